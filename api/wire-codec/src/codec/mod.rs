// Copyright 2026 The mdcore Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-protocol codecs. Each submodule implements [`crate::Framer`] plus
//! [`Codec`] for one of the three wire framings: [`xml`], [`mf`]
//! (MarketFeed), and [`binary`].

pub mod binary;
pub mod mf;
pub mod xml;

use std::mem::size_of;

use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::field_list::FieldList;
use crate::header::Header;
use crate::schema::Schema;
use crate::CodecError;
use crate::IoResult;

/// Outcome of [`Codec::parse`].
pub enum ParseOutcome {
    Parsed {
        consumed: usize,
        header: Header,
        body: FieldList,
    },
    Incomplete {
        hint: Option<usize>,
    },
    BadFraming,
}

/// Renders a header + body to bytes, or parses bytes into a header + body,
/// under one wire framing. A codec instance owns a reusable scratch buffer
/// for `build`, so it is not `Sync` and callers run one instance per
/// connection.
pub trait Codec {
    /// Looks for one complete message at the front of `buf` and decodes it.
    /// Never blocks: returns `Incomplete` rather than waiting for more bytes.
    fn parse(&mut self, buf: &[u8], schema: &Schema) -> ParseOutcome;

    /// Parses only the header, for routers that need addressing but not the
    /// field body. Returns the number of bytes consumed and the header, or
    /// `None` if the buffer does not yet hold a full header.
    fn parse_header(&mut self, buf: &[u8]) -> IoResult<Option<(usize, Header)>>;

    /// Encodes `header` + `body` into the codec's scratch buffer, which is
    /// overwritten and returned on the next call to `build`.
    fn build(&mut self, header: &Header, body: &FieldList, schema: &Schema) -> IoResult<&[u8]>;

    /// Protocol-specific keepalive payload.
    fn ping(&mut self) -> &[u8];
}

pub(crate) trait Decoder<T: Sized> {
    fn decode<B: ReadBytesExt>(&self, buf: &mut B) -> IoResult<T>;
}

pub(crate) trait Encoder<T> {
    fn encode<B: WriteBytesExt>(&self, buf: &mut B, value: T) -> IoResult<()>;
}

pub(crate) trait FixedSizeEncoder {
    const SIZE: usize;
}

macro_rules! define_ints_codec {
    ($name:ident, $ty:ty, $write:ident, $read:ident $(,)? $($endian:ident)?) => {
        #[derive(Debug, Copy, Clone)]
        pub(crate) struct $name;

        impl Decoder<$ty> for $name {
            fn decode<B: ReadBytesExt>(&self, buf: &mut B) -> IoResult<$ty> {
                Ok(buf.$read$(::<$endian>)?()?)
            }
        }

        impl Encoder<$ty> for $name {
            fn encode<B: WriteBytesExt>(&self, buf: &mut B, value: $ty) -> IoResult<()> {
                Ok(buf.$write$(::<$endian>)?(value)?)
            }
        }

        impl FixedSizeEncoder for $name {
            const SIZE: usize = size_of::<$ty>();
        }
    };
}

define_ints_codec!(Int8, i8, write_i8, read_i8);
define_ints_codec!(Int16, i16, write_i16, read_i16, BigEndian);
define_ints_codec!(Int32, i32, write_i32, read_i32, BigEndian);
define_ints_codec!(Int64, i64, write_i64, read_i64, BigEndian);
define_ints_codec!(UInt8, u8, write_u8, read_u8);
define_ints_codec!(UInt16, u16, write_u16, read_u16, BigEndian);
define_ints_codec!(UInt32, u32, write_u32, read_u32, BigEndian);
define_ints_codec!(UInt64, u64, write_u64, read_u64, BigEndian);
define_ints_codec!(Float32, f32, write_f32, read_f32, BigEndian);
define_ints_codec!(Float64, f64, write_f64, read_f64, BigEndian);

#[derive(Debug, Copy, Clone)]
pub(crate) struct Bool;

impl Decoder<bool> for Bool {
    fn decode<B: ReadBytesExt>(&self, buf: &mut B) -> IoResult<bool> {
        Ok(buf.read_u8()? != 0)
    }
}

impl Encoder<bool> for Bool {
    fn encode<B: WriteBytesExt>(&self, buf: &mut B, value: bool) -> IoResult<()> {
        Ok(buf.write_u8(if value { 1 } else { 0 })?)
    }
}

/// Minimal unsigned LEB128 varint. Used by the packed binary framing to keep
/// per-field overhead small for the common case of small field ids and short
/// fixed-width values.
#[derive(Debug, Copy, Clone)]
pub(crate) struct VarUInt;

impl Decoder<u32> for VarUInt {
    fn decode<B: ReadBytesExt>(&self, buf: &mut B) -> IoResult<u32> {
        let mut res: u32 = 0;
        for i in 0.. {
            if i >= 5 {
                return Err(CodecError::BadFraming("varint longer than 5 bytes".into()));
            }
            let next = buf.read_u8()? as u32;
            res |= (next & 0x7F) << (i * 7);
            if next < 0x80 {
                break;
            }
        }
        Ok(res)
    }
}

impl Encoder<u32> for VarUInt {
    fn encode<B: WriteBytesExt>(&self, buf: &mut B, value: u32) -> IoResult<()> {
        let mut v = value;
        while v >= 0x80 {
            buf.write_u8((v as u8) | 0x80)?;
            v >>= 7;
        }
        Ok(buf.write_u8(v as u8)?)
    }
}

pub(crate) fn varint_len(n: u32) -> usize {
    let mut res = 1;
    let mut v = n;
    while v >= 0x80 {
        res += 1;
        v >>= 7;
    }
    res
}

pub(crate) fn read_bytes<B: ReadBytesExt>(buf: &mut B, len: usize) -> IoResult<Vec<u8>> {
    let mut v = vec![0u8; len];
    buf.read_exact(&mut v)?;
    Ok(v)
}
