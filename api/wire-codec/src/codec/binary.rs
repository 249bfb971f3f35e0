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

//! Packed binary framing: a fixed prelude, a short variable-length header
//! string section, then one record per field. Unlike XML and MarketFeed,
//! every field keeps its native [`FieldType`] on the wire instead of
//! round-tripping through ASCII, and the framer always knows the exact
//! message length up front.
//!
//! ```text
//! msgLen:u32 protocol:u8 msgType:u8 dataType:u8 bPacked:u8 tagInt:i32 rtl:i64
//! timeSec:u32 timeUs:u32 hdrLen:u16
//! [svcLen:u8 svc] [tkrLen:u8 tkr] [tagStrLen:u8 tagStr] [errLen:u16 err]
//! fieldCount:u16
//! { fid type value }*
//! ```
//!
//! `bPacked` selects whether field ids are written as a LEB128 varint
//! (packed, the default on encode) or a fixed 4-byte big-endian integer
//! (unpacked); both are accepted on decode.

use std::io::Cursor;
use std::io::Read;

use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::codec::read_bytes;
use crate::codec::varint_len;
use crate::codec::Codec;
use crate::codec::Decoder;
use crate::codec::Encoder;
use crate::codec::FixedSizeEncoder;
use crate::codec::Int16;
use crate::codec::Int32;
use crate::codec::Int64;
use crate::codec::Int8;
use crate::codec::ParseOutcome;
use crate::codec::UInt16;
use crate::codec::UInt32;
use crate::codec::UInt8;
use crate::codec::VarUInt;
use crate::field::FieldType;
use crate::field::FieldValue;
use crate::field_list::FieldList;
use crate::framer::FrameOutcome;
use crate::framer::Framer;
use crate::framer::Protocol;
use crate::header::truncate_to;
use crate::header::DataType;
use crate::header::Header;
use crate::header::MsgType;
use crate::header::Timestamp;
use crate::header::ERR_MAX;
use crate::header::SVC_MAX;
use crate::header::TAG_STR_MAX;
use crate::header::TKR_MAX;
use crate::schema::Schema;
use crate::CodecError;
use crate::IoResult;

const PROTOCOL_MARKER: u8 = 0xB1;
const PRELUDE_LEN: usize = 4 + 1 + 1 + 1 + 1 + 4 + 8 + 4 + 4 + 2;

fn msg_type_ordinal(ty: MsgType) -> u8 {
    match ty {
        MsgType::Undef => 0,
        MsgType::Image => 1,
        MsgType::Update => 2,
        MsgType::Dead => 3,
        MsgType::Stale => 4,
        MsgType::Recovering => 5,
        MsgType::GlobalStatus => 6,
        MsgType::Mount => 7,
        MsgType::Ping => 8,
        MsgType::Ctl => 9,
        MsgType::Open => 10,
        MsgType::Close => 11,
        MsgType::Query => 12,
        MsgType::Insert => 13,
        MsgType::InsAck => 14,
    }
}

fn msg_type_from_ordinal(ord: u8) -> MsgType {
    match ord {
        1 => MsgType::Image,
        2 => MsgType::Update,
        3 => MsgType::Dead,
        4 => MsgType::Stale,
        5 => MsgType::Recovering,
        6 => MsgType::GlobalStatus,
        7 => MsgType::Mount,
        8 => MsgType::Ping,
        9 => MsgType::Ctl,
        10 => MsgType::Open,
        11 => MsgType::Close,
        12 => MsgType::Query,
        13 => MsgType::Insert,
        14 => MsgType::InsAck,
        _ => MsgType::Undef,
    }
}

fn data_type_ordinal(ty: DataType) -> u8 {
    match ty {
        DataType::Undef => 0,
        DataType::FieldList => 1,
        DataType::FixedMsg => 2,
        DataType::BlobList => 3,
        DataType::BlobTable => 4,
        DataType::BookOrder => 5,
        DataType::BookPriceLevel => 6,
        DataType::Control => 7,
    }
}

fn data_type_from_ordinal(ord: u8) -> DataType {
    match ord {
        1 => DataType::FieldList,
        2 => DataType::FixedMsg,
        3 => DataType::BlobList,
        4 => DataType::BlobTable,
        5 => DataType::BookOrder,
        6 => DataType::BookPriceLevel,
        7 => DataType::Control,
        _ => DataType::Undef,
    }
}

fn write_short_string<W: WriteBytesExt>(buf: &mut W, s: &str, max: usize) -> IoResult<()> {
    let s = truncate_to(s, max);
    UInt8.encode(buf, s.len() as u8)?;
    buf.write_all(s.as_bytes())?;
    Ok(())
}

fn read_short_string<R: ReadBytesExt>(buf: &mut R) -> IoResult<String> {
    let len = UInt8.decode(buf)? as usize;
    let bytes = read_bytes(buf, len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_long_string<W: WriteBytesExt>(buf: &mut W, s: &str, max: usize) -> IoResult<()> {
    let s = truncate_to(s, max);
    UInt16.encode(buf, s.len() as u16)?;
    buf.write_all(s.as_bytes())?;
    Ok(())
}

fn read_long_string<R: ReadBytesExt>(buf: &mut R) -> IoResult<String> {
    let len = UInt16.decode(buf)? as usize;
    let bytes = read_bytes(buf, len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_value<W: WriteBytesExt>(buf: &mut W, value: &FieldValue) -> IoResult<()> {
    match value {
        FieldValue::Undefined => {}
        FieldValue::String(s) => {
            UInt16.encode(buf, s.len() as u16)?;
            buf.write_all(s.as_bytes())?;
        }
        FieldValue::Int8(v) => Int8.encode(buf, *v)?,
        FieldValue::Int16(v) => Int16.encode(buf, *v)?,
        FieldValue::Int32(v) => Int32.encode(buf, *v)?,
        FieldValue::Int64(v) => Int64.encode(buf, *v)?,
        FieldValue::Float(v) => crate::codec::Float32.encode(buf, *v)?,
        FieldValue::Double(v) => crate::codec::Float64.encode(buf, *v)?,
        FieldValue::Real { mantissa, hint } => {
            Int64.encode(buf, *mantissa)?;
            UInt8.encode(buf, *hint)?;
            UInt8.encode(buf, 0)?; // reserved, kept for 8-byte alignment of the next record
        }
        FieldValue::Date(v) => Int32.encode(buf, *v)?,
        FieldValue::Time(v) => Int32.encode(buf, *v)?,
        FieldValue::TimeSec(v) => Int32.encode(buf, *v)?,
        FieldValue::DateTime(v) => Int64.encode(buf, *v)?,
        FieldValue::UnixTime(v) => Int64.encode(buf, *v)?,
        FieldValue::ByteStream(bytes) => {
            UInt16.encode(buf, bytes.len() as u16)?;
            buf.write_all(bytes)?;
        }
        FieldValue::Vector { precision, values } => {
            UInt8.encode(buf, *precision)?;
            UInt32.encode(buf, values.len() as u32)?;
            let scale = 10f64.powi(*precision as i32);
            for v in values {
                Int64.encode(buf, (v * scale).round() as i64)?;
            }
        }
    }
    Ok(())
}

fn value_wire_len(value: &FieldValue) -> usize {
    match value {
        FieldValue::Undefined => 0,
        FieldValue::String(s) => 2 + s.len(),
        FieldValue::Int8(_) => Int8::SIZE,
        FieldValue::Int16(_) => Int16::SIZE,
        FieldValue::Int32(_) => Int32::SIZE,
        FieldValue::Int64(_) => Int64::SIZE,
        FieldValue::Float(_) => 4,
        FieldValue::Double(_) => 8,
        FieldValue::Real { .. } => 10,
        FieldValue::Date(_) => 4,
        FieldValue::Time(_) => 4,
        FieldValue::TimeSec(_) => 4,
        FieldValue::DateTime(_) => 8,
        FieldValue::UnixTime(_) => 8,
        FieldValue::ByteStream(bytes) => 2 + bytes.len(),
        FieldValue::Vector { values, .. } => 1 + 4 + values.len() * 8,
    }
}

fn read_value<R: ReadBytesExt>(buf: &mut R, ty: FieldType) -> IoResult<FieldValue> {
    Ok(match ty {
        FieldType::Undefined => FieldValue::Undefined,
        FieldType::String => {
            let len = UInt16.decode(buf)? as usize;
            FieldValue::String(String::from_utf8_lossy(&read_bytes(buf, len)?).into_owned())
        }
        FieldType::Int8 => FieldValue::Int8(Int8.decode(buf)?),
        FieldType::Int16 => FieldValue::Int16(Int16.decode(buf)?),
        FieldType::Int32 => FieldValue::Int32(Int32.decode(buf)?),
        FieldType::Int64 => FieldValue::Int64(Int64.decode(buf)?),
        FieldType::Float => FieldValue::Float(crate::codec::Float32.decode(buf)?),
        FieldType::Double => FieldValue::Double(crate::codec::Float64.decode(buf)?),
        FieldType::Real => {
            let mantissa = Int64.decode(buf)?;
            let hint = UInt8.decode(buf)?;
            let _reserved = UInt8.decode(buf)?;
            FieldValue::Real { mantissa, hint }
        }
        FieldType::Date => FieldValue::Date(Int32.decode(buf)?),
        FieldType::Time => FieldValue::Time(Int32.decode(buf)?),
        FieldType::TimeSec => FieldValue::TimeSec(Int32.decode(buf)?),
        FieldType::DateTime => FieldValue::DateTime(Int64.decode(buf)?),
        FieldType::UnixTime => FieldValue::UnixTime(Int64.decode(buf)?),
        FieldType::ByteStream => {
            let len = UInt16.decode(buf)? as usize;
            FieldValue::ByteStream(read_bytes(buf, len)?)
        }
        FieldType::Vector => {
            let precision = UInt8.decode(buf)?;
            let count = UInt32.decode(buf)? as usize;
            let scale = 10f64.powi(precision as i32);
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(Int64.decode(buf)? as f64 / scale);
            }
            FieldValue::Vector { precision, values }
        }
    })
}

#[derive(Debug, Default)]
pub struct BinaryCodec {
    scratch: Vec<u8>,
}

impl BinaryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_prelude<R: ReadBytesExt>(r: &mut R) -> IoResult<(u32, bool, MsgType, DataType, i32, i64, Timestamp, u16)> {
        let msg_len = UInt32.decode(r)?;
        let protocol = UInt8.decode(r)?;
        if protocol != PROTOCOL_MARKER {
            return Err(CodecError::BadFraming(format!("unexpected protocol marker 0x{protocol:02x}")));
        }
        let msg_type = msg_type_from_ordinal(UInt8.decode(r)?);
        let data_type = data_type_from_ordinal(UInt8.decode(r)?);
        let b_packed = UInt8.decode(r)? != 0;
        let tag_int = Int32.decode(r)?;
        let rtl = Int64.decode(r)?;
        let sec = UInt32.decode(r)?;
        let usec = UInt32.decode(r)?;
        let hdr_len = UInt16.decode(r)?;
        Ok((msg_len, b_packed, msg_type, data_type, tag_int, rtl, Timestamp { sec, usec }, hdr_len))
    }

    fn decode_message(bytes: &[u8], schema: &Schema) -> IoResult<(Header, FieldList)> {
        let mut cur = Cursor::new(bytes);
        let (_msg_len, b_packed, msg_type, data_type, tag_int, rtl, tstamp, _hdr_len) =
            Self::read_prelude(&mut cur)?;
        let svc = read_short_string(&mut cur)?;
        let tkr = read_long_string(&mut cur)?;
        let tag_str = read_short_string(&mut cur)?;
        let err = read_long_string(&mut cur)?;

        let mut header = Header::new(msg_type, svc, tkr);
        header.data_type = data_type;
        header.tag_int = tag_int;
        header.tag_str = tag_str;
        header.rtl = rtl;
        header.tstamp = tstamp;
        header.err = err;

        let field_count = UInt16.decode(&mut cur)?;
        let mut body = FieldList::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let fid = if b_packed {
                VarUInt.decode(&mut cur)? as i32
            } else {
                Int32.decode(&mut cur)?
            };
            let tag = UInt8.decode(&mut cur)?;
            let wire_type = FieldType::from_wire_tag(tag)
                .ok_or_else(|| CodecError::BadFraming(format!("unknown field type tag {tag}")))?;
            let value = read_value(&mut cur, wire_type)?;
            match schema.find_by_fid(fid) {
                Some(entry) if entry.ty != wire_type => {
                    body.upsert(fid, wire_type, value);
                }
                _ => body.upsert(fid, wire_type, value),
            }
        }
        Ok((header, body))
    }
}

impl Framer for BinaryCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Binary
    }

    fn frame(&self, buf: &[u8]) -> FrameOutcome {
        if buf.len() < 4 {
            return FrameOutcome::NeedMore { hint: Some(4 - buf.len()) };
        }
        let mut cur = Cursor::new(&buf[..4]);
        let msg_len = match UInt32.decode(&mut cur) {
            Ok(v) => v as usize,
            Err(_) => return FrameOutcome::BadFraming,
        };
        if msg_len < PRELUDE_LEN {
            return FrameOutcome::BadFraming;
        }
        if buf.len() < msg_len {
            FrameOutcome::NeedMore { hint: Some(msg_len - buf.len()) }
        } else {
            FrameOutcome::Complete { len: msg_len }
        }
    }
}

impl Codec for BinaryCodec {
    fn parse(&mut self, buf: &[u8], schema: &Schema) -> ParseOutcome {
        match self.frame(buf) {
            FrameOutcome::Complete { len } => match Self::decode_message(&buf[..len], schema) {
                Ok((header, body)) => ParseOutcome::Parsed { consumed: len, header, body },
                Err(_) => ParseOutcome::BadFraming,
            },
            FrameOutcome::NeedMore { hint } => ParseOutcome::Incomplete { hint },
            FrameOutcome::BadFraming => ParseOutcome::BadFraming,
        }
    }

    fn parse_header(&mut self, buf: &[u8]) -> IoResult<Option<(usize, Header)>> {
        match self.frame(buf) {
            FrameOutcome::Complete { len } => {
                let mut cur = Cursor::new(&buf[..len]);
                let (_msg_len, _b_packed, msg_type, data_type, tag_int, rtl, tstamp, _hdr_len) =
                    Self::read_prelude(&mut cur)?;
                let svc = read_short_string(&mut cur)?;
                let tkr = read_long_string(&mut cur)?;
                let tag_str = read_short_string(&mut cur)?;
                let err = read_long_string(&mut cur)?;
                let mut header = Header::new(msg_type, svc, tkr);
                header.data_type = data_type;
                header.tag_int = tag_int;
                header.tag_str = tag_str;
                header.rtl = rtl;
                header.tstamp = tstamp;
                header.err = err;
                Ok(Some((len, header)))
            }
            FrameOutcome::NeedMore { .. } => Ok(None),
            FrameOutcome::BadFraming => Err(CodecError::BadFraming("binary framing".into())),
        }
    }

    fn build(&mut self, header: &Header, body: &FieldList, _schema: &Schema) -> IoResult<&[u8]> {
        let svc = truncate_to(&header.svc, SVC_MAX);
        let tkr = truncate_to(&header.tkr, TKR_MAX);
        let tag_str = truncate_to(&header.tag_str, TAG_STR_MAX);
        let err = truncate_to(&header.err, ERR_MAX);
        let hdr_len = 1 + svc.len() + 2 + tkr.len() + 1 + tag_str.len() + 2 + err.len();

        let mut field_bytes = 0usize;
        for field in body.iter() {
            field_bytes += varint_len(field.fid as u32) + 1 + value_wire_len(&field.value);
        }
        let msg_len = PRELUDE_LEN + hdr_len + 2 + field_bytes;

        let mut payload = Vec::with_capacity(msg_len);
        UInt32.encode(&mut payload, msg_len as u32)?;
        UInt8.encode(&mut payload, PROTOCOL_MARKER)?;
        UInt8.encode(&mut payload, msg_type_ordinal(header.msg_type))?;
        UInt8.encode(&mut payload, data_type_ordinal(header.data_type))?;
        UInt8.encode(&mut payload, 1)?; // always packed on encode
        Int32.encode(&mut payload, header.tag_int)?;
        Int64.encode(&mut payload, header.rtl)?;
        UInt32.encode(&mut payload, header.tstamp.sec)?;
        UInt32.encode(&mut payload, header.tstamp.usec)?;
        UInt16.encode(&mut payload, hdr_len as u16)?;
        write_short_string(&mut payload, svc, SVC_MAX)?;
        write_long_string(&mut payload, tkr, TKR_MAX)?;
        write_short_string(&mut payload, tag_str, TAG_STR_MAX)?;
        write_long_string(&mut payload, err, ERR_MAX)?;
        UInt16.encode(&mut payload, body.len() as u16)?;
        for field in body.iter() {
            VarUInt.encode(&mut payload, field.fid as u32)?;
            UInt8.encode(&mut payload, field.value.field_type().wire_tag())?;
            write_value(&mut payload, &field.value)?;
        }

        self.scratch = payload;
        Ok(&self.scratch)
    }

    fn ping(&mut self) -> &[u8] {
        let header = Header::new(MsgType::Ping, "", "");
        let body = FieldList::new();
        let schema = Schema::default();
        // build() always succeeds for an empty body; the unwrap below can
        // only fail on an io error, impossible for an in-memory Vec.
        self.build(&header, &body, &schema).expect("encoding a ping never fails");
        &self.scratch
    }
}

/// Reads a length-delimited record straight off a `Read` stream, without
/// requiring the whole message to already be resident in one buffer. Used by
/// callers reading a tape segment or a socket that exposes `Read` directly
/// rather than a growable byte buffer.
pub fn read_one<R: Read>(mut r: R) -> IoResult<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    r.read_exact(&mut len_bytes)?;
    let msg_len = u32::from_be_bytes(len_bytes) as usize;
    if msg_len < PRELUDE_LEN {
        return Err(CodecError::BadFraming("message shorter than prelude".into()));
    }
    let mut buf = vec![0u8; msg_len];
    buf[..4].copy_from_slice(&len_bytes);
    r.read_exact(&mut buf[4..])?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::builder()
            .field(22, "BID", FieldType::Real, 9)
            .field(40, "VOL_CURVE", FieldType::Vector, 0)
            .build()
            .unwrap()
    }

    #[test]
    fn round_trips_real_and_vector_fields() {
        let schema = schema();
        let mut header = Header::new(MsgType::Image, "NASDAQ", "AAPL");
        header.rtl = 42;
        header.tstamp = Timestamp { sec: 1_700_000_000, usec: 500 };
        let mut body = FieldList::new();
        body.add(22, FieldType::Real, FieldValue::Real { mantissa: 12055, hint: 2 });
        body.add(
            40,
            FieldType::Vector,
            FieldValue::Vector { precision: 3, values: vec![1.5, 2.25, 3.0] },
        );

        let mut codec = BinaryCodec::new();
        let wire = codec.build(&header, &body, &schema).unwrap().to_vec();

        let mut codec2 = BinaryCodec::new();
        match codec2.parse(&wire, &schema) {
            ParseOutcome::Parsed { consumed, header: h2, body: b2 } => {
                assert_eq!(consumed, wire.len());
                assert_eq!(h2.rtl, 42);
                assert_eq!(h2.tstamp.sec, 1_700_000_000);
                assert_eq!(b2.get(22), Some(&FieldValue::Real { mantissa: 12055, hint: 2 }));
                match b2.get(40).unwrap() {
                    FieldValue::Vector { precision, values } => {
                        assert_eq!(*precision, 3);
                        assert_eq!(values, &vec![1.5, 2.25, 3.0]);
                    }
                    _ => panic!("expected Vector"),
                }
            }
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn frame_reports_needed_bytes() {
        let schema = schema();
        let header = Header::new(MsgType::Update, "X", "Y");
        let mut codec = BinaryCodec::new();
        let wire = codec.build(&header, &FieldList::new(), &schema).unwrap().to_vec();
        let mut partial = wire.clone();
        partial.truncate(wire.len() - 3);
        let mut codec2 = BinaryCodec::new();
        match codec2.parse(&partial, &schema) {
            ParseOutcome::Incomplete { hint } => assert_eq!(hint, Some(3)),
            _ => panic!("expected Incomplete"),
        }
    }

    #[test]
    fn rejects_bad_protocol_marker() {
        let mut buf = vec![0u8; PRELUDE_LEN];
        buf[3] = PRELUDE_LEN as u8;
        buf[4] = 0xFF;
        let schema = schema();
        let mut codec = BinaryCodec::new();
        assert!(matches!(codec.parse(&buf, &schema), ParseOutcome::BadFraming));
    }
}
