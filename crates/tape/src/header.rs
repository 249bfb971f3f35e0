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

//! Cross-platform tape header (§3, §4.6.1, §6.3). The journal was
//! historically recorded by three distinct processes -- native, 64-bit
//! Windows, 64-bit Linux -- that agree on every field except the width of
//! the sentinel's `tStart`, which follows the recording platform's `long`.
//! `TapeVariant::detect` reads `hdrSiz`/`sizeofLong` from the first 16 bytes
//! and the accessor methods on [`TapeHeader`] hide the width difference from
//! callers.

use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::error::TapeError;
use crate::error::TapeResult;

pub const PRELUDE_LEN: usize = 16;

/// Which on-disk layout produced this tape's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeVariant {
    /// `sizeof(long) == 8`, written by this crate.
    Native,
    /// `sizeof(long) == 4`, historically a 32-bit Windows recorder.
    Win64,
    /// `sizeof(long) == 8`, a 64-bit Linux recorder; identical layout to
    /// `Native` but kept as a distinct tag so callers can report provenance.
    Linux64,
}

impl TapeVariant {
    fn sizeof_long(self) -> u64 {
        match self {
            TapeVariant::Native | TapeVariant::Linux64 => 8,
            TapeVariant::Win64 => 4,
        }
    }

    fn detect(sizeof_long: u64) -> TapeResult<TapeVariant> {
        match sizeof_long {
            8 => Ok(TapeVariant::Native),
            4 => Ok(TapeVariant::Win64),
            _ => Err(TapeError::BadHeader),
        }
    }
}

const OFF_HDR_SIZ: usize = 0;
const OFF_SIZEOF_LONG: usize = 8;
const OFF_FILE_SIZ: usize = 16;
const OFF_WIN_SIZ: usize = 24;
const OFF_B_MD_DIRECT: usize = 32;
const OFF_T_CREATE: usize = 40;
const OFF_T_EOD: usize = 48;
const OFF_CUR_LOC: usize = 56;
const OFF_NUM_REC: usize = 64;
const OFF_SEC_PER_IDX_T: usize = 72;
const OFF_NUM_SEC_IDX_T: usize = 76;
const OFF_SEC_PER_IDX_R: usize = 80;
const OFF_NUM_SEC_IDX_R: usize = 84;
const OFF_MAX_REC: usize = 88;
const OFF_NUM_DICT_ENTRY: usize = 92;
const OFF_B_WRITE: usize = 96;
const OFF_T_START: usize = 104;
const VERSION_LEN: usize = 16;
const SIGNATURE_LEN: usize = 16;

pub const SIGNATURE: &[u8; SIGNATURE_LEN] = b"MDCORE_TAPE_001\0";

/// Parameters fixed at tape creation; everything else is mutated in place
/// as records are appended.
#[derive(Debug, Clone, Copy)]
pub struct TapeParams {
    pub sec_per_idx_t: u32,
    pub num_sec_idx_t: u32,
    pub sec_per_idx_r: u32,
    pub num_sec_idx_r: u32,
    pub max_rec: u32,
}

impl Default for TapeParams {
    fn default() -> Self {
        // One coarse bucket per minute covering roughly 30 days, and a
        // finer per-record granularity bucket every 10 seconds.
        TapeParams {
            sec_per_idx_t: 60,
            num_sec_idx_t: 60 * 24 * 30,
            sec_per_idx_r: 10,
            num_sec_idx_r: 10 * 24 * 30,
            max_rec: 0,
        }
    }
}

/// Platform-agnostic view over the tape's fixed-size header region.
#[derive(Debug, Clone, Copy)]
pub struct TapeHeader {
    pub variant: TapeVariant,
    pub file_siz: u64,
    pub t_create: u64,
    pub t_eod: u64,
    pub cur_loc: u64,
    pub num_rec: u64,
    pub sec_per_idx_t: u32,
    pub num_sec_idx_t: u32,
    pub sec_per_idx_r: u32,
    pub num_sec_idx_r: u32,
    pub max_rec: u32,
    /// `false` while a writer holds the tape open; set once on a clean close
    /// (§4.6.3). A tape reopened with this still `true` was not closed
    /// cleanly and is replayable only up to its last complete record.
    pub b_write: bool,
}

impl TapeHeader {
    pub fn header_len(&self) -> usize {
        OFF_T_START + self.variant.sizeof_long() as usize + VERSION_LEN + SIGNATURE_LEN
    }

    pub fn new(now_sec: u64, params: TapeParams) -> Self {
        TapeHeader {
            variant: TapeVariant::Native,
            file_siz: 0,
            t_create: now_sec,
            t_eod: 0,
            cur_loc: 0,
            num_rec: 0,
            sec_per_idx_t: params.sec_per_idx_t,
            num_sec_idx_t: params.num_sec_idx_t,
            sec_per_idx_r: params.sec_per_idx_r,
            num_sec_idx_r: params.num_sec_idx_r,
            max_rec: params.max_rec,
            b_write: true,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.header_len()];
        LittleEndian::write_u64(&mut buf[OFF_HDR_SIZ..], self.header_len() as u64);
        LittleEndian::write_u64(&mut buf[OFF_SIZEOF_LONG..], self.variant.sizeof_long());
        LittleEndian::write_u64(&mut buf[OFF_FILE_SIZ..], self.file_siz);
        LittleEndian::write_u64(&mut buf[OFF_WIN_SIZ..], self.file_siz);
        buf[OFF_B_MD_DIRECT] = 0;
        LittleEndian::write_u64(&mut buf[OFF_T_CREATE..], self.t_create);
        LittleEndian::write_u64(&mut buf[OFF_T_EOD..], self.t_eod);
        LittleEndian::write_u64(&mut buf[OFF_CUR_LOC..], self.cur_loc);
        LittleEndian::write_u64(&mut buf[OFF_NUM_REC..], self.num_rec);
        LittleEndian::write_u32(&mut buf[OFF_SEC_PER_IDX_T..], self.sec_per_idx_t);
        LittleEndian::write_u32(&mut buf[OFF_NUM_SEC_IDX_T..], self.num_sec_idx_t);
        LittleEndian::write_u32(&mut buf[OFF_SEC_PER_IDX_R..], self.sec_per_idx_r);
        LittleEndian::write_u32(&mut buf[OFF_NUM_SEC_IDX_R..], self.num_sec_idx_r);
        LittleEndian::write_u32(&mut buf[OFF_MAX_REC..], self.max_rec);
        LittleEndian::write_u32(&mut buf[OFF_NUM_DICT_ENTRY..], 0);
        buf[OFF_B_WRITE] = self.b_write as u8;
        let long_width = self.variant.sizeof_long() as usize;
        let t_start = self.t_create as i64;
        if long_width == 4 {
            LittleEndian::write_i32(&mut buf[OFF_T_START..], t_start as i32);
        } else {
            LittleEndian::write_i64(&mut buf[OFF_T_START..], t_start);
        }
        let version_off = OFF_T_START + long_width;
        let version_bytes = crate::VERSION.as_bytes();
        let n = version_bytes.len().min(VERSION_LEN);
        buf[version_off..version_off + n].copy_from_slice(&version_bytes[..n]);
        let signature_off = version_off + VERSION_LEN;
        buf[signature_off..signature_off + SIGNATURE_LEN].copy_from_slice(SIGNATURE);
        buf
    }

    pub fn decode(bytes: &[u8]) -> TapeResult<Self> {
        if bytes.len() < PRELUDE_LEN {
            return Err(TapeError::BadHeader);
        }
        let sizeof_long = LittleEndian::read_u64(&bytes[OFF_SIZEOF_LONG..]);
        let variant = TapeVariant::detect(sizeof_long)?;
        let long_width = sizeof_long as usize;
        let min_len = OFF_T_START + long_width + VERSION_LEN + SIGNATURE_LEN;
        if bytes.len() < min_len {
            return Err(TapeError::BadHeader);
        }
        let signature_off = OFF_T_START + long_width + VERSION_LEN;
        if &bytes[signature_off..signature_off + SIGNATURE_LEN] != SIGNATURE {
            return Err(TapeError::BadHeader);
        }
        Ok(TapeHeader {
            variant,
            file_siz: LittleEndian::read_u64(&bytes[OFF_FILE_SIZ..]),
            t_create: LittleEndian::read_u64(&bytes[OFF_T_CREATE..]),
            t_eod: LittleEndian::read_u64(&bytes[OFF_T_EOD..]),
            cur_loc: LittleEndian::read_u64(&bytes[OFF_CUR_LOC..]),
            num_rec: LittleEndian::read_u64(&bytes[OFF_NUM_REC..]),
            sec_per_idx_t: LittleEndian::read_u32(&bytes[OFF_SEC_PER_IDX_T..]),
            num_sec_idx_t: LittleEndian::read_u32(&bytes[OFF_NUM_SEC_IDX_T..]),
            sec_per_idx_r: LittleEndian::read_u32(&bytes[OFF_SEC_PER_IDX_R..]),
            num_sec_idx_r: LittleEndian::read_u32(&bytes[OFF_NUM_SEC_IDX_R..]),
            max_rec: LittleEndian::read_u32(&bytes[OFF_MAX_REC..]),
            b_write: bytes[OFF_B_WRITE] != 0,
        })
    }

    pub fn set_cur_loc(bytes: &mut [u8], value: u64) {
        LittleEndian::write_u64(&mut bytes[OFF_CUR_LOC..], value);
    }

    pub fn set_file_siz(bytes: &mut [u8], value: u64) {
        LittleEndian::write_u64(&mut bytes[OFF_FILE_SIZ..], value);
        LittleEndian::write_u64(&mut bytes[OFF_WIN_SIZ..], value);
    }

    pub fn set_num_rec(bytes: &mut [u8], value: u64) {
        LittleEndian::write_u64(&mut bytes[OFF_NUM_REC..], value);
    }

    pub fn set_b_write(bytes: &mut [u8], value: bool) {
        bytes[OFF_B_WRITE] = value as u8;
    }

    pub fn set_t_eod(bytes: &mut [u8], value: u64) {
        LittleEndian::write_u64(&mut bytes[OFF_T_EOD..], value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips_scalar_fields() {
        let header = TapeHeader::new(1_700_000_000, TapeParams::default());
        let bytes = header.encode();
        let decoded = TapeHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.variant, TapeVariant::Native);
        assert_eq!(decoded.t_create, header.t_create);
        assert_eq!(decoded.sec_per_idx_t, header.sec_per_idx_t);
        assert!(decoded.b_write);
    }

    #[test]
    fn win64_variant_is_detected_from_sizeof_long() {
        let header = TapeHeader {
            variant: TapeVariant::Win64,
            ..TapeHeader::new(1, TapeParams::default())
        };
        let bytes = header.encode();
        let decoded = TapeHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.variant, TapeVariant::Win64);
        assert_eq!(decoded.t_create, 1);
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut bytes = TapeHeader::new(1, TapeParams::default()).encode();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(TapeHeader::decode(&bytes).is_err());
    }
}
