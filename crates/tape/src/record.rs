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

//! One journal entry: `tapeRecHdr` (§3) plus the raw wire-message bytes it
//! frames. The tape never decodes the payload; that is left to whichever
//! `WireCodec` the caller picked when it built the message.

use byteorder::ByteOrder;
use byteorder::LittleEndian;
use crc32fast::Hasher;

use crate::error::TapeError;
use crate::error::TapeResult;

pub const SVC_MAX: usize = 64;
pub const TKR_MAX: usize = 128;

const OFF_T_MSG_SEC: usize = 0;
const OFF_T_MSG_USEC: usize = 8;
const OFF_N_MSG: usize = 12;
const OFF_N_BYTE: usize = 20;
const OFF_DB_IDX: usize = 28;
const OFF_STREAM_ID: usize = 32;
const OFF_SVC: usize = 36;
const OFF_TKR: usize = OFF_SVC + SVC_MAX;
const OFF_CHANNEL_ID: usize = OFF_TKR + TKR_MAX;
const OFF_LOC: usize = OFF_CHANNEL_ID + 4;
const OFF_LOC_IMG: usize = OFF_LOC + 8;
const OFF_CRC32: usize = OFF_LOC_IMG + 8;
pub const RECORD_HEADER_LEN: usize = OFF_CRC32 + 4;

/// A decoded journal entry, handed back by [`crate::reader::TapeReader::read`].
#[derive(Debug, Clone)]
pub struct TapeRecord {
    pub t_msg_sec: u64,
    pub t_msg_usec: u32,
    pub n_msg: u64,
    pub db_idx: i32,
    pub stream_id: i32,
    pub svc: String,
    pub tkr: String,
    pub channel_id: i32,
    pub loc: u64,
    pub loc_img: u64,
    pub payload: Vec<u8>,
}

fn write_fixed_str(buf: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    buf[n..].fill(0);
}

fn read_fixed_str(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Appends one record (header + payload + trailing crc32 over the payload)
/// to `out`, returning its total on-disk length.
pub fn encode_record(record: &TapeRecord) -> Vec<u8> {
    let mut buf = vec![0u8; RECORD_HEADER_LEN + record.payload.len()];
    LittleEndian::write_u64(&mut buf[OFF_T_MSG_SEC..], record.t_msg_sec);
    LittleEndian::write_u32(&mut buf[OFF_T_MSG_USEC..], record.t_msg_usec);
    LittleEndian::write_u64(&mut buf[OFF_N_MSG..], record.n_msg);
    LittleEndian::write_u64(&mut buf[OFF_N_BYTE..], record.payload.len() as u64);
    LittleEndian::write_i32(&mut buf[OFF_DB_IDX..], record.db_idx);
    LittleEndian::write_i32(&mut buf[OFF_STREAM_ID..], record.stream_id);
    write_fixed_str(&mut buf[OFF_SVC..OFF_SVC + SVC_MAX], &record.svc);
    write_fixed_str(&mut buf[OFF_TKR..OFF_TKR + TKR_MAX], &record.tkr);
    LittleEndian::write_i32(&mut buf[OFF_CHANNEL_ID..], record.channel_id);
    LittleEndian::write_u64(&mut buf[OFF_LOC..], record.loc);
    LittleEndian::write_u64(&mut buf[OFF_LOC_IMG..], record.loc_img);

    let mut hasher = Hasher::new();
    hasher.update(&record.payload);
    LittleEndian::write_u32(&mut buf[OFF_CRC32..], hasher.finalize());

    buf[RECORD_HEADER_LEN..].copy_from_slice(&record.payload);
    buf
}

/// Decodes one record starting at `bytes[0]`; `bytes` must contain at least
/// the record header plus its declared payload length.
pub fn decode_record(bytes: &[u8]) -> TapeResult<TapeRecord> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Err(TapeError::Corrupt("record header truncated"));
    }
    let n_byte = LittleEndian::read_u64(&bytes[OFF_N_BYTE..]) as usize;
    if bytes.len() < RECORD_HEADER_LEN + n_byte {
        return Err(TapeError::Corrupt("record payload truncated"));
    }
    let payload = bytes[RECORD_HEADER_LEN..RECORD_HEADER_LEN + n_byte].to_vec();

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let want_crc = LittleEndian::read_u32(&bytes[OFF_CRC32..]);
    if hasher.finalize() != want_crc {
        return Err(TapeError::Corrupt("payload crc32 mismatch"));
    }

    Ok(TapeRecord {
        t_msg_sec: LittleEndian::read_u64(&bytes[OFF_T_MSG_SEC..]),
        t_msg_usec: LittleEndian::read_u32(&bytes[OFF_T_MSG_USEC..]),
        n_msg: LittleEndian::read_u64(&bytes[OFF_N_MSG..]),
        db_idx: LittleEndian::read_i32(&bytes[OFF_DB_IDX..]),
        stream_id: LittleEndian::read_i32(&bytes[OFF_STREAM_ID..]),
        svc: read_fixed_str(&bytes[OFF_SVC..OFF_SVC + SVC_MAX]),
        tkr: read_fixed_str(&bytes[OFF_TKR..OFF_TKR + TKR_MAX]),
        channel_id: LittleEndian::read_i32(&bytes[OFF_CHANNEL_ID..]),
        loc: LittleEndian::read_u64(&bytes[OFF_LOC..]),
        loc_img: LittleEndian::read_u64(&bytes[OFF_LOC_IMG..]),
        payload,
    })
}

/// Reads just the `nByte` field so callers can size a slice before decoding.
pub fn peek_len(bytes: &[u8]) -> TapeResult<usize> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Err(TapeError::Corrupt("record header truncated"));
    }
    Ok(RECORD_HEADER_LEN + LittleEndian::read_u64(&bytes[OFF_N_BYTE..]) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TapeRecord {
        TapeRecord {
            t_msg_sec: 1_700_000_000,
            t_msg_usec: 500_000,
            n_msg: 7,
            db_idx: 0,
            stream_id: 3,
            svc: "BOOKS".to_string(),
            tkr: "IBM".to_string(),
            channel_id: 1,
            loc: 144,
            loc_img: 0,
            payload: b"\x01\x02\x03hello".to_vec(),
        }
    }

    #[test]
    fn round_trips_a_record() {
        let record = sample();
        let bytes = encode_record(&record);
        let decoded = decode_record(&bytes).unwrap();
        assert_eq!(decoded.svc, "BOOKS");
        assert_eq!(decoded.tkr, "IBM");
        assert_eq!(decoded.payload, record.payload);
        assert_eq!(decoded.n_msg, 7);
    }

    #[test]
    fn flipped_payload_byte_fails_crc() {
        let record = sample();
        let mut bytes = encode_record(&record);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode_record(&bytes), Err(TapeError::Corrupt(_))));
    }

    #[test]
    fn peek_len_matches_encoded_length() {
        let record = sample();
        let bytes = encode_record(&record);
        assert_eq!(peek_len(&bytes).unwrap(), bytes.len());
    }
}
