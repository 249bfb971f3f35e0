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

//! Replay and timestamp-seek over a mapped tape (§4.6.2). Many readers may
//! map the same file concurrently; each remaps independently when it
//! observes `curLoc` has advanced past what it last saw.

use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;

use memmap2::Mmap;

use crate::error::TapeError;
use crate::error::TapeResult;
use crate::header::TapeHeader;
use crate::index::TapeIndex;
use crate::record::decode_record;
use crate::record::peek_len;
use crate::record::TapeRecord;
use crate::record::RECORD_HEADER_LEN;

pub struct TapeReader {
    file: File,
    mmap: Mmap,
    header: TapeHeader,
    header_len: usize,
    index: TapeIndex,
    cursor: usize,
}

impl TapeReader {
    pub fn open(path: impl AsRef<Path>) -> TapeResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let header = TapeHeader::decode(&mmap)?;
        let header_len = header.header_len();
        let mut reader = TapeReader { file, mmap, header, header_len, index: TapeIndex::new(), cursor: header_len };
        reader.rebuild_index()?;
        reader.cursor = header_len;
        Ok(reader)
    }

    fn rebuild_index(&mut self) -> TapeResult<()> {
        self.index.clear();
        let sec_per_idx_t = self.header.sec_per_idx_t;
        let cur_loc = self.header.cur_loc as usize;
        let mut offset = self.header_len;
        while offset + RECORD_HEADER_LEN <= cur_loc {
            let total_len = match peek_len(&self.mmap[offset..]) {
                Ok(len) => len,
                Err(_) => break,
            };
            if offset + total_len > cur_loc {
                break;
            }
            match decode_record(&self.mmap[offset..offset + total_len]) {
                Ok(record) => self.index.observe(sec_per_idx_t, &record),
                Err(_) => break,
            }
            offset += total_len;
        }
        Ok(())
    }

    /// Re-maps the file and rebuilds the indices if `curLoc` has advanced
    /// since the last map.
    pub fn remap(&mut self) -> TapeResult<()> {
        let on_disk_len = self.file.metadata()?.len();
        let grew = on_disk_len as usize > self.mmap.len();
        if grew {
            self.mmap = unsafe { Mmap::map(&self.file)? };
        }
        let fresh_header = TapeHeader::decode(&self.mmap)?;
        if fresh_header.cur_loc != self.header.cur_loc || grew {
            self.header = fresh_header;
            self.rebuild_index()?;
        }
        Ok(())
    }

    /// Resets the cursor to the first journal byte, returning that record's
    /// timestamp (0 if the tape is empty).
    pub fn rewind(&mut self) -> u64 {
        self.cursor = self.header_len;
        self.peek_timestamp()
    }

    fn peek_timestamp(&self) -> u64 {
        if self.cursor + RECORD_HEADER_LEN > self.header.cur_loc as usize {
            return 0;
        }
        match decode_record(&self.mmap[self.cursor..self.header.cur_loc as usize]) {
            Ok(record) => record.t_msg_sec,
            Err(_) => 0,
        }
    }

    /// Seeks so that the next `read` returns the first record with
    /// `tMsg >= t_sec`, or leaves the cursor at end-of-tape. Returns that
    /// record's timestamp, or 0 past end (§4.6.2).
    pub fn rewind_to(&mut self, t_sec: u64) -> u64 {
        let mut offset = self.index.seek_offset(self.header.sec_per_idx_t, t_sec).max(self.header_len as u64) as usize;
        let cur_loc = self.header.cur_loc as usize;
        while offset + RECORD_HEADER_LEN <= cur_loc {
            let total_len = match peek_len(&self.mmap[offset..]) {
                Ok(len) if offset + len <= cur_loc => len,
                _ => break,
            };
            match decode_record(&self.mmap[offset..offset + total_len]) {
                Ok(record) if record.t_msg_sec >= t_sec => {
                    self.cursor = offset;
                    return record.t_msg_sec;
                }
                Ok(_) => offset += total_len,
                Err(_) => break,
            }
        }
        self.cursor = cur_loc;
        0
    }

    /// Reads the next record, advancing the cursor; `Ok(None)` at a clean
    /// end-of-tape or a truncated tail record left by an unclean close.
    /// `Err(TapeCorrupt)` only for a complete-but-corrupt record (§4.6.3).
    pub fn read(&mut self) -> TapeResult<Option<TapeRecord>> {
        let cur_loc = self.header.cur_loc as usize;
        if self.cursor + RECORD_HEADER_LEN > cur_loc {
            return Ok(None);
        }
        let total_len = peek_len(&self.mmap[self.cursor..])?;
        if self.cursor + total_len > cur_loc {
            return Ok(None);
        }
        let record = decode_record(&self.mmap[self.cursor..self.cursor + total_len])
            .map_err(|_| TapeError::Corrupt("record shape or checksum invalid"))?;
        self.cursor += total_len;
        Ok(Some(record))
    }

    pub fn b_write(&self) -> bool {
        self.header.b_write
    }

    pub fn num_rec(&self) -> u64 {
        self.header.num_rec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TapeParams;
    use crate::writer::TapeWriter;

    fn write_sample(path: &Path) {
        let mut writer = TapeWriter::open(path, 1_700_000_000, TapeParams::default()).unwrap();
        for (idx, t) in [1_700_000_000u64, 1_700_000_050, 1_700_000_100].into_iter().enumerate() {
            writer.append(t, 0, "S1", "A", 1, idx as i32, 0, idx == 0, b"payload").unwrap();
        }
    }

    #[test]
    fn rewind_then_read_replays_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        write_sample(&path);

        let mut reader = TapeReader::open(&path).unwrap();
        let first_ts = reader.rewind();
        assert_eq!(first_ts, 1_700_000_000);

        let mut seen = vec![];
        while let Some(record) = reader.read().unwrap() {
            seen.push(record.t_msg_sec);
        }
        assert_eq!(seen, vec![1_700_000_000, 1_700_000_050, 1_700_000_100]);
    }

    #[test]
    fn rewind_to_lands_on_first_record_at_or_after_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        write_sample(&path);

        let mut reader = TapeReader::open(&path).unwrap();
        let ts = reader.rewind_to(1_700_000_060);
        assert_eq!(ts, 1_700_000_100);
        let record = reader.read().unwrap().unwrap();
        assert_eq!(record.t_msg_sec, 1_700_000_100);
    }

    #[test]
    fn rewind_to_past_end_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        write_sample(&path);

        let mut reader = TapeReader::open(&path).unwrap();
        assert_eq!(reader.rewind_to(9_000_000_000), 0);
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn remap_observes_records_appended_after_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        let mut writer = TapeWriter::open(&path, 1, TapeParams::default()).unwrap();
        writer.append(1, 0, "S1", "A", 1, 0, 0, true, b"one").unwrap();

        let mut reader = TapeReader::open(&path).unwrap();
        reader.rewind();
        assert!(reader.read().unwrap().is_some());
        assert!(reader.read().unwrap().is_none());

        writer.append(2, 0, "S1", "A", 1, 0, 0, false, b"two").unwrap();
        reader.remap().unwrap();
        assert!(reader.read().unwrap().is_some());
    }
}
