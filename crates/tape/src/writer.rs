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

//! Single-writer append path (§4.6.2 `Append`). A tape has exactly one
//! writer by construction; concurrent readers map the same file and remap
//! when they observe `curLoc` has advanced.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write as _;
use std::path::Path;

use memmap2::MmapMut;

use crate::error::TapeError;
use crate::error::TapeResult;
use crate::header::TapeHeader;
use crate::header::TapeParams;
use crate::index::TapeIndex;
use crate::record::decode_record;
use crate::record::encode_record;
use crate::record::peek_len;
use crate::record::TapeRecord;

pub struct TapeWriter {
    file: File,
    mmap: MmapMut,
    header: TapeHeader,
    header_len: usize,
    index: TapeIndex,
}

impl TapeWriter {
    /// Opens `path` for appending, creating a new tape with `params` and
    /// `now_sec` as its creation time if the file does not yet exist.
    pub fn open(path: impl AsRef<Path>, now_sec: u64, params: TapeParams) -> TapeResult<Self> {
        let path = path.as_ref();
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).read(true).write(true).open(path)?;

        if is_new {
            let header = TapeHeader::new(now_sec, params);
            let header_len = header.header_len();
            let complete = TapeHeader { file_siz: header_len as u64, cur_loc: header_len as u64, ..header };
            let bytes = complete.encode();
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&bytes)?;
            file.flush()?;
        }

        let len = file.metadata()?.len();
        if len == 0 {
            return Err(TapeError::Corrupt("empty tape file"));
        }
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        let header = TapeHeader::decode(&mmap)?;
        let header_len = header.header_len();
        TapeHeader::set_b_write(&mut mmap, true);

        let mut writer = TapeWriter { file, mmap, header, header_len, index: TapeIndex::new() };
        writer.rebuild_index()?;
        Ok(writer)
    }

    fn rebuild_index(&mut self) -> TapeResult<()> {
        self.index.clear();
        let sec_per_idx_t = self.header.sec_per_idx_t;
        let mut offset = self.header_len;
        let cur_loc = self.header.cur_loc as usize;
        while offset + crate::record::RECORD_HEADER_LEN <= cur_loc {
            let total_len = peek_len(&self.mmap[offset..])?;
            if offset + total_len > cur_loc {
                break;
            }
            let record = decode_record(&self.mmap[offset..offset + total_len])?;
            self.index.observe(sec_per_idx_t, &record);
            offset += total_len;
        }
        Ok(())
    }

    /// Appends one message to the journal, bumping `curLoc`/`numRec` and
    /// updating the in-memory coarse and per-stream indices. `is_image`
    /// marks this payload as an Image so the stream's `locImg` advances.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        t_msg_sec: u64,
        t_msg_usec: u32,
        svc: &str,
        tkr: &str,
        channel_id: i32,
        stream_id: i32,
        db_idx: i32,
        is_image: bool,
        payload: &[u8],
    ) -> TapeResult<u64> {
        let prior = self.index.stream(svc, tkr, channel_id);
        let loc = self.header.cur_loc;
        let loc_img = if is_image { loc } else { prior.map(|s| s.loc_img).unwrap_or(0) };

        let record = TapeRecord {
            t_msg_sec,
            t_msg_usec,
            n_msg: prior.map(|s| s.n_msg + 1).unwrap_or(0),
            db_idx,
            stream_id,
            svc: svc.to_string(),
            tkr: tkr.to_string(),
            channel_id,
            loc,
            loc_img,
            payload: payload.to_vec(),
        };
        let bytes = encode_record(&record);
        let new_len = loc as usize + bytes.len();
        self.ensure_capacity(new_len)?;

        self.mmap[loc as usize..new_len].copy_from_slice(&bytes);
        self.mmap.flush_range(loc as usize, bytes.len())?;

        self.header.cur_loc = new_len as u64;
        self.header.num_rec += 1;
        if new_len as u64 > self.header.file_siz {
            self.header.file_siz = new_len as u64;
        }
        TapeHeader::set_cur_loc(&mut self.mmap, self.header.cur_loc);
        TapeHeader::set_num_rec(&mut self.mmap, self.header.num_rec);
        TapeHeader::set_file_siz(&mut self.mmap, self.header.file_siz);
        self.mmap.flush_range(0, self.header_len)?;

        self.index.observe(self.header.sec_per_idx_t, &record);
        Ok(loc)
    }

    fn ensure_capacity(&mut self, needed: usize) -> TapeResult<()> {
        if needed <= self.mmap.len() {
            return Ok(());
        }
        let grown = (needed * 2).max(self.mmap.len() + 4 * 1024 * 1024);
        self.file.set_len(grown as u64)?;
        self.mmap.flush()?;
        self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }

    /// Marks the tape as cleanly closed (§4.6.3 sentinel). A reader opening
    /// the tape afterward sees `bWrite == false`.
    pub fn close(mut self, t_eod_sec: u64) -> TapeResult<()> {
        TapeHeader::set_b_write(&mut self.mmap, false);
        TapeHeader::set_t_eod(&mut self.mmap, t_eod_sec);
        self.mmap.flush_range(0, self.header_len)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_bumps_cur_loc_and_num_rec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        let mut writer = TapeWriter::open(&path, 1_700_000_000, TapeParams::default()).unwrap();

        let loc0 = writer.append(1000, 0, "S1", "A", 1, 0, 0, true, b"hello").unwrap();
        let loc1 = writer.append(1001, 0, "S1", "A", 1, 0, 0, false, b"world!").unwrap();
        assert!(loc1 > loc0);
        assert_eq!(writer.header.num_rec, 2);
    }

    #[test]
    fn image_flag_advances_stream_loc_img() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        let mut writer = TapeWriter::open(&path, 1, TapeParams::default()).unwrap();

        let img_loc = writer.append(1, 0, "S1", "A", 1, 0, 0, true, b"img").unwrap();
        writer.append(2, 0, "S1", "A", 1, 0, 0, false, b"upd").unwrap();
        let entry = writer.index.stream("S1", "A", 1).unwrap();
        assert_eq!(entry.loc_img, img_loc);
    }

    #[test]
    fn reopen_rebuilds_index_and_appends_after_prior_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.dat");
        {
            let mut writer = TapeWriter::open(&path, 1, TapeParams::default()).unwrap();
            writer.append(1, 0, "S1", "A", 1, 0, 0, true, b"img").unwrap();
        }
        let mut writer = TapeWriter::open(&path, 2, TapeParams::default()).unwrap();
        let loc = writer.append(2, 0, "S1", "A", 1, 0, 0, false, b"upd").unwrap();
        assert!(loc > 0);
        assert_eq!(writer.header.num_rec, 2);
    }
}
