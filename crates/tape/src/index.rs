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

//! In-memory coarse time index and per-stream index (§4.6.1). Both are
//! rebuilt by a single journal scan on open, the same way
//! `mdcore-lvc-store` rebuilds its offset index -- cheap at the record
//! counts this core targets, and it sidesteps growing a fixed-size region
//! in the middle of a memory-mapped file.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::record::TapeRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamEntry {
    pub loc: u64,
    pub loc_img: u64,
    /// Highest `nMsg` sequence number observed for this stream.
    pub n_msg: u64,
}

#[derive(Debug, Default)]
pub struct TapeIndex {
    /// Coarse time bucket -> offset of the first record observed in it.
    coarse: BTreeMap<u64, u64>,
    /// `(svc, tkr, channelID) -> {most recent record, most recent Image}`.
    streams: HashMap<(String, String, i32), StreamEntry>,
}

impl TapeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_of(sec_per_idx_t: u32, t_msg_sec: u64) -> u64 {
        t_msg_sec / sec_per_idx_t.max(1) as u64
    }

    pub fn clear(&mut self) {
        self.coarse.clear();
        self.streams.clear();
    }

    /// Folds an already-decoded record into both indices, trusting its
    /// persisted `loc`/`locImg` fields rather than recomputing them.
    pub fn observe(&mut self, sec_per_idx_t: u32, record: &TapeRecord) {
        let bucket = Self::bucket_of(sec_per_idx_t, record.t_msg_sec);
        self.coarse.entry(bucket).or_insert(record.loc);
        let key = (record.svc.clone(), record.tkr.clone(), record.channel_id);
        self.streams.insert(key, StreamEntry { loc: record.loc, loc_img: record.loc_img, n_msg: record.n_msg });
    }

    /// Offset to start a linear scan from in order to find the first record
    /// with `tMsg >= t_sec` (§4.6.2 `RewindTo`). Returns 0 (tape start) if
    /// no bucket at or before `t_sec` has been observed.
    pub fn seek_offset(&self, sec_per_idx_t: u32, t_sec: u64) -> u64 {
        let bucket = Self::bucket_of(sec_per_idx_t, t_sec);
        self.coarse.range(..=bucket).next_back().map(|(_, &offset)| offset).unwrap_or(0)
    }

    pub fn stream(&self, svc: &str, tkr: &str, channel_id: i32) -> Option<StreamEntry> {
        self.streams.get(&(svc.to_string(), tkr.to_string(), channel_id)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(loc: u64, t_msg_sec: u64) -> TapeRecord {
        TapeRecord {
            t_msg_sec,
            t_msg_usec: 0,
            n_msg: 0,
            db_idx: 0,
            stream_id: 0,
            svc: "S".to_string(),
            tkr: "T".to_string(),
            channel_id: 1,
            loc,
            loc_img: 0,
            payload: vec![],
        }
    }

    #[test]
    fn seek_offset_picks_the_bucket_at_or_before_target() {
        let mut index = TapeIndex::new();
        index.observe(10, &record_at(100, 1000));
        index.observe(10, &record_at(200, 2000));
        assert_eq!(index.seek_offset(10, 1500), 100);
        assert_eq!(index.seek_offset(10, 2500), 200);
        assert_eq!(index.seek_offset(10, 500), 0);
    }

    #[test]
    fn stream_lookup_tracks_most_recent_record() {
        let mut index = TapeIndex::new();
        index.observe(10, &record_at(100, 1000));
        index.observe(10, &record_at(300, 3000));
        let entry = index.stream("S", "T", 1).unwrap();
        assert_eq!(entry.loc, 300);
    }
}
