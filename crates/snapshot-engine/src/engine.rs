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

//! Stateless glue between `WireCodec`, `LVCStore` and the tape (§4.7):
//! snapshot requests remap-then-read the LVC under its named lock, replay
//! requests seek a tape and stream records out under watermark-governed
//! backpressure.

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use mdcore_lvc_store::LvcFilter;
use mdcore_lvc_store::LvcStore;
use mdcore_protos::Watermarks;
use mdcore_tape::TapeReader;
use mdcore_wire_codec::Protocol;
use mdcore_wire_codec::Schema;

use crate::error::EngineError;
use crate::error::EngineResult;
use crate::transcode::decode_any;
use crate::transcode::make_codec;

/// How often a paused replay re-polls the caller's queue depth.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Orchestrates one process's LVC and tape subsystems. `SnapshotEngine`
/// itself carries no per-request state; `snapshot_one`/`snapshot_all`/
/// `replay` each resolve everything they need from their arguments.
pub struct SnapshotEngine {
    lvc: Mutex<LvcStore>,
    watermarks: Watermarks,
}

impl SnapshotEngine {
    pub fn new(lvc: LvcStore) -> Self {
        SnapshotEngine { lvc: Mutex::new(lvc), watermarks: Watermarks::default() }
    }

    pub fn with_watermarks(mut self, watermarks: Watermarks) -> Self {
        self.watermarks = watermarks;
        self
    }

    /// Snapshot request for a single `(svc, tkr)` (§4.7): remap if the LVC
    /// tail has grown, locate the record, and build a reply in `protocol`.
    /// Returns `Ok(None)` for a ticker the store has never seen.
    pub fn snapshot_one(&self, svc: &str, tkr: &str, filter: &LvcFilter, protocol: Protocol) -> EngineResult<Option<Vec<u8>>> {
        let mut store = self.lvc.lock().map_err(|_| EngineError::Poisoned)?;
        store.remap()?;
        let Some(mut view) = store.snap(svc, tkr)? else {
            return Ok(None);
        };
        view.fields = filter.project(&view.fields);

        let header = view_header(&view);
        let mut codec = make_codec(protocol);
        let bytes = codec.build(&header, &view.fields, store.schema())?;
        Ok(Some(bytes.to_vec()))
    }

    /// Snapshot request over every live record admitted by `filter` (§4.7,
    /// §4.5.3), each built into its own reply buffer.
    pub fn snapshot_all(&self, filter: &LvcFilter, protocol: Protocol) -> EngineResult<Vec<Vec<u8>>> {
        let mut store = self.lvc.lock().map_err(|_| EngineError::Poisoned)?;
        store.remap()?;
        let views = store.snap_all(filter)?;

        let mut codec = make_codec(protocol);
        let mut out = Vec::with_capacity(views.len());
        for view in &views {
            let header = view_header(view);
            let bytes = codec.build(&header, &view.fields, store.schema())?;
            out.push(bytes.to_vec());
        }
        Ok(out)
    }

    /// Replay request (§4.7): seek `tape_path` to `t0`, stream records
    /// through `emit` re-framed in `protocol` until a record past `t1` (or
    /// end of tape), pausing whenever `queue_depth` crosses the high
    /// watermark and resuming only once it has drained back under the low
    /// one. Returns the number of records emitted.
    pub fn replay(
        &self,
        tape_path: impl AsRef<Path>,
        schema: &Schema,
        t0: u64,
        t1: Option<u64>,
        protocol: Protocol,
        mut queue_depth: impl FnMut() -> usize,
        mut emit: impl FnMut(&[u8]) -> EngineResult<()>,
    ) -> EngineResult<u64> {
        let mut reader = TapeReader::open(tape_path)?;
        reader.rewind_to(t0);
        let mut codec = make_codec(protocol);

        let mut paused = false;
        let mut emitted = 0u64;
        loop {
            if !paused && self.watermarks.should_pause(queue_depth()) {
                paused = true;
            }
            while paused {
                thread::sleep(PAUSE_POLL_INTERVAL);
                if self.watermarks.should_resume(queue_depth()) {
                    paused = false;
                }
            }

            let Some(record) = reader.read()? else {
                break;
            };
            if let Some(t1) = t1 {
                if record.t_msg_sec > t1 {
                    break;
                }
            }

            let (header, body) = decode_any(&record.payload, schema)?;
            let bytes = codec.build(&header, &body, schema)?;
            emit(bytes)?;
            emitted += 1;
        }
        Ok(emitted)
    }
}

fn view_header(view: &mdcore_lvc_store::RecordView) -> mdcore_wire_codec::Header {
    let msg_type = if !view.active {
        mdcore_wire_codec::MsgType::Dead
    } else if view.n_upd <= 1 {
        mdcore_wire_codec::MsgType::Image
    } else {
        mdcore_wire_codec::MsgType::Update
    };
    let mut header = mdcore_wire_codec::Header::new(msg_type, view.svc.clone(), view.tkr.clone());
    header.rtl = view.n_upd as i64;
    header.tstamp = mdcore_wire_codec::Timestamp { sec: view.t_upd, usec: view.t_upd_us };
    header
}

#[cfg(test)]
mod tests {
    use mdcore_lvc_store::Signature;
    use mdcore_wire_codec::FieldType;
    use mdcore_wire_codec::FieldValue;
    use mdcore_wire_codec::FieldList;
    use mdcore_tape::TapeParams;
    use mdcore_tape::TapeWriter;

    use super::*;

    fn schema() -> Schema {
        Schema::builder().field(22, "BID", FieldType::Double, 8).build().unwrap()
    }

    #[test]
    fn snapshot_one_builds_a_reply_for_a_live_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let mut store = LvcStore::open(dir.path().join("lvc.dat"), dir.path().join("lvc.lock"), schema.clone(), Signature::Binary).unwrap();
        let mut image = FieldList::new();
        image.add(22, FieldType::Double, FieldValue::Double(100.0));
        store.apply("S1", "A", &image, 1000, 0, false).unwrap();

        let engine = SnapshotEngine::new(store);
        let bytes = engine.snapshot_one("S1", "A", &LvcFilter::new(), Protocol::Binary).unwrap().unwrap();

        let mut codec = make_codec(Protocol::Binary);
        let (header, body) = match codec.parse(&bytes, &schema) {
            mdcore_wire_codec::ParseOutcome::Parsed { header, body, .. } => (header, body),
            _ => panic!("expected a parsed reply"),
        };
        assert_eq!(header.svc, "S1");
        assert_eq!(body.get(22), Some(&FieldValue::Double(100.0)));
    }

    #[test]
    fn snapshot_one_misses_an_unknown_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let store = LvcStore::open(dir.path().join("lvc.dat"), dir.path().join("lvc.lock"), schema(), Signature::Binary).unwrap();
        let engine = SnapshotEngine::new(store);
        assert!(engine.snapshot_one("S1", "NOPE", &LvcFilter::new(), Protocol::Binary).unwrap().is_none());
    }

    #[test]
    fn replay_streams_records_between_t0_and_t1() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let tape_path = dir.path().join("tape.dat");
        {
            let mut writer = TapeWriter::open(&tape_path, 1_700_000_000, TapeParams::default()).unwrap();
            let mut codec = make_codec(Protocol::Binary);
            for (idx, t) in [1_700_000_000u64, 1_700_000_050, 1_700_000_100].into_iter().enumerate() {
                let mut header = mdcore_wire_codec::Header::new(mdcore_wire_codec::MsgType::Update, "S1", "A");
                header.tstamp.sec = t as u32;
                let mut body = FieldList::new();
                body.add(22, FieldType::Double, FieldValue::Double(idx as f64));
                let bytes = codec.build(&header, &body, &schema).unwrap().to_vec();
                writer.append(t, 0, "S1", "A", 1, idx as i32, 0, idx == 0, &bytes).unwrap();
            }
        }

        let store = LvcStore::open(dir.path().join("lvc.dat"), dir.path().join("lvc.lock"), schema.clone(), Signature::Binary).unwrap();
        let engine = SnapshotEngine::new(store);

        let mut seen = vec![];
        let emitted = engine
            .replay(&tape_path, &schema, 1_700_000_010, Some(1_700_000_050), Protocol::Xml, || 0, |bytes| {
                seen.push(bytes.to_vec());
                Ok(())
            })
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(seen.len(), 1);
        let mut codec = make_codec(Protocol::Xml);
        match codec.parse(&seen[0], &schema) {
            mdcore_wire_codec::ParseOutcome::Parsed { header, .. } => assert_eq!(header.tstamp.sec, 1_700_000_050),
            _ => panic!("expected a parsed reply"),
        }
    }

    #[test]
    fn replay_pauses_above_high_watermark_and_resumes_below_low() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let tape_path = dir.path().join("tape.dat");
        {
            let mut writer = TapeWriter::open(&tape_path, 1, TapeParams::default()).unwrap();
            let mut codec = make_codec(Protocol::Binary);
            let header = mdcore_wire_codec::Header::new(mdcore_wire_codec::MsgType::Image, "S1", "A");
            let body = FieldList::new();
            let bytes = codec.build(&header, &body, &schema).unwrap().to_vec();
            writer.append(1, 0, "S1", "A", 1, 0, 0, true, &bytes).unwrap();
        }

        let store = LvcStore::open(dir.path().join("lvc.dat"), dir.path().join("lvc.lock"), schema.clone(), Signature::Binary).unwrap();
        let engine = SnapshotEngine::new(store).with_watermarks(Watermarks::new(1, 2));

        let mut polls = 0;
        let emitted = engine
            .replay(&tape_path, &schema, 0, None, Protocol::Binary, || {
                polls += 1;
                if polls < 3 {
                    5
                } else {
                    0
                }
            }, |_bytes| Ok(()))
            .unwrap();
        assert_eq!(emitted, 1);
        assert!(polls >= 3);
    }
}
