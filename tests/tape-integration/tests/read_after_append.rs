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

use mdcore_tape::TapeParams;
use mdcore_tape::TapeReader;
use mdcore_tape::TapeWriter;
use mdcore_wire_codec::BinaryCodec;
use mdcore_wire_codec::Codec;
use mdcore_wire_codec::Header;
use mdcore_wire_codec::MsgType;
use mdcore_wire_codec::Timestamp;

fn encode(header: &Header, body: &mdcore_wire_codec::FieldList, schema: &mdcore_wire_codec::Schema) -> Vec<u8> {
    let mut codec = BinaryCodec::new();
    codec.build(header, body, schema).unwrap().to_vec()
}

#[test]
fn read_after_append_returns_every_record_in_order() {
    let dir = tests_toolkit::temp_dir();
    let schema = tests_toolkit::sample_schema();
    let body = tests_toolkit::sample_field_list();
    let tape_path = dir.path().join("tape.dat");

    let mut writer = TapeWriter::open(&tape_path, 1_700_000_000, TapeParams::default()).unwrap();

    let mut image = Header::new(MsgType::Image, "BOOKS", "IBM");
    image.tstamp = Timestamp { sec: 1_700_000_000, usec: 0 };
    let image_bytes = encode(&image, &body, &schema);
    writer.append(1_700_000_000, 0, "BOOKS", "IBM", 1, 0, 0, true, &image_bytes).unwrap();

    let mut update = Header::new(MsgType::Update, "BOOKS", "IBM");
    update.tstamp = Timestamp { sec: 1_700_000_005, usec: 250_000 };
    let update_bytes = encode(&update, &body, &schema);
    writer.append(1_700_000_005, 250_000, "BOOKS", "IBM", 1, 0, 0, false, &update_bytes).unwrap();

    writer.close(1_700_000_010).unwrap();

    let mut reader = TapeReader::open(&tape_path).unwrap();
    assert_eq!(reader.num_rec(), 2);
    assert!(!reader.b_write());

    let first = reader.read().unwrap().unwrap();
    assert_eq!(first.svc, "BOOKS");
    assert_eq!(first.tkr, "IBM");
    assert_eq!(first.t_msg_sec, 1_700_000_000);
    assert_eq!(first.payload, image_bytes);

    let second = reader.read().unwrap().unwrap();
    assert_eq!(second.t_msg_sec, 1_700_000_005);
    assert_eq!(second.t_msg_usec, 250_000);
    assert_eq!(second.payload, update_bytes);

    assert!(reader.read().unwrap().is_none());

    let (header, decoded_body) = mdcore_snapshot_engine::decode_any(&second.payload, &schema).unwrap();
    assert_eq!(header.msg_type, MsgType::Update);
    assert_eq!(decoded_body, body);
}

#[test]
fn rewind_to_skips_records_before_the_given_time() {
    let dir = tests_toolkit::temp_dir();
    let schema = tests_toolkit::sample_schema();
    let body = tests_toolkit::sample_field_list();
    let tape_path = dir.path().join("tape.dat");

    let mut writer = TapeWriter::open(&tape_path, 1_700_000_000, TapeParams::default()).unwrap();
    for offset in 0..5u64 {
        let t_sec = 1_700_000_000 + offset * 60;
        let mut header = Header::new(MsgType::Update, "BOOKS", "IBM");
        header.tstamp = Timestamp { sec: t_sec as u32, usec: 0 };
        let bytes = encode(&header, &body, &schema);
        writer.append(t_sec, 0, "BOOKS", "IBM", 1, 0, 0, offset == 0, &bytes).unwrap();
    }
    writer.close(1_700_000_600).unwrap();

    let mut reader = TapeReader::open(&tape_path).unwrap();
    reader.rewind_to(1_700_000_000 + 3 * 60);

    let record = reader.read().unwrap().unwrap();
    assert_eq!(record.t_msg_sec, 1_700_000_000 + 3 * 60);
    assert_eq!(reader.read().unwrap().unwrap().t_msg_sec, 1_700_000_000 + 4 * 60);
    assert!(reader.read().unwrap().is_none());
}
