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

use mdcore_protos::config::MdcoreConfig;

#[test]
fn parses_a_minimal_document() {
    let doc = r#"
        [codec]
        schema_path = "schema.csv"

        [lvc]
        path = "lvc.dat"

        [tape]
        directory = "tape/"
    "#;
    let config: MdcoreConfig = toml::from_str(doc).unwrap();
    assert_eq!(config.lvc.capacity, 65_536);
    assert_eq!(config.tape.segment_bytes, 256 * 1024 * 1024);
    assert!(config.telemetry.log.stderr.is_some());
}

#[test]
fn rejects_unknown_fields() {
    let doc = r#"
        [codec]
        schema_path = "schema.csv"
        bogus = true

        [lvc]
        path = "lvc.dat"

        [tape]
        directory = "tape/"
    "#;
    assert!(toml::from_str::<MdcoreConfig>(doc).is_err());
}
