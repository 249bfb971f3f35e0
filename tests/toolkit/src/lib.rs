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

//! Fixtures shared by the workspace's integration test crates: a scratch
//! directory per test and a small field dictionary standing in for a real
//! exchange feed's schema.

use mdcore_wire_codec::FieldList;
use mdcore_wire_codec::FieldType;
use mdcore_wire_codec::FieldValue;
use mdcore_wire_codec::Schema;

/// A fresh temp directory, removed when the returned guard drops.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

/// A small schema covering each scalar [`FieldType`] an integration test is
/// likely to exercise: a price, a size, a count and a name.
pub fn sample_schema() -> Schema {
    Schema::builder()
        .field(22, "BID", FieldType::Double, 8)
        .field(25, "ASK", FieldType::Double, 8)
        .field(48, "VOLUME", FieldType::Int64, 8)
        .field(1025, "SYMBOL", FieldType::String, 16)
        .build()
        .expect("sample schema is valid")
}

/// A field list matching [`sample_schema`], suitable as an Image or Update
/// body.
pub fn sample_field_list() -> FieldList {
    let mut fields = FieldList::new();
    fields.add(22, FieldType::Double, FieldValue::Double(101.25));
    fields.add(25, FieldType::Double, FieldValue::Double(101.50));
    fields.add(48, FieldType::Int64, FieldValue::Int64(1_000));
    fields.add(1025, FieldType::String, FieldValue::String("IBM".to_string()));
    fields
}
