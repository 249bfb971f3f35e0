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

use std::collections::HashMap;

use crate::field::FieldType;

/// Maximum length, in bytes, of a schema entry's name on the wire (§3).
pub const SCHEMA_NAME_MAX: usize = 32;

/// One field dictionary entry: `fid -> (name, type, fixed on-disk width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub fid: i32,
    pub name: String,
    pub ty: FieldType,
    /// On-disk byte budget for the value in the LVC record layout.
    /// Variable-length types instead store a `u16` length prefix plus bytes.
    pub fixed_width: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate fid {0} in schema")]
    DuplicateFid(i32),
    #[error("duplicate name {0:?} in schema")]
    DuplicateName(String),
    #[error("fid 0 is reserved and may not be used")]
    ZeroFid,
    #[error("name {0:?} exceeds the {SCHEMA_NAME_MAX}-byte limit")]
    NameTooLong(String),
    #[error("schema definition parse error at line {line}: {reason}")]
    ParseError { line: usize, reason: String },
}

/// Immutable field dictionary. A `Schema` is never mutated in place --
/// replacement is an atomic swap of the whole table (see module docs on
/// [`crate::Header`] for why: borrowed views into a [`crate::FieldList`]
/// must not outlive the schema that produced them).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
    by_fid: HashMap<i32, usize>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// O(1) lookup by field id.
    pub fn find_by_fid(&self, fid: i32) -> Option<&SchemaEntry> {
        self.by_fid.get(&fid).map(|&idx| &self.entries[idx])
    }

    /// O(1), case-sensitive lookup by field name.
    pub fn find_by_name(&self, name: &str) -> Option<&SchemaEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Index of `fid` within [`Schema::entries`], used by the LVC record
    /// layout which stores `presentFids` as schema indices rather than fids.
    pub fn index_of(&self, fid: i32) -> Option<usize> {
        self.by_fid.get(&fid).copied()
    }

    pub fn entry_at(&self, index: usize) -> Option<&SchemaEntry> {
        self.entries.get(index)
    }

    /// Parses a field dictionary from `fid,name,type,width` rows (§4.1
    /// `Load`), one field per line. Blank lines and lines starting with `#`
    /// are skipped, so a schema file can carry comments.
    pub fn load(bytes: &[u8]) -> Result<Schema, SchemaError> {
        let text = String::from_utf8_lossy(bytes);
        let mut builder = Schema::builder();
        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = idx + 1;
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            let [fid_s, name, ty_s, width_s] = parts[..] else {
                return Err(SchemaError::ParseError {
                    line: line_no,
                    reason: format!("expected 4 comma-separated columns, got {}", parts.len()),
                });
            };
            let fid = fid_s.parse::<i32>().map_err(|e| SchemaError::ParseError { line: line_no, reason: format!("bad fid {fid_s:?}: {e}") })?;
            let ty = FieldType::from_name(ty_s).ok_or_else(|| SchemaError::ParseError { line: line_no, reason: format!("unknown type {ty_s:?}") })?;
            let width = width_s.parse::<u16>().map_err(|e| SchemaError::ParseError { line: line_no, reason: format!("bad width {width_s:?}: {e}") })?;
            builder = builder.field(fid, name, ty, width);
        }
        builder.build()
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<SchemaEntry>,
}

impl SchemaBuilder {
    pub fn field(mut self, fid: i32, name: impl Into<String>, ty: FieldType, fixed_width: u16) -> Self {
        self.entries.push(SchemaEntry {
            fid,
            name: name.into(),
            ty,
            fixed_width,
        });
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut by_fid = HashMap::with_capacity(self.entries.len());
        let mut by_name = HashMap::with_capacity(self.entries.len());
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.fid == 0 {
                return Err(SchemaError::ZeroFid);
            }
            if entry.name.len() > SCHEMA_NAME_MAX {
                return Err(SchemaError::NameTooLong(entry.name.clone()));
            }
            if by_fid.insert(entry.fid, idx).is_some() {
                return Err(SchemaError::DuplicateFid(entry.fid));
            }
            if by_name.insert(entry.name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(Schema {
            entries: self.entries,
            by_fid,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::builder()
            .field(22, "BID", FieldType::Double, 8)
            .field(25, "ASK", FieldType::Double, 8)
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_by_fid_and_name() {
        let schema = sample();
        assert_eq!(schema.find_by_fid(22).unwrap().name, "BID");
        assert_eq!(schema.find_by_name("ASK").unwrap().fid, 25);
        assert!(schema.find_by_fid(999).is_none());
    }

    #[test]
    fn rejects_duplicate_fid() {
        let err = Schema::builder()
            .field(1, "A", FieldType::Int32, 4)
            .field(1, "B", FieldType::Int32, 4)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFid(1)));
    }

    #[test]
    fn rejects_zero_fid() {
        let err = Schema::builder()
            .field(0, "A", FieldType::Int32, 4)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ZeroFid));
    }

    #[test]
    fn index_of_matches_entries_order() {
        let schema = sample();
        assert_eq!(schema.index_of(22), Some(0));
        assert_eq!(schema.index_of(25), Some(1));
        assert_eq!(schema.index_of(1), None);
    }

    #[test]
    fn load_parses_csv_rows_and_skips_comments_and_blanks() {
        let text = "# fid,name,type,width\n22,BID,double,8\n\n25,ASK,double,8\n";
        let schema = Schema::load(text.as_bytes()).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.find_by_fid(22).unwrap().name, "BID");
        assert_eq!(schema.find_by_name("ASK").unwrap().ty, FieldType::Double);
    }

    #[test]
    fn load_rejects_a_malformed_row() {
        let err = Schema::load(b"22,BID,double\n").unwrap_err();
        assert!(matches!(err, SchemaError::ParseError { line: 1, .. }));
    }

    #[test]
    fn load_rejects_an_unknown_type() {
        let err = Schema::load(b"22,BID,not-a-type,8\n").unwrap_err();
        assert!(matches!(err, SchemaError::ParseError { line: 1, .. }));
    }
}
