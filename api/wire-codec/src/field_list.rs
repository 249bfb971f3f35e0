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

use crate::field::FieldType;
use crate::field::FieldValue;

/// One `(fid, type, value)` triple as it appears in a [`FieldList`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub fid: i32,
    pub ty: FieldType,
    pub value: FieldValue,
}

/// Ordered sequence of fields making up a single message body. Encoding
/// order is preserved on the wire.
///
/// `Add` does not check for duplicate fids -- callers are trusted, the same
/// way the wire codec trusts a schema it did not itself validate. Decoders
/// that must honor "last occurrence wins" semantics (§3) use [`FieldList::upsert`]
/// instead of `add`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldList {
    fields: Vec<Field>,
}

impl FieldList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    /// Appends a field without checking for an existing fid.
    pub fn add(&mut self, fid: i32, ty: FieldType, value: FieldValue) {
        self.fields.push(Field { fid, ty, value });
    }

    /// Inserts a field, overwriting any prior occurrence of the same fid in
    /// place (keeping its original position) so that the last occurrence on
    /// the wire always wins, as required when decoding a message that may
    /// legally repeat a fid.
    pub fn upsert(&mut self, fid: i32, ty: FieldType, value: FieldValue) {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.fid == fid) {
            existing.ty = ty;
            existing.value = value;
        } else {
            self.add(fid, ty, value);
        }
    }

    /// Linear scan over the fields, acceptable because a typical message
    /// carries at most a few dozen of them.
    pub fn get(&self, fid: i32) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.fid == fid).map(|f| &f.value)
    }

    pub fn contains(&self, fid: i32) -> bool {
        self.fields.iter().any(|f| f.fid == fid)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.fields.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn fids(&self) -> impl Iterator<Item = i32> + '_ {
        self.fields.iter().map(|f| f.fid)
    }
}

impl FromIterator<Field> for FieldList {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_allows_duplicates_upsert_does_not() {
        let mut fl = FieldList::new();
        fl.add(1, FieldType::Int32, FieldValue::Int32(1));
        fl.add(1, FieldType::Int32, FieldValue::Int32(2));
        assert_eq!(fl.len(), 2);
        // `get` returns the first match; `upsert` keeps exactly one slot.
        let mut fl2 = FieldList::new();
        fl2.upsert(1, FieldType::Int32, FieldValue::Int32(1));
        fl2.upsert(1, FieldType::Int32, FieldValue::Int32(2));
        assert_eq!(fl2.len(), 1);
        assert_eq!(fl2.get(1), Some(&FieldValue::Int32(2)));
    }

    #[test]
    fn upsert_preserves_original_position() {
        let mut fl = FieldList::new();
        fl.upsert(1, FieldType::Int32, FieldValue::Int32(1));
        fl.upsert(2, FieldType::Int32, FieldValue::Int32(2));
        fl.upsert(1, FieldType::Int32, FieldValue::Int32(99));
        let fids: Vec<i32> = fl.fids().collect();
        assert_eq!(fids, vec![1, 2]);
        assert_eq!(fl.get(1), Some(&FieldValue::Int32(99)));
    }
}
