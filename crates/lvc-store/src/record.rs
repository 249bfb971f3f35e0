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

//! On-disk LVC record layout: a fixed `RecordHeader`, a `presentFids` index
//! array (schema indices, not fids), then each field's value packed to its
//! schema-declared fixed width. This is a distinct byte format from the
//! wire codec's binary framing -- the LVC never round-trips through the
//! wire, so there is no reason to share that framing's varint/packed-field
//! layout here.

use bytemuck::Pod;
use bytemuck::Zeroable;
use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use mdcore_wire_codec::Field;
use mdcore_wire_codec::FieldList;
use mdcore_wire_codec::FieldType;
use mdcore_wire_codec::FieldValue;
use mdcore_wire_codec::Schema;

use crate::error::LvcError;
use crate::error::LvcResult;

pub const SVC_MAX: usize = 64;
pub const TKR_MAX: usize = 128;

/// Fixed-size prefix of every LVC record (§3). `size_bytes` lets a scanner
/// hop record-to-record without consulting the schema.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RecordHeader {
    pub size_bytes: u32,
    pub svc: [u8; SVC_MAX],
    pub tkr: [u8; TKR_MAX],
    pub b_active: u8,
    _pad0: [u8; 3],
    pub t_create: u32,
    pub t_upd: u32,
    pub t_upd_us: u32,
    pub t_dead: u32,
    pub n_upd: u32,
    pub n_fld: u16,
    _pad1: u16,
}

pub const RECORD_HEADER_LEN: usize = std::mem::size_of::<RecordHeader>();

impl RecordHeader {
    pub fn new(svc: &str, tkr: &str) -> Self {
        let mut header = RecordHeader::zeroed();
        write_fixed_str(&mut header.svc, svc);
        write_fixed_str(&mut header.tkr, tkr);
        header
    }

    pub fn svc(&self) -> String {
        read_fixed_str(&self.svc)
    }

    pub fn tkr(&self) -> String {
        read_fixed_str(&self.tkr)
    }
}

fn write_fixed_str(slot: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(slot.len());
    slot[..n].copy_from_slice(&bytes[..n]);
}

fn read_fixed_str(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end]).into_owned()
}

/// Returns the fixed encoded width of a scalar field type, or `None` for
/// variable-length types (`String`, `ByteStream`, `Vector`) whose slot
/// instead holds a `u16` length prefix plus up to `fixed_width - 2` bytes.
pub fn scalar_width(ty: FieldType) -> Option<usize> {
    match ty {
        FieldType::Undefined => Some(0),
        FieldType::Int8 => Some(1),
        FieldType::Int16 => Some(2),
        FieldType::Int32 | FieldType::Float | FieldType::Date | FieldType::Time | FieldType::TimeSec => Some(4),
        FieldType::Int64 | FieldType::Double | FieldType::DateTime | FieldType::UnixTime => Some(8),
        FieldType::Real => Some(9),
        FieldType::String | FieldType::ByteStream | FieldType::Vector => None,
    }
}

/// Encodes one field's value into `out`, padded/truncated to `fixed_width`
/// bytes per the schema entry for its fid.
pub fn encode_value(out: &mut Vec<u8>, value: &FieldValue, fixed_width: u16) -> LvcResult<()> {
    let width = fixed_width as usize;
    let start = out.len();
    match value {
        FieldValue::Undefined => {}
        FieldValue::Int8(v) => out.write_i8(*v)?,
        FieldValue::Int16(v) => out.write_i16::<BigEndian>(*v)?,
        FieldValue::Int32(v) | FieldValue::Date(v) | FieldValue::Time(v) | FieldValue::TimeSec(v) => {
            out.write_i32::<BigEndian>(*v)?
        }
        FieldValue::Float(v) => out.write_f32::<BigEndian>(*v)?,
        FieldValue::Int64(v) | FieldValue::DateTime(v) | FieldValue::UnixTime(v) => out.write_i64::<BigEndian>(*v)?,
        FieldValue::Double(v) => out.write_f64::<BigEndian>(*v)?,
        FieldValue::Real { mantissa, hint } => {
            out.write_i64::<BigEndian>(*mantissa)?;
            out.write_u8(*hint)?;
        }
        FieldValue::String(s) => {
            let bytes = s.as_bytes();
            let payload_max = width.saturating_sub(2);
            let n = bytes.len().min(payload_max);
            out.write_u16::<BigEndian>(n as u16)?;
            out.extend_from_slice(&bytes[..n]);
            out.resize(start + width, 0);
            return Ok(());
        }
        FieldValue::ByteStream(bytes) => {
            let payload_max = width.saturating_sub(2);
            let n = bytes.len().min(payload_max);
            out.write_u16::<BigEndian>(n as u16)?;
            out.extend_from_slice(&bytes[..n]);
            out.resize(start + width, 0);
            return Ok(());
        }
        FieldValue::Vector { precision, values } => {
            let payload_max = width.saturating_sub(3);
            let max_values = payload_max / 8;
            let n = values.len().min(max_values);
            out.write_u16::<BigEndian>(n as u16)?;
            out.write_u8(*precision)?;
            for v in &values[..n] {
                out.write_f64::<BigEndian>(*v)?;
            }
            out.resize(start + width, 0);
            return Ok(());
        }
    }
    out.resize(start + width, 0);
    Ok(())
}

/// Decodes one field's value out of a `fixed_width`-byte slot.
pub fn decode_value(mut slot: &[u8], ty: FieldType, fixed_width: u16) -> LvcResult<FieldValue> {
    let _ = fixed_width;
    Ok(match ty {
        FieldType::Undefined => FieldValue::Undefined,
        FieldType::Int8 => FieldValue::Int8(slot.read_i8()?),
        FieldType::Int16 => FieldValue::Int16(slot.read_i16::<BigEndian>()?),
        FieldType::Int32 => FieldValue::Int32(slot.read_i32::<BigEndian>()?),
        FieldType::Date => FieldValue::Date(slot.read_i32::<BigEndian>()?),
        FieldType::Time => FieldValue::Time(slot.read_i32::<BigEndian>()?),
        FieldType::TimeSec => FieldValue::TimeSec(slot.read_i32::<BigEndian>()?),
        FieldType::UnixTime => FieldValue::UnixTime(slot.read_i64::<BigEndian>()?),
        FieldType::Float => FieldValue::Float(slot.read_f32::<BigEndian>()?),
        FieldType::Int64 => FieldValue::Int64(slot.read_i64::<BigEndian>()?),
        FieldType::Double => FieldValue::Double(slot.read_f64::<BigEndian>()?),
        FieldType::DateTime => FieldValue::DateTime(slot.read_i64::<BigEndian>()?),
        FieldType::Real => {
            let mantissa = slot.read_i64::<BigEndian>()?;
            let hint = slot.read_u8()?;
            FieldValue::Real { mantissa, hint }
        }
        FieldType::String => {
            let n = slot.read_u16::<BigEndian>()? as usize;
            let n = n.min(slot.len());
            FieldValue::String(String::from_utf8_lossy(&slot[..n]).into_owned())
        }
        FieldType::ByteStream => {
            let n = slot.read_u16::<BigEndian>()? as usize;
            let n = n.min(slot.len());
            FieldValue::ByteStream(slot[..n].to_vec())
        }
        FieldType::Vector => {
            let n = slot.read_u16::<BigEndian>()? as usize;
            let precision = slot.read_u8()?;
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(slot.read_f64::<BigEndian>()?);
            }
            FieldValue::Vector { precision, values }
        }
    })
}

/// Encodes the full on-disk record for `(svc, tkr)` carrying `fields`.
/// `present` must already be in schema-index order; callers merge new
/// values into the retained field set before calling this (§4.5.1).
pub fn encode_record(header: &RecordHeader, schema: &Schema, present: &[(usize, FieldValue)]) -> LvcResult<Vec<u8>> {
    let mut out = Vec::with_capacity(RECORD_HEADER_LEN + present.len() * 10);
    let mut header = *header;
    header.n_fld = present.len() as u16;

    out.resize(RECORD_HEADER_LEN, 0);
    for &(idx, _) in present {
        out.write_u16::<BigEndian>(idx as u16)?;
    }
    for (idx, value) in present {
        let entry = schema
            .entry_at(*idx)
            .ok_or(LvcError::SchemaMissing(*idx as i32))?;
        encode_value(&mut out, value, entry.fixed_width)?;
    }
    header.size_bytes = out.len() as u32;
    out[..RECORD_HEADER_LEN].copy_from_slice(bytemuck::bytes_of(&header));
    Ok(out)
}

/// Decodes a record's header, present-fid index, and field values out of
/// `bytes` (exactly `size_bytes` long).
pub fn decode_record(bytes: &[u8], schema: &Schema) -> LvcResult<(RecordHeader, FieldList)> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Err(LvcError::Truncated("record header"));
    }
    let header: RecordHeader = *bytemuck::from_bytes(&bytes[..RECORD_HEADER_LEN]);
    let n_fld = header.n_fld as usize;
    let idx_end = RECORD_HEADER_LEN + n_fld * 2;
    if bytes.len() < idx_end {
        return Err(LvcError::Truncated("present-fid index"));
    }
    let mut present_idx = Vec::with_capacity(n_fld);
    let mut cursor = &bytes[RECORD_HEADER_LEN..idx_end];
    for _ in 0..n_fld {
        present_idx.push(cursor.read_u16::<BigEndian>()? as usize);
    }

    let mut fields = FieldList::with_capacity(n_fld);
    let mut offset = idx_end;
    for idx in present_idx {
        let entry = schema
            .entry_at(idx)
            .ok_or(LvcError::SchemaMissing(idx as i32))?;
        let width = if let Some(w) = scalar_width(entry.ty) {
            w
        } else {
            entry.fixed_width as usize
        };
        if offset + width > bytes.len() {
            return Err(LvcError::Truncated("field value"));
        }
        let value = decode_value(&bytes[offset..offset + width], entry.ty, entry.fixed_width)?;
        fields.add(entry.fid, entry.ty, value);
        offset += width;
    }
    Ok((header, fields))
}

/// Merges `update` into `current` per the record-merge rule (§4.5.1):
/// fields present in the update overwrite; fields retained otherwise.
/// Returns present fields as `(schema_index, value)` pairs in schema order.
pub fn merge_fields(schema: &Schema, current: &FieldList, update: &FieldList) -> Vec<(usize, FieldValue)> {
    let mut by_index: std::collections::BTreeMap<usize, FieldValue> = std::collections::BTreeMap::new();
    for Field { fid, value, .. } in current {
        if let Some(idx) = schema.index_of(*fid) {
            by_index.insert(idx, value.clone());
        }
    }
    for Field { fid, value, .. } in update {
        if let Some(idx) = schema.index_of(*fid) {
            by_index.insert(idx, value.clone());
        }
    }
    by_index.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use mdcore_wire_codec::FieldType;

    use super::*;

    fn schema() -> Schema {
        Schema::builder()
            .field(22, "BID", FieldType::Double, 8)
            .field(25, "ASK", FieldType::Double, 8)
            .field(3, "SYM", FieldType::String, 18)
            .build()
            .unwrap()
    }

    #[test]
    fn round_trips_a_record() {
        let schema = schema();
        let header = RecordHeader::new("BLOOMBERG", "IBM EQUITY");
        let present = vec![
            (0usize, FieldValue::Double(100.0)),
            (1usize, FieldValue::Double(100.5)),
            (2usize, FieldValue::String("IBM".to_string())),
        ];
        let bytes = encode_record(&header, &schema, &present).unwrap();
        let (decoded_header, fields) = decode_record(&bytes, &schema).unwrap();
        assert_eq!(decoded_header.svc(), "BLOOMBERG");
        assert_eq!(decoded_header.tkr(), "IBM EQUITY");
        assert_eq!(fields.get(22), Some(&FieldValue::Double(100.0)));
        assert_eq!(fields.get(25), Some(&FieldValue::Double(100.5)));
        assert_eq!(fields.get(3), Some(&FieldValue::String("IBM".to_string())));
    }

    #[test]
    fn merge_retains_fields_absent_from_update() {
        let schema = schema();
        let mut current = FieldList::new();
        current.add(22, FieldType::Double, FieldValue::Double(100.0));
        current.add(25, FieldType::Double, FieldValue::Double(100.5));
        let mut update = FieldList::new();
        update.add(25, FieldType::Double, FieldValue::Double(100.6));

        let merged = merge_fields(&schema, &current, &update);
        let merged_map: std::collections::HashMap<_, _> = merged.into_iter().collect();
        assert_eq!(merged_map.get(&0), Some(&FieldValue::Double(100.0)));
        assert_eq!(merged_map.get(&1), Some(&FieldValue::Double(100.6)));
    }
}
