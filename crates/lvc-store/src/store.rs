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

//! The memory-mapped record store (§4.5, §6.1): `Signature ‖ FileHdr ‖
//! Schema[nFlds] ‖ Records*`, guarded for writes by a named OS-level file
//! lock keyed on the store's lock path.

use std::collections::HashMap;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use fs2::FileExt;
use mdcore_wire_codec::FieldList;
use mdcore_wire_codec::Schema;
use mdcore_wire_codec::SchemaEntry;
use memmap2::MmapMut;

use crate::error::LvcError;
use crate::error::LvcResult;
use crate::filter::LvcFilter;
use crate::record::decode_record;
use crate::record::encode_record;
use crate::record::merge_fields;
use crate::record::RecordHeader;
use crate::record::RECORD_HEADER_LEN;

/// Whether a store carries ASCII or native-binary field payloads; the two
/// layouts are otherwise structurally identical (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Ascii,
    Binary,
}

impl Signature {
    const ASCII_MAGIC: &'static [u8; 16] = b"LVC_004\0\0\0\0\0\0\0\0\0";
    const BINARY_MAGIC: &'static [u8; 16] = b"LVC_005\0\0\0\0\0\0\0\0\0";

    fn magic(self) -> &'static [u8; 16] {
        match self {
            Signature::Ascii => Self::ASCII_MAGIC,
            Signature::Binary => Self::BINARY_MAGIC,
        }
    }

    fn detect(bytes: &[u8; 16]) -> LvcResult<Signature> {
        if bytes == Self::ASCII_MAGIC {
            Ok(Signature::Ascii)
        } else if bytes == Self::BINARY_MAGIC {
            Ok(Signature::Binary)
        } else {
            Err(LvcError::BadSignature)
        }
    }
}

const SIGNATURE_LEN: usize = 16;
const FILE_HDR_LEN: usize = 8 + 4 + 8 + 4; // fileSiz, nFlds, freeIdx, sentinel
const SCHEMA_ENTRY_LEN: usize = 40;
const SENTINEL_WRITABLE: u32 = 1;

fn schema_start() -> usize {
    SIGNATURE_LEN + FILE_HDR_LEN
}

/// A decoded view of one live record, handed back by `snap`/`snap_all`.
#[derive(Debug, Clone)]
pub struct RecordView {
    pub svc: String,
    pub tkr: String,
    pub active: bool,
    pub t_create: u32,
    pub t_upd: u32,
    pub t_upd_us: u32,
    pub t_dead: u32,
    pub n_upd: u32,
    pub fields: FieldList,
}

pub struct LvcStore {
    file: File,
    lock_file: File,
    mmap: MmapMut,
    schema: Schema,
    signature: Signature,
    records_start: usize,
    /// `(service, ticker) -> byte offset of record start`.
    index: HashMap<(String, String), usize>,
}

impl LvcStore {
    /// Opens an existing store, or creates one at `path` with `schema` and
    /// `signature` if it does not yet exist.
    pub fn open(path: impl AsRef<Path>, lock_path: impl AsRef<Path>, schema: Schema, signature: Signature) -> LvcResult<Self> {
        let path = path.as_ref();
        let lock_file = OpenOptions::new().create(true).write(true).open(lock_path)?;

        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).read(true).write(true).open(path)?;

        if is_new {
            Self::initialize(&mut file, &schema, signature)?;
        }

        let (on_disk_schema, detected_signature) = read_header_and_schema(&mut file)?;
        let records_start = schema_start() + on_disk_schema.len() * SCHEMA_ENTRY_LEN;

        let len = file.metadata()?.len();
        if len == 0 {
            return Err(LvcError::Truncated("empty file"));
        }
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let mut store = LvcStore {
            file,
            lock_file,
            mmap,
            schema: on_disk_schema,
            signature: detected_signature,
            records_start,
            index: HashMap::new(),
        };
        store.rebuild_index()?;
        Ok(store)
    }

    fn initialize(file: &mut File, schema: &Schema, signature: Signature) -> LvcResult<()> {
        let mut buf = Vec::new();
        buf.extend_from_slice(signature.magic());

        let records_start = schema_start() + schema.len() * SCHEMA_ENTRY_LEN;
        buf.write_u64::<LittleEndian>(records_start as u64)?; // fileSiz
        buf.write_u32::<LittleEndian>(schema.len() as u32)?; // nFlds
        buf.write_u64::<LittleEndian>(records_start as u64)?; // freeIdx
        buf.write_u32::<LittleEndian>(SENTINEL_WRITABLE)?; // sentinel

        for entry in schema.entries() {
            write_schema_entry(&mut buf, entry)?;
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }

    fn rebuild_index(&mut self) -> LvcResult<()> {
        let _guard = lock_shared(&self.lock_file)?;
        self.index.clear();
        let free_idx = self.free_idx() as usize;
        let mut offset = self.records_start;
        while offset + RECORD_HEADER_LEN <= free_idx {
            let size = u32::from_le_bytes(self.mmap[offset..offset + 4].try_into().unwrap()) as usize;
            if size < RECORD_HEADER_LEN || offset + size > free_idx {
                return Err(LvcError::Truncated("record size crosses free boundary"));
            }
            let header: RecordHeader = *bytemuck::from_bytes(&self.mmap[offset..offset + RECORD_HEADER_LEN]);
            self.index.insert((header.svc(), header.tkr()), offset);
            offset += size;
        }
        Ok(())
    }

    fn free_idx(&self) -> u64 {
        u64::from_le_bytes(self.mmap[24..32].try_into().unwrap())
    }

    fn set_free_idx(&mut self, value: u64) {
        self.mmap[24..32].copy_from_slice(&value.to_le_bytes());
    }

    fn file_size(&self) -> u64 {
        u64::from_le_bytes(self.mmap[16..24].try_into().unwrap())
    }

    fn set_file_size(&mut self, value: u64) {
        self.mmap[16..24].copy_from_slice(&value.to_le_bytes());
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Re-maps the file if `freeIdx` has advanced since the last map,
    /// growing the mapped region to `fileSiz` (§4.5: `Remap`).
    pub fn remap(&mut self) -> LvcResult<()> {
        let on_disk_len = self.file.metadata()?.len();
        if on_disk_len as usize > self.mmap.len() {
            self.mmap.flush()?;
            self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
        }
        self.rebuild_index()
    }

    /// Locates the record for `(svc, tkr)` and returns a decoded view.
    pub fn snap(&self, svc: &str, tkr: &str) -> LvcResult<Option<RecordView>> {
        let Some(&offset) = self.index.get(&(svc.to_string(), tkr.to_string())) else {
            return Ok(None);
        };
        Ok(Some(self.view_at(offset)?))
    }

    /// Iterates every live record, applying `filter`.
    pub fn snap_all(&self, filter: &LvcFilter) -> LvcResult<Vec<RecordView>> {
        let mut out = Vec::new();
        for (&(ref svc, _), &offset) in &self.index {
            if !filter.admits_service(svc) {
                continue;
            }
            let mut view = self.view_at(offset)?;
            view.fields = filter.project(&view.fields);
            out.push(view);
        }
        Ok(out)
    }

    fn view_at(&self, offset: usize) -> LvcResult<RecordView> {
        let size = u32::from_le_bytes(self.mmap[offset..offset + 4].try_into().unwrap()) as usize;
        let (header, fields) = decode_record(&self.mmap[offset..offset + size], &self.schema)?;
        Ok(RecordView {
            svc: header.svc(),
            tkr: header.tkr(),
            active: header.b_active != 0,
            t_create: header.t_create,
            t_upd: header.t_upd,
            t_upd_us: header.t_upd_us,
            t_dead: header.t_dead,
            n_upd: header.n_upd,
            fields,
        })
    }

    /// Writer path (§4.5, §4.5.1): locate-or-append a record for
    /// `(svc, tkr)`, merge `update` into the on-disk image, bump
    /// `tUpd`/`tUpdUs`/`nUpd`, and mark active unless `dead` is set.
    pub fn apply(&mut self, svc: &str, tkr: &str, update: &FieldList, now_sec: u32, now_us: u32, dead: bool) -> LvcResult<()> {
        let _guard = lock_exclusive(&self.lock_file)?;

        let key = (svc.to_string(), tkr.to_string());
        let existing_offset = self.index.get(&key).copied();

        let (mut header, current_fields, n_upd) = match existing_offset {
            Some(offset) => {
                let size = u32::from_le_bytes(self.mmap[offset..offset + 4].try_into().unwrap()) as usize;
                let (header, fields) = decode_record(&self.mmap[offset..offset + size], &self.schema)?;
                (header, fields, header.n_upd)
            }
            None => (RecordHeader::new(svc, tkr), FieldList::new(), 0),
        };

        header.t_upd = now_sec;
        header.t_upd_us = now_us;
        header.n_upd = n_upd + 1;
        if header.t_create == 0 {
            header.t_create = now_sec;
        }
        if dead {
            header.b_active = 0;
            header.t_dead = now_sec;
        } else {
            header.b_active = 1;
        }

        let merged = merge_fields(&self.schema, &current_fields, update);
        let bytes = encode_record(&header, &self.schema, &merged)?;

        // A record whose shape (field set) is unchanged is rewritten in
        // place; one whose shape grew is appended at the tail and the old
        // slot left in place, reclaimed only by a compaction pass (out of
        // scope, §9 open questions).
        let existing_size = existing_offset.map(|offset| u32::from_le_bytes(self.mmap[offset..offset + 4].try_into().unwrap()) as usize);

        let write_offset = match (existing_offset, existing_size) {
            (Some(offset), Some(size)) if size == bytes.len() => offset,
            _ => self.free_idx() as usize,
        };
        let new_len = write_offset + bytes.len();
        self.ensure_capacity(new_len)?;
        self.mmap[write_offset..new_len].copy_from_slice(&bytes);
        self.mmap.flush_range(write_offset, bytes.len())?;

        self.index.insert(key, write_offset);
        if new_len as u64 > self.free_idx() {
            self.set_free_idx(new_len as u64);
        }
        if new_len as u64 > self.file_size() {
            self.set_file_size(new_len as u64);
        }
        self.mmap.flush_range(16, 16)?;
        Ok(())
    }

    fn ensure_capacity(&mut self, needed: usize) -> LvcResult<()> {
        if needed <= self.mmap.len() {
            return Ok(());
        }
        let grown = (needed * 2).max(self.mmap.len() + 64 * 1024);
        self.file.set_len(grown as u64)?;
        self.mmap.flush()?;
        self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }
}

/// An flock held on a duplicated handle to the store's lock file. Holding a
/// dup'd fd rather than `&File` keeps the guard's lifetime independent of
/// `LvcStore` itself, since flock applies to the open file description and is
/// shared by every descriptor duplicated from it -- the store can keep
/// mutating its other fields (`mmap`, `index`) through plain `&mut self`
/// methods while the guard is alive.
struct FileLockGuard {
    file: File,
}

fn lock_shared(lock_file: &File) -> LvcResult<FileLockGuard> {
    lock_file.lock_shared().map_err(|_| LvcError::Locked("shared".to_string()))?;
    Ok(FileLockGuard { file: lock_file.try_clone()? })
}

fn lock_exclusive(lock_file: &File) -> LvcResult<FileLockGuard> {
    lock_file.lock_exclusive().map_err(|_| LvcError::Locked("exclusive".to_string()))?;
    Ok(FileLockGuard { file: lock_file.try_clone()? })
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn write_schema_entry(buf: &mut Vec<u8>, entry: &SchemaEntry) -> LvcResult<()> {
    buf.write_i32::<LittleEndian>(entry.fid)?;
    buf.write_u8(entry.ty.wire_tag())?;
    buf.write_u8(0)?; // _pad
    buf.write_u16::<LittleEndian>(entry.fixed_width)?;
    let mut name = [0u8; 32];
    let bytes = entry.name.as_bytes();
    let n = bytes.len().min(32);
    name[..n].copy_from_slice(&bytes[..n]);
    buf.extend_from_slice(&name);
    Ok(())
}

fn read_header_and_schema(file: &mut File) -> LvcResult<(Schema, Signature)> {
    file.seek(SeekFrom::Start(0))?;
    let mut sig_bytes = [0u8; SIGNATURE_LEN];
    file.read_exact(&mut sig_bytes)?;
    let signature = Signature::detect(&sig_bytes)?;

    let mut hdr = [0u8; FILE_HDR_LEN];
    file.read_exact(&mut hdr)?;
    let mut cursor = &hdr[..];
    let _file_siz = cursor.read_u64::<LittleEndian>()?;
    let n_flds = cursor.read_u32::<LittleEndian>()?;
    let _free_idx = cursor.read_u64::<LittleEndian>()?;
    let _sentinel = cursor.read_u32::<LittleEndian>()?;

    let mut builder = Schema::builder();
    for _ in 0..n_flds {
        let mut entry_bytes = [0u8; SCHEMA_ENTRY_LEN];
        file.read_exact(&mut entry_bytes)?;
        let mut cursor = &entry_bytes[..];
        let fid = cursor.read_i32::<LittleEndian>()?;
        let ty_tag = cursor.read_u8()?;
        let _pad = cursor.read_u8()?;
        let fixed_width = cursor.read_u16::<LittleEndian>()?;
        let mut name_bytes = [0u8; 32];
        std::io::Read::read_exact(&mut cursor, &mut name_bytes)?;
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(32);
        let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
        let ty = mdcore_wire_codec::FieldType::from_wire_tag(ty_tag).ok_or(LvcError::Truncated("schema entry type tag"))?;
        builder = builder.field(fid, name, ty, fixed_width);
    }
    Ok((builder.build()?, signature))
}

/// Derives the named-lock file path for a store at `path`, keyed by
/// `lock_name` (`LvcConfig::lock_name`) so two stores in the same directory
/// never share a lock.
pub fn lock_path_for(path: &Path, lock_name: &str) -> PathBuf {
    path.with_file_name(format!("{lock_name}.lock"))
}

impl std::fmt::Debug for LvcStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LvcStore")
            .field("signature", &self.signature)
            .field("records", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use mdcore_wire_codec::FieldType;
    use mdcore_wire_codec::FieldValue;

    use super::*;

    fn schema() -> Schema {
        Schema::builder()
            .field(22, "BID", FieldType::Double, 8)
            .field(25, "ASK", FieldType::Double, 8)
            .build()
            .unwrap()
    }

    #[test]
    fn apply_then_snap_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lvc.dat");
        let lock = dir.path().join("lvc.lock");
        let mut store = LvcStore::open(&path, &lock, schema(), Signature::Binary).unwrap();

        let mut image = FieldList::new();
        image.add(22, FieldType::Double, FieldValue::Double(100.0));
        image.add(25, FieldType::Double, FieldValue::Double(100.5));
        store.apply("X", "Y", &image, 1000, 0, false).unwrap();

        let mut update = FieldList::new();
        update.add(25, FieldType::Double, FieldValue::Double(100.6));
        store.apply("X", "Y", &update, 1001, 0, false).unwrap();

        let view = store.snap("X", "Y").unwrap().unwrap();
        assert_eq!(view.fields.get(22), Some(&FieldValue::Double(100.0)));
        assert_eq!(view.fields.get(25), Some(&FieldValue::Double(100.6)));
        assert_eq!(view.n_upd, 2);
        assert!(view.active);
    }

    #[test]
    fn dead_ticker_retains_last_known_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lvc.dat");
        let lock = dir.path().join("lvc.lock");
        let mut store = LvcStore::open(&path, &lock, schema(), Signature::Binary).unwrap();

        let mut image = FieldList::new();
        image.add(22, FieldType::Double, FieldValue::Double(1.0));
        store.apply("X", "Y", &image, 1, 0, false).unwrap();
        store.apply("X", "Y", &FieldList::new(), 2, 0, true).unwrap();

        let view = store.snap("X", "Y").unwrap().unwrap();
        assert!(!view.active);
        assert_eq!(view.fields.get(22), Some(&FieldValue::Double(1.0)));
    }

    #[test]
    fn snap_all_respects_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lvc.dat");
        let lock = dir.path().join("lvc.lock");
        let mut store = LvcStore::open(&path, &lock, schema(), Signature::Binary).unwrap();

        for (svc, tkr) in [("S1", "A"), ("S1", "B"), ("S2", "C")] {
            let mut fields = FieldList::new();
            fields.add(22, FieldType::Double, FieldValue::Double(1.0));
            fields.add(25, FieldType::Double, FieldValue::Double(2.0));
            store.apply(svc, tkr, &fields, 1, 0, false).unwrap();
        }

        let filter = LvcFilter::new().with_fids([22]).with_services(["S1".to_string()]);
        let views = store.snap_all(&filter).unwrap();
        assert_eq!(views.len(), 2);
        for view in views {
            assert_eq!(view.svc, "S1");
            assert_eq!(view.fields.len(), 1);
            assert!(view.fields.contains(22));
        }
    }

    #[test]
    fn reopen_rebuilds_index_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lvc.dat");
        let lock = dir.path().join("lvc.lock");
        {
            let mut store = LvcStore::open(&path, &lock, schema(), Signature::Binary).unwrap();
            let mut fields = FieldList::new();
            fields.add(22, FieldType::Double, FieldValue::Double(9.0));
            store.apply("X", "Y", &fields, 1, 0, false).unwrap();
        }
        let reopened = LvcStore::open(&path, &lock, schema(), Signature::Binary).unwrap();
        let view = reopened.snap("X", "Y").unwrap().unwrap();
        assert_eq!(view.fields.get(22), Some(&FieldValue::Double(9.0)));
    }
}
