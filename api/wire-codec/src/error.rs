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

/// Error kinds a codec or framer can surface. Mirrors the taxonomy a caller
/// is expected to branch on: most are locally recoverable by resynchronizing
/// on the next frame, a few must be surfaced to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The buffer held a partial message; the caller should read more bytes
    /// and retry. Carries a size hint when the framing makes one available
    /// (always for binary, never for XML, sometimes for MarketFeed).
    #[error("incomplete message, need at least {hint:?} more bytes")]
    Incomplete { hint: Option<usize> },

    /// Delimiters were inconsistent in a way the framer cannot resynchronize
    /// from; the caller should drop the connection.
    #[error("bad framing: {0}")]
    BadFraming(String),

    /// A field id on the wire has no entry in the schema. The field is
    /// elided from the decoded FieldList rather than failing the message.
    #[error("field {fid} is not present in the schema")]
    SchemaMissing { fid: i32 },

    /// The wire-encoded type for a field disagreed with the schema's
    /// declared type. The value is kept in its wire type and the mismatch is
    /// reported to the caller for logging.
    #[error("field {fid} schema type {schema_type:?} disagrees with wire type {wire_type:?}")]
    TypeMismatch {
        fid: i32,
        schema_type: crate::FieldType,
        wire_type: crate::FieldType,
    },

    /// The codec's growable scratch buffer could not be grown further.
    #[error("scratch buffer overflow: needed {needed} bytes, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },

    /// Low-level I/O failure reading or writing the underlying buffer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
