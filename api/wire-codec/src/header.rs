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

use crate::field_list::FieldList;

/// Message type, carried on every header.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MsgType {
    Undef,
    Image,
    Update,
    Dead,
    Stale,
    Recovering,
    GlobalStatus,
    Mount,
    Ping,
    Ctl,
    Open,
    Close,
    Query,
    Insert,
    InsAck,
}

/// Payload shape carried by a message, independent of its [`MsgType`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DataType {
    Undef,
    FieldList,
    FixedMsg,
    BlobList,
    BlobTable,
    BookOrder,
    BookPriceLevel,
    Control,
}

/// Wall-clock stamp carried by a header: seconds plus microseconds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Hash)]
pub struct Timestamp {
    pub sec: u32,
    pub usec: u32,
}

/// Message header: addressing plus the per-stream sequence fields that the
/// body's [`FieldList`] rides along with.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub msg_type: MsgType,
    pub data_type: DataType,
    /// Free-form tag, at most 31 bytes on the wire; longer values are
    /// truncated on encode.
    pub tag_str: String,
    pub tag_int: i32,
    /// Record Transaction Level: monotonically increasing per stream across
    /// Image/Update messages (§5). The codec does not enforce monotonicity,
    /// only preserves it through encode/decode.
    pub rtl: i64,
    pub tstamp: Timestamp,
    /// Service name, at most 64 bytes on the wire.
    pub svc: String,
    /// Ticker name, at most 128 bytes on the wire.
    pub tkr: String,
    /// Error text, at most 256 bytes on the wire.
    pub err: String,
    pub attrs: FieldList,
}

impl Header {
    pub fn new(msg_type: MsgType, svc: impl Into<String>, tkr: impl Into<String>) -> Self {
        Header {
            msg_type,
            data_type: DataType::FieldList,
            tag_str: String::new(),
            tag_int: 0,
            rtl: 0,
            tstamp: Timestamp::default(),
            svc: svc.into(),
            tkr: tkr.into(),
            err: String::new(),
            attrs: FieldList::new(),
        }
    }
}

pub const TAG_STR_MAX: usize = 31;
pub const SVC_MAX: usize = 64;
pub const TKR_MAX: usize = 128;
pub const ERR_MAX: usize = 256;

/// Truncates `s` to at most `max` bytes, respecting UTF-8 boundaries.
pub fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
