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

//! Re-framing a tape-recorded payload into whatever protocol a replaying
//! subscriber asked for. A `TapeRecord`'s payload is the wire bytes exactly
//! as its original publisher framed them (§3, §6.3); the subscriber's
//! protocol need not match, so replay decodes with whichever codec
//! [`detect_protocol`] picks and re-encodes with the subscriber's codec.

use mdcore_wire_codec::detect_protocol;
use mdcore_wire_codec::BinaryCodec;
use mdcore_wire_codec::Codec;
use mdcore_wire_codec::FieldList;
use mdcore_wire_codec::Header;
use mdcore_wire_codec::MarketFeedCodec;
use mdcore_wire_codec::ParseOutcome;
use mdcore_wire_codec::Protocol;
use mdcore_wire_codec::Schema;
use mdcore_wire_codec::XmlCodec;

use crate::error::EngineError;
use crate::error::EngineResult;

/// Builds a fresh codec instance for `protocol`. Every codec owns a
/// reusable scratch buffer for `build`, so instances are never shared
/// across calls that might overlap (§5 "Scratch encode/decode buffers are
/// per-codec-instance and never shared").
pub fn make_codec(protocol: Protocol) -> Box<dyn Codec> {
    match protocol {
        Protocol::Xml => Box::new(XmlCodec::new()),
        Protocol::MarketFeed => Box::new(MarketFeedCodec::new()),
        Protocol::Binary => Box::new(BinaryCodec::new()),
    }
}

/// Decodes `payload` with whichever codec its first byte identifies,
/// trusting that a tape record always holds exactly one complete message
/// (it was framed and checksummed whole on `Append`).
pub fn decode_any(payload: &[u8], schema: &Schema) -> EngineResult<(Header, FieldList)> {
    let protocol = detect_protocol(payload).ok_or(EngineError::EmptyPayload)?;
    let mut codec = make_codec(protocol);
    match codec.parse(payload, schema) {
        ParseOutcome::Parsed { header, body, .. } => Ok((header, body)),
        ParseOutcome::Incomplete { hint } => Err(EngineError::Incomplete(hint)),
        ParseOutcome::BadFraming => Err(EngineError::BadFraming),
    }
}
