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

//! Wire framing and codec for the market-data field-list protocol.
//!
//! A single numeric [`Schema`] (field id -> name/type/width) drives three
//! interchangeable wire framings -- XML, MarketFeed (delimiter-separated
//! ASCII), and packed binary -- over one dynamic data model, [`FieldList`].
//! Callers pick a framing per connection; [`detect_protocol`] recovers it
//! from the first byte of an inbound buffer so a receiver never needs to be
//! told in advance which framing a sender used.

pub mod codec;
mod error;
mod field;
mod field_list;
mod framer;
mod header;
mod schema;

pub use codec::binary::BinaryCodec;
pub use codec::mf::MarketFeedCodec;
pub use codec::xml::XmlCodec;
pub use codec::Codec;
pub use codec::ParseOutcome;
pub use error::CodecError;
pub use field::FieldType;
pub use field::FieldValue;
pub use field_list::Field;
pub use field_list::FieldList;
pub use framer::detect_protocol;
pub use framer::FrameOutcome;
pub use framer::Framer;
pub use framer::Protocol;
pub use header::DataType;
pub use header::Header;
pub use header::MsgType;
pub use header::Timestamp;
pub use schema::Schema;
pub use schema::SchemaEntry;
pub use schema::SchemaError;

pub(crate) type IoResult<T> = std::result::Result<T, CodecError>;
