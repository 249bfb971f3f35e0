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

//! Append-only tape journal of wire messages (§3, §4.6, §6.3): a single
//! header, an in-memory coarse time index and per-stream index rebuilt on
//! open, then a contiguous run of checksummed records. One writer per tape;
//! any number of concurrent readers.

pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
mod header;
mod index;
mod reader;
mod record;
mod writer;

pub use error::TapeError;
pub use error::TapeResult;
pub use header::TapeHeader;
pub use header::TapeParams;
pub use header::TapeVariant;
pub use reader::TapeReader;
pub use record::TapeRecord;
pub use writer::TapeWriter;
