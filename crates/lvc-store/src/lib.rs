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

//! Memory-mapped last-value cache keyed by `(service, ticker)`. A single
//! writer applies incoming messages under a named file lock; readers remap
//! and rebuild a small in-memory offset index whenever the tail has grown,
//! after which field reads are lock-free (§4.5.2).

mod error;
mod filter;
mod record;
mod store;

pub use error::LvcError;
pub use error::LvcResult;
pub use filter::LvcFilter;
pub use record::RecordHeader;
pub use store::lock_path_for;
pub use store::LvcStore;
pub use store::RecordView;
pub use store::Signature;
