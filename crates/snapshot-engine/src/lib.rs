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

//! Orchestrates the LVC and tape subsystems for a subscriber's snapshot or
//! replay request (§4.7), transcoding between whichever of the three wire
//! protocols a tape record was captured in and whichever one the
//! requesting connection uses.

mod engine;
mod error;
mod transcode;

pub use engine::SnapshotEngine;
pub use error::EngineError;
pub use error::EngineResult;
pub use transcode::decode_any;
pub use transcode::make_codec;
