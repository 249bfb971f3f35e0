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

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

fn default_segment_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_index_granularity_secs() -> u32 {
    60
}

/// Where the append-only tape journal lives and how its coarse time index is
/// spaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapeConfig {
    pub directory: PathBuf,
    /// Segment rotation size; a new tape segment opens once the active one
    /// crosses this many bytes.
    #[serde(default = "default_segment_bytes")]
    pub segment_bytes: u64,
    /// Spacing, in seconds of tape time, between coarse time-index entries.
    #[serde(default = "default_index_granularity_secs")]
    pub index_granularity_secs: u32,
}

impl Default for TapeConfig {
    fn default() -> Self {
        TapeConfig {
            directory: PathBuf::new(),
            segment_bytes: default_segment_bytes(),
            index_granularity_secs: default_index_granularity_secs(),
        }
    }
}
