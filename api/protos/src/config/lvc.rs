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

fn default_capacity() -> u32 {
    65_536
}

fn default_lock_name() -> String {
    "mdcore-lvc".to_string()
}

/// Where and how large the memory-mapped Last Value Cache file is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LvcConfig {
    pub path: PathBuf,
    /// Number of (service, ticker) records the file is sized to hold;
    /// exceeding it forces a remap to a larger file.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Name of the OS-level advisory lock guarding concurrent writers.
    #[serde(default = "default_lock_name")]
    pub lock_name: String,
}

impl Default for LvcConfig {
    fn default() -> Self {
        LvcConfig {
            path: PathBuf::new(),
            capacity: default_capacity(),
            lock_name: default_lock_name(),
        }
    }
}
