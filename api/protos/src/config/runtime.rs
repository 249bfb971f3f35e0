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

use std::num::NonZeroUsize;

use serde::Deserialize;
use serde::Serialize;

/// Sizes the OS thread pools the synchronous core runs on (§5: "parallel OS
/// threads", no async runtime). Each field defaults to the host's available
/// parallelism when unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Threads decoding/encoding inbound and outbound wire traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_threads: Option<NonZeroUsize>,
    /// Threads applying decoded updates into the LVC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lvc_threads: Option<NonZeroUsize>,
    /// Threads serving tape replay/seek requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tape_threads: Option<NonZeroUsize>,
}

impl RuntimeOptions {
    pub fn codec_threads(&self) -> NonZeroUsize {
        self.codec_threads.unwrap_or_else(default_parallelism)
    }

    pub fn lvc_threads(&self) -> NonZeroUsize {
        self.lvc_threads.unwrap_or_else(default_parallelism)
    }

    pub fn tape_threads(&self) -> NonZeroUsize {
        self.tape_threads.unwrap_or_else(default_parallelism)
    }
}

fn default_parallelism() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::new(1).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_threads_fall_back_to_available_parallelism() {
        let opts = RuntimeOptions::default();
        assert!(opts.codec_threads().get() >= 1);
    }
}
