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

//! Build-time version information, generated into `OUT_DIR` by `build.rs`
//! and stitched together here into the one-line banner the CLI prints for
//! `--version`.

use const_format::formatcp;

shadow_rs::shadow!(build);

/// `<version> (<short git sha>, built on <build date>)`
pub const VERSION: &str = formatcp!(
    "{} ({}, built on {})",
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME
);

pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_is_non_empty() {
        assert!(!version().is_empty());
    }
}
