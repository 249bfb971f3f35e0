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

use serde::Deserialize;
use serde::Serialize;

/// Backpressure thresholds for a bounded replay queue: cross `high` and the
/// producer pauses, drain back under `low` and it resumes. Keeping the two
/// apart avoids a pause/resume cycle thrashing on every message at the
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Watermarks {
    pub low: usize,
    pub high: usize,
}

impl Watermarks {
    pub fn new(low: usize, high: usize) -> Self {
        assert!(low <= high, "low watermark {low} must not exceed high watermark {high}");
        Watermarks { low, high }
    }

    pub fn should_pause(&self, queue_depth: usize) -> bool {
        queue_depth >= self.high
    }

    pub fn should_resume(&self, queue_depth: usize) -> bool {
        queue_depth <= self.low
    }
}

impl Default for Watermarks {
    fn default() -> Self {
        Watermarks { low: 1_000, high: 10_000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_resume_hysteresis() {
        let wm = Watermarks::new(10, 20);
        assert!(!wm.should_pause(15));
        assert!(wm.should_pause(20));
        assert!(!wm.should_resume(15));
        assert!(wm.should_resume(10));
    }

    #[test]
    #[should_panic]
    fn rejects_inverted_bounds() {
        Watermarks::new(20, 10);
    }
}
