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

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;

/// Blocks the owning thread until every participant has called
/// [`WaitGroup::done`]. `wait()` parks the caller's OS thread on a condvar
/// rather than suspending a future, matching the synchronous core.
#[derive(Clone)]
pub struct WaitGroup {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl WaitGroup {
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new((Mutex::new(count), Condvar::new())),
        }
    }

    /// Registers `n` more participants that must call `done` before waiters
    /// are released.
    pub fn add(&self, n: usize) {
        let (lock, _) = &*self.inner;
        let mut count = lock.lock().expect("wait group poisoned");
        *count += n;
    }

    /// Marks one participant as finished, waking waiters once the count
    /// reaches zero.
    pub fn done(&self) {
        let (lock, cvar) = &*self.inner;
        let mut count = lock.lock().expect("wait group poisoned");
        assert!(*count > 0, "WaitGroup::done called more times than add");
        *count -= 1;
        if *count == 0 {
            cvar.notify_all();
        }
    }

    /// Blocks the calling thread until the outstanding count reaches zero.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut count = lock.lock().expect("wait group poisoned");
        while *count > 0 {
            count = cvar.wait(count).expect("wait group poisoned");
        }
    }

    pub fn count(&self) -> usize {
        let (lock, _) = &*self.inner;
        *lock.lock().expect("wait group poisoned")
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn wait_blocks_until_all_workers_are_done() {
        let wg = WaitGroup::new(0);
        wg.add(3);
        let mut handles = Vec::new();
        for _ in 0..3 {
            let wg = wg.clone();
            handles.push(thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                wg.done();
            }));
        }
        wg.wait();
        assert_eq!(wg.count(), 0);
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn wait_returns_immediately_when_empty() {
        let wg = WaitGroup::new(0);
        wg.wait();
    }

    #[test]
    #[should_panic]
    fn done_without_add_panics() {
        let wg = WaitGroup::new(0);
        wg.done();
    }
}
