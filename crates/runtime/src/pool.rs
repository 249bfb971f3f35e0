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

//! A fixed-size worker pool of OS threads, used instead of an async
//! executor to drive the codec/LVC/tape subsystems (no cooperative
//! suspension primitive in this core).

use std::panic::catch_unwind;
use std::panic::resume_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

static POOL_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, thiserror::Error)]
#[error("task was dropped before it produced a result")]
pub struct PanicError;

/// A handle to a task submitted with [`ThreadPool::spawn`].
pub struct JoinHandle<R> {
    rx: mpsc::Receiver<thread::Result<R>>,
}

impl<R> JoinHandle<R> {
    /// Blocks the calling thread for the task's result.
    ///
    /// A task that panicked has its panic resumed on the caller's thread,
    /// after flagging the process for shutdown, mirroring how a panicking
    /// unsupervised OS thread brings down a process.
    pub fn join(self) -> Result<R, PanicError> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => {
                crate::shutdown();
                resume_unwind(payload)
            }
            Err(_) => Err(PanicError),
        }
    }
}

/// A named pool of worker threads pulling jobs off a shared queue.
pub struct ThreadPool {
    name: String,
    sender: mpsc::Sender<Job>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name)
            .field("worker_threads", &self.workers.len())
            .finish()
    }
}

impl ThreadPool {
    /// Spawns `worker_threads` OS threads named `<name>-<pool id>-<index>`.
    pub fn new(name: impl Into<String>, worker_threads: usize) -> Self {
        let name = name.into();
        let worker_threads = worker_threads.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let id = POOL_ID.fetch_add(1, Ordering::Relaxed);

        let workers = (0..worker_threads)
            .map(|idx| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("{name}-{id}-{idx}"))
                    .spawn(move || loop {
                        let job = {
                            let receiver = receiver.lock().expect("pool receiver poisoned");
                            receiver.recv()
                        };
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            name,
            sender,
            workers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker_threads(&self) -> usize {
        self.workers.len()
    }

    /// Submits a task to the pool, returning a handle to its eventual
    /// result. Panics inside `task` are caught and re-raised on the
    /// caller's thread when the handle is joined.
    pub fn spawn<F, R>(&self, task: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(task));
            let _ = tx.send(result);
        });
        self.sender
            .send(job)
            .expect("thread pool worker channel closed");
        JoinHandle { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_runs_on_worker_thread() {
        let pool = ThreadPool::new("test", 2);
        let handle = pool.spawn(|| 1 + 1);
        assert_eq!(handle.join().unwrap(), 2);
    }

    #[test]
    fn many_tasks_share_the_pool() {
        let pool = ThreadPool::new("test", 4);
        let handles: Vec<_> = (0..32).map(|i| pool.spawn(move || i * i)).collect();
        let sum: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(sum, (0..32).map(|i| i * i).sum());
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panicking_task_resumes_panic_on_join() {
        let pool = ThreadPool::new("test", 1);
        let handle = pool.spawn(|| -> usize { panic!("boom") });
        let _ = handle.join();
    }
}
