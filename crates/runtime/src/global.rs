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

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

use mdcore_protos::config::RuntimeOptions;

use crate::ThreadPool;

/// The three worker pools the synchronous core runs on, sized from
/// [`RuntimeOptions`].
#[derive(Debug)]
pub struct GlobalPools {
    pub codec_pool: ThreadPool,
    pub lvc_pool: ThreadPool,
    pub tape_pool: ThreadPool,
}

static GLOBAL_POOLS: OnceLock<GlobalPools> = OnceLock::new();
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Initializes the global pools once, sized from `opts`. Subsequent calls
/// are no-ops: the first caller wins.
pub fn init(opts: &RuntimeOptions) {
    GLOBAL_POOLS.get_or_init(|| do_initialize_pools(opts));
}

fn do_initialize_pools(opts: &RuntimeOptions) -> GlobalPools {
    log::info!("initializing global thread pools: {opts:?}");

    set_panic_hook();

    GlobalPools {
        codec_pool: ThreadPool::new("codec", opts.codec_threads().get()),
        lvc_pool: ThreadPool::new("lvc", opts.lvc_threads().get()),
        tape_pool: ThreadPool::new("tape", opts.tape_threads().get()),
    }
}

/// Returns the global pools, lazily initializing them with default sizing
/// if nothing has called [`init`] yet.
pub fn fetch_pools_or_default() -> &'static GlobalPools {
    GLOBAL_POOLS.get_or_init(|| do_initialize_pools(&RuntimeOptions::default()))
}

/// Installs a panic hook that logs the panic and backtrace, prints
/// `better_panic`'s rendering, then flags the process for shutdown.
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("panic occurred: {info}\nbacktrace:\n{backtrace}");
        better_panic::Settings::auto().create_panic_handler()(info);
        shutdown();
    }));
}

/// Flags the process as shutting down. Worker loops observing
/// [`is_shutdown`] should stop pulling new work and drain in-flight tasks.
pub fn shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pools_are_sized_at_least_one_thread_each() {
        let pools = fetch_pools_or_default();
        assert!(pools.codec_pool.worker_threads() >= 1);
        assert!(pools.lvc_pool.worker_threads() >= 1);
        assert!(pools.tape_pool.worker_threads() >= 1);
    }

    #[test]
    fn pools_run_submitted_work() {
        let pools = fetch_pools_or_default();
        let handle = pools.codec_pool.spawn(|| 1 + 1);
        assert_eq!(handle.join().unwrap(), 2);
    }
}
