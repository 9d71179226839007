// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background dispatcher thread of a [`TimerScheduler`].

use super::TimerScheduler;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single wait, so clock jumps are noticed.
const MAX_IDLE_WAIT: Duration = Duration::from_millis(100);

/// Handle to a running dispatcher thread.
///
/// When dropped, shuts the scheduler down and joins the thread.
pub struct DispatcherHandle {
    scheduler: Arc<TimerScheduler>,
    /// Thread join handle (Option so we can take it in drop).
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.scheduler.shutdown();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl TimerScheduler {
    /// Spawn the dispatcher thread that fires due timers.
    pub fn spawn_dispatcher(self: &Arc<Self>, thread_name: &str) -> Result<DispatcherHandle> {
        let scheduler = Arc::clone(self);
        let thread = std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || scheduler.run_dispatcher())?;

        Ok(DispatcherHandle {
            scheduler: Arc::clone(self),
            thread: Some(thread),
        })
    }

    fn run_dispatcher(&self) {
        log::debug!("[scheduler] Dispatcher started");

        loop {
            {
                let mut queue = self.queue.lock();
                if queue.stopped {
                    break;
                }
                let now = self.clock.now();
                match queue.peek_expiry() {
                    Some(expiry) if expiry < now => {}
                    Some(expiry) => {
                        // +1ns: an entry becomes due strictly after its expiry.
                        let wait = expiry.saturating_since(now) + Duration::from_nanos(1);
                        self.wakeup.wait_for(&mut queue, wait.min(MAX_IDLE_WAIT));
                        continue;
                    }
                    None => {
                        self.wakeup.wait_for(&mut queue, MAX_IDLE_WAIT);
                        continue;
                    }
                }
            }
            self.fire_due();
        }

        log::debug!("[scheduler] Dispatcher stopped");
    }
}
