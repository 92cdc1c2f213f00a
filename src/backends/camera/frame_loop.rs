// SPDX-License-Identifier: GPL-3.0-only
//! Paced worker threads for per-frame work
//!
//! Decode loops and capture threads share the same lifecycle: run an iteration,
//! wait out the rest of the pacing interval, stop when asked or when the
//! iteration says so. Stopping joins the thread, so once `stop()` returns no
//! further iteration can run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a loop running in a separate thread
pub struct FrameLoop {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl FrameLoop {
    /// Start a loop that runs at most once per `interval`
    ///
    /// The callback receives the loop's stop signal so it can bail out of long
    /// work. A zero interval runs iterations back to back.
    pub fn start<F>(name: &str, interval: Duration, mut loop_fn: F) -> Self
    where
        F: FnMut(&AtomicBool) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        debug!(name, interval_ms = interval.as_millis() as u64, "Starting frame loop");

        let thread_handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                let started = Instant::now();

                if loop_fn(&thread_stop) == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }

                // Sleep in short slices so a stop request is honoured promptly
                let deadline = started + interval;
                while !thread_stop.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::sleep((deadline - now).min(Duration::from_millis(10)));
                }
            }

            debug!(name = %thread_name, "Frame loop exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// Must not be called from inside the loop callback.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Dropped from its own callback; the thread is already unwinding out
                return;
            }
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frame_loop = FrameLoop::start("test-loop", Duration::ZERO, move |_| {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        frame_loop.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
    }

    #[test]
    fn test_stop_prevents_further_iterations() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frame_loop = FrameLoop::start("test-stop", Duration::from_millis(5), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(50));
        frame_loop.stop();
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
        assert!(!frame_loop.is_running());
    }

    #[test]
    fn test_interval_bounds_iteration_rate() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frame_loop = FrameLoop::start("test-pace", Duration::from_millis(100), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(450));
        frame_loop.stop();
        // 10 per second at most: 5 iterations fit in 450ms (t=0,100,200,300,400)
        assert!(counter.load(Ordering::SeqCst) <= 5);
    }

    #[test]
    fn test_drop_stops_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let frame_loop = FrameLoop::start("test-drop", Duration::from_millis(5), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        });
        assert!(frame_loop.is_running());
        drop(frame_loop);

        let after_drop = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), after_drop);
    }
}
