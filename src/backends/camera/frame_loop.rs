// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for capture loops
//!
//! Every backend runs its device I/O on a dedicated thread. Opening the device
//! happens on that thread too, and the outcome is handed back to the caller
//! before [`CaptureLoopController::start_with_init`] returns, so acquisition
//! errors (busy device, missing permissions) surface to whoever asked for the
//! stream instead of dying silently in the background.

use super::types::{BackendError, BackendResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// Dropping the controller stops the loop and joins the thread, which in turn
/// drops the loop state (closing the device).
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a capture loop whose state is created on the capture thread
    ///
    /// Blocks until `init_fn` has run. If it fails the thread exits and the
    /// error is returned; the loop function never runs.
    ///
    /// # Arguments
    ///
    /// * `name` - A descriptive name for the loop (used in logging and as thread name)
    /// * `init_fn` - Opens the device and builds the loop state
    /// * `loop_fn` - One iteration of the loop
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> BackendResult<Self>
    where
        S: 'static,
        I: FnOnce() -> BackendResult<S> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();
        let (init_tx, init_rx) = mpsc::sync_channel::<BackendResult<()>>(1);

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut state = match init_fn() {
                    Ok(s) => {
                        let _ = init_tx.send(Ok(()));
                        s
                    }
                    Err(e) => {
                        warn!(name = %name_clone, error = %e, "Capture initialization failed");
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };

                while !stop_signal_clone.load(Ordering::SeqCst) {
                    if loop_fn(&mut state) == LoopAction::Stop {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }

                // Dropping the state closes the device before the thread is joinable
                drop(state);
                info!(name = %name_clone, "Capture loop thread exiting");
            })
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let mut controller = Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        };

        match init_rx.recv() {
            Ok(Ok(())) => Ok(controller),
            Ok(Err(e)) => {
                controller.join();
                Err(e)
            }
            Err(_) => {
                controller.join();
                Err(BackendError::InitializationFailed(format!(
                    "{} exited during initialization",
                    name
                )))
            }
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread (and the device) to be released
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}
