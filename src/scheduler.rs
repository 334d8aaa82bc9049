//! Render scheduling.
//!
//! Any number of mutation sites may call `request_render`; the dedicated
//! scheduler loop collapses every request arriving before or during an
//! in-flight render into a single subsequent pass, and throttles passes to
//! a minimum inter-frame interval. State machine: Idle -> Requested ->
//! Rendering -> Idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::error::BridgeError;

pub type RenderFn = Arc<dyn Fn() -> Result<(), BridgeError> + Send + Sync>;

struct Shared {
    requested: Mutex<bool>,
    wake: Condvar,
    running: AtomicBool,
    /// Excludes a scheduler-triggered render and a synchronous
    /// `render_now` from ever running concurrently.
    render_gate: Mutex<()>,
}

pub struct RenderScheduler {
    shared: Arc<Shared>,
    render: RenderFn,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl RenderScheduler {
    /// Starts the scheduler loop. `poll` bounds the idle wait so shutdown
    /// is observed promptly; `min_interval` caps the frame rate.
    pub fn spawn(poll: Duration, min_interval: Duration, render: RenderFn) -> Self {
        let shared = Arc::new(Shared {
            requested: Mutex::new(false),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
            render_gate: Mutex::new(()),
        });

        let loop_shared = Arc::clone(&shared);
        let loop_render = Arc::clone(&render);
        let handle = thread::spawn(move || {
            scheduler_loop(loop_shared, loop_render, poll, min_interval);
        });

        Self {
            shared,
            render,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Cheap, non-blocking signal; callable from any thread. Multiple calls
    /// while a render is pending or running collapse into one pass.
    pub fn request_render(&self) {
        *self.shared.requested.lock() = true;
        self.shared.wake.notify_one();
    }

    /// Runs one render synchronously, excluded against the loop. Used for
    /// the initial render at startup.
    pub fn render_now(&self) -> Result<(), BridgeError> {
        let _gate = self.shared.render_gate.lock();
        (self.render)()
    }

    /// Stops the loop. Sets the signal one last time so the loop wakes
    /// immediately instead of riding out its poll timeout. Idempotent.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        *self.shared.requested.lock() = true;
        self.shared.wake.notify_one();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scheduler_loop(shared: Arc<Shared>, render: RenderFn, poll: Duration, min_interval: Duration) {
    while shared.running.load(Ordering::SeqCst) {
        {
            let mut requested = shared.requested.lock();
            if !*requested {
                shared.wake.wait_for(&mut requested, poll);
            }
            if !shared.running.load(Ordering::SeqCst) {
                return;
            }
            if !*requested {
                continue;
            }
            // Clearing before rendering: requests arriving during the
            // render mark the flag again and produce one more pass.
            *requested = false;
        }

        {
            let _gate = shared.render_gate.lock();
            if let Err(err) = render() {
                warn!(error = %err, "render pass failed, waiting for next request");
            }
        }

        thread::sleep(min_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    /// Render fn that reports each start and blocks until released.
    fn gated_render() -> (RenderFn, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let render: RenderFn = Arc::new(move || {
            started_tx.send(()).expect("report start");
            release_rx.lock().recv().expect("await release");
            Ok(())
        });
        (render, started_rx, release_tx)
    }

    #[test]
    fn fifty_requests_coalesce_into_one_subsequent_render() {
        let (render, started, release) = gated_render();
        let scheduler = RenderScheduler::spawn(
            Duration::from_millis(50),
            Duration::ZERO,
            render,
        );

        scheduler.request_render();
        started
            .recv_timeout(Duration::from_secs(5))
            .expect("first render starts");

        // The loop is now blocked inside the render. Everything below must
        // collapse into exactly one more pass.
        for _ in 0..50 {
            scheduler.request_render();
        }
        release.send(()).expect("release first");

        started
            .recv_timeout(Duration::from_secs(5))
            .expect("coalesced render starts");
        release.send(()).expect("release second");

        // No third pass without a new request.
        assert!(started.recv_timeout(Duration::from_millis(300)).is_err());

        release.send(()).ok();
        scheduler.shutdown();
    }

    #[test]
    fn render_failure_does_not_stop_the_loop() {
        let failed = Arc::new(AtomicBool::new(false));
        let failed_once = Arc::clone(&failed);
        let (done_tx, done_rx) = mpsc::channel();
        let render: RenderFn = Arc::new(move || {
            if !failed_once.swap(true, Ordering::SeqCst) {
                return Err(BridgeError::DepthExceeded {
                    depth: 101,
                    max_depth: 100,
                });
            }
            done_tx.send(()).expect("report success");
            Ok(())
        });

        let scheduler =
            RenderScheduler::spawn(Duration::from_millis(20), Duration::ZERO, render);
        scheduler.request_render();
        thread::sleep(Duration::from_millis(50));
        scheduler.request_render();

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("loop survived the failed pass");
        scheduler.shutdown();
    }

    #[test]
    fn shutdown_wakes_the_loop_immediately() {
        let render: RenderFn = Arc::new(|| Ok(()));
        let scheduler = RenderScheduler::spawn(Duration::from_secs(60), Duration::ZERO, render);

        let started = Instant::now();
        scheduler.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn render_now_is_synchronous() {
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let render: RenderFn = Arc::new(move || {
            *counter.lock() += 1;
            Ok(())
        });
        let scheduler =
            RenderScheduler::spawn(Duration::from_millis(50), Duration::ZERO, render);

        scheduler.render_now().expect("render");
        assert_eq!(*count.lock(), 1);
        scheduler.shutdown();
    }
}
