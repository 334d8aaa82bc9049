//! Duplex channel to the render host over a Unix domain socket.
//!
//! One writer path serialized behind a lock, one background reader thread
//! that reassembles frames and hands decoded messages to a [`MessageSink`].
//! `send` is fire-and-forget signaling, not a reliable queue: once the
//! channel is down it silently no-ops.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::codec::{self, FrameBuffer};
use crate::error::BridgeError;
use crate::protocol::Message;

const READ_CHUNK: usize = 8192;

/// Receives every decoded inbound message, on the reader thread. The sink
/// must not block; it only classifies and hands off.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: Message);
}

pub struct Transport {
    writer: Mutex<Option<UnixStream>>,
    connected: Arc<AtomicBool>,
    reader_handle: Mutex<Option<thread::JoinHandle<()>>>,
    max_frame_bytes: usize,
}

impl Transport {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            writer: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            reader_handle: Mutex::new(None),
            max_frame_bytes,
        }
    }

    /// Establishes the channel, retrying because the host process may still
    /// be starting, then spawns the background reader.
    pub fn connect(
        &self,
        path: &Path,
        retries: u32,
        delay: Duration,
        sink: Arc<dyn MessageSink>,
    ) -> Result<(), BridgeError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(BridgeError::AlreadyConnected);
        }
        // A previous reader that stopped on its own (EOF or write error)
        // is joined here so reconnecting never leaks its thread.
        if let Some(stale) = self.reader_handle.lock().take() {
            let _ = stale.join();
        }

        let attempts = retries.max(1);
        let mut last_error = None;
        let mut stream = None;

        for attempt in 1..=attempts {
            match UnixStream::connect(path) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(err) => {
                    trace!(attempt, error = %err, "connection attempt failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        thread::sleep(delay);
                    }
                }
            }
        }

        let Some(stream) = stream else {
            return Err(BridgeError::Connection {
                attempts,
                source: last_error
                    .unwrap_or_else(|| std::io::Error::other("no connection attempt made")),
            });
        };

        let read_half = stream.try_clone().map_err(|source| BridgeError::Connection {
            attempts,
            source,
        })?;

        *self.writer.lock() = Some(stream);
        self.connected.store(true, Ordering::SeqCst);

        let connected = Arc::clone(&self.connected);
        let max_frame_bytes = self.max_frame_bytes;
        let handle = thread::spawn(move || {
            reader_loop(read_half, connected, max_frame_bytes, sink);
        });
        *self.reader_handle.lock() = Some(handle);

        debug!(path = %path.display(), "channel connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Writes one frame. Concurrent calls never interleave bytes; the whole
    /// frame goes out under the writer lock. No-ops when disconnected.
    pub fn send(&self, message: &Message) {
        if !self.is_connected() {
            trace!(message = message.tag(), "send skipped, channel disconnected");
            return;
        }

        let frame = match codec::encode(message, self.max_frame_bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(message = message.tag(), error = %err, "dropping unencodable message");
                return;
            }
        };

        let mut writer = self.writer.lock();
        let Some(stream) = writer.as_mut() else {
            return;
        };
        if let Err(err) = stream.write_all(&frame).and_then(|()| stream.flush()) {
            warn!(error = %err, "write failed, marking channel disconnected");
            self.connected.store(false, Ordering::SeqCst);
            // Unblocks the reader's pending read on the shared socket;
            // once the writer is gone `disconnect` has no fd to close.
            let _ = stream.shutdown(std::net::Shutdown::Both);
            *writer = None;
        }
    }

    /// Tears the channel down. Idempotent; safe to call after the reader
    /// already stopped on EOF.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(stream) = self.writer.lock().take() {
            // Unblocks the reader's pending read on the shared socket.
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }

        let handle = self.reader_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        debug!("channel disconnected");
    }
}

fn reader_loop(
    mut stream: UnixStream,
    connected: Arc<AtomicBool>,
    max_frame_bytes: usize,
    sink: Arc<dyn MessageSink>,
) {
    let mut frames = FrameBuffer::new(max_frame_bytes);
    let mut chunk = [0_u8; READ_CHUNK];

    'read: loop {
        let count = match stream.read(&mut chunk) {
            Ok(0) => {
                debug!("channel closed by host");
                break;
            }
            Ok(count) => count,
            Err(err) => {
                if connected.load(Ordering::SeqCst) {
                    warn!(error = %err, "read failed, stopping reader");
                }
                break;
            }
        };

        frames.extend(&chunk[..count]);
        loop {
            match frames.next_payload() {
                Ok(Some(payload)) => match codec::decode_payload(&payload) {
                    Ok(message) => sink.deliver(message),
                    Err(err) => {
                        // One malformed frame is dropped; framing stays intact.
                        warn!(error = %err, len = payload.len(), "dropping malformed frame");
                    }
                },
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "unrecoverable framing error, stopping reader");
                    break 'read;
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
}
