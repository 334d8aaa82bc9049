//! Shared test utilities: a fake render host on a Unix socket.

#![allow(dead_code, unused_imports)]

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use uibridge::codec::{self, FrameBuffer};
use uibridge::config::BridgeConfig;
use uibridge::Message;

pub const FRAME_CAP: usize = 16 * 1024 * 1024;

/// Config with short intervals so failing tests fail fast.
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        connect_retries: 3,
        connect_retry_delay_ms: 10,
        poll_interval_ms: 20,
        min_frame_interval_ms: 0,
        request_timeout_ms: 2_000,
        ..BridgeConfig::default()
    }
}

/// A socket path inside a fresh tempdir; keep the tempdir alive.
pub fn socket_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("host.sock");
    (dir, path)
}

/// The render-host side of the channel, driven synchronously by tests.
pub struct FakeHost {
    stream: UnixStream,
    frames: FrameBuffer,
}

impl FakeHost {
    pub fn accept(listener: &UnixListener) -> Self {
        let (stream, _) = listener.accept().expect("accept bridge connection");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");
        Self {
            stream,
            frames: FrameBuffer::new(FRAME_CAP),
        }
    }

    /// Blocks for the next complete message from the bridge.
    pub fn recv(&mut self) -> Message {
        let mut chunk = [0_u8; 4096];
        loop {
            if let Some(payload) = self.frames.next_payload().expect("well-formed frame") {
                return codec::decode_payload(&payload).expect("decodable payload");
            }
            let count = self.stream.read(&mut chunk).expect("host read");
            assert!(count > 0, "bridge closed the channel mid-message");
            self.frames.extend(&chunk[..count]);
        }
    }

    /// True when the bridge has closed the channel.
    pub fn saw_eof(&mut self) -> bool {
        let mut chunk = [0_u8; 64];
        matches!(self.stream.read(&mut chunk), Ok(0))
    }

    pub fn send(&mut self, message: &Message) {
        let frame = codec::encode(message, FRAME_CAP).expect("encode");
        self.stream.write_all(&frame).expect("host write");
        self.stream.flush().expect("host flush");
    }
}
