//! Microphone capture lifecycle
//!
//! [`AudioCapture`] owns acquisition and release of the capture device.
//! The device itself sits behind [`CaptureDevice`] so the server can feed
//! audio arriving over a WebSocket and tests can feed synthetic frames.
//!
//! Invariants:
//! - the device is held by at most one [`CaptureHandle`] at a time;
//!   a second `acquire` waits for the previous release
//! - every acquisition is paired with exactly one release, on every exit
//!   path (explicit `release`, drop, or error)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use bima_core::{AudioFrame, Error, Result};

/// Capacity of the frame channel between device and handle
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// Capture device boundary
///
/// `open` starts delivering frames into the returned receiver; `close`
/// stops delivery and must be idempotent.
pub trait CaptureDevice: Send + Sync + 'static {
    /// Start capturing; returns the frame stream
    fn open(&self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing (idempotent)
    fn close(&self);

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Device fed by an external source (WebSocket audio, tests)
///
/// While open, frames pushed through [`ChannelDevice::feed`] flow to the
/// current handle; while closed, fed frames are dropped.
pub struct ChannelDevice {
    sender: parking_lot::Mutex<Option<mpsc::Sender<AudioFrame>>>,
}

impl ChannelDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sender: parking_lot::Mutex::new(None),
        })
    }

    /// Push a frame into the open capture stream
    ///
    /// Returns false if no capture is open or the stream is congested; the
    /// frame is dropped in that case.
    pub fn feed(&self, frame: AudioFrame) -> bool {
        let guard = self.sender.lock();
        match guard.as_ref() {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Whether a capture cycle currently holds this device
    pub fn is_open(&self) -> bool {
        self.sender.lock().is_some()
    }
}

impl CaptureDevice for ChannelDevice {
    fn open(&self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        *self.sender.lock() = Some(tx);
        Ok(rx)
    }

    fn close(&self) {
        self.sender.lock().take();
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Device that always refuses acquisition, as a denied-permission platform
/// would. Useful for exercising the PermissionError path.
pub struct DeniedDevice;

impl CaptureDevice for DeniedDevice {
    fn open(&self) -> Result<mpsc::Receiver<AudioFrame>> {
        Err(Error::Permission("user denied microphone access".into()))
    }

    fn close(&self) {}

    fn name(&self) -> &str {
        "denied"
    }
}

/// Owns the capture device lifecycle for one session
pub struct AudioCapture {
    device: Arc<dyn CaptureDevice>,
    /// Single permit guaranteeing exclusive device ownership
    slot: Arc<Semaphore>,
}

impl AudioCapture {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquire the device, waiting for any previous holder to release it
    ///
    /// Fails with `Error::Permission` or `Error::Device` from the
    /// underlying device; the exclusivity permit is returned in that case.
    pub async fn acquire(&self) -> Result<CaptureHandle> {
        let permit = self
            .slot
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Device("capture slot closed".into()))?;

        let frames = self.device.open()?;
        tracing::debug!(device = self.device.name(), "capture acquired");

        Ok(CaptureHandle {
            frames,
            device: Arc::clone(&self.device),
            released: AtomicBool::new(false),
            _permit: permit,
        })
    }

    pub fn device(&self) -> &Arc<dyn CaptureDevice> {
        &self.device
    }
}

/// Live capture for one listening cycle
///
/// Releasing (or dropping) the handle closes the device and frees the
/// exclusivity permit, allowing the next acquisition to proceed.
pub struct CaptureHandle {
    frames: mpsc::Receiver<AudioFrame>,
    device: Arc<dyn CaptureDevice>,
    released: AtomicBool,
    _permit: OwnedSemaphorePermit,
}

impl CaptureHandle {
    /// Next captured frame; `None` once the device closed
    pub async fn next_frame(&mut self) -> Option<AudioFrame> {
        self.frames.recv().await
    }

    /// Stop capture (idempotent)
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.device.close();
            tracing::debug!(device = self.device.name(), "capture released");
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("device", &self.device.name())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
