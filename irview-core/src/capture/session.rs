//! Capture session and its acquisition loop
//!
//! A session owns one negotiated reader, moved onto a dedicated thread that
//! blocks on hardware reads and publishes each decoded frame into the
//! session's [`FrameExchange`]. Stopping clears the running flag and joins
//! the thread; the reader and device are dropped as the thread exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use super::copy::copy_rows;
use crate::error::{IrviewError, Result};
use crate::exchange::{FrameExchange, frame_len};
use crate::negotiate::NegotiatedReader;
use crate::platform::SourceReader;
use crate::types::{FrameNotice, SessionId, SessionStats};

/// Shared state between the loop thread and the session handle
#[derive(Debug, Default)]
struct SharedState {
    /// Cleared by `stop()`; checked before every read
    running: AtomicBool,
    frames_acquired: AtomicU64,
    frames_skipped: AtomicU64,
}

/// An open capture session
pub struct CaptureSession {
    id: SessionId,
    device_index: usize,
    width: u32,
    height: u32,
    exchange: Arc<FrameExchange>,
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Start the acquisition loop for a negotiated reader
    ///
    /// Frame notices are sent on `notices` after every publish.
    pub fn start(
        id: SessionId,
        device_index: usize,
        negotiated: NegotiatedReader,
        notices: Arc<watch::Sender<FrameNotice>>,
    ) -> Result<Self> {
        let NegotiatedReader {
            reader,
            width,
            height,
        } = negotiated;

        let exchange = Arc::new(FrameExchange::new());
        let shared = Arc::new(SharedState::default());
        shared.running.store(true, Ordering::SeqCst);

        let ctx = LoopContext {
            id,
            width,
            height,
            exchange: exchange.clone(),
            shared: shared.clone(),
            notices,
        };

        let worker = std::thread::Builder::new()
            .name("irview-capture".to_string())
            .spawn(move || acquisition_loop(reader, ctx))
            .map_err(|e| {
                shared.running.store(false, Ordering::SeqCst);
                IrviewError::open_device(format!("Failed to spawn acquisition thread: {}", e))
            })?;

        info!("{} running on device {} at {}x{}", id, device_index, width, height);

        Ok(Self {
            id,
            device_index,
            width,
            height,
            exchange,
            shared,
            worker: Some(worker),
        })
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Device index the session was opened with
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// Negotiated frame size
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The session's frame exchange
    pub fn exchange(&self) -> Arc<FrameExchange> {
        self.exchange.clone()
    }

    /// Whether the acquisition loop is still running
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
            && self
                .worker
                .as_ref()
                .map(|t| !t.is_finished())
                .unwrap_or(false)
    }

    /// Acquisition counters
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session: self.id,
            device_index: self.device_index,
            width: self.width,
            height: self.height,
            frames_acquired: self.shared.frames_acquired.load(Ordering::Relaxed),
            frames_skipped: self.shared.frames_skipped.load(Ordering::Relaxed),
            running: self.is_running(),
        }
    }

    /// Stop the loop and wait for it to release the device
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            debug!("Joining acquisition thread for {}", self.id);
            if worker.join().is_err() {
                error!("Acquisition thread for {} panicked", self.id);
            }
            info!(
                "{} stopped after {} frame(s)",
                self.id,
                self.shared.frames_acquired.load(Ordering::Relaxed)
            );
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("device_index", &self.device_index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Everything the loop thread needs besides the reader
struct LoopContext {
    id: SessionId,
    width: u32,
    height: u32,
    exchange: Arc<FrameExchange>,
    shared: Arc<SharedState>,
    notices: Arc<watch::Sender<FrameNotice>>,
}

/// Row pitch of a tightly packed BGRA frame, `None` if it overflows `i32`
fn tight_pitch(width: u32) -> Option<i32> {
    (width as usize)
        .checked_mul(4)
        .and_then(|bytes| i32::try_from(bytes).ok())
}

/// Runs on the acquisition thread until stopped or the reader fails
fn acquisition_loop(mut reader: Box<dyn SourceReader>, ctx: LoopContext) {
    let LoopContext {
        id,
        width,
        height,
        exchange,
        shared,
        notices,
    } = ctx;

    let expected = frame_len(width, height);
    let fallback_pitch = tight_pitch(width);
    let mut scratch: Vec<u8> = Vec::with_capacity(expected);

    while shared.running.load(Ordering::SeqCst) {
        let sample = match reader.read_sample() {
            Ok(Some(sample)) => sample,
            Ok(None) => continue,
            Err(e) => {
                warn!("{} acquisition fault, loop ending: {}", id, e);
                break;
            }
        };

        let sequence = sample.sequence();
        let buffer = sample.into_contiguous();
        let (src, pitch) = match (buffer.lock_2d(), fallback_pitch) {
            (Some(lines), _) => (lines.data, lines.pitch),
            (None, Some(pitch)) => (buffer.lock(), pitch),
            (None, None) => {
                shared.frames_skipped.fetch_add(1, Ordering::Relaxed);
                warn!("{} skipped sample {}: {} pixel rows overflow a pitch", id, sequence, width);
                continue;
            }
        };

        if scratch.len() != expected {
            trace!("Resizing frame buffer {} -> {} bytes", scratch.len(), expected);
            scratch.resize(expected, 0);
        }

        if let Err(e) = copy_rows(src, pitch, width, height, &mut scratch) {
            let skipped = shared.frames_skipped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("{} skipped sample {} ({} so far): {}", id, sequence, skipped, e);
            continue;
        }
        drop(buffer);

        let generation = match exchange.publish_swap(&mut scratch, width, height) {
            Ok(generation) => generation,
            Err(e) => {
                shared.frames_skipped.fetch_add(1, Ordering::Relaxed);
                warn!("{} could not publish sample {}: {}", id, sequence, e);
                continue;
            }
        };

        let count = shared.frames_acquired.fetch_add(1, Ordering::Relaxed);
        if count % 60 == 0 {
            trace!("{} acquired {} frames", id, count + 1);
        }

        notices.send_replace(FrameNotice {
            session: Some(id),
            generation,
        });
    }

    shared.running.store(false, Ordering::SeqCst);
    drop(reader);
    debug!("{} released its reader", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Sample;
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    /// Reader replaying a fixed script, then idling or failing
    struct ScriptReader {
        frames: VecDeque<(Vec<u8>, Option<i32>)>,
        fail_when_done: bool,
    }

    impl SourceReader for ScriptReader {
        fn frame_size(&self) -> Result<(u32, u32)> {
            Ok((2, 2))
        }

        fn read_sample(&mut self) -> Result<Option<Sample<'_>>> {
            match self.frames.pop_front() {
                Some((data, Some(pitch))) => Ok(Some(Sample::single(data).with_pitch(pitch))),
                Some((data, None)) => Ok(Some(Sample::single(data))),
                None if self.fail_when_done => Err(IrviewError::acquisition("unplugged")),
                None => {
                    std::thread::sleep(Duration::from_millis(1));
                    Ok(None)
                }
            }
        }
    }

    fn start(frames: Vec<(Vec<u8>, Option<i32>)>, fail_when_done: bool) -> CaptureSession {
        let reader = ScriptReader {
            frames: frames.into(),
            fail_when_done,
        };
        let negotiated = NegotiatedReader {
            reader: Box::new(reader),
            width: 2,
            height: 2,
        };
        let (tx, _rx) = watch::channel(FrameNotice::default());
        CaptureSession::start(SessionId::next(), 0, negotiated, Arc::new(tx)).unwrap()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_publishes_padded_frames_tightly() {
        let mut padded = Vec::new();
        for row in 0..2u8 {
            padded.extend_from_slice(&[row; 8]);
            padded.extend_from_slice(&[0xEE; 4]);
        }
        let mut session = start(vec![(padded, Some(12))], false);
        let exchange = session.exchange();
        wait_until(|| exchange.generation() == 1);

        let snapshot = exchange.snapshot_latest().unwrap();
        assert_eq!(snapshot.data, [vec![0u8; 8], vec![1u8; 8]].concat());
        session.stop();
        assert!(!session.is_running());
    }

    #[test]
    fn test_flat_lock_assumes_tight_pitch() {
        let mut session = start(vec![(vec![5u8; 16], None)], false);
        let exchange = session.exchange();
        wait_until(|| exchange.generation() == 1);
        assert_eq!(exchange.snapshot_latest().unwrap().data, vec![5u8; 16]);
        session.stop();
    }

    #[test]
    fn test_tight_pitch_bounds() {
        assert_eq!(tight_pitch(2), Some(8));
        assert_eq!(tight_pitch(i32::MAX as u32 / 4), Some(i32::MAX - 3));
        assert_eq!(tight_pitch(i32::MAX as u32 / 4 + 1), None);
        assert_eq!(tight_pitch(u32::MAX), None);
    }

    #[test]
    fn test_short_sample_is_skipped() {
        let mut session = start(vec![(vec![1u8; 3], Some(8)), (vec![2u8; 16], Some(8))], false);
        let exchange = session.exchange();
        wait_until(|| exchange.generation() == 1);

        let stats = session.stats();
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.frames_acquired, 1);
        assert_eq!(exchange.snapshot_latest().unwrap().data, vec![2u8; 16]);
        session.stop();
    }

    #[test]
    fn test_read_failure_ends_loop_and_keeps_last_frame() {
        let session = start(vec![(vec![3u8; 16], Some(8))], true);
        wait_until(|| !session.is_running());
        assert_eq!(session.exchange().snapshot_latest().unwrap().data, vec![3u8; 16]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut session = start(Vec::new(), false);
        assert!(session.is_running());
        session.stop();
        session.stop();
        assert!(!session.is_running());
    }
}
