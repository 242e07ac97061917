//! Session controller
//!
//! [`Engine`] owns the platform backend and at most one capture session.
//! Starting and closing serialize through a transition lock; frame pulls
//! only take the short session lock and never wait on hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::capture::CaptureSession;
use crate::catalog;
use crate::config::EngineConfig;
use crate::error::{IrviewError, Result};
use crate::exchange::FrameExchange;
use crate::negotiate;
use crate::platform::{self, Platform};
use crate::types::{
    DeviceDescriptor, DeviceEvent, DeviceStatus, FormatCandidate, FrameNotice, FrameSnapshot,
    SessionId, SessionState, SessionStats,
};

/// The capture engine
pub struct Engine {
    platform: Arc<dyn Platform>,
    config: EngineConfig,
    /// Held across a whole start or close
    transition: Mutex<()>,
    session: Mutex<Option<CaptureSession>>,
    opening: AtomicBool,
    notices: Arc<watch::Sender<FrameNotice>>,
    device_changes: AtomicU64,
}

impl Engine {
    /// Create an engine over a platform backend
    pub fn new(platform: Arc<dyn Platform>, config: EngineConfig) -> Self {
        info!("Capture engine using the {} backend", platform.name());
        let (notices, _) = watch::channel(FrameNotice::default());
        Self {
            platform,
            config,
            transition: Mutex::new(()),
            session: Mutex::new(None),
            opening: AtomicBool::new(false),
            notices: Arc::new(notices),
            device_changes: AtomicU64::new(0),
        }
    }

    /// Create an engine over this build's default backend
    pub fn with_default_platform(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(platform::default_platform()?, config))
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Attached devices whose name could be read, in enumeration order
    pub fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        catalog::enumerate(self.platform.as_ref())
    }

    /// Connectivity of one device index; never fails
    pub fn device_status(&self, index: usize) -> DeviceStatus {
        catalog::status(self.platform.as_ref(), index)
    }

    /// Unique resolutions of device `index`, empty on any failure
    pub fn supported_resolutions(&self, index: usize) -> Vec<FormatCandidate> {
        match negotiate::list_resolutions(
            self.platform.as_ref(),
            index,
            self.config.fallback_frame_rate,
        ) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Could not list resolutions of device {}: {}", index, e);
                Vec::new()
            }
        }
    }

    /// Open device `index` and start acquiring frames
    ///
    /// Any open session is closed first, even if the new open then fails.
    pub fn start_preview(&self, index: usize) -> Result<SessionId> {
        let _transition = self.transition.lock();
        self.close_locked();

        self.opening.store(true, Ordering::SeqCst);
        let negotiated = negotiate::negotiate(
            self.platform.as_ref(),
            index,
            &self.config.reader_config(),
        );
        let started = negotiated.and_then(|negotiated| {
            CaptureSession::start(SessionId::next(), index, negotiated, self.notices.clone())
        });
        self.opening.store(false, Ordering::SeqCst);

        let session = started.inspect_err(|e| warn!("Preview on device {} failed: {}", index, e))?;
        let id = session.id();
        *self.session.lock() = Some(session);
        Ok(id)
    }

    /// Stop the current session and release the device; idempotent
    pub fn close_device(&self) {
        let _transition = self.transition.lock();
        self.close_locked();
    }

    /// Caller must hold the transition lock
    fn close_locked(&self) {
        // Take the session out first so pulls stop seeing it before the join
        let session = self.session.lock().take();
        if let Some(mut session) = session {
            let id = session.id();
            session.stop();
            drop(session);
            self.notices.send_replace(FrameNotice::default());
            info!("Closed {}", id);
        } else {
            debug!("Close requested with no open session");
        }
    }

    /// Latest frame of the current session
    pub fn capture_photo(&self) -> Result<FrameSnapshot> {
        self.current_exchange()
            .and_then(|(_, exchange)| exchange.snapshot_latest())
            .ok_or(IrviewError::NoFrameAvailable)
    }

    /// Renderer pull
    ///
    /// The requested size is advisory; frames are returned at their
    /// negotiated size. `None` when `session` is not the current session or
    /// no frame has arrived yet.
    pub fn fetch_frame(
        &self,
        session: SessionId,
        requested_width: u32,
        requested_height: u32,
    ) -> Option<FrameSnapshot> {
        trace!(
            "Pull for {} at {}x{}",
            session, requested_width, requested_height
        );
        let (current, exchange) = self.current_exchange()?;
        if current != session {
            return None;
        }
        exchange.snapshot_latest()
    }

    fn current_exchange(&self) -> Option<(SessionId, Arc<FrameExchange>)> {
        self.session
            .lock()
            .as_ref()
            .map(|session| (session.id(), session.exchange()))
    }

    /// Lifecycle state
    pub fn state(&self) -> SessionState {
        if self.opening.load(Ordering::SeqCst) {
            return SessionState::Opening;
        }
        match self.session.lock().as_ref() {
            Some(session) if session.is_running() => SessionState::Running,
            _ => SessionState::Closed,
        }
    }

    /// ID of the open session
    pub fn active_session(&self) -> Option<SessionId> {
        self.session.lock().as_ref().map(|session| session.id())
    }

    /// Counters of the open session
    pub fn stats(&self) -> Option<SessionStats> {
        self.session.lock().as_ref().map(|session| session.stats())
    }

    /// Watch "new frame" notices
    ///
    /// The value resets to the default notice when a session closes.
    pub fn subscribe_frames(&self) -> watch::Receiver<FrameNotice> {
        self.notices.subscribe()
    }

    /// Record an OS device arrival or removal
    ///
    /// The next enumeration or status query reflects the change; an open
    /// session is left alone.
    pub fn notify_device_change(&self, event: DeviceEvent) {
        let count = self.device_changes.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Device change #{}: {:?}", count, event);
    }

    /// Number of device-change notices received
    pub fn device_change_count(&self) -> u64 {
        self.device_changes.load(Ordering::Relaxed)
    }

    /// Close any session before the engine goes away
    pub fn shutdown(&self) {
        info!("Shutting down capture engine");
        self.close_device();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // The platform field is dropped after this, once the loop is joined
        self.close_locked();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("platform", &self.platform.name())
            .field("config", &self.config)
            .field("session", &self.active_session())
            .finish_non_exhaustive()
    }
}
