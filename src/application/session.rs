use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::{
    codec::{DetectionCodec, ResultImage},
    health::HealthProbe,
    ports::{DetectionTransportPort, HandleStorePort},
    resource_tracker::ResourceTracker,
};
use crate::domain::{
    detection::DetectionResult,
    errors::{DomainError, DomainResult},
    image::{HandleSlot, SelectedImage},
    session::{SessionSnapshot, SessionState, SkipReason, SubmitOutcome},
    settings::{ConfidenceThreshold, SessionSettings},
};

struct Inner {
    tracker: ResourceTracker,
    image: Option<SelectedImage>,
    result: Option<DetectionResult>,
    error: Option<String>,
    validation: Option<String>,
    threshold: ConfidenceThreshold,
    backend_online: Option<bool>,
    /// Sequence number of the most recently issued request.
    issued: u64,
    /// Set while the request with that sequence number is outstanding.
    in_flight: Option<u64>,
}

impl Inner {
    fn state(&self) -> SessionState {
        if self.in_flight.is_some() {
            SessionState::Submitting
        } else if self.error.is_some() {
            SessionState::Failed
        } else if self.result.is_some() {
            SessionState::Succeeded
        } else if self.image.is_some() {
            SessionState::FileSelected
        } else {
            SessionState::Idle
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            preview_handle: self.tracker.get(HandleSlot::Preview).cloned(),
            result_handle: self.tracker.get(HandleSlot::Result).cloned(),
            result: self.result.clone(),
            error_message: self.error.clone(),
            validation_message: self.validation.clone(),
            threshold: self.threshold,
            backend_online: self.backend_online,
        }
    }

    fn clear_result(&mut self) {
        self.tracker.release(HandleSlot::Result);
        self.result = None;
        self.error = None;
    }

    fn fail(&mut self, err: &DomainError) {
        self.tracker.release(HandleSlot::Result);
        self.result = None;
        self.error = Some(err.to_string());
    }
}

/// Orchestrates select → submit → succeed/fail → reset for a single image.
///
/// Cloning is cheap and every clone drives the same session. Handlers never hold
/// the internal lock across the network await, so `reset` can run while a
/// submission is pending; the late response is then recognised by its sequence
/// number and dropped.
#[derive(Clone)]
pub struct DetectionSession {
    inner: Arc<Mutex<Inner>>,
    updates: Arc<watch::Sender<SessionSnapshot>>,
    codec: DetectionCodec,
    transport: Arc<dyn DetectionTransportPort>,
    probe: Option<HealthProbe>,
    max_upload_bytes: u64,
}

impl DetectionSession {
    pub fn new(
        codec: DetectionCodec,
        transport: Arc<dyn DetectionTransportPort>,
        store: Arc<dyn HandleStorePort>,
        settings: SessionSettings,
    ) -> Self {
        let inner = Inner {
            tracker: ResourceTracker::new(store),
            image: None,
            result: None,
            error: None,
            validation: None,
            threshold: settings.initial_threshold,
            backend_online: None,
            issued: 0,
            in_flight: None,
        };
        let (updates, _) = watch::channel(inner.snapshot());
        Self {
            inner: Arc::new(Mutex::new(inner)),
            updates: Arc::new(updates),
            codec,
            transport,
            probe: None,
            max_upload_bytes: settings.max_upload_bytes,
        }
    }

    pub fn with_health_probe(mut self, probe: HealthProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    /// Receives a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Runs the health probe once, if one is configured, and records the outcome.
    /// Without a probe the backend is assumed reachable and `None` is returned.
    pub async fn check_backend(&self) -> Option<bool> {
        let probe = self.probe.as_ref()?;
        let online = probe.probe().await.is_ok();
        let mut inner = self.lock();
        inner.backend_online = Some(online);
        self.publish(&inner);
        Some(online)
    }

    pub fn select_file(
        &self,
        bytes: Vec<u8>,
        media_type: &str,
        size: u64,
    ) -> DomainResult<SessionState> {
        self.select(SelectedImage::new(bytes, media_type, size, self.max_upload_bytes))
    }

    pub fn select_named_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        media_type: &str,
        size: u64,
    ) -> DomainResult<SessionState> {
        self.select(
            SelectedImage::new(bytes, media_type, size, self.max_upload_bytes)
                .map(|img| img.with_file_name(file_name)),
        )
    }

    /// A rejected file leaves the session untouched apart from `validation_message`.
    /// Calls made while a request is in flight are ignored.
    fn select(&self, candidate: DomainResult<SelectedImage>) -> DomainResult<SessionState> {
        let mut inner = self.lock();
        if inner.in_flight.is_some() {
            debug!("Ignoring file selection while a request is in flight");
            return Ok(SessionState::Submitting);
        }

        let image = match candidate {
            Ok(image) => image,
            Err(err) => {
                warn!("Rejected file: {err}");
                inner.validation = Some(err.to_string());
                self.publish(&inner);
                return Err(err);
            }
        };

        let installed = inner
            .tracker
            .set(HandleSlot::Preview, image.bytes(), image.media_type());
        inner.clear_result();
        inner.validation = None;

        match &installed {
            Ok(handle) => {
                info!(
                    file = image.file_name(),
                    media_type = image.media_type(),
                    size = image.size(),
                    preview = %handle.uri,
                    "Image selected"
                );
                inner.image = Some(image);
            }
            Err(err) => {
                // The previous preview is already gone, so the old selection goes with it.
                error!("Could not create preview handle: {err}");
                inner.image = None;
            }
        }
        let state = inner.state();
        self.publish(&inner);
        installed.map(|_| state)
    }

    pub fn set_threshold(&self, value: f32) -> ConfidenceThreshold {
        let mut inner = self.lock();
        inner.threshold = ConfidenceThreshold::new(value);
        debug!(threshold = inner.threshold.value(), "Threshold updated");
        let threshold = inner.threshold;
        self.publish(&inner);
        threshold
    }

    /// Sends the selected image once. Never fails: every problem ends up in the
    /// session's `error_message`, and calls that cannot submit are skipped.
    pub async fn submit(&self) -> SubmitOutcome {
        let (seq, request, original) = {
            let mut inner = self.lock();
            if inner.in_flight.is_some() {
                return SubmitOutcome::Skipped(SkipReason::AlreadySubmitting);
            }
            if inner.backend_online == Some(false) {
                return SubmitOutcome::Skipped(SkipReason::BackendOffline);
            }
            let Some(image) = inner.image.clone() else {
                return SubmitOutcome::Skipped(SkipReason::NoFileSelected);
            };

            inner.issued += 1;
            let seq = inner.issued;
            inner.in_flight = Some(seq);
            inner.error = None;
            let request = self.codec.encode_request(&image, inner.threshold);
            info!(
                seq,
                file = image.file_name(),
                threshold = inner.threshold.value(),
                path = request.path,
                "Submitting image for detection"
            );
            self.publish(&inner);
            (seq, request, image)
        };

        let pending = PendingRequest {
            session: self,
            seq,
            armed: true,
        };
        let decoded = match self.transport.send(request).await {
            Ok(raw) => self.codec.decode_response(&raw),
            Err(err) => Err(err),
        };
        pending.disarm();

        let mut inner = self.lock();
        if inner.in_flight != Some(seq) || inner.issued != seq {
            debug!(seq, latest = inner.issued, "Dropping stale detection response");
            return SubmitOutcome::Discarded;
        }
        inner.in_flight = None;

        match decoded {
            Ok(decoded) => {
                let installed = match &decoded.image {
                    ResultImage::Annotated { bytes, media_type } => {
                        inner.tracker.set(HandleSlot::Result, bytes, media_type)
                    }
                    ResultImage::Original => inner.tracker.set(
                        HandleSlot::Result,
                        original.bytes(),
                        original.media_type(),
                    ),
                };
                match installed {
                    Ok(_) => {
                        info!(seq, "Detection finished: {}", decoded.result.summary());
                        inner.error = None;
                        inner.result = Some(decoded.result);
                    }
                    Err(err) => {
                        error!(seq, "Could not create result handle: {err}");
                        inner.fail(&err);
                    }
                }
            }
            Err(err) => {
                warn!(seq, "Detection request failed: {err}");
                inner.fail(&err);
            }
        }

        let state = inner.state();
        self.publish(&inner);
        SubmitOutcome::Applied(state)
    }

    /// Back to `Idle`. Keeps the threshold and the last known backend status.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if let Some(seq) = inner.in_flight.take() {
            debug!(seq, "Reset supersedes in-flight request");
        }
        inner.tracker.release_all();
        inner.image = None;
        inner.result = None;
        inner.error = None;
        inner.validation = None;
        self.publish(&inner);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.snapshot());
    }
}

/// Clears `in_flight` when a `submit` future is dropped before its response
/// arrives, so a cancelled call cannot leave the session stuck in `Submitting`.
struct PendingRequest<'a> {
    session: &'a DetectionSession,
    seq: u64,
    armed: bool,
}

impl PendingRequest<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.session.lock();
        if inner.in_flight == Some(self.seq) {
            debug!(seq = self.seq, "Submission cancelled before a response arrived");
            inner.in_flight = None;
            self.session.publish(&inner);
        }
    }
}
