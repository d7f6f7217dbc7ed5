//! Portrait intake: validation, preview lifecycle, and the submission gate.
//!
//! ```text
//!   drop zone ─┐
//!              ├─► IntakeEvent ─► accept_file ─► UploadedImage (+ preview)
//!   picker ────┘                      │
//!                                     └─► Measurement ──(blocking pool)──► apply_measurement
//! ```
//!
//! ## Generations
//!
//! Every accept, clear, or submit bumps a monotonically increasing generation
//! counter. A [`Measurement`] remembers the generation it was issued for, and
//! [`ImageIntake::apply_measurement`] discards results whose generation no
//! longer matches the current upload. A slow decode of a replaced photo can
//! therefore never attach its dimensions or advisory to the newer one.
//!
//! ## Preview resources
//!
//! Accepting a file registers a transient preview in the [`PreviewRegistry`].
//! The [`PreviewHandle`] is released exactly once: when the measurement for
//! its upload is applied, or when the upload is replaced, cleared, or
//! submitted. `release` consumes the handle, and dropping an unreleased
//! handle releases it, so neither double release nor a leak can be written.
//! Callers that need to keep rendering after measurement use
//! [`UploadedImage::bytes`], which is independent of the preview.

use crate::config::IntakeConfig;
use crate::imaging::{BackendError, Dimensions, ImageBackend};
use crate::types::{FaceShape, HairLength};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Minimum width below which a portrait gets a low-resolution advisory.
pub const MIN_WIDTH: u32 = 800;
/// Minimum height below which a portrait gets a low-resolution advisory.
pub const MIN_HEIGHT: u32 = 1000;

/// A file offered to the intake, from either the picker or a drop.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    /// Declared media type, e.g. `image/jpeg`. Not sniffed.
    pub media_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, media_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            media_type,
            bytes: bytes.into(),
        })
    }

    fn is_image(&self) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image/"))
    }
}

/// Why a candidate was not accepted. Either way the intake ends up cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectedReason {
    NoFileGiven,
    NotAnImage { media_type: Option<String> },
}

impl fmt::Display for RejectedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectedReason::NoFileGiven => write!(f, "no file given"),
            RejectedReason::NotAnImage { media_type: Some(t) } => {
                write!(f, "not an image ({t})")
            }
            RejectedReason::NotAnImage { media_type: None } => {
                write!(f, "not an image (unknown type)")
            }
        }
    }
}

/// Non-blocking notice shown next to the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    LowResolution(Dimensions),
    OversizeFile { size: u64, limit: u64 },
    UnlistedType { media_type: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::LowResolution(dims) => write!(
                f,
                "Low resolution ({dims}). For best results, use an image at least {MIN_WIDTH}x{MIN_HEIGHT}px."
            ),
            Advisory::OversizeFile { size, limit } => write!(
                f,
                "File is {:.1}MB; uploads up to {:.0}MB are recommended.",
                *size as f64 / (1024.0 * 1024.0),
                *limit as f64 / (1024.0 * 1024.0)
            ),
            Advisory::UnlistedType { media_type } => {
                write!(f, "{media_type} may not be supported; PNG, JPG or WEBP work best.")
            }
        }
    }
}

/// Low-resolution check for portraits: advises iff `width < 800 || height < 1000`.
pub fn evaluate_resolution(width: u32, height: u32) -> Option<Advisory> {
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        Some(Advisory::LowResolution(Dimensions { width, height }))
    } else {
        None
    }
}

/// The submission gate: a file must be accepted and consent given.
pub fn is_submittable(has_file: bool, consent: bool) -> bool {
    has_file && consent
}

// ============================================================================
// Preview resources
// ============================================================================

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    live: HashMap<u64, Arc<[u8]>>,
}

/// Session-wide table of live preview resources.
///
/// Cloning shares the table.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, bytes: Arc<[u8]>) -> PreviewHandle {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.live.insert(id, bytes);
        PreviewHandle {
            id,
            registry: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Number of previews acquired and not yet released.
    pub fn live_count(&self) -> usize {
        lock(&self.inner).live.len()
    }

    pub fn is_live(&self, id: u64) -> bool {
        lock(&self.inner).live.contains_key(&id)
    }
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    // A panic while holding the lock cannot leave the map half-updated.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive owner of one preview resource.
pub struct PreviewHandle {
    id: u64,
    registry: Arc<Mutex<RegistryInner>>,
    released: bool,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bytes behind the preview.
    pub fn resolve(&self) -> Option<Arc<[u8]>> {
        lock(&self.registry).live.get(&self.id).cloned()
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            lock(&self.registry).live.remove(&self.id);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("id", &self.id).finish()
    }
}

// ============================================================================
// Uploaded image and measurement
// ============================================================================

/// The currently accepted portrait.
#[derive(Debug)]
pub struct UploadedImage {
    generation: u64,
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
    preview: Option<PreviewHandle>,
    dimensions: Option<Dimensions>,
    advisories: Vec<Advisory>,
}

impl UploadedImage {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Long-lived render reference, independent of the transient preview.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// The transient preview, until measurement releases it.
    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    /// `None` until the measurement for this upload has been applied.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    fn release_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            debug!(generation = self.generation, preview = preview.id(), "releasing preview");
            preview.release();
        }
    }
}

/// Dimension decode for one accepted upload.
pub struct Measurement {
    generation: u64,
    bytes: Arc<[u8]>,
    backend: Arc<dyn ImageBackend>,
}

/// Outcome of a [`Measurement`], to be handed back to the intake.
#[derive(Debug)]
pub struct MeasurementResult {
    pub generation: u64,
    pub outcome: Result<Dimensions, BackendError>,
}

impl Measurement {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decode on the calling thread.
    pub fn run_blocking(self) -> MeasurementResult {
        MeasurementResult {
            generation: self.generation,
            outcome: self.backend.identify(&self.bytes),
        }
    }

    /// Decode on tokio's blocking pool.
    pub async fn run(self) -> MeasurementResult {
        let generation = self.generation;
        match tokio::task::spawn_blocking(move || self.run_blocking()).await {
            Ok(result) => result,
            Err(e) => MeasurementResult {
                generation,
                outcome: Err(BackendError::DecodeFailed(format!(
                    "measurement task failed: {e}"
                ))),
            },
        }
    }
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measurement")
            .field("generation", &self.generation)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What [`ImageIntake::apply_measurement`] did with a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasurementOutcome {
    /// Dimensions recorded; carries the resolution advisory, if any.
    Applied(Option<Advisory>),
    /// The upload it was measured for is gone; nothing changed.
    Stale,
    /// Decode failed; preview released, no dimensions.
    Failed,
}

// ============================================================================
// Intake
// ============================================================================

/// Both entry paths into the intake.
#[derive(Debug, Clone)]
pub enum IntakeEvent {
    DragOver,
    DragLeave,
    /// Dropped files; only the first one is considered.
    Drop(Vec<Candidate>),
    /// File picker selection; `None` when the picker was dismissed.
    Pick(Option<Candidate>),
}

/// Everything the generation collaborator needs for one request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub name: String,
    pub media_type: String,
    pub image: Arc<[u8]>,
    pub face_shape: FaceShape,
    pub hair_length: HairLength,
}

/// Upload form state for one session.
pub struct ImageIntake {
    backend: Arc<dyn ImageBackend>,
    previews: PreviewRegistry,
    limits: IntakeConfig,
    generation: u64,
    current: Option<UploadedImage>,
    consent: bool,
    face_shape: FaceShape,
    hair_length: HairLength,
    drag_over: bool,
}

impl ImageIntake {
    pub fn new(backend: Arc<dyn ImageBackend>, limits: IntakeConfig) -> Self {
        Self {
            backend,
            previews: PreviewRegistry::new(),
            limits,
            generation: 0,
            current: None,
            consent: false,
            face_shape: FaceShape::default(),
            hair_length: HairLength::default(),
            drag_over: false,
        }
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn current(&self) -> Option<&UploadedImage> {
        self.current.as_ref()
    }

    pub fn is_drag_over(&self) -> bool {
        self.drag_over
    }

    pub fn consent(&self) -> bool {
        self.consent
    }

    pub fn set_consent(&mut self, consent: bool) {
        self.consent = consent;
    }

    pub fn face_shape(&self) -> FaceShape {
        self.face_shape
    }

    pub fn set_face_shape(&mut self, face_shape: FaceShape) {
        self.face_shape = face_shape;
    }

    pub fn hair_length(&self) -> HairLength {
        self.hair_length
    }

    pub fn set_hair_length(&mut self, hair_length: HairLength) {
        self.hair_length = hair_length;
    }

    /// Route a drop-zone or picker event. Returns `None` for events that do
    /// not offer a file (drag highlight changes, empty drops).
    pub fn handle(&mut self, event: IntakeEvent) -> Option<Result<Measurement, RejectedReason>> {
        match event {
            IntakeEvent::DragOver => {
                self.drag_over = true;
                None
            }
            IntakeEvent::DragLeave => {
                self.drag_over = false;
                None
            }
            IntakeEvent::Drop(files) => {
                self.drag_over = false;
                let first = files.into_iter().next()?;
                Some(self.accept_file(Some(first)))
            }
            IntakeEvent::Pick(candidate) => Some(self.accept_file(candidate)),
        }
    }

    /// Validate a candidate and make it the current upload.
    ///
    /// Any previous upload is discarded first, whatever the outcome. On
    /// acceptance the returned [`Measurement`] must be run and handed back to
    /// [`apply_measurement`](Self::apply_measurement) to fill in dimensions.
    pub fn accept_file(
        &mut self,
        candidate: Option<Candidate>,
    ) -> Result<Measurement, RejectedReason> {
        self.discard_current();

        let Some(candidate) = candidate else {
            debug!("intake cleared: no file given");
            return Err(RejectedReason::NoFileGiven);
        };
        if !candidate.is_image() {
            debug!(name = %candidate.name, media_type = ?candidate.media_type, "intake cleared: not an image");
            return Err(RejectedReason::NotAnImage {
                media_type: candidate.media_type,
            });
        }

        let media_type = candidate
            .media_type
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let advisories = self.form_advisories(&media_type, candidate.bytes.len() as u64);
        let preview = self.previews.acquire(Arc::clone(&candidate.bytes));

        info!(
            generation = self.generation,
            name = %candidate.name,
            media_type = %media_type,
            bytes = candidate.bytes.len(),
            "accepted upload"
        );

        let measurement = Measurement {
            generation: self.generation,
            bytes: Arc::clone(&candidate.bytes),
            backend: Arc::clone(&self.backend),
        };
        self.current = Some(UploadedImage {
            generation: self.generation,
            name: candidate.name,
            media_type,
            bytes: candidate.bytes,
            preview: Some(preview),
            dimensions: None,
            advisories,
        });
        Ok(measurement)
    }

    /// Record a finished measurement if it still belongs to the current upload.
    pub fn apply_measurement(&mut self, result: MeasurementResult) -> MeasurementOutcome {
        let Some(current) = self
            .current
            .as_mut()
            .filter(|c| c.generation == result.generation)
        else {
            debug!(
                generation = result.generation,
                current = self.generation,
                "discarding stale measurement"
            );
            return MeasurementOutcome::Stale;
        };

        current.release_preview();
        match result.outcome {
            Ok(dims) => {
                current.dimensions = Some(dims);
                let advisory = evaluate_resolution(dims.width, dims.height);
                current
                    .advisories
                    .retain(|a| !matches!(a, Advisory::LowResolution(_)));
                if let Some(advisory) = &advisory {
                    current.advisories.push(advisory.clone());
                }
                debug!(generation = result.generation, %dims, low_res = advisory.is_some(), "measured upload");
                MeasurementOutcome::Applied(advisory)
            }
            Err(e) => {
                warn!(generation = result.generation, error = %e, "could not measure upload");
                MeasurementOutcome::Failed
            }
        }
    }

    /// Accept a candidate and wait for its measurement.
    pub async fn accept_and_measure(
        &mut self,
        candidate: Option<Candidate>,
    ) -> Result<&UploadedImage, RejectedReason> {
        let measurement = self.accept_file(candidate)?;
        let result = measurement.run().await;
        self.apply_measurement(result);
        self.current.as_ref().ok_or(RejectedReason::NoFileGiven)
    }

    /// "Choose a different photo": drop the current upload.
    pub fn clear(&mut self) {
        self.discard_current();
    }

    pub fn is_submittable(&self) -> bool {
        is_submittable(self.current.is_some(), self.consent)
    }

    /// Hand the upload off for generation. The intake forgets it afterwards.
    ///
    /// Returns `None` (and changes nothing) unless [`is_submittable`](Self::is_submittable).
    pub fn submit(&mut self) -> Option<GenerationRequest> {
        if !self.is_submittable() {
            return None;
        }
        self.generation += 1;
        let mut upload = self.current.take()?;
        upload.release_preview();
        info!(
            name = %upload.name,
            face_shape = %self.face_shape,
            hair_length = %self.hair_length,
            "submitting upload for generation"
        );
        Some(GenerationRequest {
            name: upload.name,
            media_type: upload.media_type,
            image: upload.bytes,
            face_shape: self.face_shape,
            hair_length: self.hair_length,
        })
    }

    fn discard_current(&mut self) {
        self.generation += 1;
        if let Some(mut previous) = self.current.take() {
            previous.release_preview();
        }
    }

    fn form_advisories(&self, media_type: &str, size: u64) -> Vec<Advisory> {
        let mut advisories = Vec::new();
        if size > self.limits.max_upload_bytes {
            advisories.push(Advisory::OversizeFile {
                size,
                limit: self.limits.max_upload_bytes,
            });
        }
        if !self.limits.accepted_types.is_empty()
            && !self
                .limits
                .accepted_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(media_type))
        {
            advisories.push(Advisory::UnlistedType {
                media_type: media_type.to_string(),
            });
        }
        advisories
    }
}
