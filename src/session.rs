//! One studio session: upload → generating → results → start over.
//!
//! Nothing outlives the session. The uploaded portrait is dropped from the
//! intake the moment it is submitted, and the [`LookCollection`] lives only
//! until [`Session::start_over`].

use crate::generation::{GenerationError, StyleGenerator};
use crate::intake::ImageIntake;
use crate::types::LookCollection;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Message shown when the generation service fails.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate hairstyles. Please try again.";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("a photo and consent are required before generating")]
    NotSubmittable,
    #[error("generation is only possible from the upload stage")]
    WrongStage,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone)]
pub enum Stage {
    Upload,
    Generating,
    Results(Arc<LookCollection>),
}

pub struct Session {
    intake: ImageIntake,
    stage: Stage,
    error_message: Option<&'static str>,
}

impl Session {
    pub fn new(intake: ImageIntake) -> Self {
        Self {
            intake,
            stage: Stage::Upload,
            error_message: None,
        }
    }

    pub fn intake(&self) -> &ImageIntake {
        &self.intake
    }

    pub fn intake_mut(&mut self) -> &mut ImageIntake {
        &mut self.intake
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// User-facing message from the last failed generation, if any.
    pub fn error_message(&self) -> Option<&'static str> {
        self.error_message
    }

    pub fn results(&self) -> Option<&Arc<LookCollection>> {
        match &self.stage {
            Stage::Results(collection) => Some(collection),
            _ => None,
        }
    }

    /// Submit the current upload and wait for the generated looks.
    ///
    /// On failure the session returns to the upload stage with an error
    /// message; the portrait has already been handed off and must be chosen
    /// again.
    pub async fn generate(
        &mut self,
        generator: &dyn StyleGenerator,
    ) -> Result<Arc<LookCollection>, SessionError> {
        if !matches!(self.stage, Stage::Upload) {
            return Err(SessionError::WrongStage);
        }
        let request = self.intake.submit().ok_or(SessionError::NotSubmittable)?;

        self.error_message = None;
        self.stage = Stage::Generating;
        match generator.generate(&request).await {
            Ok(collection) => {
                let collection = Arc::new(collection);
                info!(looks = collection.len(), "session has results");
                self.stage = Stage::Results(Arc::clone(&collection));
                Ok(collection)
            }
            Err(e) => {
                error!(error = %e, "generation failed");
                self.stage = Stage::Upload;
                self.error_message = Some(GENERATION_FAILED_MESSAGE);
                Err(e.into())
            }
        }
    }

    /// Discard results and any pending upload, back to an empty form.
    pub fn start_over(&mut self) {
        self.intake.clear();
        self.intake.set_consent(false);
        self.stage = Stage::Upload;
        self.error_message = None;
    }
}
