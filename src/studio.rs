use tracing::{error, info};

use crate::capture::CaptureError;
use crate::gallery::{GeneratedResult, ResultGallery};
use crate::generation::{
    build_from_session, GenerationClient, GenerationError, GenerationTransport, PreparedRequest,
    ValidationError,
};
use crate::media::EncodedImage;
use crate::session::SessionState;
use crate::styles::StyleDefinition;

pub const FACE_REQUIRED_MESSAGE: &str = "please upload a face photo first";
pub const GENERATION_FAILED_MESSAGE: &str = "generation failed, please retry later";
pub const CAMERA_UNAVAILABLE_MESSAGE: &str =
    "cannot access the camera, please check permission settings";
pub const UNREADABLE_IMAGE_MESSAGE: &str = "could not read that image, please choose another file";

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a portrait is already being generated")]
    GenerationInProgress,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// The message shown for a failed capture. Device problems get the camera notice;
/// everything else means the file could not be used.
pub fn capture_notice(err: &CaptureError) -> &'static str {
    match err {
        CaptureError::Device(_) => CAMERA_UNAVAILABLE_MESSAGE,
        CaptureError::Read { .. } | CaptureError::Decode(_) | CaptureError::Media(_) => {
            UNREADABLE_IMAGE_MESSAGE
        }
    }
}

/// One user's studio: inputs, results, the error banner, and the single
/// in-flight generation slot.
#[derive(Debug)]
pub struct PortraitStudio {
    session: SessionState,
    gallery: ResultGallery,
    error: Option<&'static str>,
    generating: bool,
    aspect_ratio: String,
}

impl PortraitStudio {
    pub fn new(aspect_ratio: impl Into<String>) -> Self {
        Self {
            session: SessionState::new(),
            gallery: ResultGallery::new(),
            error: None,
            generating: false,
            aspect_ratio: aspect_ratio.into(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn gallery(&self) -> &ResultGallery {
        &self.gallery
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn can_submit(&self) -> bool {
        !self.generating && self.session.face_image().is_some()
    }

    /// Validates the session and claims the in-flight slot. The caller must pass
    /// the outcome of the call to [`finish_generation`](Self::finish_generation).
    pub fn begin_generation(&mut self) -> Result<PreparedRequest, StudioError> {
        if self.generating {
            return Err(StudioError::GenerationInProgress);
        }

        let prepared = match build_from_session(&self.session, &self.aspect_ratio) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.error = Some(FACE_REQUIRED_MESSAGE);
                return Err(err.into());
            }
        };

        self.error = None;
        self.generating = true;
        info!(
            style = prepared.style.id,
            has_reference = self.session.reference_image().is_some(),
            "Starting portrait generation"
        );
        Ok(prepared)
    }

    pub fn finish_generation(
        &mut self,
        style: &StyleDefinition,
        outcome: Result<EncodedImage, GenerationError>,
    ) -> Result<&GeneratedResult, StudioError> {
        self.generating = false;
        match outcome {
            Ok(image) => Ok(self.gallery.record(image, style.display_name)),
            Err(err) => {
                error!(kind = err.kind(), style = style.id, "Portrait generation failed: {err}");
                self.error = Some(GENERATION_FAILED_MESSAGE);
                Err(err.into())
            }
        }
    }

    pub async fn generate<T: GenerationTransport>(
        &mut self,
        client: &GenerationClient<T>,
    ) -> Result<&GeneratedResult, StudioError> {
        let prepared = self.begin_generation()?;
        let outcome = client.submit(&prepared.request).await;
        self.finish_generation(prepared.style, outcome)
    }
}
