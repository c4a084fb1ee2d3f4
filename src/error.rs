// User-facing error types. The Display text of each variant is what ends up
// in the interaction state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Image size exceeds 4MB. Please upload a smaller image.")]
    TooLarge { size: u64 },

    #[error("Unsupported image type '{0}'. Please upload a PNG, JPG, or WEBP image.")]
    UnsupportedType(String),

    #[error("Failed to read the image file.")]
    Read(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to read the image file.")]
    Interrupted(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditErrorCategory {
    /// The request was refused as malformed or inappropriate.
    Rejected,
    /// The model service is temporarily down.
    Unavailable,
    Generic,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Bad request. The prompt or image may be inappropriate or unsupported. Please try again.")]
    Rejected { detail: String },

    #[error("The AI model is currently unavailable. Please try again later.")]
    Unavailable { status: u16 },

    #[error("Failed to generate image. The model did not return any image data.")]
    NoImage,

    #[error("Failed to generate image. Please check the log for details.")]
    Failed(String),
}

impl EditError {
    pub const fn category(&self) -> EditErrorCategory {
        match self {
            Self::Rejected { .. } => EditErrorCategory::Rejected,
            Self::Unavailable { .. } => EditErrorCategory::Unavailable,
            Self::NoImage | Self::Failed(_) => EditErrorCategory::Generic,
        }
    }

    /// Technical detail for the log; never shown to the user.
    pub fn detail(&self) -> String {
        match self {
            Self::Rejected { detail } | Self::Failed(detail) => detail.clone(),
            Self::Unavailable { status } => format!("status {status}"),
            Self::NoImage => "no inline image data in response".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("The model returned tags in an invalid format.")]
    InvalidTagFormat,

    #[error("Failed to recognize objects in the image.")]
    Failed(String),
}

impl RecognitionError {
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidTagFormat => "response was not a JSON array of strings".to_string(),
            Self::Failed(detail) => detail.clone(),
        }
    }
}

/// Failure of one workflow run, reported back through its trigger's error field.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

impl WorkflowError {
    pub fn detail(&self) -> String {
        match self {
            Self::Encode(EncodeError::Interrupted(join)) => format!("encode task failed: {join}"),
            Self::Edit(e) => format!("{:?}: {}", e.category(), e.detail()),
            Self::Recognition(e) => e.detail(),
        }
    }
}
