// Completion events delivered from workflow tasks to the UI loop

use crate::error::{UploadError, WorkflowError};
use crate::models::{ImageFile, SelectionId};

/// Identifies one generate request; only the latest one may update state.
pub type GenerationToken = u64;

#[derive(Debug)]
pub enum AppEvent {
    /// A file finished loading from disk
    ImageLoaded(Result<ImageFile, UploadError>),
    /// Tagging finished for the given selection
    TagsReady {
        selection: SelectionId,
        result: Result<Vec<String>, WorkflowError>,
    },
    /// An edit request finished
    GenerationFinished {
        token: GenerationToken,
        result: Result<String, WorkflowError>,
    },
}
