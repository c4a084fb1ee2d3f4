use crate::error::UploadError;
use crate::events::{AppEvent, GenerationToken};
use crate::models::{GeneratedImage, ImageFile, ImageSelection, MediaType, MAX_UPLOAD_BYTES};
use crate::workflow::{EditJob, TagJob};

use std::path::{Path, PathBuf};

pub const MISSING_INPUT_MESSAGE: &str = "Please upload an image and enter a prompt.";

pub const EXAMPLE_PROMPTS: [&str; 5] = [
    "Remove the background",
    "Make the background white",
    "Improve lighting and colors",
    "Add a reflection underneath the product",
    "Give it a retro, vintage feel",
];

/// Which input receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Path,
    Instruction,
}

/// Interaction state. The upload/generate trigger owns `selection`, `result`,
/// `instruction`, `is_generating` and `error`; the tagging sub-flow owns
/// `tags`, `is_tagging` and `tagging_error`.
#[derive(Debug)]
pub struct App {
    pub focus: Focus,
    pub should_quit: bool,
    pub show_help: bool,
    pub show_info: bool,
    pub exit_pending: bool,
    pub path_input: String,
    pub is_loading_file: bool,

    pub selection: Option<ImageSelection>,
    pub result: Option<GeneratedImage>,
    pub tags: Vec<String>,
    pub instruction: String,
    pub is_generating: bool,
    pub is_tagging: bool,
    pub error: Option<String>,
    pub tagging_error: Option<String>,

    /// One-line status such as "Saved to ./edited-image.png"
    pub notice: Option<String>,
    generation_token: GenerationToken,
}

impl App {
    pub const fn new() -> Self {
        Self {
            focus: Focus::Path,
            should_quit: false,
            show_help: false,
            show_info: false,
            exit_pending: false,
            path_input: String::new(),
            is_loading_file: false,
            selection: None,
            result: None,
            tags: Vec::new(),
            instruction: String::new(),
            is_generating: false,
            is_tagging: false,
            error: None,
            tagging_error: None,
            notice: None,
            generation_token: 0,
        }
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub const fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub const fn toggle_info(&mut self) {
        self.show_info = !self.show_info;
    }

    pub const fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Path => Focus::Instruction,
            Focus::Instruction => Focus::Path,
        };
    }

    pub const fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn can_generate(&self) -> bool {
        self.has_selection() && !self.instruction.trim().is_empty() && !self.is_generating
    }

    /// Start loading the file named in the path input, if any.
    pub fn begin_file_load(&mut self) -> Option<PathBuf> {
        let path = self.path_input.trim();
        if path.is_empty() || self.is_loading_file {
            return None;
        }
        self.is_loading_file = true;
        Some(PathBuf::from(path))
    }

    /// Accept or reject a freshly loaded file. Returns the tagging job for an
    /// accepted selection.
    pub fn handle_upload(&mut self, file: ImageFile) -> Option<TagJob> {
        let size = file.size();
        if size > MAX_UPLOAD_BYTES {
            self.reject_upload(UploadError::TooLarge { size });
            return None;
        }

        let Some(media_type) = MediaType::from_mime(&file.mime_type) else {
            let declared = if file.mime_type.is_empty() {
                "unknown".to_string()
            } else {
                file.mime_type
            };
            self.reject_upload(UploadError::UnsupportedType(declared));
            return None;
        };

        let selection = ImageSelection::new(file.name, media_type, file.bytes);
        let job = TagJob::for_selection(&selection);
        tracing::info!(
            selection = %selection.id.short(),
            name = %selection.name,
            size,
            %media_type,
            "image selected"
        );

        self.selection = Some(selection);
        self.result = None;
        self.error = None;
        self.instruction.clear();
        self.notice = None;
        // Any edit still in flight was computed for the previous image.
        self.generation_token += 1;
        self.is_generating = false;

        self.tags.clear();
        self.tagging_error = None;
        self.is_tagging = true;

        self.focus = Focus::Instruction;
        Some(job)
    }

    pub fn reject_upload(&mut self, error: UploadError) {
        match &error {
            UploadError::TooLarge { size } => {
                tracing::warn!(size, limit = MAX_UPLOAD_BYTES, "upload rejected: too large");
            }
            other => tracing::warn!(error = %other, "upload rejected"),
        }
        self.error = Some(error.to_string());
    }

    pub fn push_instruction_char(&mut self, c: char) {
        if self.has_selection() {
            self.instruction.push(c);
        }
    }

    pub fn pop_instruction_char(&mut self) {
        self.instruction.pop();
    }

    pub fn apply_example_prompt(&mut self, index: usize) {
        if !self.has_selection() {
            return;
        }
        if let Some(prompt) = EXAMPLE_PROMPTS.get(index) {
            self.instruction = (*prompt).to_string();
        }
    }

    /// Validate preconditions and mark a generation as in flight.
    pub fn request_generation(&mut self) -> Option<EditJob> {
        let job = match &self.selection {
            Some(selection) if !self.instruction.trim().is_empty() => EditJob {
                token: self.generation_token + 1,
                bytes: selection.bytes.clone(),
                media_type: selection.media_type,
                instruction: self.instruction.clone(),
            },
            _ => {
                self.error = Some(MISSING_INPUT_MESSAGE.to_string());
                return None;
            }
        };

        self.generation_token = job.token;
        self.is_generating = true;
        self.error = None;
        self.result = None;
        self.notice = None;
        Some(job)
    }

    /// Apply a completion event. Loading a file may yield a tagging job to dispatch.
    pub fn handle_event(&mut self, event: AppEvent) -> Option<TagJob> {
        match event {
            AppEvent::ImageLoaded(loaded) => {
                self.is_loading_file = false;
                match loaded {
                    Ok(file) => return self.handle_upload(file),
                    Err(error) => self.reject_upload(error),
                }
            }
            AppEvent::TagsReady { selection, result } => {
                if self.selection.as_ref().map(|s| s.id) != Some(selection) {
                    tracing::debug!(
                        selection = %selection.short(),
                        "discarding tags for a superseded selection"
                    );
                    return None;
                }
                match result {
                    Ok(tags) => self.tags = tags,
                    Err(error) => {
                        tracing::warn!(detail = %error.detail(), "tagging failed");
                        self.tags.clear();
                        self.tagging_error = Some(error.to_string());
                    }
                }
                self.is_tagging = false;
            }
            AppEvent::GenerationFinished { token, result } => {
                if token != self.generation_token || !self.is_generating {
                    tracing::debug!(token, "discarding superseded edit result");
                    return None;
                }
                match result {
                    Ok(base64) => self.result = Some(GeneratedImage::new(base64)),
                    Err(error) => {
                        tracing::warn!(detail = %error.detail(), "generation failed");
                        self.error = Some(error.to_string());
                    }
                }
                self.is_generating = false;
            }
        }
        None
    }

    /// Download the current result as `edited-image.png` into `dir`.
    pub fn save_result(&mut self, dir: &Path) {
        let Some(result) = &self.result else {
            self.notice = Some("Nothing to save yet.".to_string());
            return;
        };
        self.notice = Some(match result.save_to(dir) {
            Ok(path) => format!("Saved to {}", path.display()),
            Err(e) => {
                tracing::error!(error = ?e, "failed to save result");
                format!("Save failed: {e}")
            }
        });
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
