// Async sub-flows: file loading, tagging and image editing. Each runs start to
// finish in one task and reports back with a single AppEvent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::api::ImageModel;
use crate::error::{EncodeError, UploadError, WorkflowError};
use crate::events::{AppEvent, GenerationToken};
use crate::models::{
    EncodedImage, ImageFile, ImageSelection, MediaType, SelectionId, MAX_UPLOAD_BYTES,
};

/// Tagging work for one accepted selection.
#[derive(Debug, Clone)]
pub struct TagJob {
    pub selection: SelectionId,
    pub media_type: MediaType,
    pub bytes: Arc<[u8]>,
}

impl TagJob {
    pub fn for_selection(selection: &ImageSelection) -> Self {
        Self {
            selection: selection.id,
            media_type: selection.media_type,
            bytes: Arc::clone(&selection.bytes),
        }
    }
}

/// One edit request: the selected image plus the instruction text.
#[derive(Debug, Clone)]
pub struct EditJob {
    pub token: GenerationToken,
    pub media_type: MediaType,
    pub bytes: Arc<[u8]>,
    pub instruction: String,
}

/// Read an image from disk. Oversized files are refused from their metadata
/// without reading the payload.
pub async fn load_image(path: &Path) -> Result<ImageFile, UploadError> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: metadata.len(),
        });
    }

    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mime_type = MediaType::from_path(path)
        .map(|m| m.mime_type().to_string())
        .unwrap_or_default();

    Ok(ImageFile::new(name, mime_type, bytes))
}

/// Base64-encode on the blocking pool so large images don't stall the UI loop.
pub async fn encode_image(
    bytes: Arc<[u8]>,
    media_type: MediaType,
) -> Result<EncodedImage, EncodeError> {
    let encoded =
        tokio::task::spawn_blocking(move || EncodedImage::encode(&bytes, media_type)).await?;
    Ok(encoded)
}

pub async fn run_tagging(model: Arc<dyn ImageModel>, job: TagJob) -> AppEvent {
    let TagJob {
        selection,
        media_type,
        bytes,
    } = job;

    let result = async {
        let image = encode_image(bytes, media_type).await?;
        let tags = model.recognize_objects(image).await?;
        Ok::<_, WorkflowError>(tags)
    }
    .await;

    tracing::debug!(
        selection = %selection.short(),
        ok = result.is_ok(),
        "tagging finished"
    );
    AppEvent::TagsReady { selection, result }
}

pub async fn run_generation(model: Arc<dyn ImageModel>, job: EditJob) -> AppEvent {
    let EditJob {
        token,
        media_type,
        bytes,
        instruction,
    } = job;

    let result = async {
        let image = encode_image(bytes, media_type).await?;
        let edited = model.edit_image(image, instruction).await?;
        Ok::<_, WorkflowError>(edited)
    }
    .await;

    tracing::debug!(token, ok = result.is_ok(), "generation finished");
    AppEvent::GenerationFinished { token, result }
}

pub fn spawn_load(path: PathBuf, tx: UnboundedSender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let loaded = load_image(&path).await;
        let _ = tx.send(AppEvent::ImageLoaded(loaded));
    })
}

pub fn spawn_tagging(
    model: Arc<dyn ImageModel>,
    job: TagJob,
    tx: UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _ = tx.send(run_tagging(model, job).await);
    })
}

pub fn spawn_generation(
    model: Arc<dyn ImageModel>,
    job: EditJob,
    tx: UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _ = tx.send(run_generation(model, job).await);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockImageModel;
    use crate::app::App;
    use crate::error::{EditError, EditErrorCategory, RecognitionError};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    const MIB: usize = 1024 * 1024;

    fn upload(app: &mut App, size: usize, mime: &str) -> Option<TagJob> {
        app.handle_upload(ImageFile::new("product", mime, vec![7u8; size]))
    }

    #[tokio::test]
    async fn test_load_image_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shoe.JPG");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let file = assert_ok!(load_image(&path).await);

        assert_eq!(file.name, "shoe.JPG");
        assert_eq!(file.mime_type, "image/jpeg");
        assert_eq!(file.bytes, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_load_image_unknown_extension_has_empty_mime() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"data").unwrap();

        let loaded = assert_ok!(load_image(file.path()).await);
        assert!(loaded.mime_type.is_empty());
    }

    #[tokio::test]
    async fn test_load_image_refuses_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 4 * MIB + 1]).unwrap();

        let err = assert_err!(load_image(&path).await);
        assert!(matches!(err, UploadError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_load_image_missing_file() {
        let err = assert_err!(load_image(Path::new("/definitely/not/here.png")).await);
        assert!(matches!(err, UploadError::Read(_)));
    }

    #[tokio::test]
    async fn test_encode_image() {
        let encoded = assert_ok!(encode_image(Arc::from(&b"hello"[..]), MediaType::Png).await);
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.media_type, MediaType::Png);
    }

    #[tokio::test]
    async fn test_upload_then_tagging_scenario() {
        let mut model = MockImageModel::new();
        model
            .expect_recognize_objects()
            .withf(|image| image.media_type == MediaType::Png)
            .times(1)
            .returning(|_| Ok(vec!["shoes".into(), "sneakers".into(), "red".into()]));
        let model: Arc<dyn ImageModel> = Arc::new(model);

        let mut app = App::new();
        let job = upload(&mut app, 2 * MIB, "image/png").unwrap();
        assert!(app.is_tagging);

        let event = run_tagging(model, job).await;
        app.handle_event(event);

        assert_eq!(app.tags, vec!["shoes", "sneakers", "red"]);
        assert!(!app.is_tagging);
    }

    #[tokio::test]
    async fn test_six_tags_preserve_order() {
        let expected = vec!["mug", "kitchenware", "ceramic", "white", "glossy", "handle"];
        let returned: Vec<String> = expected.iter().map(ToString::to_string).collect();

        let mut model = MockImageModel::new();
        model
            .expect_recognize_objects()
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let mut app = App::new();
        let job = upload(&mut app, 100, "image/webp").unwrap();
        app.handle_event(run_tagging(Arc::new(model), job).await);

        assert_eq!(app.tags, expected);
    }

    #[tokio::test]
    async fn test_invalid_tag_format_leaves_tags_empty() {
        let mut model = MockImageModel::new();
        model
            .expect_recognize_objects()
            .returning(|_| Err(RecognitionError::InvalidTagFormat));

        let mut app = App::new();
        let job = upload(&mut app, 100, "image/png").unwrap();
        app.handle_event(run_tagging(Arc::new(model), job).await);

        assert!(app.tags.is_empty());
        assert!(!app.is_tagging);
        assert!(app.tagging_error.as_deref().unwrap().contains("invalid format"));
    }

    #[tokio::test]
    async fn test_oversized_upload_makes_no_remote_call() {
        let mut model = MockImageModel::new();
        model.expect_recognize_objects().never();
        model.expect_edit_image().never();

        let mut app = App::new();
        let job = upload(&mut app, 5 * MIB, "image/jpeg");

        assert!(job.is_none());
        assert!(app.selection.is_none());
        assert!(app.error.as_deref().unwrap().contains("4MB"));
        assert!(!app.is_tagging);
    }

    #[tokio::test]
    async fn test_generate_scenario_produces_data_url() {
        let mut model = MockImageModel::new();
        model
            .expect_edit_image()
            .withf(|image, instruction| {
                image.media_type == MediaType::Jpeg && instruction == "Remove the background"
            })
            .times(1)
            .returning(|_, _| Ok("RURJVEVE".to_string()));

        let mut app = App::new();
        upload(&mut app, 1000, "image/jpeg").unwrap();
        app.instruction = "Remove the background".into();
        let job = app.request_generation().unwrap();

        app.handle_event(run_generation(Arc::new(model), job).await);

        assert!(!app.is_generating);
        assert_eq!(
            app.result.as_ref().unwrap().data_url(),
            "data:image/png;base64,RURJVEVE"
        );
    }

    #[tokio::test]
    async fn test_generate_rejected_content_scenario() {
        let mut model = MockImageModel::new();
        model.expect_edit_image().times(1).returning(|_, _| {
            Err(EditError::Rejected {
                detail: "status 400".into(),
            })
        });

        let mut app = App::new();
        upload(&mut app, 1000, "image/png").unwrap();
        app.instruction = "Remove the background".into();
        let job = app.request_generation().unwrap();

        let event = run_generation(Arc::new(model), job).await;
        if let AppEvent::GenerationFinished {
            result: Err(WorkflowError::Edit(ref err)),
            ..
        } = event
        {
            assert_eq!(err.category(), EditErrorCategory::Rejected);
        } else {
            panic!("expected a rejected edit, got {event:?}");
        }
        app.handle_event(event);

        assert!(app.result.is_none());
        assert!(!app.is_generating);
        assert!(app
            .error
            .as_deref()
            .unwrap()
            .contains("inappropriate or unsupported"));
    }

    #[tokio::test]
    async fn test_generate_without_instruction_makes_no_remote_call() {
        let mut model = MockImageModel::new();
        model.expect_edit_image().never();

        let mut app = App::new();
        upload(&mut app, 1000, "image/png").unwrap();

        assert!(app.request_generation().is_none());
        assert!(app.error.is_some());
    }

    #[tokio::test]
    async fn test_spawned_flows_deliver_events() {
        let mut model = MockImageModel::new();
        model
            .expect_recognize_objects()
            .returning(|_| Ok(vec!["bottle".into()]));
        model
            .expect_edit_image()
            .returning(|_, _| Ok("QUJD".to_string()));
        let model: Arc<dyn ImageModel> = Arc::new(model);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bottle.png");
        std::fs::write(&path, b"png").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new();

        spawn_load(path, tx.clone()).await.unwrap();
        let job = app.handle_event(rx.recv().await.unwrap()).unwrap();

        spawn_tagging(Arc::clone(&model), job, tx.clone()).await.unwrap();
        app.handle_event(rx.recv().await.unwrap());
        assert_eq!(app.tags, vec!["bottle"]);

        app.instruction = "Make the background white".into();
        let job = app.request_generation().unwrap();
        spawn_generation(model, job, tx).await.unwrap();
        app.handle_event(rx.recv().await.unwrap());

        assert_eq!(app.result.as_ref().unwrap().base64, "QUJD");
        assert!(!app.is_generating);
        assert!(!app.is_tagging);
    }
}
