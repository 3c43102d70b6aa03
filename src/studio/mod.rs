//! Session-side driver for the two endpoints: holds the form, the in-flight
//! flags and the generated history for one studio session.

mod client;
mod session;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    generation::{GenerationRequest, GenerationResult},
    publish::{PublishRequest, PublishResult},
};

pub use client::{ClientError, StudioClient};
pub use session::{
    FormFields, GenerationMetadata, HistoryEntry, PendingGeneration, PendingUpload,
    PublishOutcome, Session,
};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("a generation is already in flight")]
    GenerationInFlight,
    #[error("an upload is already in flight")]
    UploadInFlight,
    #[error("generate an image before uploading")]
    NoImage,
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[async_trait]
pub trait StudioApi: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ClientError>;
    async fn upload(&self, request: &PublishRequest) -> Result<PublishResult, ClientError>;
}

/// Runs generate and upload actions against a session. The session sits
/// behind a mutex so an upload and a generation may overlap; the lock is
/// never held across a request.
pub struct Studio<A> {
    api: A,
    session: Arc<Mutex<Session>>,
}

impl<A: StudioApi> Studio<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }

    pub fn edit_form(&self, edit: impl FnOnce(&mut FormFields)) {
        edit(&mut self.session.lock().form);
    }

    pub fn snapshot(&self) -> Session {
        self.session.lock().clone()
    }

    pub async fn generate(&self) -> Result<HistoryEntry, StudioError> {
        let pending = self.session.lock().begin_generation()?;

        match self.api.generate(&pending.request).await {
            Ok(result) => {
                let entry = self.session.lock().finish_generation(pending, result);
                debug!(entry_id = entry.id, "history entry added");
                Ok(entry)
            }
            Err(err) => {
                warn!(error = %err, "generation failed");
                self.session.lock().fail_generation(err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn upload(&self) -> Result<PublishOutcome, StudioError> {
        let pending = self.session.lock().begin_upload()?;

        match self.api.upload(&pending.request).await {
            Ok(result) => Ok(self.session.lock().finish_upload(pending, result)),
            Err(err) => {
                warn!(error = %err, image_url = ?err.image_url(), "upload failed");
                self.session
                    .lock()
                    .fail_upload(err.to_string(), err.image_url().map(str::to_string));
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct ScriptedApi {
        generate_calls: AtomicUsize,
        fail_upload: bool,
    }

    #[async_trait]
    impl StudioApi for ScriptedApi {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResult, ClientError> {
            let n = self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if request.prompt.as_deref().is_none_or(|p| p.trim().is_empty()) {
                return Err(ClientError::Api {
                    status: 400,
                    message: "prompt is required".into(),
                    image_url: None,
                });
            }
            Ok(GenerationResult {
                base64_image: format!("IMG{n}"),
                model: None,
                inference_time: None,
            })
        }

        async fn upload(&self, request: &PublishRequest) -> Result<PublishResult, ClientError> {
            if self.fail_upload {
                return Err(ClientError::Api {
                    status: 502,
                    message: "media not ready".into(),
                    image_url: Some("https://cdn/x.png".into()),
                });
            }
            Ok(PublishResult {
                container_id: "c".into(),
                publish_id: "p".into(),
                image_url: format!(
                    "https://cdn/{}.png",
                    request.image_data.as_deref().unwrap_or("")
                ),
            })
        }
    }

    #[tokio::test]
    async fn generate_then_upload() {
        let studio = Studio::new(ScriptedApi::default());
        studio.edit_form(|form| form.prompt = "a figure sketch".into());

        let entry = studio.generate().await.unwrap();
        assert_eq!(entry.image, "IMG0");

        let outcome = studio.upload().await.unwrap();
        assert_eq!(outcome.entry_id, entry.id);
        assert_eq!(outcome.result.image_url, "https://cdn/IMG0.png");

        let session = studio.snapshot();
        assert_eq!(session.published_latest(), Some(true));
        assert!(!session.is_generating());
        assert!(!session.is_uploading());
    }

    #[tokio::test]
    async fn upload_without_image_is_refused() {
        let studio = Studio::new(ScriptedApi::default());
        assert!(matches!(studio.upload().await, Err(StudioError::NoImage)));
    }

    #[tokio::test]
    async fn errors_are_stored_for_display() {
        let studio = Studio::new(ScriptedApi {
            fail_upload: true,
            ..Default::default()
        });
        assert!(studio.generate().await.is_err());
        assert_eq!(studio.snapshot().generation_error(), Some("prompt is required"));

        studio.edit_form(|form| form.prompt = "pose".into());
        studio.generate().await.unwrap();
        assert!(studio.upload().await.is_err());

        let session = studio.snapshot();
        assert_eq!(session.generation_error(), None);
        assert_eq!(session.upload_error(), Some("media not ready"));
        assert_eq!(session.stranded_image_url(), Some("https://cdn/x.png"));
        assert_eq!(session.history().len(), 1);
    }
}
