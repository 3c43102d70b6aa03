use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    generation::{DEFAULT_ASPECT_RATIO, DEFAULT_GUIDANCE, GenerationRequest, GenerationResult},
    publish::{PublishRequest, PublishResult},
    studio::StudioError,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    pub prompt: String,
    pub negative_prompt: String,
    pub aspect_ratio: String,
    pub style: Option<String>,
    pub guidance: f64,
    pub caption: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: String::new(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            style: None,
            guidance: DEFAULT_GUIDANCE,
            caption: String::new(),
        }
    }
}

impl FormFields {
    fn generation_request(&self) -> GenerationRequest {
        let non_blank = |value: &str| Some(value.to_string()).filter(|v| !v.trim().is_empty());
        GenerationRequest {
            prompt: Some(self.prompt.clone()),
            negative_prompt: non_blank(&self.negative_prompt),
            aspect_ratio: non_blank(&self.aspect_ratio),
            style: self.style.clone(),
            guidance: Some(self.guidance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub model: Option<String>,
    pub inference_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    /// History entry that was uploaded; may no longer be the newest one.
    pub entry_id: u64,
    pub result: PublishResult,
}

#[derive(Debug)]
pub struct PendingGeneration {
    pub request: GenerationRequest,
    prompt: String,
    style: Option<String>,
}

#[derive(Debug)]
pub struct PendingUpload {
    pub entry_id: u64,
    pub request: PublishRequest,
}

/// In-memory state of one studio session. Nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub form: FormFields,
    generating: bool,
    uploading: bool,
    generation_error: Option<String>,
    upload_error: Option<String>,
    stranded_image_url: Option<String>,
    history: Vec<HistoryEntry>,
    last_metadata: Option<GenerationMetadata>,
    last_publish: Option<PublishOutcome>,
    next_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn can_generate(&self) -> bool {
        !self.generating
    }

    pub fn can_upload(&self) -> bool {
        !self.uploading && !self.history.is_empty()
    }

    /// Most recent first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.history.first()
    }

    pub fn generation_error(&self) -> Option<&str> {
        self.generation_error.as_deref()
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    /// Hosted URL reported by a publish that failed after hosting succeeded.
    pub fn stranded_image_url(&self) -> Option<&str> {
        self.stranded_image_url.as_deref()
    }

    pub fn last_metadata(&self) -> Option<&GenerationMetadata> {
        self.last_metadata.as_ref()
    }

    pub fn last_publish(&self) -> Option<&PublishOutcome> {
        self.last_publish.as_ref()
    }

    /// Whether the last published image is still the newest history entry.
    pub fn published_latest(&self) -> Option<bool> {
        let outcome = self.last_publish.as_ref()?;
        Some(self.latest().is_some_and(|entry| entry.id == outcome.entry_id))
    }

    pub fn begin_generation(&mut self) -> Result<PendingGeneration, StudioError> {
        if !self.can_generate() {
            return Err(StudioError::GenerationInFlight);
        }
        self.generating = true;
        self.generation_error = None;

        Ok(PendingGeneration {
            request: self.form.generation_request(),
            prompt: self.form.prompt.trim().to_string(),
            style: self.form.style.clone(),
        })
    }

    pub fn finish_generation(
        &mut self,
        pending: PendingGeneration,
        result: GenerationResult,
    ) -> HistoryEntry {
        self.generating = false;
        self.next_id += 1;
        let entry = HistoryEntry {
            id: self.next_id,
            image: result.base64_image,
            created_at: Utc::now(),
            prompt: pending.prompt,
            style: pending.style,
        };
        self.history.insert(0, entry.clone());
        self.last_metadata = Some(GenerationMetadata {
            model: result.model,
            inference_time: result.inference_time,
        });
        entry
    }

    pub fn fail_generation(&mut self, message: impl Into<String>) {
        self.generating = false;
        self.generation_error = Some(message.into());
    }

    /// Snapshots the newest entry; the upload proceeds with that copy even if
    /// another generation lands meanwhile.
    pub fn begin_upload(&mut self) -> Result<PendingUpload, StudioError> {
        if self.uploading {
            return Err(StudioError::UploadInFlight);
        }
        let entry = self.history.first().ok_or(StudioError::NoImage)?;
        let request = PublishRequest {
            image_data: Some(entry.image.clone()),
            caption: Some(self.form.caption.clone()),
            prompt: Some(entry.prompt.clone()),
            style: entry.style.clone(),
        };
        let entry_id = entry.id;

        self.uploading = true;
        self.upload_error = None;
        self.stranded_image_url = None;
        Ok(PendingUpload { entry_id, request })
    }

    pub fn finish_upload(
        &mut self,
        pending: PendingUpload,
        result: PublishResult,
    ) -> PublishOutcome {
        self.uploading = false;
        let outcome = PublishOutcome {
            entry_id: pending.entry_id,
            result,
        };
        self.last_publish = Some(outcome.clone());
        outcome
    }

    pub fn fail_upload(&mut self, message: impl Into<String>, image_url: Option<String>) {
        self.uploading = false;
        self.upload_error = Some(message.into());
        self.stranded_image_url = image_url;
    }
}
