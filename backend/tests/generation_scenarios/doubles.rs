//! Scripted outbound adapters for the generation pipeline.
//!
//! The provider can be gated so a test decides exactly when an analysis call
//! returns, which makes overlapping runs deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use avatar_backend::domain::ports::{
    AvatarProvider, AvatarProviderError, FetchedImage, ImageFetchError, ImageFetcher, ObjectStore,
    ObjectStoreError, ObjectUpload, SynthesisRequest,
};
use avatar_backend::domain::{AnalysisInstruction, VisionInput};
use bytes::Bytes;
use tokio::sync::Notify;
use url::Url;

/// Pauses analysis calls until released.
#[derive(Default)]
pub(crate) struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until a run reaches the provider.
    pub(crate) async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one waiting run continue.
    pub(crate) fn release(&self) {
        self.release.notify_one();
    }
}

/// Provider double answering with fixed values.
pub(crate) struct ScriptedProvider {
    analysis: Option<String>,
    synthesis: Option<Url>,
    gate: Option<Arc<Gate>>,
    analyze_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// Provider that describes every image and returns a hosted result.
    pub(crate) fn succeeding() -> Self {
        Self {
            analysis: Some("a person with short dark hair and round glasses".to_owned()),
            synthesis: Some(Url::parse("https://provider.test/result.png").expect("valid url")),
            gate: None,
            analyze_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose synthesis step returns no image.
    pub(crate) fn without_synthesis_result() -> Self {
        Self {
            synthesis: None,
            ..Self::succeeding()
        }
    }

    /// Provider whose analysis step returns no text.
    pub(crate) fn without_analysis_text() -> Self {
        Self {
            analysis: None,
            ..Self::succeeding()
        }
    }

    /// Hold analysis calls on `gate`.
    pub(crate) fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// Prompts sent to synthesis, in call order.
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl AvatarProvider for ScriptedProvider {
    async fn analyze(
        &self,
        _image: &VisionInput,
        _instruction: &AnalysisInstruction,
    ) -> Result<Option<String>, AvatarProviderError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(self.analysis.clone())
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<Url>, AvatarProviderError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(request.prompt.clone());
        Ok(self.synthesis.clone())
    }
}

/// Fetcher returning the same small WebP body for every URL.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    urls: Mutex<Vec<Url>>,
}

impl StaticFetcher {
    pub(crate) const BODY: &'static [u8] = b"RIFF-webp-avatar";

    pub(crate) fn urls(&self) -> Vec<Url> {
        self.urls.lock().expect("urls lock").clone()
    }
}

#[async_trait]
impl ImageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, ImageFetchError> {
        self.urls.lock().expect("urls lock").push(url.clone());
        Ok(FetchedImage {
            bytes: Bytes::from_static(Self::BODY),
            content_type: Some("image/webp".to_owned()),
        })
    }
}

/// Object store keeping uploads in memory under `https://bucket.test/`.
#[derive(Default)]
pub(crate) struct RecordingObjectStore {
    uploads: Mutex<Vec<ObjectUpload>>,
}

impl RecordingObjectStore {
    pub(crate) fn uploads(&self) -> Vec<ObjectUpload> {
        self.uploads.lock().expect("uploads lock").clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn upload(&self, upload: &ObjectUpload) -> Result<Option<Url>, ObjectStoreError> {
        self.uploads
            .lock()
            .expect("uploads lock")
            .push(upload.clone());
        let location = Url::parse(&format!("https://bucket.test/{}", upload.key))
            .map_err(|err| ObjectStoreError::upload(err.to_string()))?;
        Ok(Some(location))
    }
}
