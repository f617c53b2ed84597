//! The operation catalogue.

use crate::{
    AssetListing, Deadlines, ImageToImage, JobError, ModelListing, Operation, Orchestrator,
    OutputDescriptor, PollPolicy, RemoveBackground, TextToImage, Upscale,
};
use provider::{AssetPage, ModelPage, Provider};
use std::sync::Arc;

/// Every generation operation, each a thin parameter-shaping call into
/// the shared [`Orchestrator`].
pub struct Studio<P> {
    provider: Arc<P>,
    orchestrator: Orchestrator<P>,
}

impl<P: Provider> Studio<P> {
    pub fn new(provider: Arc<P>, policy: PollPolicy, deadlines: Deadlines) -> Self {
        Self {
            orchestrator: Orchestrator::new(Arc::clone(&provider), policy, deadlines),
            provider,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<P> {
        &self.orchestrator
    }

    /// Normalize `operation`, then submit, poll and resolve it.
    pub async fn run<O: Operation>(
        &self,
        operation: O,
    ) -> Result<Vec<OutputDescriptor>, JobError> {
        let body = operation.into_body()?;
        let deadline = self.orchestrator.deadlines().get(O::DEADLINE);
        self.orchestrator
            .run(|| self.provider.submit(O::PATH, &body), deadline)
            .await
    }

    pub async fn text_to_image(
        &self,
        request: TextToImage,
    ) -> Result<Vec<OutputDescriptor>, JobError> {
        self.run(request).await
    }

    pub async fn image_to_image(
        &self,
        request: ImageToImage,
    ) -> Result<Vec<OutputDescriptor>, JobError> {
        self.run(request).await
    }

    pub async fn remove_background(
        &self,
        request: RemoveBackground,
    ) -> Result<Vec<OutputDescriptor>, JobError> {
        self.run(request).await
    }

    pub async fn upscale(&self, request: Upscale) -> Result<Vec<OutputDescriptor>, JobError> {
        self.run(request).await
    }

    pub async fn list_models(&self, listing: ModelListing) -> Result<ModelPage, JobError> {
        self.provider
            .models(&listing.query())
            .await
            .map_err(JobError::List)
    }

    pub async fn list_assets(&self, listing: AssetListing) -> Result<AssetPage, JobError> {
        self.provider
            .assets(&listing.query())
            .await
            .map_err(JobError::List)
    }
}
