//! In-memory artifact sink

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::core::{ArtifactSink, PersistedArtifact};
use crate::error::Result;

/// Keeps every appended artifact in insertion order
#[derive(Debug, Default)]
pub struct MemoryArtifactSink {
    artifacts: RwLock<Vec<PersistedArtifact>>,
}

impl MemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored artifact
    pub async fn artifacts(&self) -> Vec<PersistedArtifact> {
        self.artifacts.read().await.clone()
    }

    /// Artifacts of one request, ordered by chunk index
    pub async fn for_request(&self, request_id: Uuid) -> Vec<PersistedArtifact> {
        let mut matching: Vec<_> = self
            .artifacts
            .read()
            .await
            .iter()
            .filter(|artifact| artifact.request_id == request_id)
            .cloned()
            .collect();

        matching.sort_by_key(|artifact| artifact.chunk_index);
        matching
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactSink for MemoryArtifactSink {
    async fn append(&self, artifact: PersistedArtifact) -> Result<()> {
        debug!(request_id = %artifact.request_id, chunk_index = artifact.chunk_index, "Storing artifact");
        self.artifacts.write().await.push(artifact);
        Ok(())
    }
}
