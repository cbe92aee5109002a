//! Project lookup capability.
//!
//! The orchestrator never owns project persistence; callers hand it a
//! [`ProjectLookup`] at construction.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::{ProjectMetadata, Result};

#[async_trait]
pub trait ProjectLookup: Send + Sync {
    /// Metadata for `project_id`, or `None` when the project is unknown
    async fn find(&self, project_id: &str) -> Result<Option<ProjectMetadata>>;
}

/// Lookup backed by a concurrent map; used by the CLI and tests
#[derive(Debug, Default)]
pub struct InMemoryProjectLookup {
    projects: DashMap<String, ProjectMetadata>,
}

impl InMemoryProjectLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, metadata: ProjectMetadata) -> Self {
        self.insert(metadata);
        self
    }

    pub fn insert(&self, metadata: ProjectMetadata) {
        self.projects.insert(metadata.id.clone(), metadata);
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
impl ProjectLookup for InMemoryProjectLookup {
    async fn find(&self, project_id: &str) -> Result<Option<ProjectMetadata>> {
        Ok(self.projects.get(project_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let lookup = InMemoryProjectLookup::new()
            .with_project(ProjectMetadata::new("1", "One"))
            .with_project(ProjectMetadata::new("2", "Two"));
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.find("2").await.unwrap().unwrap().title, "Two");
        assert!(lookup.find("3").await.unwrap().is_none());

        lookup.insert(ProjectMetadata::new("2", "Two, revised"));
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.find("2").await.unwrap().unwrap().title, "Two, revised");
    }
}
