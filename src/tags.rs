//! Container tag lookup.

use std::collections::{BTreeMap, HashMap};

use crate::error::BoxError;

/// Resolves the tags of a container, keyed by container ID.
pub trait ContainerTagger: Send + Sync {
    fn container_tags(&self, container_id: &str) -> Result<Vec<String>, BoxError>;
}

impl<F> ContainerTagger for F
where
    F: Fn(&str) -> Result<Vec<String>, BoxError> + Send + Sync,
{
    fn container_tags(&self, container_id: &str) -> Result<Vec<String>, BoxError> {
        self(container_id)
    }
}

/// Tagger backed by the `[container_tags]` table of the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticTagger {
    tags: HashMap<String, Vec<String>>,
}

impl StaticTagger {
    pub fn new(tags: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            tags: tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

impl ContainerTagger for StaticTagger {
    fn container_tags(&self, container_id: &str) -> Result<Vec<String>, BoxError> {
        Ok(self.tags.get(container_id).cloned().unwrap_or_default())
    }
}

/// Value of the container tags header, or `None` when there is nothing to send.
pub fn container_tags_header(tagger: &dyn ContainerTagger, container_id: &str) -> Option<String> {
    if container_id.is_empty() {
        return None;
    }
    match tagger.container_tags(container_id) {
        Ok(tags) if !tags.is_empty() => {
            tracing::trace!(container_id = %container_id, tags = ?tags, "Resolved container tags");
            Some(tags.join(","))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(container_id = %container_id, error = %e, "Container tag lookup failed");
            None
        }
    }
}
