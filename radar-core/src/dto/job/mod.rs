//! Job DTOs

use serde::{Deserialize, Serialize};

/// Filter and window for listing final jobs
///
/// Every entry of `tags` must be a truthy normalized tag of a matching job.
/// A `limit` of zero or less means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    pub tags: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

impl JobFilter {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Requested tags with blanks removed
    pub fn effective_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
    }
}

/// Response of a manual refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub created: usize,
}
