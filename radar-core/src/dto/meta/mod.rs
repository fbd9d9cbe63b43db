//! Metadata DTOs

use serde::{Deserialize, Serialize};

/// Filter candidates exposed to API consumers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaResponse {
    pub tag_candidates: Vec<String>,
    pub employment_types: Vec<String>,
    pub salary_ranges: Vec<String>,
    pub role_categories: Vec<String>,
    pub language_options: Vec<String>,
    pub channels: Vec<String>,
}
