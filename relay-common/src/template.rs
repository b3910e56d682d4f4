//! Template data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{notification::Content, Channel};

/// A stored, reusable message template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub name: String,
    pub channel: Channel,
    pub content: Content,
    /// Ordered list of variable names that must be supplied to render this template.
    pub variables: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateCreateRequest {
    pub name: String,
    pub channel: Channel,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub active: Option<bool>,
}

const fn default_page() -> u32 {
    1
}

const fn default_size() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateListResponse {
    pub items: Vec<Template>,
    pub total: u64,
}
