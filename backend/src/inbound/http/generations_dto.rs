//! Request and response bodies for generation endpoints.

use chrono::{DateTime, Utc};
use pagination::Paginated;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::GenerationView;
use crate::domain::{AvatarStyle, GenerationEntry};

/// Body for `POST /api/v1/generations`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationBody {
    /// Caller-chosen identifier; generated when omitted.
    #[schema(example = "k3v9x2m1qa")]
    pub id: Option<String>,
    /// `PUBLIC` or `PRIVATE`; private when omitted.
    #[schema(example = "PRIVATE")]
    pub visibility: Option<String>,
}

/// Body for `POST /api/v1/regenerate`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateBody {
    /// Target generation.
    #[schema(example = "k3v9x2m1qa")]
    pub id: String,
    /// Override prompt applied on top of the previous avatar.
    #[schema(example = "make it a fox wearing a scarf")]
    pub prompt: String,
}

/// Paging parameters shared by the list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PageQuery {
    /// One-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
}

/// One stored avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEntryBody {
    /// Entry identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    /// Override prompt that produced this entry; omitted in community views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Durable image location.
    pub image_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<GenerationEntry> for GenerationEntryBody {
    fn from(entry: GenerationEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            prompt: entry.prompt,
            image_url: entry.image_url.into(),
            created_at: entry.created_at,
        }
    }
}

/// A generation with its entries in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationBody {
    /// Generation identifier.
    #[schema(example = "k3v9x2m1qa")]
    pub id: String,
    /// Style fixed by the first run.
    #[schema(example = "CLAY")]
    pub style: Option<String>,
    /// `PUBLIC` or `PRIVATE`.
    #[schema(example = "PRIVATE")]
    pub visibility: String,
    /// `IDLE` or `IN_PROGRESS`.
    #[schema(example = "IDLE")]
    pub status: String,
    /// `fresh`, `ongoing`, `finalized` or `in_progress`.
    #[schema(example = "ongoing")]
    pub phase: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change, including lock changes.
    pub updated_at: DateTime<Utc>,
    /// Stored avatars, oldest first.
    pub entries: Vec<GenerationEntryBody>,
}

impl From<GenerationView> for GenerationBody {
    fn from(view: GenerationView) -> Self {
        let GenerationView { generation, phase } = view;
        Self {
            id: generation.id.as_str().to_owned(),
            style: generation.style.map(|style| style.as_str().to_owned()),
            visibility: generation.visibility.as_str().to_owned(),
            status: generation.status.as_str().to_owned(),
            phase: phase.as_str().to_owned(),
            created_at: generation.created_at,
            updated_at: generation.updated_at,
            entries: generation
                .entries
                .into_iter()
                .map(GenerationEntryBody::from)
                .collect(),
        }
    }
}

/// Paged list of generations.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct GenerationPageBody {
    data: Vec<GenerationBody>,
    page: u32,
    page_size: u32,
    total_items: u64,
    total_pages: u64,
    links: Option<serde_json::Value>,
}

/// Convert a page of views into response bodies.
pub fn page_body(page: Paginated<GenerationView>) -> Paginated<GenerationBody> {
    page.map(GenerationBody::from)
}

/// One entry of the style catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleBody {
    /// Identifier accepted by `POST /api/v1/generate`.
    #[schema(value_type = String, example = "CLAY")]
    pub id: &'static str,
    /// Prompt fragment describing the look.
    #[schema(value_type = String)]
    pub description: &'static str,
}

impl From<AvatarStyle> for StyleBody {
    fn from(style: AvatarStyle) -> Self {
        Self {
            id: style.as_str(),
            description: style.descriptor(),
        }
    }
}
