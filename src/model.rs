use serde::{Deserialize, Serialize};

/// Note row as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNote {
    pub id: i64,
    pub post_title: String,
    pub post_content: String,
    pub post_name: String,
    pub post_date: String,
}

/// Display-ready note, shaped for list and detail views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: String,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Standard response envelope: `message` carries human-readable status,
/// `data` the payload.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Default, Clone)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
}
