use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;

use crate::error::RequestError;
use crate::model::{ApiEnvelope, Category, ListParams, NoteItem, RawNote};
use crate::request::{Client, Transport};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 20;
const PREVIEW_LENGTH: usize = 100;

impl ListParams {
    pub fn into_query(self) -> String {
        let mut parts = vec![
            format!("page={}", self.page.unwrap_or(DEFAULT_PAGE)),
            format!("limit={}", self.limit.unwrap_or(DEFAULT_LIMIT)),
        ];

        if let Some(category) = self.category.filter(|c| !c.is_empty()) {
            parts.push(format!("category={}", urlencoding::encode(&category)));
        }
        if let Some(search) = self.search.filter(|s| !s.is_empty()) {
            parts.push(format!("search={}", urlencoding::encode(&search)));
        }

        parts.join("&")
    }
}

/// Typed wrappers over the notes endpoints.
pub struct NotesApi<'a, T: Transport> {
    client: &'a Client<T>,
}

impl<'a, T: Transport> NotesApi<'a, T> {
    pub fn new(client: &'a Client<T>) -> NotesApi<'a, T> {
        NotesApi { client }
    }

    pub fn list(&self, params: ListParams) -> Result<Vec<RawNote>, RequestError> {
        self.fetch(&format!("/api/notes?{}", params.into_query()))
    }

    pub fn detail(&self, note_id: i64) -> Result<RawNote, RequestError> {
        self.fetch(&format!("/api/notes/search/{}", note_id))
    }

    pub fn categories(&self) -> Result<Vec<Category>, RequestError> {
        self.fetch("/api/notes/categories")
    }

    pub fn by_category(
        &self,
        category: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<RawNote>, RequestError> {
        self.fetch(&format!(
            "/api/notes/category/{}?page={}&limit={}",
            urlencoding::encode(category),
            page,
            limit
        ))
    }

    fn fetch<D: DeserializeOwned>(&self, path: &str) -> Result<D, RequestError> {
        let envelope: ApiEnvelope<D> = self.client.get_json(path)?;
        envelope.data.ok_or_else(|| RequestError::Status {
            status: 200,
            message: envelope
                .message
                .unwrap_or_else(|| "empty response".to_owned()),
        })
    }
}

pub fn format_note_item(raw: RawNote) -> NoteItem {
    let preview = extract_text_from_html(&raw.post_content, PREVIEW_LENGTH);
    NoteItem {
        id: raw.id,
        title: raw.post_title,
        content: raw.post_content,
        category: raw.post_name,
        created_at: raw.post_date,
        preview,
    }
}

/// Plain-text preview of HTML content: tags stripped, whitespace collapsed,
/// char-truncated with an ellipsis.
pub fn extract_text_from_html(html: &str, max_length: usize) -> String {
    if html.is_empty() {
        return String::new();
    }

    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > max_length {
        let truncated: String = collapsed.chars().take(max_length).collect();
        format!("{}...", truncated)
    } else {
        collapsed
    }
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn format_relative_time(date_str: &str) -> String {
    format_relative_to(date_str, Utc::now())
}

/// Buckets a timestamp relative to `now`; dates older than 30 days fall back
/// to the absolute form. Unparseable input passes through untouched.
pub fn format_relative_to(date_str: &str, now: DateTime<Utc>) -> String {
    if date_str.is_empty() {
        return String::new();
    }
    let Some(date) = parse_date(date_str) else {
        return date_str.to_owned();
    };

    let diff = now.signed_duration_since(date);
    if diff.num_seconds() < 60 {
        return "just now".to_owned();
    }
    if diff.num_minutes() < 60 {
        return format!("{}m ago", diff.num_minutes());
    }
    if diff.num_hours() < 24 {
        return format!("{}h ago", diff.num_hours());
    }
    if diff.num_days() < 30 {
        return format!("{}d ago", diff.num_days());
    }

    date.format("%Y-%m-%d").to_string()
}

fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
