//! Announcements and CMS pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AnnouncementId, CmsPageId};

/// Minimum announcement text length.
pub const ANNOUNCEMENT_MIN_LEN: usize = 5;

/// A banner message shown across the storefront while active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: AnnouncementId,
    pub text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A static page such as "about" or "returns". `content` is sanitized HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsPage {
    pub id: CmsPageId,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}
