use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::BlockKind;

/// A public landing page (`/p/{slug}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub user_id: String,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_color: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An ordered content block on a page. `content` is kind-specific JSON
/// (`{"text": ...}`, `{"url": ..., "label": ...}`, `{"quiz_id": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageBlock {
    pub id: String,
    pub page_id: String,
    pub kind: BlockKind,
    pub title: Option<String>,
    pub content: serde_json::Value,
    pub position: i64,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialLink {
    pub id: String,
    pub page_id: String,
    pub platform: String,
    pub url: String,
    pub position: i64,
}

/// Practice address shown on a page. At most one per page is the default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub id: String,
    pub page_id: String,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Option offered in the page's lead form ("What are you interested in?").
/// At most one per page is the default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestOption {
    pub id: String,
    pub page_id: String,
    pub label: String,
    pub is_default: bool,
    pub position: i64,
}

/// A page with all of its children, each list ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageBundle {
    pub page: Page,
    pub blocks: Vec<PageBlock>,
    pub social_links: Vec<SocialLink>,
    pub addresses: Vec<Address>,
    pub interests: Vec<InterestOption>,
}
