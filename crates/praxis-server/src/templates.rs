//! Server-rendered public pages.

use askama::Template;

use praxis_core::entities::{PageBlock, PageBundle};

/// Display form of a block; `content` keys vary by block kind.
pub struct BlockView {
    pub kind: &'static str,
    pub title: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
}

impl From<&PageBlock> for BlockView {
    fn from(block: &PageBlock) -> Self {
        let field = |key: &str| {
            block
                .content
                .get(key)
                .and_then(|v| v.as_str())
                .map(String::from)
        };
        Self {
            kind: block.kind.as_str(),
            title: block.title.clone(),
            text: field("text"),
            url: field("url"),
        }
    }
}

pub struct AddressView {
    pub label: Option<String>,
    pub line: String,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub title: String,
    pub subtitle: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_color: String,
    pub blocks: Vec<BlockView>,
    pub social_links: Vec<(String, String)>,
    pub addresses: Vec<AddressView>,
    pub interests: Vec<String>,
    pub default_interest: Option<String>,
    pub lead_action: String,
}

impl PageTemplate {
    #[must_use]
    pub fn from_bundle(bundle: &PageBundle) -> Self {
        let page = &bundle.page;
        Self {
            title: page.title.clone(),
            subtitle: page.subtitle.clone(),
            bio: page.bio.clone(),
            avatar_url: page.avatar_url.clone(),
            theme_color: page.theme_color.clone().unwrap_or_else(|| "#0f766e".to_string()),
            blocks: bundle.blocks.iter().filter(|b| b.visible).map(BlockView::from).collect(),
            social_links: bundle
                .social_links
                .iter()
                .map(|l| (l.platform.clone(), l.url.clone()))
                .collect(),
            addresses: bundle
                .addresses
                .iter()
                .map(|a| AddressView {
                    label: a.label.clone(),
                    line: [Some(a.street.as_str()), Some(a.city.as_str()), a.state.as_deref(), a.postal_code.as_deref()]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect(),
            interests: bundle.interests.iter().map(|i| i.label.clone()).collect(),
            default_interest: bundle
                .interests
                .iter()
                .find(|i| i.is_default)
                .map(|i| i.label.clone()),
            lead_action: format!("/api/public/pages/{}/leads", page.slug),
        }
    }
}
