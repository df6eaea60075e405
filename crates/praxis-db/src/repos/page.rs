//! Page repository: doctor landing pages and their bundles.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::entities::{Page, PageBundle};
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::PREFIX_PAGE;
use praxis_core::slug;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, ensure_affected, get_bool, get_opt_string, parse_datetime};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::page::PageUpdate;

const SELECT_COLS: &str = "id, user_id, slug, title, subtitle, bio, avatar_url, theme_color, published, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPage {
    pub title: String,
    /// Derived from `title` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[serde(default)]
    pub published: bool,
}

fn row_to_page(row: &libsql::Row) -> Result<Page, DatabaseError> {
    Ok(Page {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        slug: row.get::<String>(2)?,
        title: row.get::<String>(3)?,
        subtitle: get_opt_string(row, 4)?,
        bio: get_opt_string(row, 5)?,
        avatar_url: get_opt_string(row, 6)?,
        theme_color: get_opt_string(row, 7)?,
        published: get_bool(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

impl PraxisService {
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` when the slug is already used.
    pub async fn create_page(&self, user_id: &str, new: &NewPage) -> Result<Page, DatabaseError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(DatabaseError::Validation("page title is required".into()));
        }
        let slug = new
            .slug
            .as_deref()
            .map_or_else(|| slug::slugify(title), str::to_string);
        slug::validate(&slug)?;
        if self.page_slug_taken(&slug, None).await? {
            return Err(DatabaseError::Conflict(format!("slug '{slug}' is already taken")));
        }

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_PAGE).await?;
        self.db()
            .execute(
                &format!("INSERT INTO pages ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)"),
                libsql::params![
                    id.as_str(),
                    user_id,
                    slug.as_str(),
                    title,
                    new.subtitle.as_deref(),
                    new.bio.as_deref(),
                    new.avatar_url.as_deref(),
                    new.theme_color.as_deref(),
                    i64::from(new.published),
                    now.to_rfc3339()
                ],
            )
            .await?;
        self.audit(user_id, EntityType::Page, &id, AuditAction::Created, None)
            .await?;

        Ok(Page {
            id,
            user_id: user_id.to_string(),
            slug,
            title: title.to_string(),
            subtitle: new.subtitle.clone(),
            bio: new.bio.clone(),
            avatar_url: new.avatar_url.clone(),
            theme_color: new.theme_color.clone(),
            published: new.published,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_page(&self, user_id: &str, id: &str) -> Result<Page, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM pages WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_page(&row)
    }

    /// Public lookup; drafts are reported as `NoResult`.
    pub async fn get_page_by_slug(&self, slug: &str) -> Result<Page, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM pages WHERE slug = ?1 AND published = 1");
        let mut rows = self.db().query(&sql, [slug]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_page(&row)
    }

    pub async fn list_pages(&self, user_id: &str) -> Result<Vec<Page>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM pages WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );
        let rows = self.db().query(&sql, [user_id]).await?;
        collect_rows(rows, row_to_page).await
    }

    pub async fn update_page(
        &self,
        user_id: &str,
        id: &str,
        update: PageUpdate,
    ) -> Result<Page, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref new_slug) = update.slug {
            slug::validate(new_slug)?;
            if self.page_slug_taken(new_slug, Some(id)).await? {
                return Err(DatabaseError::Conflict(format!("slug '{new_slug}' is already taken")));
            }
            sets.set("slug", new_slug.as_str());
        }
        if let Some(ref title) = update.title {
            if title.trim().is_empty() {
                return Err(DatabaseError::Validation("page title is required".into()));
            }
            sets.set("title", title.trim());
        }
        if let Some(ref subtitle) = update.subtitle {
            sets.set_opt("subtitle", subtitle.as_deref());
        }
        if let Some(ref bio) = update.bio {
            sets.set_opt("bio", bio.as_deref());
        }
        if let Some(ref avatar_url) = update.avatar_url {
            sets.set_opt("avatar_url", avatar_url.as_deref());
        }
        if let Some(ref theme_color) = update.theme_color {
            sets.set_opt("theme_color", theme_color.as_deref());
        }
        if let Some(published) = update.published {
            sets.set_bool("published", published);
        }

        if sets.is_empty() {
            return self.get_page(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("pages", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Page,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_page(user_id, id).await
    }

    /// Delete a page and all of its children. Events and leads that point at
    /// the page keep their rows with `page_id` nulled.
    pub async fn delete_page(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let mut rows = tx
                .query("SELECT 1 FROM pages WHERE id = ?1 AND user_id = ?2", [id, user_id])
                .await?;
            rows.next().await?.ok_or(DatabaseError::NoResult)?;

            for table in ["page_blocks", "social_links", "addresses", "interest_options"] {
                tx.execute(&format!("DELETE FROM {table} WHERE page_id = ?1"), [id])
                    .await?;
            }
            tx.execute("UPDATE events SET page_id = NULL WHERE page_id = ?1", [id])
                .await?;
            tx.execute("UPDATE leads SET page_id = NULL WHERE page_id = ?1", [id])
                .await?;
            tx.execute("DELETE FROM pages WHERE id = ?1", [id]).await?;

            self.audit_in(&tx, user_id, EntityType::Page, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    /// Page with every child collection, each ordered by position.
    pub async fn get_page_bundle(&self, user_id: &str, id: &str) -> Result<PageBundle, DatabaseError> {
        let page = self.get_page(user_id, id).await?;
        self.bundle_for(page, false).await
    }

    /// Published page by slug with visible blocks only.
    pub async fn get_public_page_bundle(&self, slug: &str) -> Result<PageBundle, DatabaseError> {
        let page = self.get_page_by_slug(slug).await?;
        self.bundle_for(page, true).await
    }

    async fn bundle_for(&self, page: Page, visible_only: bool) -> Result<PageBundle, DatabaseError> {
        let mut blocks = self.list_blocks_of(&page.id).await?;
        if visible_only {
            blocks.retain(|b| b.visible);
        }
        let social_links = self.list_social_links_of(&page.id).await?;
        let addresses = self.list_addresses_of(&page.id).await?;
        let interests = self.list_interests_of(&page.id).await?;
        Ok(PageBundle {
            page,
            blocks,
            social_links,
            addresses,
            interests,
        })
    }

    async fn page_slug_taken(&self, slug: &str, except_id: Option<&str>) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT 1 FROM pages WHERE slug = ?1 AND id != COALESCE(?2, '')",
                libsql::params![slug, except_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}
