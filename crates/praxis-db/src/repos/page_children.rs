//! Page children: content blocks, social links, addresses and interest
//! options. Every operation checks that the parent page belongs to the
//! calling doctor.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::entities::{Address, InterestOption, PageBlock, SocialLink};
use praxis_core::enums::{AuditAction, BlockKind, EntityType};
use praxis_core::ids::{PREFIX_ADDRESS, PREFIX_BLOCK, PREFIX_INTEREST, PREFIX_SOCIAL_LINK};

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{collect_rows, get_bool, get_opt_string, parse_datetime, parse_enum};
use crate::repos::lead::ensure_owned_in;
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::page::{AddressUpdate, BlockUpdate};

const BLOCK_COLS: &str = "id, page_id, kind, title, content, position, visible";
const SOCIAL_COLS: &str = "id, page_id, platform, url, position";
const ADDRESS_COLS: &str =
    "id, page_id, label, street, city, state, postal_code, is_default, created_at";
const INTEREST_COLS: &str = "id, page_id, label, is_default, position";

fn default_content() -> serde_json::Value {
    serde_json::json!({})
}

const fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlock {
    pub kind: BlockKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_content")]
    pub content: serde_json::Value,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSocialLink {
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAddress {
    #[serde(default)]
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

fn row_to_block(row: &libsql::Row) -> Result<PageBlock, DatabaseError> {
    let content = row.get::<String>(4)?;
    Ok(PageBlock {
        id: row.get::<String>(0)?,
        page_id: row.get::<String>(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        title: get_opt_string(row, 3)?,
        content: serde_json::from_str(&content)?,
        position: row.get::<i64>(5)?,
        visible: get_bool(row, 6)?,
    })
}

fn row_to_social_link(row: &libsql::Row) -> Result<SocialLink, DatabaseError> {
    Ok(SocialLink {
        id: row.get::<String>(0)?,
        page_id: row.get::<String>(1)?,
        platform: row.get::<String>(2)?,
        url: row.get::<String>(3)?,
        position: row.get::<i64>(4)?,
    })
}

fn row_to_address(row: &libsql::Row) -> Result<Address, DatabaseError> {
    Ok(Address {
        id: row.get::<String>(0)?,
        page_id: row.get::<String>(1)?,
        label: get_opt_string(row, 2)?,
        street: row.get::<String>(3)?,
        city: row.get::<String>(4)?,
        state: get_opt_string(row, 5)?,
        postal_code: get_opt_string(row, 6)?,
        is_default: get_bool(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

fn row_to_interest(row: &libsql::Row) -> Result<InterestOption, DatabaseError> {
    Ok(InterestOption {
        id: row.get::<String>(0)?,
        page_id: row.get::<String>(1)?,
        label: row.get::<String>(2)?,
        is_default: get_bool(row, 3)?,
        position: row.get::<i64>(4)?,
    })
}

/// Page id of a child row, provided the page belongs to `user_id`.
async fn child_page_in(
    tx: &Tx<'_>,
    table: &str,
    id: &str,
    user_id: &str,
) -> Result<String, DatabaseError> {
    let sql = format!(
        "SELECT c.page_id FROM {table} c JOIN pages p ON p.id = c.page_id
         WHERE c.id = ?1 AND p.user_id = ?2"
    );
    let mut rows = tx.query(&sql, [id, user_id]).await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<String>(0)?)
}

async fn next_child_position_in(
    tx: &Tx<'_>,
    table: &str,
    page_id: &str,
) -> Result<i64, DatabaseError> {
    let sql = format!("SELECT COALESCE(MAX(position) + 1, 0) FROM {table} WHERE page_id = ?1");
    let mut rows = tx.query(&sql, [page_id]).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}

impl PraxisService {
    async fn ensure_page_owned(&self, user_id: &str, page_id: &str) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT 1 FROM pages WHERE id = ?1 AND user_id = ?2",
                [page_id, user_id],
            )
            .await?;
        rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(())
    }

    // -- blocks ------------------------------------------------------------

    pub async fn add_block(
        &self,
        user_id: &str,
        page_id: &str,
        new: &NewBlock,
    ) -> Result<PageBlock, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<PageBlock, DatabaseError> = async {
            ensure_owned_in(&tx, "pages", page_id, user_id).await?;
            let position = next_child_position_in(&tx, "page_blocks", page_id).await?;
            let id = self.db().generate_id(PREFIX_BLOCK).await?;
            tx.execute(
                &format!("INSERT INTO page_blocks ({BLOCK_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    id.as_str(),
                    page_id,
                    new.kind.as_str(),
                    new.title.as_deref(),
                    new.content.to_string(),
                    position,
                    i64::from(new.visible)
                ],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::PageBlock, &id, AuditAction::Created, None)
                .await?;
            Ok(PageBlock {
                id,
                page_id: page_id.to_string(),
                kind: new.kind,
                title: new.title.clone(),
                content: new.content.clone(),
                position,
                visible: new.visible,
            })
        }
        .await;
        tx.finish(result).await
    }

    pub async fn update_block(
        &self,
        user_id: &str,
        id: &str,
        update: BlockUpdate,
    ) -> Result<PageBlock, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<PageBlock, DatabaseError> = async {
            child_page_in(&tx, "page_blocks", id, user_id).await?;

            let mut sets = SetClauses::new();
            if let Some(kind) = update.kind {
                sets.set("kind", kind.as_str());
            }
            if let Some(ref title) = update.title {
                sets.set_opt("title", title.as_deref());
            }
            if let Some(ref content) = update.content {
                sets.set("content", content.to_string());
            }
            if let Some(visible) = update.visible {
                sets.set_bool("visible", visible);
            }
            if !sets.is_empty() {
                let (sql, params) = sets.into_sql("page_blocks", id, None);
                tx.execute(&sql, libsql::params_from_iter(params)).await?;
                self.audit_in(
                    &tx,
                    user_id,
                    EntityType::PageBlock,
                    id,
                    AuditAction::Updated,
                    Some(serde_json::to_value(&update)?),
                )
                .await?;
            }

            let sql = format!("SELECT {BLOCK_COLS} FROM page_blocks WHERE id = ?1");
            let mut rows = tx.query(&sql, [id]).await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row_to_block(&row)
        }
        .await;
        tx.finish(result).await
    }

    /// Delete a block and close the gap in the page's ordering.
    pub async fn delete_block(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let page_id = child_page_in(&tx, "page_blocks", id, user_id).await?;
            let mut rows = tx
                .query("SELECT position FROM page_blocks WHERE id = ?1", [id])
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let position = row.get::<i64>(0)?;

            tx.execute("DELETE FROM page_blocks WHERE id = ?1", [id]).await?;
            tx.execute(
                "UPDATE page_blocks SET position = position - 1 WHERE page_id = ?1 AND position > ?2",
                libsql::params![page_id.as_str(), position],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::PageBlock, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    /// Rewrite block positions to follow `ids`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` unless `ids` names every block of
    /// the page exactly once.
    pub async fn reorder_blocks(
        &self,
        user_id: &str,
        page_id: &str,
        ids: &[String],
    ) -> Result<Vec<PageBlock>, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            ensure_owned_in(&tx, "pages", page_id, user_id).await?;

            let mut rows = tx
                .query("SELECT id FROM page_blocks WHERE page_id = ?1", [page_id])
                .await?;
            let mut current = Vec::new();
            while let Some(row) = rows.next().await? {
                current.push(row.get::<String>(0)?);
            }
            let mut requested = ids.to_vec();
            requested.sort();
            requested.dedup();
            current.sort();
            if requested.len() != ids.len() || requested != current {
                return Err(DatabaseError::Validation(
                    "block order must list every block of the page exactly once".into(),
                ));
            }

            for (position, id) in ids.iter().enumerate() {
                tx.execute(
                    "UPDATE page_blocks SET position = ?1 WHERE id = ?2",
                    libsql::params![i64::try_from(position).unwrap_or(i64::MAX), id.as_str()],
                )
                .await?;
            }
            self.audit_in(
                &tx,
                user_id,
                EntityType::Page,
                page_id,
                AuditAction::Reordered,
                Some(serde_json::json!({ "blocks": ids })),
            )
            .await
        }
        .await;
        tx.finish(result).await?;
        self.list_blocks_of(page_id).await
    }

    pub async fn list_blocks(&self, user_id: &str, page_id: &str) -> Result<Vec<PageBlock>, DatabaseError> {
        self.ensure_page_owned(user_id, page_id).await?;
        self.list_blocks_of(page_id).await
    }

    pub(crate) async fn list_blocks_of(&self, page_id: &str) -> Result<Vec<PageBlock>, DatabaseError> {
        let sql = format!("SELECT {BLOCK_COLS} FROM page_blocks WHERE page_id = ?1 ORDER BY position");
        let rows = self.db().query(&sql, [page_id]).await?;
        collect_rows(rows, row_to_block).await
    }

    // -- social links ------------------------------------------------------

    pub async fn add_social_link(
        &self,
        user_id: &str,
        page_id: &str,
        new: &NewSocialLink,
    ) -> Result<SocialLink, DatabaseError> {
        let platform = new.platform.trim().to_lowercase();
        if platform.is_empty() || new.url.trim().is_empty() {
            return Err(DatabaseError::Validation("platform and url are required".into()));
        }

        let tx = self.db().transaction().await?;
        let result: Result<SocialLink, DatabaseError> = async {
            ensure_owned_in(&tx, "pages", page_id, user_id).await?;
            let position = next_child_position_in(&tx, "social_links", page_id).await?;
            let id = self.db().generate_id(PREFIX_SOCIAL_LINK).await?;
            tx.execute(
                &format!("INSERT INTO social_links ({SOCIAL_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                libsql::params![id.as_str(), page_id, platform.as_str(), new.url.trim(), position],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::SocialLink, &id, AuditAction::Created, None)
                .await?;
            Ok(SocialLink {
                id,
                page_id: page_id.to_string(),
                platform: platform.clone(),
                url: new.url.trim().to_string(),
                position,
            })
        }
        .await;
        tx.finish(result).await
    }

    pub async fn delete_social_link(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            child_page_in(&tx, "social_links", id, user_id).await?;
            tx.execute("DELETE FROM social_links WHERE id = ?1", [id]).await?;
            self.audit_in(&tx, user_id, EntityType::SocialLink, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    pub async fn list_social_links(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> Result<Vec<SocialLink>, DatabaseError> {
        self.ensure_page_owned(user_id, page_id).await?;
        self.list_social_links_of(page_id).await
    }

    pub(crate) async fn list_social_links_of(
        &self,
        page_id: &str,
    ) -> Result<Vec<SocialLink>, DatabaseError> {
        let sql = format!("SELECT {SOCIAL_COLS} FROM social_links WHERE page_id = ?1 ORDER BY position");
        let rows = self.db().query(&sql, [page_id]).await?;
        collect_rows(rows, row_to_social_link).await
    }

    // -- addresses ---------------------------------------------------------

    /// Add an address; the first address of a page becomes its default.
    pub async fn add_address(
        &self,
        user_id: &str,
        page_id: &str,
        new: &NewAddress,
    ) -> Result<Address, DatabaseError> {
        if new.street.trim().is_empty() || new.city.trim().is_empty() {
            return Err(DatabaseError::Validation("street and city are required".into()));
        }

        let tx = self.db().transaction().await?;
        let result: Result<Address, DatabaseError> = async {
            ensure_owned_in(&tx, "pages", page_id, user_id).await?;
            let mut rows = tx
                .query("SELECT COUNT(*) FROM addresses WHERE page_id = ?1", [page_id])
                .await?;
            let existing = match rows.next().await? {
                Some(row) => row.get::<i64>(0)?,
                None => 0,
            };
            let is_default = existing == 0;

            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_ADDRESS).await?;
            tx.execute(
                &format!("INSERT INTO addresses ({ADDRESS_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                libsql::params![
                    id.as_str(),
                    page_id,
                    new.label.as_deref(),
                    new.street.trim(),
                    new.city.trim(),
                    new.state.as_deref(),
                    new.postal_code.as_deref(),
                    i64::from(is_default),
                    now.to_rfc3339()
                ],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::Address, &id, AuditAction::Created, None)
                .await?;
            Ok(Address {
                id,
                page_id: page_id.to_string(),
                label: new.label.clone(),
                street: new.street.trim().to_string(),
                city: new.city.trim().to_string(),
                state: new.state.clone(),
                postal_code: new.postal_code.clone(),
                is_default,
                created_at: now,
            })
        }
        .await;
        tx.finish(result).await
    }

    pub async fn update_address(
        &self,
        user_id: &str,
        id: &str,
        update: AddressUpdate,
    ) -> Result<Address, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<Address, DatabaseError> = async {
            child_page_in(&tx, "addresses", id, user_id).await?;

            let mut sets = SetClauses::new();
            if let Some(ref label) = update.label {
                sets.set_opt("label", label.as_deref());
            }
            if let Some(ref street) = update.street {
                if street.trim().is_empty() {
                    return Err(DatabaseError::Validation("street is required".into()));
                }
                sets.set("street", street.trim());
            }
            if let Some(ref city) = update.city {
                if city.trim().is_empty() {
                    return Err(DatabaseError::Validation("city is required".into()));
                }
                sets.set("city", city.trim());
            }
            if let Some(ref state) = update.state {
                sets.set_opt("state", state.as_deref());
            }
            if let Some(ref postal_code) = update.postal_code {
                sets.set_opt("postal_code", postal_code.as_deref());
            }
            if !sets.is_empty() {
                let (sql, params) = sets.into_sql("addresses", id, None);
                tx.execute(&sql, libsql::params_from_iter(params)).await?;
                self.audit_in(
                    &tx,
                    user_id,
                    EntityType::Address,
                    id,
                    AuditAction::Updated,
                    Some(serde_json::to_value(&update)?),
                )
                .await?;
            }

            let sql = format!("SELECT {ADDRESS_COLS} FROM addresses WHERE id = ?1");
            let mut rows = tx.query(&sql, [id]).await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row_to_address(&row)
        }
        .await;
        tx.finish(result).await
    }

    /// Make `id` the only default address of its page.
    pub async fn set_default_address(&self, user_id: &str, id: &str) -> Result<Address, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<Address, DatabaseError> = async {
            let page_id = child_page_in(&tx, "addresses", id, user_id).await?;
            tx.execute(
                "UPDATE addresses SET is_default = (id = ?1) WHERE page_id = ?2",
                [id, page_id.as_str()],
            )
            .await?;
            self.audit_in(
                &tx,
                user_id,
                EntityType::Address,
                id,
                AuditAction::Updated,
                Some(serde_json::json!({ "is_default": true })),
            )
            .await?;

            let sql = format!("SELECT {ADDRESS_COLS} FROM addresses WHERE id = ?1");
            let mut rows = tx.query(&sql, [id]).await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row_to_address(&row)
        }
        .await;
        tx.finish(result).await
    }

    /// Delete an address. When it was the default, the oldest remaining
    /// address is promoted.
    pub async fn delete_address(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let page_id = child_page_in(&tx, "addresses", id, user_id).await?;
            let mut rows = tx
                .query("SELECT is_default FROM addresses WHERE id = ?1", [id])
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let was_default = get_bool(&row, 0)?;

            tx.execute("DELETE FROM addresses WHERE id = ?1", [id]).await?;
            if was_default {
                tx.execute(
                    "UPDATE addresses SET is_default = 1 WHERE id = (
                         SELECT id FROM addresses WHERE page_id = ?1
                         ORDER BY created_at, rowid LIMIT 1
                     )",
                    [page_id.as_str()],
                )
                .await?;
            }
            self.audit_in(&tx, user_id, EntityType::Address, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    pub async fn list_addresses(&self, user_id: &str, page_id: &str) -> Result<Vec<Address>, DatabaseError> {
        self.ensure_page_owned(user_id, page_id).await?;
        self.list_addresses_of(page_id).await
    }

    pub(crate) async fn list_addresses_of(&self, page_id: &str) -> Result<Vec<Address>, DatabaseError> {
        let sql = format!(
            "SELECT {ADDRESS_COLS} FROM addresses WHERE page_id = ?1 ORDER BY is_default DESC, created_at, rowid"
        );
        let rows = self.db().query(&sql, [page_id]).await?;
        collect_rows(rows, row_to_address).await
    }

    // -- interest options --------------------------------------------------

    /// Add an interest option; the first option of a page becomes its default.
    pub async fn add_interest(
        &self,
        user_id: &str,
        page_id: &str,
        label: &str,
    ) -> Result<InterestOption, DatabaseError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DatabaseError::Validation("interest label is required".into()));
        }

        let tx = self.db().transaction().await?;
        let result: Result<InterestOption, DatabaseError> = async {
            ensure_owned_in(&tx, "pages", page_id, user_id).await?;
            let position = next_child_position_in(&tx, "interest_options", page_id).await?;
            let is_default = position == 0;
            let id = self.db().generate_id(PREFIX_INTEREST).await?;
            tx.execute(
                &format!("INSERT INTO interest_options ({INTEREST_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                libsql::params![id.as_str(), page_id, label, i64::from(is_default), position],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::InterestOption, &id, AuditAction::Created, None)
                .await?;
            Ok(InterestOption {
                id,
                page_id: page_id.to_string(),
                label: label.to_string(),
                is_default,
                position,
            })
        }
        .await;
        tx.finish(result).await
    }

    /// Delete an interest option, promoting the first remaining one when the
    /// default goes away.
    pub async fn delete_interest(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let page_id = child_page_in(&tx, "interest_options", id, user_id).await?;
            let mut rows = tx
                .query("SELECT is_default FROM interest_options WHERE id = ?1", [id])
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let was_default = get_bool(&row, 0)?;

            tx.execute("DELETE FROM interest_options WHERE id = ?1", [id]).await?;
            if was_default {
                tx.execute(
                    "UPDATE interest_options SET is_default = 1 WHERE id = (
                         SELECT id FROM interest_options WHERE page_id = ?1
                         ORDER BY position LIMIT 1
                     )",
                    [page_id.as_str()],
                )
                .await?;
            }
            self.audit_in(&tx, user_id, EntityType::InterestOption, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    pub async fn set_default_interest(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<InterestOption, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<InterestOption, DatabaseError> = async {
            let page_id = child_page_in(&tx, "interest_options", id, user_id).await?;
            tx.execute(
                "UPDATE interest_options SET is_default = (id = ?1) WHERE page_id = ?2",
                [id, page_id.as_str()],
            )
            .await?;
            self.audit_in(
                &tx,
                user_id,
                EntityType::InterestOption,
                id,
                AuditAction::Updated,
                Some(serde_json::json!({ "is_default": true })),
            )
            .await?;

            let sql = format!("SELECT {INTEREST_COLS} FROM interest_options WHERE id = ?1");
            let mut rows = tx.query(&sql, [id]).await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row_to_interest(&row)
        }
        .await;
        tx.finish(result).await
    }

    pub async fn list_interests(
        &self,
        user_id: &str,
        page_id: &str,
    ) -> Result<Vec<InterestOption>, DatabaseError> {
        self.ensure_page_owned(user_id, page_id).await?;
        self.list_interests_of(page_id).await
    }

    pub(crate) async fn list_interests_of(
        &self,
        page_id: &str,
    ) -> Result<Vec<InterestOption>, DatabaseError> {
        let sql = format!(
            "SELECT {INTEREST_COLS} FROM interest_options WHERE page_id = ?1 ORDER BY position"
        );
        let rows = self.db().query(&sql, [page_id]).await?;
        collect_rows(rows, row_to_interest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::page::NewPage;
    use crate::test_support::helpers::{create_test_user, service_with_user};
    use pretty_assertions::assert_eq;

    async fn setup() -> (PraxisService, String, String) {
        let (svc, user_id) = service_with_user().await;
        let page = svc
            .create_page(
                &user_id,
                &NewPage {
                    title: "Consultório".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (svc, user_id, page.id)
    }

    fn text_block(title: &str) -> NewBlock {
        NewBlock {
            kind: BlockKind::Text,
            title: Some(title.to_string()),
            content: serde_json::json!({"text": title}),
            visible: true,
        }
    }

    fn address(street: &str) -> NewAddress {
        NewAddress {
            street: street.to_string(),
            city: "Campinas".into(),
            ..Default::default()
        }
    }

    fn titles(blocks: &[PageBlock]) -> Vec<String> {
        blocks.iter().filter_map(|b| b.title.clone()).collect()
    }

    #[tokio::test]
    async fn blocks_append_and_reorder() {
        let (svc, user_id, page_id) = setup().await;
        let a = svc.add_block(&user_id, &page_id, &text_block("A")).await.unwrap();
        let b = svc.add_block(&user_id, &page_id, &text_block("B")).await.unwrap();
        let c = svc.add_block(&user_id, &page_id, &text_block("C")).await.unwrap();
        assert_eq!(c.position, 2);

        let reordered = svc
            .reorder_blocks(&user_id, &page_id, &[c.id.clone(), a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(titles(&reordered), vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn reorder_requires_every_block_once() {
        let (svc, user_id, page_id) = setup().await;
        let a = svc.add_block(&user_id, &page_id, &text_block("A")).await.unwrap();
        svc.add_block(&user_id, &page_id, &text_block("B")).await.unwrap();

        let err = svc
            .reorder_blocks(&user_id, &page_id, std::slice::from_ref(&a.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));

        let err = svc
            .reorder_blocks(&user_id, &page_id, &[a.id.clone(), a.id.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_block_compacts_positions() {
        let (svc, user_id, page_id) = setup().await;
        let a = svc.add_block(&user_id, &page_id, &text_block("A")).await.unwrap();
        svc.add_block(&user_id, &page_id, &text_block("B")).await.unwrap();

        svc.delete_block(&user_id, &a.id).await.unwrap();
        let blocks = svc.list_blocks(&user_id, &page_id).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].position, 0);
    }

    #[tokio::test]
    async fn update_block_content_and_visibility() {
        let (svc, user_id, page_id) = setup().await;
        let a = svc.add_block(&user_id, &page_id, &text_block("A")).await.unwrap();
        let updated = svc
            .update_block(
                &user_id,
                &a.id,
                BlockUpdate {
                    content: Some(serde_json::json!({"text": "changed"})),
                    visible: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content, serde_json::json!({"text": "changed"}));
        assert!(!updated.visible);
    }

    #[tokio::test]
    async fn children_of_foreign_page_are_hidden() {
        let (svc, user_id, page_id) = setup().await;
        let other = create_test_user(&svc, "Bruno Lima").await;
        let a = svc.add_block(&user_id, &page_id, &text_block("A")).await.unwrap();

        assert!(matches!(
            svc.add_block(&other.id, &page_id, &text_block("X")).await,
            Err(DatabaseError::NoResult)
        ));
        assert!(matches!(svc.delete_block(&other.id, &a.id).await, Err(DatabaseError::NoResult)));
        assert!(matches!(
            svc.list_blocks(&other.id, &page_id).await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn social_links_lowercase_platform() {
        let (svc, user_id, page_id) = setup().await;
        let link = svc
            .add_social_link(
                &user_id,
                &page_id,
                &NewSocialLink {
                    platform: "Instagram".into(),
                    url: "https://instagram.com/dra.ana".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(link.platform, "instagram");

        svc.delete_social_link(&user_id, &link.id).await.unwrap();
        assert!(svc.list_social_links(&user_id, &page_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_address_is_default_and_default_is_single() {
        let (svc, user_id, page_id) = setup().await;
        let first = svc.add_address(&user_id, &page_id, &address("Rua A, 1")).await.unwrap();
        let second = svc.add_address(&user_id, &page_id, &address("Rua B, 2")).await.unwrap();
        assert!(first.is_default);
        assert!(!second.is_default);

        svc.set_default_address(&user_id, &second.id).await.unwrap();
        let defaults: Vec<String> = svc
            .list_addresses(&user_id, &page_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.is_default)
            .map(|a| a.id)
            .collect();
        assert_eq!(defaults, vec![second.id]);
    }

    #[tokio::test]
    async fn deleting_default_address_promotes_oldest() {
        let (svc, user_id, page_id) = setup().await;
        let first = svc.add_address(&user_id, &page_id, &address("Rua A, 1")).await.unwrap();
        let second = svc.add_address(&user_id, &page_id, &address("Rua B, 2")).await.unwrap();
        svc.add_address(&user_id, &page_id, &address("Rua C, 3")).await.unwrap();

        svc.delete_address(&user_id, &first.id).await.unwrap();
        let remaining = svc.list_addresses(&user_id, &page_id).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].id, second.id);
        assert!(remaining[0].is_default);
    }

    #[tokio::test]
    async fn update_address_rejects_blank_city() {
        let (svc, user_id, page_id) = setup().await;
        let a = svc.add_address(&user_id, &page_id, &address("Rua A, 1")).await.unwrap();
        let err = svc
            .update_address(
                &user_id,
                &a.id,
                AddressUpdate {
                    city: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn interest_default_is_single_and_promoted() {
        let (svc, user_id, page_id) = setup().await;
        let botox = svc.add_interest(&user_id, &page_id, "Botox").await.unwrap();
        let peeling = svc.add_interest(&user_id, &page_id, "Peeling").await.unwrap();
        assert!(botox.is_default);

        let now_default = svc.set_default_interest(&user_id, &peeling.id).await.unwrap();
        assert!(now_default.is_default);
        let list = svc.list_interests(&user_id, &page_id).await.unwrap();
        assert_eq!(list.iter().filter(|i| i.is_default).count(), 1);

        svc.delete_interest(&user_id, &peeling.id).await.unwrap();
        let list = svc.list_interests(&user_id, &page_id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_default);
    }
}
