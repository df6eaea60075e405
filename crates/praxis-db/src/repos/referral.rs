//! Patient-to-patient referrals and threshold rewards.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::audit_detail::UnlockedDetail;
use praxis_core::entities::{PatientReferral, ReferralReward};
use praxis_core::enums::{AuditAction, EntityType, EventKind, LeadSource};
use praxis_core::ids::{PREFIX_REFERRAL, PREFIX_REWARD};
use praxis_core::referral::rewards_to_unlock;

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{collect_rows, get_opt_string, parse_datetime, parse_optional_datetime};
use crate::repos::event::NewEvent;
use crate::repos::lead::{NewLead, ensure_owned_in};
use crate::service::PraxisService;

const REWARD_COLS: &str =
    "id, user_id, patient_id, title, description, threshold, unlocked_at, redeemed_at, created_at";
const REFERRAL_COLS: &str = "id, user_id, referrer_patient_id, lead_id, referred_name, referred_email, referred_phone, created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewReward {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub threshold: i64,
}

/// Contact details of the person being referred.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralContact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn row_to_reward(row: &libsql::Row) -> Result<ReferralReward, DatabaseError> {
    Ok(ReferralReward {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        patient_id: row.get::<String>(2)?,
        title: row.get::<String>(3)?,
        description: get_opt_string(row, 4)?,
        threshold: row.get::<i64>(5)?,
        unlocked_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        redeemed_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

fn row_to_referral(row: &libsql::Row) -> Result<PatientReferral, DatabaseError> {
    Ok(PatientReferral {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        referrer_patient_id: row.get::<String>(2)?,
        lead_id: get_opt_string(row, 3)?,
        referred_name: row.get::<String>(4)?,
        referred_email: get_opt_string(row, 5)?,
        referred_phone: get_opt_string(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

async fn get_reward_in(tx: &Tx<'_>, user_id: &str, id: &str) -> Result<ReferralReward, DatabaseError> {
    let sql = format!("SELECT {REWARD_COLS} FROM referral_rewards WHERE id = ?1 AND user_id = ?2");
    let mut rows = tx.query(&sql, [id, user_id]).await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    row_to_reward(&row)
}

async fn referral_count_in(tx: &Tx<'_>, patient_id: &str) -> Result<i64, DatabaseError> {
    let mut rows = tx
        .query("SELECT referral_count FROM patients WHERE id = ?1", [patient_id])
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<i64>(0)?)
}

impl PraxisService {
    /// Create a reward for a patient. A reward whose threshold the patient
    /// already meets is unlocked immediately.
    pub async fn create_reward(
        &self,
        user_id: &str,
        patient_id: &str,
        new: &NewReward,
    ) -> Result<ReferralReward, DatabaseError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(DatabaseError::Validation("reward title is required".into()));
        }
        if new.threshold < 1 {
            return Err(DatabaseError::Validation("reward threshold must be at least 1".into()));
        }

        let tx = self.db().transaction().await?;
        let result: Result<String, DatabaseError> = async {
            ensure_owned_in(&tx, "patients", patient_id, user_id).await?;
            let id = self.db().generate_id(PREFIX_REWARD).await?;
            tx.execute(
                "INSERT INTO referral_rewards (id, user_id, patient_id, title, description, threshold, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    patient_id,
                    title,
                    new.description.as_deref(),
                    new.threshold,
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::Reward, &id, AuditAction::Created, None)
                .await?;
            self.unlock_rewards_in(&tx, user_id, patient_id).await?;
            Ok(id)
        }
        .await;
        let id = tx.finish(result).await?;
        self.get_reward(user_id, &id).await
    }

    pub async fn get_reward(&self, user_id: &str, id: &str) -> Result<ReferralReward, DatabaseError> {
        let sql = format!("SELECT {REWARD_COLS} FROM referral_rewards WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_reward(&row)
    }

    /// Rewards of one patient, lowest threshold first.
    pub async fn list_rewards(
        &self,
        user_id: &str,
        patient_id: &str,
    ) -> Result<Vec<ReferralReward>, DatabaseError> {
        self.get_patient(user_id, patient_id).await?;
        let sql = format!(
            "SELECT {REWARD_COLS} FROM referral_rewards WHERE patient_id = ?1 AND user_id = ?2
             ORDER BY threshold, created_at"
        );
        let rows = self.db().query(&sql, [patient_id, user_id]).await?;
        collect_rows(rows, row_to_reward).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the reward is still locked or
    /// was already redeemed.
    pub async fn redeem_reward(&self, user_id: &str, id: &str) -> Result<ReferralReward, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let reward = get_reward_in(&tx, user_id, id).await?;
            if reward.unlocked_at.is_none() {
                return Err(DatabaseError::InvalidState(format!("reward {id} is still locked")));
            }
            if reward.redeemed_at.is_some() {
                return Err(DatabaseError::InvalidState(format!("reward {id} was already redeemed")));
            }
            tx.execute(
                "UPDATE referral_rewards SET redeemed_at = ?1 WHERE id = ?2",
                libsql::params![Utc::now().to_rfc3339(), id],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::Reward, id, AuditAction::Redeemed, None)
                .await
        }
        .await;
        tx.finish(result).await?;
        self.get_reward(user_id, id).await
    }

    pub async fn delete_reward(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute(
                "DELETE FROM referral_rewards WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )
            .await?;
        crate::helpers::ensure_affected(affected)?;
        self.audit(user_id, EntityType::Reward, id, AuditAction::Deleted, None)
            .await
    }

    /// Register a referral made with a patient's code.
    ///
    /// In one transaction: creates a `referral` lead for the referred person,
    /// stores the referral, increments the referrer's `referral_count` and
    /// unlocks every reward whose threshold is now met.
    pub async fn register_referral(
        &self,
        code: &str,
        contact: &ReferralContact,
    ) -> Result<PatientReferral, DatabaseError> {
        let referrer = self.get_patient_by_referral_code(code).await?;
        let user_id = referrer.user_id.as_str();
        let name = contact.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("referred name is required".into()));
        }

        let new_lead = NewLead {
            name: name.to_string(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            notes: Some(format!("Referred by {}", referrer.name)),
            source: LeadSource::Referral,
            metadata: Some(serde_json::json!({
                "referrer_patient_id": referrer.id,
                "referral_code": referrer.referral_code,
            })),
            ..Default::default()
        };

        let tx = self.db().transaction().await?;
        let result: Result<PatientReferral, DatabaseError> = async {
            let lead = self.insert_lead_in(&tx, user_id, &new_lead).await?;

            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_REFERRAL).await?;
            tx.execute(
                &format!("INSERT INTO patient_referrals ({REFERRAL_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                libsql::params![
                    id.as_str(),
                    user_id,
                    referrer.id.as_str(),
                    lead.id.as_str(),
                    name,
                    contact.email.as_deref(),
                    contact.phone.as_deref(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            tx.execute(
                "UPDATE patients SET referral_count = referral_count + 1, updated_at = ?1 WHERE id = ?2",
                libsql::params![now.to_rfc3339(), referrer.id.as_str()],
            )
            .await?;
            self.unlock_rewards_in(&tx, user_id, &referrer.id).await?;

            self.insert_event_in(
                &tx,
                &NewEvent {
                    user_id: user_id.to_string(),
                    kind: EventKind::ReferralCreated,
                    lead_id: Some(lead.id.clone()),
                    metadata: Some(serde_json::json!({ "referrer_patient_id": referrer.id })),
                    ..Default::default()
                },
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::Referral, &id, AuditAction::Created, None)
                .await?;

            Ok(PatientReferral {
                id,
                user_id: user_id.to_string(),
                referrer_patient_id: referrer.id.clone(),
                lead_id: Some(lead.id),
                referred_name: name.to_string(),
                referred_email: contact.email.clone(),
                referred_phone: contact.phone.clone(),
                created_at: now,
            })
        }
        .await;
        let referral = tx.finish(result).await?;
        tracing::info!(referral_id = %referral.id, referrer = %referral.referrer_patient_id, "referral registered");
        Ok(referral)
    }

    /// Newest first, optionally restricted to one referrer.
    pub async fn list_referrals(
        &self,
        user_id: &str,
        patient_id: Option<&str>,
    ) -> Result<Vec<PatientReferral>, DatabaseError> {
        let sql = format!(
            "SELECT {REFERRAL_COLS} FROM patient_referrals
             WHERE user_id = ?1 AND (?2 IS NULL OR referrer_patient_id = ?2)
             ORDER BY created_at DESC, rowid DESC"
        );
        let rows = self
            .db()
            .query(&sql, libsql::params![user_id, patient_id])
            .await?;
        collect_rows(rows, row_to_referral).await
    }

    /// Mark every reward the patient's current count unlocks.
    async fn unlock_rewards_in(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        patient_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let count = referral_count_in(tx, patient_id).await?;
        let sql = format!(
            "SELECT {REWARD_COLS} FROM referral_rewards WHERE patient_id = ?1 AND unlocked_at IS NULL"
        );
        let rows = tx.query(&sql, [patient_id]).await?;
        let locked = collect_rows(rows, row_to_reward).await?;
        let unlocked = rewards_to_unlock(count, &locked);

        let now = Utc::now().to_rfc3339();
        for reward in locked.iter().filter(|r| unlocked.contains(&r.id)) {
            tx.execute(
                "UPDATE referral_rewards SET unlocked_at = ?1 WHERE id = ?2",
                libsql::params![now.as_str(), reward.id.as_str()],
            )
            .await?;
            let detail = UnlockedDetail {
                threshold: reward.threshold,
                referral_count: count,
            };
            self.audit_in(
                tx,
                user_id,
                EntityType::Reward,
                &reward.id,
                AuditAction::Unlocked,
                Some(serde_json::to_value(&detail)?),
            )
            .await?;
        }
        Ok(unlocked)
    }
}
