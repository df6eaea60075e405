//! Referral reward unlocking and referral code generation.

use crate::entities::ReferralReward;

/// Ids of the rewards that become unlocked at `referral_count`.
///
/// A reward unlocks when it is still locked and its threshold is met.
/// Rewards already unlocked are never returned again.
#[must_use]
pub fn rewards_to_unlock(referral_count: i64, rewards: &[ReferralReward]) -> Vec<String> {
    rewards
        .iter()
        .filter(|r| r.unlocked_at.is_none() && r.threshold <= referral_count)
        .map(|r| r.id.clone())
        .collect()
}

/// Referrals still missing before `reward` unlocks (0 when unlocked).
#[must_use]
pub fn remaining_for(referral_count: i64, reward: &ReferralReward) -> i64 {
    if reward.unlocked_at.is_some() {
        return 0;
    }
    (reward.threshold - referral_count).max(0)
}

/// Build a referral code from a patient name and random hex suffix.
///
/// `"Maria da Silva"` + `"a3f8"` → `"MARIA-A3F8"`.
#[must_use]
pub fn referral_code(name: &str, random_hex: &str) -> String {
    let stem: String = name
        .split_whitespace()
        .next()
        .unwrap_or("PATIENT")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect::<String>()
        .to_uppercase();
    let stem = if stem.is_empty() { "PATIENT".to_string() } else { stem };
    format!("{stem}-{}", random_hex.to_uppercase())
}
