use crate::domain::money::Amount;
use crate::domain::profile::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
}

/// One referral relationship, created at signup and settled once the
/// referred user clears KYC. The bonus amount is frozen at creation so a
/// later config change cannot alter what an old referral pays.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: UserId,
    pub referred_user_id: UserId,
    pub code: String,
    pub status: ReferralStatus,
    pub bonus_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Referral {
    pub const COLLECTION: &'static str = "referrals";

    pub fn new(
        referrer_id: UserId,
        referred_user_id: UserId,
        code: impl Into<String>,
        bonus_amount: Amount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            referrer_id,
            referred_user_id,
            code: code.into(),
            status: ReferralStatus::Pending,
            bonus_amount: bonus_amount.value(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReferralStatus::Pending
    }

    /// Marks the referral settled. Returns false if it already was; the
    /// caller treats that as someone else having settled it first.
    pub fn complete(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = ReferralStatus::Completed;
        self.completed_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_complete_exactly_once() {
        let mut referral = Referral::new(
            UserId::from("referrer"),
            UserId::from("referred"),
            "ABC123ER",
            Amount::new(dec!(5)).unwrap(),
        );
        assert!(referral.is_pending());
        assert!(referral.complete());
        assert_eq!(referral.status, ReferralStatus::Completed);
        assert!(referral.completed_at.is_some());

        let first_completed_at = referral.completed_at;
        assert!(!referral.complete());
        assert_eq!(referral.completed_at, first_completed_at);
    }
}
