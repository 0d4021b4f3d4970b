use crate::domain::profile::UserId;
use crate::domain::rate::ExchangeQuote;
use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// An admin's verdict on a pending submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: String },
}

/// A gift card handed in by a user, carrying the amount quoted at
/// submission time. The quote is frozen here so later rate edits cannot
/// change what an approval pays out.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct GiftCardSubmission {
    pub id: Uuid,
    pub user_id: UserId,
    pub card_type: String,
    pub card_value: Decimal,
    pub calculated_amount: Decimal,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GiftCardSubmission {
    pub const COLLECTION: &'static str = "gift_card_submissions";

    pub fn new(user_id: UserId, quote: &ExchangeQuote) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            card_type: quote.card_type.clone(),
            card_value: quote.card_value,
            calculated_amount: quote.exchange_amount,
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }

    /// Applies a review verdict. A submission leaves `pending` exactly
    /// once; any later attempt is rejected.
    pub fn review(
        &mut self,
        decision: &ReviewDecision,
        reviewer: UserId,
    ) -> Result<(), ExchangeError> {
        if !self.is_pending() {
            return Err(ExchangeError::AlreadyReviewed {
                collection: Self::COLLECTION,
                id: self.id.to_string(),
            });
        }
        match decision {
            ReviewDecision::Approve => {
                self.status = SubmissionStatus::Approved;
            }
            ReviewDecision::Reject { reason } => {
                self.status = SubmissionStatus::Rejected;
                self.rejection_reason = Some(reason.clone());
            }
        }
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{LoyaltyTier, TierSchedule};
    use crate::domain::rate::{DEFAULT_CURRENCY, Rate, RateStatus};
    use rust_decimal_macros::dec;

    fn submission() -> GiftCardSubmission {
        let rate = Rate {
            card_type: "Steam".to_string(),
            buy_rate: dec!(0.75),
            sell_rate: dec!(0.78),
            currency: DEFAULT_CURRENCY.to_string(),
            status: RateStatus::Active,
            last_updated: Utc::now(),
        };
        let quote = ExchangeQuote::compute(
            &rate,
            dec!(200),
            LoyaltyTier::Bronze,
            &TierSchedule::default(),
        )
        .unwrap();
        GiftCardSubmission::new(UserId::from("user-1"), &quote)
    }

    #[test]
    fn test_new_submission_freezes_quote() {
        let s = submission();
        assert_eq!(s.status, SubmissionStatus::Pending);
        assert_eq!(s.calculated_amount, dec!(150.00));
        assert_eq!(s.card_value, dec!(200));
    }

    #[test]
    fn test_review_approve() {
        let mut s = submission();
        s.review(&ReviewDecision::Approve, UserId::from("admin-1"))
            .unwrap();
        assert_eq!(s.status, SubmissionStatus::Approved);
        assert_eq!(s.reviewed_by, Some(UserId::from("admin-1")));
        assert!(s.reviewed_at.is_some());
        assert!(s.rejection_reason.is_none());
    }

    #[test]
    fn test_review_reject_records_reason() {
        let mut s = submission();
        s.review(
            &ReviewDecision::Reject {
                reason: "Card image unreadable".to_string(),
            },
            UserId::from("admin-1"),
        )
        .unwrap();
        assert_eq!(s.status, SubmissionStatus::Rejected);
        assert_eq!(s.rejection_reason.as_deref(), Some("Card image unreadable"));
    }

    #[test]
    fn test_review_is_exactly_once() {
        let mut s = submission();
        s.review(&ReviewDecision::Approve, UserId::from("admin-1"))
            .unwrap();
        let err = s
            .review(&ReviewDecision::Approve, UserId::from("admin-2"))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::AlreadyReviewed { .. }));
        // First reviewer stands
        assert_eq!(s.reviewed_by, Some(UserId::from("admin-1")));
    }
}
