use crate::domain::money::Amount;
use crate::domain::profile::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    GiftCardCredit,
    WithdrawalDebit,
    WithdrawalRefund,
    ReferralBonus,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable ledger entry, one per wallet-affecting event. Append-only;
/// corrections are new entries (see `WithdrawalRefund`), never edits.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    /// Links withdrawal entries (and their refunds) to the transfer
    /// reference handed to the aggregator.
    pub reference: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        kind: TransactionKind,
        amount: Amount,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount: amount.value(),
            status: TransactionStatus::Completed,
            reference: None,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_entry_is_completed() {
        let entry = Transaction::new(
            UserId::from("user-1"),
            TransactionKind::ReferralBonus,
            Amount::new(dec!(5)).unwrap(),
            "Referral bonus earned",
        );
        assert_eq!(entry.status, TransactionStatus::Completed);
        assert_eq!(entry.amount, dec!(5));
        assert!(entry.reference.is_none());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::GiftCardCredit).unwrap();
        assert_eq!(json, "\"gift_card_credit\"");
        let kind: TransactionKind = serde_json::from_str("\"withdrawal_refund\"").unwrap();
        assert_eq!(kind, TransactionKind::WithdrawalRefund);
    }

    #[test]
    fn test_reference_builder() {
        let entry = Transaction::new(
            UserId::from("user-1"),
            TransactionKind::WithdrawalDebit,
            Amount::new(dec!(1050)).unwrap(),
            "Withdrawal to GTBank",
        )
        .with_reference("CDX-0A1B2C3D");
        assert_eq!(entry.reference.as_deref(), Some("CDX-0A1B2C3D"));
    }
}
