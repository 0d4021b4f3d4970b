use crate::domain::money::{Amount, Balance};
use crate::domain::profile::UserId;
use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_NARRATION: &str = "Gift card withdrawal";

/// Fee-adjusted view of a withdrawal before anything is committed.
///
/// This is the single source of the balance gate: the pre-submission
/// validation and the wallet debit both derive from `total_deduction`, so
/// they cannot disagree.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct WithdrawalSummary {
    pub amount: Decimal,
    pub fee: Decimal,
    pub total_deduction: Decimal,
    pub remaining_balance: Decimal,
}

impl WithdrawalSummary {
    /// `total_deduction = amount + fee`; fails with `InsufficientBalance`
    /// when it exceeds the current balance.
    pub fn compute(amount: Amount, fee: Decimal, balance: Balance) -> Result<Self, ExchangeError> {
        if fee < Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount(
                "transfer fee cannot be negative".to_string(),
            ));
        }
        let total_deduction = amount.value() + fee;
        if total_deduction > balance.value() {
            return Err(ExchangeError::InsufficientBalance {
                required: total_deduction,
                available: balance.value(),
            });
        }
        Ok(Self {
            amount: amount.value(),
            fee,
            total_deduction,
            remaining_balance: balance.value() - total_deduction,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A withdrawal to a bank account, created together with the wallet debit
/// that funds it. `reference` is the aggregator idempotency key and is
/// never reused.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: UserId,
    pub amount: Decimal,
    pub fee: Decimal,
    pub total_deduction: Decimal,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub reference: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub const COLLECTION: &'static str = "withdrawal_requests";

    pub fn new(
        user_id: UserId,
        summary: &WithdrawalSummary,
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount: summary.amount,
            fee: summary.fee,
            total_deduction: summary.total_deduction,
            bank_code: bank_code.into(),
            account_number: account_number.into(),
            account_name: account_name.into(),
            reference: new_reference(),
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// The transfer instruction handed to the payment aggregator.
    pub fn transfer_order(&self, currency: &str) -> TransferOrder {
        TransferOrder {
            bank_code: self.bank_code.clone(),
            account_number: self.account_number.clone(),
            amount: self.amount,
            currency: currency.to_string(),
            reference: self.reference.clone(),
            narration: DEFAULT_NARRATION.to_string(),
        }
    }
}

/// Generates a transfer reference: `CDX-` plus eight hex characters.
pub fn new_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("CDX-{}", id[..8].to_uppercase())
}

/// Instruction for the payment aggregator. The user receives `amount`; the
/// fee stays with the aggregator and was already debited from the wallet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransferOrder {
    pub bank_code: String,
    pub account_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub reference: String,
    pub narration: String,
}

/// Aggregator acknowledgement of an initiated transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransferReceipt {
    pub reference: String,
    pub provider_reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_happy_path() {
        let summary = WithdrawalSummary::compute(
            Amount::new(dec!(1000)).unwrap(),
            dec!(50),
            Balance::new(dec!(2000)),
        )
        .unwrap();
        assert_eq!(summary.total_deduction, dec!(1050));
        assert_eq!(summary.remaining_balance, dec!(950));
    }

    #[test]
    fn test_summary_rejects_when_total_exceeds_balance() {
        let err = WithdrawalSummary::compute(
            Amount::new(dec!(1000)).unwrap(),
            dec!(50),
            Balance::new(dec!(900)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::InsufficientBalance {
                required,
                available,
            } if required == dec!(1050) && available == dec!(900)
        ));
    }

    #[test]
    fn test_summary_exact_balance_is_allowed() {
        let summary = WithdrawalSummary::compute(
            Amount::new(dec!(1000)).unwrap(),
            dec!(50),
            Balance::new(dec!(1050)),
        )
        .unwrap();
        assert_eq!(summary.remaining_balance, dec!(0));
    }

    #[test]
    fn test_summary_rejects_negative_fee() {
        let err = WithdrawalSummary::compute(
            Amount::new(dec!(100)).unwrap(),
            dec!(-1),
            Balance::new(dec!(1000)),
        )
        .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidAmount(_)));
    }

    #[test]
    fn test_reference_shape() {
        let reference = new_reference();
        assert!(reference.starts_with("CDX-"));
        assert_eq!(reference.len(), 12);
        assert_ne!(reference, new_reference());
    }

    #[test]
    fn test_transfer_order_carries_reference_and_narration() {
        let summary = WithdrawalSummary::compute(
            Amount::new(dec!(500)).unwrap(),
            dec!(25),
            Balance::new(dec!(1000)),
        )
        .unwrap();
        let request = WithdrawalRequest::new(
            UserId::from("user-1"),
            &summary,
            "058",
            "0123456789",
            "JOHN DOE",
        );
        let order = request.transfer_order("NGN");
        assert_eq!(order.reference, request.reference);
        assert_eq!(order.amount, dec!(500));
        assert_eq!(order.narration, DEFAULT_NARRATION);
    }
}
