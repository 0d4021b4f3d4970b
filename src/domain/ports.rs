use crate::domain::bank::{Bank, ResolvedAccount};
use crate::domain::kyc::KycSubmission;
use crate::domain::money::Amount;
use crate::domain::profile::{UserId, UserProfile};
use crate::domain::rate::{Rate, RateChange};
use crate::domain::referral::Referral;
use crate::domain::submission::GiftCardSubmission;
use crate::domain::transaction::Transaction;
use crate::domain::withdrawal::{TransferOrder, TransferReceipt, WithdrawalRequest};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monotonic version attached to every mutable record, the token behind
/// the conditional `replace` calls below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version(pub u64);

impl Version {
    pub const INITIAL: Self = Self(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A record paired with the version it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub record: T,
    pub version: Version,
}

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Last write wins; rates carry no version because concurrent admin
    /// edits are resolved by the audit trail, not by rejection.
    async fn upsert(&self, rate: Rate) -> Result<()>;
    async fn get(&self, card_type: &str) -> Result<Option<Rate>>;
    async fn all(&self) -> Result<Vec<Rate>>;
    async fn append_change(&self, change: RateChange) -> Result<()>;
    /// Audit records for one card type, newest first.
    async fn changes_for(&self, card_type: &str, limit: usize) -> Result<Vec<RateChange>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns false when the user already has a profile.
    async fn create(&self, profile: UserProfile) -> Result<bool>;
    async fn get(&self, user_id: &UserId) -> Result<Option<Versioned<UserProfile>>>;
    /// Replaces the stored profile only if its version still matches.
    /// Returns false on a lost race; nothing is written in that case.
    async fn replace(&self, profile: UserProfile, expected: Version) -> Result<bool>;
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<Versioned<UserProfile>>>;
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: GiftCardSubmission) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<GiftCardSubmission>>>;
    async fn replace(&self, submission: GiftCardSubmission, expected: Version) -> Result<bool>;
    /// Pending submissions, newest first.
    async fn pending(&self) -> Result<Vec<GiftCardSubmission>>;
    /// All of one user's submissions, newest first.
    async fn for_user(&self, user_id: &UserId) -> Result<Vec<GiftCardSubmission>>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Returns the version the request was stored at, so follow-up status
    /// writes can replace conditionally against an observed version.
    async fn insert(&self, request: WithdrawalRequest) -> Result<Version>;
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<WithdrawalRequest>>>;
    async fn replace(&self, request: WithdrawalRequest, expected: Version) -> Result<bool>;
    async fn pending(&self) -> Result<Vec<WithdrawalRequest>>;
    async fn for_user(&self, user_id: &UserId) -> Result<Vec<WithdrawalRequest>>;
}

/// Append-only wallet ledger.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append(&self, entry: Transaction) -> Result<()>;
    /// A user's ledger, newest first.
    async fn for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn insert(&self, referral: Referral) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<Referral>>>;
    async fn replace(&self, referral: Referral, expected: Version) -> Result<bool>;
    /// The pending referral naming this user as the referred party, if any.
    async fn pending_for_referred(
        &self,
        referred_user_id: &UserId,
    ) -> Result<Option<Versioned<Referral>>>;
    async fn for_referrer(&self, referrer_id: &UserId) -> Result<Vec<Referral>>;
}

#[async_trait]
pub trait KycStore: Send + Sync {
    async fn insert(&self, submission: KycSubmission) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Versioned<KycSubmission>>>;
    async fn replace(&self, submission: KycSubmission, expected: Version) -> Result<bool>;
    async fn pending(&self) -> Result<Vec<KycSubmission>>;
    async fn for_user(&self, user_id: &UserId) -> Result<Vec<KycSubmission>>;
}

/// The payment aggregator boundary.
///
/// Adapters map their failures onto the error taxonomy: a rejected account
/// resolution is `AccountVerificationFailed`, an unreachable or erroring
/// service is `ExternalServiceFailure`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount>;
    async fn transfer_fee(&self, amount: Amount) -> Result<Decimal>;
    async fn initiate_transfer(&self, order: &TransferOrder) -> Result<TransferReceipt>;
    async fn banks(&self) -> Result<Vec<Bank>>;
}

pub type RateStoreBox = Box<dyn RateStore>;
pub type ProfileStoreBox = Box<dyn ProfileStore>;
pub type SubmissionStoreBox = Box<dyn SubmissionStore>;
pub type WithdrawalStoreBox = Box<dyn WithdrawalStore>;
pub type TransactionStoreBox = Box<dyn TransactionStore>;
pub type ReferralStoreBox = Box<dyn ReferralStore>;
pub type KycStoreBox = Box<dyn KycStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;

/// Every store the engine writes through, wired explicitly at startup.
/// There is no ambient client: whoever builds the engine decides where
/// each collection lives.
pub struct StoreSet {
    pub rates: RateStoreBox,
    pub profiles: ProfileStoreBox,
    pub submissions: SubmissionStoreBox,
    pub withdrawals: WithdrawalStoreBox,
    pub transactions: TransactionStoreBox,
    pub referrals: ReferralStoreBox,
    pub kyc: KycStoreBox,
}
