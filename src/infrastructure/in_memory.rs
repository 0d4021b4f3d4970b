use crate::domain::bank::{Bank, ResolvedAccount, fallback_banks};
use crate::domain::kyc::KycSubmission;
use crate::domain::money::Amount;
use crate::domain::ports::{
    KycStore, PaymentGateway, ProfileStore, RateStore, ReferralStore, StoreSet, SubmissionStore,
    TransactionStore, Version, Versioned, WithdrawalStore,
};
use crate::domain::profile::{UserId, UserProfile};
use crate::domain::rate::{Rate, RateChange};
use crate::domain::referral::Referral;
use crate::domain::submission::GiftCardSubmission;
use crate::domain::transaction::Transaction;
use crate::domain::withdrawal::{
    TransferOrder, TransferReceipt, WithdrawalRequest, WithdrawalStatus,
};
use crate::error::{ExchangeError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory rate table plus its append-only audit log.
///
/// Uses `Arc<RwLock<..>>` for shared concurrent access. Ideal for tests and
/// single-process deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryRateStore {
    rates: Arc<RwLock<HashMap<String, Rate>>>,
    changes: Arc<RwLock<Vec<RateChange>>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn upsert(&self, rate: Rate) -> Result<()> {
        let mut rates = self.rates.write().await;
        rates.insert(rate.card_type.clone(), rate);
        Ok(())
    }

    async fn get(&self, card_type: &str) -> Result<Option<Rate>> {
        let rates = self.rates.read().await;
        Ok(rates.get(card_type).cloned())
    }

    async fn all(&self) -> Result<Vec<Rate>> {
        let rates = self.rates.read().await;
        Ok(rates.values().cloned().collect())
    }

    async fn append_change(&self, change: RateChange) -> Result<()> {
        let mut changes = self.changes.write().await;
        changes.push(change);
        Ok(())
    }

    async fn changes_for(&self, card_type: &str, limit: usize) -> Result<Vec<RateChange>> {
        let changes = self.changes.read().await;
        let mut matching: Vec<RateChange> = changes
            .iter()
            .filter(|change| change.card_type == card_type)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        matching.truncate(limit);
        Ok(matching)
    }
}

/// Versioned in-memory profile store.
///
/// The check-and-bump in `replace` happens under the map's write lock, which
/// is what makes the engine's read-mutate-replace loop race-free against
/// concurrent writers.
#[derive(Default, Clone)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<UserId, Versioned<UserProfile>>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn create(&self, profile: UserProfile) -> Result<bool> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.user_id) {
            return Ok(false);
        }
        profiles.insert(
            profile.user_id.clone(),
            Versioned {
                record: profile,
                version: Version::INITIAL,
            },
        );
        Ok(true)
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<Versioned<UserProfile>>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned())
    }

    async fn replace(&self, profile: UserProfile, expected: Version) -> Result<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&profile.user_id) {
            Some(stored) if stored.version == expected => {
                *stored = Versioned {
                    record: profile,
                    version: expected.next(),
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<Versioned<UserProfile>>> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .find(|stored| stored.record.referral_code == code)
            .cloned())
    }

    async fn count(&self) -> Result<usize> {
        let profiles = self.profiles.read().await;
        Ok(profiles.len())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySubmissionStore {
    submissions: Arc<RwLock<HashMap<Uuid, Versioned<GiftCardSubmission>>>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn insert(&self, submission: GiftCardSubmission) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        submissions.insert(
            submission.id,
            Versioned {
                record: submission,
                version: Version::INITIAL,
            },
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<GiftCardSubmission>>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id).cloned())
    }

    async fn replace(&self, submission: GiftCardSubmission, expected: Version) -> Result<bool> {
        let mut submissions = self.submissions.write().await;
        match submissions.get_mut(&submission.id) {
            Some(stored) if stored.version == expected => {
                *stored = Versioned {
                    record: submission,
                    version: expected.next(),
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending(&self) -> Result<Vec<GiftCardSubmission>> {
        let submissions = self.submissions.read().await;
        let mut pending: Vec<GiftCardSubmission> = submissions
            .values()
            .map(|stored| stored.record.clone())
            .filter(GiftCardSubmission::is_pending)
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<GiftCardSubmission>> {
        let submissions = self.submissions.read().await;
        let mut mine: Vec<GiftCardSubmission> = submissions
            .values()
            .map(|stored| stored.record.clone())
            .filter(|submission| &submission.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWithdrawalStore {
    requests: Arc<RwLock<HashMap<Uuid, Versioned<WithdrawalRequest>>>>,
}

impl InMemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalStore for InMemoryWithdrawalStore {
    async fn insert(&self, request: WithdrawalRequest) -> Result<Version> {
        let mut requests = self.requests.write().await;
        requests.insert(
            request.id,
            Versioned {
                record: request,
                version: Version::INITIAL,
            },
        );
        Ok(Version::INITIAL)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<WithdrawalRequest>>> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn replace(&self, request: WithdrawalRequest, expected: Version) -> Result<bool> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&request.id) {
            Some(stored) if stored.version == expected => {
                *stored = Versioned {
                    record: request,
                    version: expected.next(),
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending(&self) -> Result<Vec<WithdrawalRequest>> {
        let requests = self.requests.read().await;
        let mut pending: Vec<WithdrawalRequest> = requests
            .values()
            .map(|stored| stored.record.clone())
            .filter(|request| request.status == WithdrawalStatus::Pending)
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<WithdrawalRequest>> {
        let requests = self.requests.read().await;
        let mut mine: Vec<WithdrawalRequest> = requests
            .values()
            .map(|stored| stored.record.clone())
            .filter(|request| &request.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

/// Append-only in-memory wallet ledger.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    entries: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn append(&self, entry: Transaction) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        let entries = self.entries.read().await;
        let mut mine: Vec<Transaction> = entries
            .iter()
            .filter(|entry| &entry.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryReferralStore {
    referrals: Arc<RwLock<HashMap<Uuid, Versioned<Referral>>>>,
}

impl InMemoryReferralStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralStore for InMemoryReferralStore {
    async fn insert(&self, referral: Referral) -> Result<()> {
        let mut referrals = self.referrals.write().await;
        referrals.insert(
            referral.id,
            Versioned {
                record: referral,
                version: Version::INITIAL,
            },
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<Referral>>> {
        let referrals = self.referrals.read().await;
        Ok(referrals.get(&id).cloned())
    }

    async fn replace(&self, referral: Referral, expected: Version) -> Result<bool> {
        let mut referrals = self.referrals.write().await;
        match referrals.get_mut(&referral.id) {
            Some(stored) if stored.version == expected => {
                *stored = Versioned {
                    record: referral,
                    version: expected.next(),
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending_for_referred(
        &self,
        referred_user_id: &UserId,
    ) -> Result<Option<Versioned<Referral>>> {
        let referrals = self.referrals.read().await;
        Ok(referrals
            .values()
            .find(|stored| {
                stored.record.is_pending() && &stored.record.referred_user_id == referred_user_id
            })
            .cloned())
    }

    async fn for_referrer(&self, referrer_id: &UserId) -> Result<Vec<Referral>> {
        let referrals = self.referrals.read().await;
        let mut mine: Vec<Referral> = referrals
            .values()
            .map(|stored| stored.record.clone())
            .filter(|referral| &referral.referrer_id == referrer_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryKycStore {
    submissions: Arc<RwLock<HashMap<Uuid, Versioned<KycSubmission>>>>,
}

impl InMemoryKycStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KycStore for InMemoryKycStore {
    async fn insert(&self, submission: KycSubmission) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        submissions.insert(
            submission.id,
            Versioned {
                record: submission,
                version: Version::INITIAL,
            },
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<KycSubmission>>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id).cloned())
    }

    async fn replace(&self, submission: KycSubmission, expected: Version) -> Result<bool> {
        let mut submissions = self.submissions.write().await;
        match submissions.get_mut(&submission.id) {
            Some(stored) if stored.version == expected => {
                *stored = Versioned {
                    record: submission,
                    version: expected.next(),
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending(&self) -> Result<Vec<KycSubmission>> {
        let submissions = self.submissions.read().await;
        let mut pending: Vec<KycSubmission> = submissions
            .values()
            .map(|stored| stored.record.clone())
            .filter(KycSubmission::is_pending)
            .collect();
        pending.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(pending)
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<KycSubmission>> {
        let submissions = self.submissions.read().await;
        let mut mine: Vec<KycSubmission> = submissions
            .values()
            .map(|stored| stored.record.clone())
            .filter(|submission| &submission.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(mine)
    }
}

/// A full in-memory store set, one adapter per collection.
pub fn store_set() -> StoreSet {
    StoreSet {
        rates: Box::new(InMemoryRateStore::new()),
        profiles: Box::new(InMemoryProfileStore::new()),
        submissions: Box::new(InMemorySubmissionStore::new()),
        withdrawals: Box::new(InMemoryWithdrawalStore::new()),
        transactions: Box::new(InMemoryTransactionStore::new()),
        referrals: Box::new(InMemoryReferralStore::new()),
        kyc: Box::new(InMemoryKycStore::new()),
    }
}

/// Canned payment gateway for tests and local runs.
///
/// Resolves every structurally valid account to a fixed name, quotes a flat
/// fee, and acknowledges transfers with a generated provider reference.
/// The failure toggles reproduce an unreachable aggregator.
#[derive(Clone)]
pub struct StaticGateway {
    pub fee: Decimal,
    pub account_name: String,
    pub fail_transfers: bool,
    pub fail_banks: bool,
    pub fail_resolution: bool,
}

impl Default for StaticGateway {
    fn default() -> Self {
        Self {
            fee: dec!(50),
            account_name: "JOHN DOE".to_string(),
            fail_transfers: false,
            fail_banks: false,
            fail_resolution: false,
        }
    }
}

impl StaticGateway {
    pub fn with_fee(fee: Decimal) -> Self {
        Self {
            fee,
            ..Self::default()
        }
    }

    pub fn failing_transfers() -> Self {
        Self {
            fail_transfers: true,
            ..Self::default()
        }
    }

    pub fn failing_banks() -> Self {
        Self {
            fail_banks: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PaymentGateway for StaticGateway {
    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount> {
        if self.fail_resolution {
            return Err(ExchangeError::ExternalServiceFailure(
                "account resolution unavailable".to_string(),
            ));
        }
        Ok(ResolvedAccount {
            account_number: account_number.to_string(),
            account_name: self.account_name.clone(),
            bank_code: bank_code.to_string(),
        })
    }

    async fn transfer_fee(&self, _amount: Amount) -> Result<Decimal> {
        Ok(self.fee)
    }

    async fn initiate_transfer(&self, order: &TransferOrder) -> Result<TransferReceipt> {
        if self.fail_transfers {
            return Err(ExchangeError::ExternalServiceFailure(
                "transfer service unavailable".to_string(),
            ));
        }
        Ok(TransferReceipt {
            reference: order.reference.clone(),
            provider_reference: Some(format!("FLW-{}", Uuid::new_v4().simple())),
        })
    }

    async fn banks(&self) -> Result<Vec<Bank>> {
        if self.fail_banks {
            return Err(ExchangeError::ExternalServiceFailure(
                "bank directory unavailable".to_string(),
            ));
        }
        Ok(fallback_banks())
    }
}
