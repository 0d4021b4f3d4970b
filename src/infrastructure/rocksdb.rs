use crate::domain::kyc::KycSubmission;
use crate::domain::ports::{
    KycStore, ProfileStore, RateStore, ReferralStore, StoreSet, SubmissionStore, TransactionStore,
    Version, Versioned, WithdrawalStore,
};
use crate::domain::profile::{UserId, UserProfile};
use crate::domain::rate::{Rate, RateChange};
use crate::domain::referral::Referral;
use crate::domain::submission::GiftCardSubmission;
use crate::domain::transaction::Transaction;
use crate::domain::withdrawal::{WithdrawalRequest, WithdrawalStatus};
use crate::error::{ExchangeError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for the rate table.
pub const CF_RATES: &str = "rates";
/// Column Family for the rate audit log.
pub const CF_RATE_CHANGES: &str = "rate_changes";
/// Column Family for user profiles.
pub const CF_PROFILES: &str = "user_profiles";
/// Column Family for gift-card submissions.
pub const CF_SUBMISSIONS: &str = "gift_card_submissions";
/// Column Family for withdrawal requests.
pub const CF_WITHDRAWALS: &str = "withdrawal_requests";
/// Column Family for the wallet ledger.
pub const CF_TRANSACTIONS: &str = "wallet_transactions";
/// Column Family for referrals.
pub const CF_REFERRALS: &str = "referrals";
/// Column Family for KYC submissions.
pub const CF_KYC: &str = "kyc_submissions";

const ALL_CFS: [&str; 8] = [
    CF_RATES,
    CF_RATE_CHANGES,
    CF_PROFILES,
    CF_SUBMISSIONS,
    CF_WITHDRAWALS,
    CF_TRANSACTIONS,
    CF_REFERRALS,
    CF_KYC,
];

fn store_err(err: impl std::fmt::Display) -> ExchangeError {
    ExchangeError::ExternalServiceFailure(format!("storage error: {err}"))
}

/// A persistent store implementation using RocksDB.
///
/// Every collection lives in its own Column Family with JSON-serialized
/// values; versioned collections store `Versioned<T>` so the conditional
/// `replace` contract survives a restart. RocksDB has no native
/// compare-and-swap, so replaces are serialized through one writer lock.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// every collection's column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, descriptors).map_err(store_err)?;
        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// A store set backed entirely by this database.
    pub fn into_store_set(self) -> StoreSet {
        StoreSet {
            rates: Box::new(self.clone()),
            profiles: Box::new(self.clone()),
            submissions: Box::new(self.clone()),
            withdrawals: Box::new(self.clone()),
            transactions: Box::new(self.clone()),
            referrals: Box::new(self.clone()),
            kyc: Box::new(self),
        }
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| store_err(format!("column family '{name}' not found")))
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value).map_err(store_err)?;
        self.db.put_cf(cf, key, bytes).map_err(store_err)
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key).map_err(store_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(store_err)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, bytes) = item.map_err(store_err)?;
            values.push(serde_json::from_slice(&bytes).map_err(store_err)?);
        }
        Ok(values)
    }

    /// Conditional replace shared by every versioned collection: the stored
    /// version must still match the one the caller read.
    async fn replace_versioned<T: Serialize + DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
        record: T,
        expected: Version,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current: Option<Versioned<serde_json::Value>> = self.get_json(cf_name, key)?;
        match current {
            Some(stored) if stored.version == expected => {
                self.put_json(
                    cf_name,
                    key,
                    &Versioned {
                        record,
                        version: expected.next(),
                    },
                )?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl RateStore for RocksDBStore {
    async fn upsert(&self, rate: Rate) -> Result<()> {
        self.put_json(CF_RATES, rate.card_type.as_bytes(), &rate)
    }

    async fn get(&self, card_type: &str) -> Result<Option<Rate>> {
        self.get_json(CF_RATES, card_type.as_bytes())
    }

    async fn all(&self) -> Result<Vec<Rate>> {
        self.scan(CF_RATES)
    }

    async fn append_change(&self, change: RateChange) -> Result<()> {
        self.put_json(CF_RATE_CHANGES, change.id.as_bytes(), &change)
    }

    async fn changes_for(&self, card_type: &str, limit: usize) -> Result<Vec<RateChange>> {
        let mut changes: Vec<RateChange> = self
            .scan::<RateChange>(CF_RATE_CHANGES)?
            .into_iter()
            .filter(|change| change.card_type == card_type)
            .collect();
        changes.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        changes.truncate(limit);
        Ok(changes)
    }
}

#[async_trait]
impl ProfileStore for RocksDBStore {
    async fn create(&self, profile: UserProfile) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = profile.user_id.as_str().as_bytes().to_vec();
        if self.get_json::<Versioned<UserProfile>>(CF_PROFILES, &key)?.is_some() {
            return Ok(false);
        }
        self.put_json(
            CF_PROFILES,
            &key,
            &Versioned {
                record: profile,
                version: Version::INITIAL,
            },
        )?;
        Ok(true)
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<Versioned<UserProfile>>> {
        self.get_json(CF_PROFILES, user_id.as_str().as_bytes())
    }

    async fn replace(&self, profile: UserProfile, expected: Version) -> Result<bool> {
        let key = profile.user_id.as_str().as_bytes().to_vec();
        self.replace_versioned(CF_PROFILES, &key, profile, expected)
            .await
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<Versioned<UserProfile>>> {
        Ok(self
            .scan::<Versioned<UserProfile>>(CF_PROFILES)?
            .into_iter()
            .find(|stored| stored.record.referral_code == code))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.scan::<Versioned<UserProfile>>(CF_PROFILES)?.len())
    }
}

#[async_trait]
impl SubmissionStore for RocksDBStore {
    async fn insert(&self, submission: GiftCardSubmission) -> Result<()> {
        self.put_json(
            CF_SUBMISSIONS,
            submission.id.as_bytes(),
            &Versioned {
                record: submission.clone(),
                version: Version::INITIAL,
            },
        )
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<GiftCardSubmission>>> {
        self.get_json(CF_SUBMISSIONS, id.as_bytes())
    }

    async fn replace(&self, submission: GiftCardSubmission, expected: Version) -> Result<bool> {
        let key = submission.id.as_bytes().to_vec();
        self.replace_versioned(CF_SUBMISSIONS, &key, submission, expected)
            .await
    }

    async fn pending(&self) -> Result<Vec<GiftCardSubmission>> {
        let mut pending: Vec<GiftCardSubmission> = self
            .scan::<Versioned<GiftCardSubmission>>(CF_SUBMISSIONS)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(GiftCardSubmission::is_pending)
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<GiftCardSubmission>> {
        let mut mine: Vec<GiftCardSubmission> = self
            .scan::<Versioned<GiftCardSubmission>>(CF_SUBMISSIONS)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(|submission| &submission.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[async_trait]
impl WithdrawalStore for RocksDBStore {
    async fn insert(&self, request: WithdrawalRequest) -> Result<Version> {
        self.put_json(
            CF_WITHDRAWALS,
            request.id.as_bytes(),
            &Versioned {
                record: request.clone(),
                version: Version::INITIAL,
            },
        )?;
        Ok(Version::INITIAL)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<WithdrawalRequest>>> {
        self.get_json(CF_WITHDRAWALS, id.as_bytes())
    }

    async fn replace(&self, request: WithdrawalRequest, expected: Version) -> Result<bool> {
        let key = request.id.as_bytes().to_vec();
        self.replace_versioned(CF_WITHDRAWALS, &key, request, expected)
            .await
    }

    async fn pending(&self) -> Result<Vec<WithdrawalRequest>> {
        let mut pending: Vec<WithdrawalRequest> = self
            .scan::<Versioned<WithdrawalRequest>>(CF_WITHDRAWALS)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(|request| request.status == WithdrawalStatus::Pending)
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<WithdrawalRequest>> {
        let mut mine: Vec<WithdrawalRequest> = self
            .scan::<Versioned<WithdrawalRequest>>(CF_WITHDRAWALS)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(|request| &request.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn append(&self, entry: Transaction) -> Result<()> {
        self.put_json(CF_TRANSACTIONS, entry.id.as_bytes(), &entry)
    }

    async fn for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        let mut mine: Vec<Transaction> = self
            .scan::<Transaction>(CF_TRANSACTIONS)?
            .into_iter()
            .filter(|entry| &entry.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

#[async_trait]
impl ReferralStore for RocksDBStore {
    async fn insert(&self, referral: Referral) -> Result<()> {
        self.put_json(
            CF_REFERRALS,
            referral.id.as_bytes(),
            &Versioned {
                record: referral.clone(),
                version: Version::INITIAL,
            },
        )
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<Referral>>> {
        self.get_json(CF_REFERRALS, id.as_bytes())
    }

    async fn replace(&self, referral: Referral, expected: Version) -> Result<bool> {
        let key = referral.id.as_bytes().to_vec();
        self.replace_versioned(CF_REFERRALS, &key, referral, expected)
            .await
    }

    async fn pending_for_referred(
        &self,
        referred_user_id: &UserId,
    ) -> Result<Option<Versioned<Referral>>> {
        Ok(self
            .scan::<Versioned<Referral>>(CF_REFERRALS)?
            .into_iter()
            .find(|stored| {
                stored.record.is_pending() && &stored.record.referred_user_id == referred_user_id
            }))
    }

    async fn for_referrer(&self, referrer_id: &UserId) -> Result<Vec<Referral>> {
        let mut mine: Vec<Referral> = self
            .scan::<Versioned<Referral>>(CF_REFERRALS)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(|referral| &referral.referrer_id == referrer_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[async_trait]
impl KycStore for RocksDBStore {
    async fn insert(&self, submission: KycSubmission) -> Result<()> {
        self.put_json(
            CF_KYC,
            submission.id.as_bytes(),
            &Versioned {
                record: submission.clone(),
                version: Version::INITIAL,
            },
        )
    }

    async fn get(&self, id: Uuid) -> Result<Option<Versioned<KycSubmission>>> {
        self.get_json(CF_KYC, id.as_bytes())
    }

    async fn replace(&self, submission: KycSubmission, expected: Version) -> Result<bool> {
        let key = submission.id.as_bytes().to_vec();
        self.replace_versioned(CF_KYC, &key, submission, expected)
            .await
    }

    async fn pending(&self) -> Result<Vec<KycSubmission>> {
        let mut pending: Vec<KycSubmission> = self
            .scan::<Versioned<KycSubmission>>(CF_KYC)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(KycSubmission::is_pending)
            .collect();
        pending.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(pending)
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<KycSubmission>> {
        let mut mine: Vec<KycSubmission> = self
            .scan::<Versioned<KycSubmission>>(CF_KYC)?
            .into_iter()
            .map(|stored| stored.record)
            .filter(|submission| &submission.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(mine)
    }
}
