use crate::application::config::EngineConfig;
use crate::domain::bank::{self, Bank, ResolvedAccount};
use crate::domain::kyc::{KycDocument, KycSubmission};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{PaymentGatewayBox, StoreSet, Versioned};
use crate::domain::profile::{
    KycStatus, LoyaltyTier, UserId, UserProfile, WalletDirection, is_valid_referral_code,
};
use crate::domain::rate::{ExchangeQuote, Rate, RateChange, RateSnapshot, RateUpdate};
use crate::domain::referral::Referral;
use crate::domain::submission::{GiftCardSubmission, ReviewDecision, SubmissionStatus};
use crate::domain::transaction::{Transaction, TransactionKind};
use crate::domain::withdrawal::{WithdrawalRequest, WithdrawalStatus, WithdrawalSummary};
use crate::error::{ExchangeError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Counts surfaced on the admin dashboard.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct DashboardStats {
    pub total_users: usize,
    pub pending_submissions: usize,
    pub pending_kyc: usize,
    pub pending_withdrawals: usize,
}

/// The main entry point for the gift-card exchange application.
///
/// `ExchangeEngine` owns the storage ports and the payment gateway and
/// carries every business rule: quoting, rate administration, wallet
/// reconciliation, withdrawals, reviews, and referral settlement. Wallet
/// mutations go through a conditional-replace loop so concurrent requests
/// for the same user serialize instead of losing updates.
pub struct ExchangeEngine {
    stores: StoreSet,
    gateway: PaymentGatewayBox,
    config: EngineConfig,
}

impl ExchangeEngine {
    /// Creates a new `ExchangeEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `stores` - The store ports for every persisted collection.
    /// * `gateway` - The payment aggregator boundary.
    /// * `config` - Business configuration; `EngineConfig::default()` is
    ///   the launch rule set.
    pub fn new(stores: StoreSet, gateway: PaymentGatewayBox, config: EngineConfig) -> Self {
        Self {
            stores,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- rates ---

    /// Quotes a gift card against the active rate table.
    ///
    /// Pure over the current rate snapshot: the arithmetic lives in
    /// [`ExchangeQuote::compute`], this method only resolves the rate.
    /// An absent tier quotes as BRONZE.
    #[instrument(skip(self))]
    pub async fn calculate_exchange(
        &self,
        card_type: &str,
        card_value: Decimal,
        tier: Option<LoyaltyTier>,
    ) -> Result<ExchangeQuote> {
        let rate = self.active_rate(card_type).await?;
        ExchangeQuote::compute(&rate, card_value, tier.unwrap_or_default(), &self.config.tiers)
    }

    async fn active_rate(&self, card_type: &str) -> Result<Rate> {
        match self.stores.rates.get(card_type).await? {
            Some(rate) if rate.is_active() => Ok(rate),
            _ => Err(ExchangeError::RateNotFound(card_type.to_string())),
        }
    }

    /// Overwrites a card type's rate after bounds validation and appends
    /// an audit record. The audit append is best-effort: a failure is
    /// logged and swallowed, the rate update stands.
    #[instrument(skip(self))]
    pub async fn update_rate(
        &self,
        card_type: &str,
        update: RateUpdate,
        actor: UserId,
    ) -> Result<Rate> {
        update.validate()?;
        let previous = self.stores.rates.get(card_type).await?;
        let rate = update.into_rate(card_type, previous.as_ref());
        self.stores.rates.upsert(rate.clone()).await?;
        info!(
            card_type,
            buy_rate = %rate.buy_rate,
            sell_rate = %rate.sell_rate,
            "rate updated"
        );

        let change = RateChange::new(
            card_type,
            previous.as_ref().map(RateSnapshot::from),
            RateSnapshot::from(&rate),
            actor,
        );
        if let Err(err) = self.stores.rates.append_change(change).await {
            warn!(card_type, %err, "rate audit append failed, keeping rate update");
        }
        Ok(rate)
    }

    /// Audit trail for one card type, newest first.
    pub async fn rate_history(&self, card_type: &str) -> Result<Vec<RateChange>> {
        self.stores
            .rates
            .changes_for(card_type, self.config.rate_history_limit)
            .await
    }

    /// The most recently updated active rates.
    pub async fn trending_rates(&self) -> Result<Vec<Rate>> {
        let mut rates: Vec<Rate> = self
            .stores
            .rates
            .all()
            .await?
            .into_iter()
            .filter(Rate::is_active)
            .collect();
        rates.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        rates.truncate(self.config.trending_limit);
        Ok(rates)
    }

    pub async fn list_rates(&self) -> Result<Vec<Rate>> {
        let mut rates = self.stores.rates.all().await?;
        rates.sort_by(|a, b| a.card_type.cmp(&b.card_type));
        Ok(rates)
    }

    /// Writes the configured catalog into the rate table, skipping card
    /// types that already have a rate. Returns how many were written.
    #[instrument(skip(self))]
    pub async fn seed_default_rates(&self) -> Result<usize> {
        let mut written = 0;
        for entry in &self.config.catalog.entries {
            if self.stores.rates.get(&entry.card_type).await?.is_some() {
                continue;
            }
            self.stores.rates.upsert(entry.to_rate()).await?;
            written += 1;
        }
        if written > 0 {
            info!(
                written,
                catalog_version = self.config.catalog.version,
                "seeded default rates"
            );
        }
        Ok(written)
    }

    // --- profiles & wallet ---

    /// Creates the profile for a newly signed-up user. A valid referral
    /// code that resolves to an owner records a pending referral; a
    /// well-formed code nobody owns is ignored.
    #[instrument(skip(self))]
    pub async fn enroll_user(
        &self,
        user_id: UserId,
        email: &str,
        referred_by_code: Option<&str>,
    ) -> Result<UserProfile> {
        let referrer = match referred_by_code {
            Some(code) => {
                if !is_valid_referral_code(code) {
                    return Err(ExchangeError::InvalidReferralCode(code.to_string()));
                }
                self.stores.profiles.find_by_referral_code(code).await?
            }
            None => None,
        };

        let bonus = match &referrer {
            Some(_) => Some(Amount::new(self.config.referral_bonus)?),
            None => None,
        };

        let mut profile = UserProfile::new(user_id.clone(), email);
        if let Some(referrer) = &referrer {
            profile.referred_by = Some(referrer.record.user_id.clone());
        }
        if !self.stores.profiles.create(profile.clone()).await? {
            return Err(ExchangeError::ProfileExists(user_id.to_string()));
        }

        if let (Some(referrer), Some(bonus)) = (referrer, bonus) {
            let referral = Referral::new(
                referrer.record.user_id.clone(),
                user_id.clone(),
                referrer.record.referral_code.clone(),
                bonus,
            );
            self.stores.referrals.insert(referral).await?;
            info!(user = %user_id, referrer = %referrer.record.user_id, "referral recorded");
        }

        Ok(profile)
    }

    pub async fn profile(&self, user_id: &UserId) -> Result<UserProfile> {
        Ok(self.versioned_profile(user_id).await?.record)
    }

    async fn versioned_profile(&self, user_id: &UserId) -> Result<Versioned<UserProfile>> {
        self.stores
            .profiles
            .get(user_id)
            .await?
            .ok_or_else(|| ExchangeError::ProfileNotFound(user_id.to_string()))
    }

    /// Read-mutate-replace loop over one profile. A conditional replace
    /// that loses its race is retried against a fresh read, up to the
    /// configured attempt bound; errors from the mutation itself end the
    /// loop immediately.
    async fn update_profile<T>(
        &self,
        user_id: &UserId,
        mut mutate: impl FnMut(&mut UserProfile) -> Result<T>,
    ) -> Result<T> {
        for _ in 0..self.config.max_update_attempts {
            let Versioned {
                record: mut profile,
                version,
            } = self.versioned_profile(user_id).await?;
            let outcome = mutate(&mut profile)?;
            if self.stores.profiles.replace(profile, version).await? {
                return Ok(outcome);
            }
        }
        Err(ExchangeError::UpdateConflict {
            collection: UserProfile::COLLECTION,
            id: user_id.to_string(),
        })
    }

    /// Applies a wallet delta atomically for one user. A subtraction that
    /// would take the balance negative fails with `InsufficientBalance`
    /// and writes nothing; concurrent deltas for the same user serialize
    /// through the version check, so a stale balance read can never commit.
    #[instrument(skip(self))]
    pub async fn apply_wallet_delta(
        &self,
        user_id: &UserId,
        amount: Amount,
        direction: WalletDirection,
    ) -> Result<Balance> {
        let balance = self
            .update_profile(user_id, |profile| profile.apply_delta(amount, direction))
            .await?;
        info!(user = %user_id, ?direction, amount = %amount, balance = %balance, "wallet delta applied");
        Ok(balance)
    }

    /// Recomputes the loyalty tier from the transaction count, writing
    /// only when the tier actually changed.
    #[instrument(skip(self))]
    pub async fn refresh_tier(&self, user_id: &UserId) -> Result<LoyaltyTier> {
        for _ in 0..self.config.max_update_attempts {
            let Versioned {
                record: mut profile,
                version,
            } = self.versioned_profile(user_id).await?;
            let tier = self.config.tiers.tier_for(profile.transaction_count);
            if tier == profile.loyalty_tier {
                return Ok(tier);
            }
            profile.loyalty_tier = tier;
            if self.stores.profiles.replace(profile, version).await? {
                info!(user = %user_id, ?tier, "loyalty tier updated");
                return Ok(tier);
            }
        }
        Err(ExchangeError::UpdateConflict {
            collection: UserProfile::COLLECTION,
            id: user_id.to_string(),
        })
    }

    // --- withdrawals ---

    /// Fee-adjusted preview of a withdrawal against the current balance.
    /// Uses the same arithmetic as the commit path, so passing here means
    /// the debit will pass too unless the balance moved in between.
    pub async fn withdrawal_summary(
        &self,
        user_id: &UserId,
        amount: Amount,
    ) -> Result<WithdrawalSummary> {
        let profile = self.profile(user_id).await?;
        let fee = self.gateway.transfer_fee(amount).await?;
        WithdrawalSummary::compute(amount, fee, profile.wallet_balance)
    }

    /// Verifies a destination account: ten-digit format and NUBAN check
    /// digit locally, the bank code against the directory, then the
    /// aggregator resolves the account name.
    #[instrument(skip(self))]
    pub async fn verify_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<ResolvedAccount> {
        if !bank::is_valid_account_format(account_number) {
            return Err(ExchangeError::AccountVerificationFailed(
                "account number must be 10 digits".to_string(),
            ));
        }
        if !bank::is_valid_nuban(account_number) {
            return Err(ExchangeError::AccountVerificationFailed(
                "account number failed the NUBAN check".to_string(),
            ));
        }
        let banks = self.banks().await?;
        if bank::find_bank(&banks, bank_code).is_none() {
            return Err(ExchangeError::AccountVerificationFailed(format!(
                "unknown bank code '{bank_code}'"
            )));
        }
        self.gateway.resolve_account(account_number, bank_code).await
    }

    /// Bank directory, falling back to the built-in list when the
    /// aggregator cannot be reached.
    pub async fn banks(&self) -> Result<Vec<Bank>> {
        match self.gateway.banks().await {
            Ok(banks) if !banks.is_empty() => Ok(banks),
            Ok(_) => Ok(bank::fallback_banks()),
            Err(err) => {
                warn!(%err, "bank list unavailable from gateway, using fallback directory");
                Ok(bank::fallback_banks())
            }
        }
    }

    /// Runs the full withdrawal flow: verify the destination, price the
    /// fee, gate against the balance, debit the wallet together with the
    /// request record, then hand the transfer to the aggregator. A
    /// gateway failure refunds the debit in full and marks the request
    /// failed.
    #[instrument(skip(self))]
    pub async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: Amount,
        bank_code: &str,
        account_number: &str,
    ) -> Result<WithdrawalRequest> {
        if amount.value() < self.config.min_withdrawal {
            return Err(ExchangeError::InvalidAmount(format!(
                "minimum withdrawal is {}",
                self.config.min_withdrawal
            )));
        }

        let account = self.verify_account(bank_code, account_number).await?;
        let fee = self.gateway.transfer_fee(amount).await?;

        let profile = self.profile(user_id).await?;
        let summary = WithdrawalSummary::compute(amount, fee, profile.wallet_balance)?;
        let total = Amount::new(summary.total_deduction)?;

        // The debit is the authoritative balance check; the summary above
        // only surfaces the error before anything is written.
        self.apply_wallet_delta(user_id, total, WalletDirection::Subtract)
            .await?;

        let mut request = WithdrawalRequest::new(
            user_id.clone(),
            &summary,
            bank_code,
            account_number,
            account.account_name,
        );
        let stored_version = self.stores.withdrawals.insert(request.clone()).await?;
        self.stores
            .transactions
            .append(
                Transaction::new(
                    user_id.clone(),
                    TransactionKind::WithdrawalDebit,
                    total,
                    format!("Withdrawal to account {account_number}"),
                )
                .with_reference(request.reference.clone()),
            )
            .await?;

        let order = request.transfer_order(&self.config.currency);
        match self.gateway.initiate_transfer(&order).await {
            Ok(receipt) => {
                let mut processing = request.clone();
                processing.status = WithdrawalStatus::Processing;
                match self
                    .stores
                    .withdrawals
                    .replace(processing.clone(), stored_version)
                    .await
                {
                    Ok(true) => request = processing,
                    Ok(false) => {
                        warn!(reference = %request.reference, "withdrawal status raced after transfer initiation");
                    }
                    Err(err) => {
                        // The transfer and the debit both committed; a lost
                        // status write is bookkeeping lag, not money.
                        warn!(reference = %request.reference, %err, "failed to record processing status");
                    }
                }
                info!(
                    reference = %request.reference,
                    provider = ?receipt.provider_reference,
                    "transfer initiated"
                );
                Ok(request)
            }
            Err(err) => {
                warn!(reference = %request.reference, %err, "transfer initiation failed, refunding debit");
                self.apply_wallet_delta(user_id, total, WalletDirection::Add)
                    .await?;
                self.stores
                    .transactions
                    .append(
                        Transaction::new(
                            user_id.clone(),
                            TransactionKind::WithdrawalRefund,
                            total,
                            "Withdrawal refund: transfer initiation failed",
                        )
                        .with_reference(request.reference.clone()),
                    )
                    .await?;
                let mut failed = request.clone();
                failed.status = WithdrawalStatus::Failed;
                if !self
                    .stores
                    .withdrawals
                    .replace(failed, stored_version)
                    .await?
                {
                    warn!(reference = %request.reference, "failed-withdrawal status raced");
                }
                Err(err)
            }
        }
    }

    /// Marks a processing withdrawal completed once the aggregator
    /// settles it.
    #[instrument(skip(self))]
    pub async fn complete_withdrawal(&self, request_id: Uuid) -> Result<WithdrawalRequest> {
        let Versioned {
            record: mut request,
            version,
        } = self
            .stores
            .withdrawals
            .get(request_id)
            .await?
            .ok_or(ExchangeError::RecordNotFound {
                collection: WithdrawalRequest::COLLECTION,
                id: request_id.to_string(),
            })?;

        if request.status != WithdrawalStatus::Processing {
            return Err(ExchangeError::InvalidStatus {
                collection: WithdrawalRequest::COLLECTION,
                id: request_id.to_string(),
                status: request.status.to_string(),
            });
        }
        request.status = WithdrawalStatus::Completed;
        if !self
            .stores
            .withdrawals
            .replace(request.clone(), version)
            .await?
        {
            return Err(ExchangeError::UpdateConflict {
                collection: WithdrawalRequest::COLLECTION,
                id: request_id.to_string(),
            });
        }
        info!(reference = %request.reference, "withdrawal completed");
        Ok(request)
    }

    // --- gift-card submissions ---

    /// Creates a pending submission carrying the payout quoted at the
    /// user's current tier. No wallet effect until approval.
    #[instrument(skip(self))]
    pub async fn submit_card(
        &self,
        user_id: &UserId,
        card_type: &str,
        card_value: Decimal,
    ) -> Result<GiftCardSubmission> {
        if card_value < self.config.min_card_value {
            return Err(ExchangeError::InvalidAmount(format!(
                "minimum card value is {}",
                self.config.min_card_value
            )));
        }
        let profile = self.profile(user_id).await?;
        let quote = self
            .calculate_exchange(card_type, card_value, Some(profile.loyalty_tier))
            .await?;
        let submission = GiftCardSubmission::new(user_id.clone(), &quote);
        self.stores.submissions.insert(submission.clone()).await?;
        info!(
            user = %user_id,
            card_type,
            amount = %submission.calculated_amount,
            "gift card submitted"
        );
        Ok(submission)
    }

    /// Settles an admin verdict exactly once: the conditional replace on
    /// the submission is the gate, so of two concurrent reviewers only one
    /// credits the wallet. Approval pays the frozen quote, advances the
    /// loyalty state, and appends the ledger entry.
    #[instrument(skip(self))]
    pub async fn review_submission(
        &self,
        submission_id: Uuid,
        decision: ReviewDecision,
        reviewer: UserId,
    ) -> Result<GiftCardSubmission> {
        let Versioned {
            record: mut submission,
            version,
        } = self
            .stores
            .submissions
            .get(submission_id)
            .await?
            .ok_or(ExchangeError::RecordNotFound {
                collection: GiftCardSubmission::COLLECTION,
                id: submission_id.to_string(),
            })?;

        submission.review(&decision, reviewer)?;
        if !self
            .stores
            .submissions
            .replace(submission.clone(), version)
            .await?
        {
            return Err(ExchangeError::AlreadyReviewed {
                collection: GiftCardSubmission::COLLECTION,
                id: submission_id.to_string(),
            });
        }

        if submission.status == SubmissionStatus::Approved {
            let amount = Amount::new(submission.calculated_amount)?;
            let tier = self
                .update_profile(&submission.user_id, |profile| {
                    Ok(profile.credit_submission(amount, &self.config.tiers))
                })
                .await?;
            self.stores
                .transactions
                .append(Transaction::new(
                    submission.user_id.clone(),
                    TransactionKind::GiftCardCredit,
                    amount,
                    format!("{} gift card approved", submission.card_type),
                ))
                .await?;
            info!(
                user = %submission.user_id,
                amount = %amount,
                ?tier,
                "submission approved and credited"
            );
        }
        Ok(submission)
    }

    // --- KYC & referrals ---

    /// Records an identity document for review.
    #[instrument(skip(self, document))]
    pub async fn submit_kyc(&self, user_id: &UserId, document: KycDocument) -> Result<KycSubmission> {
        self.versioned_profile(user_id).await?;
        let submission = KycSubmission::new(user_id.clone(), document)?;
        self.stores.kyc.insert(submission.clone()).await?;
        info!(user = %user_id, ?submission.id_type, "kyc submitted");
        Ok(submission)
    }

    /// Reviews a KYC submission exactly once. Approval flips the
    /// profile's KYC status and then settles any pending referral for
    /// this user; rejection records the reason.
    #[instrument(skip(self))]
    pub async fn review_kyc(
        &self,
        kyc_id: Uuid,
        decision: ReviewDecision,
        reviewer: UserId,
    ) -> Result<KycSubmission> {
        let Versioned {
            record: mut submission,
            version,
        } = self
            .stores
            .kyc
            .get(kyc_id)
            .await?
            .ok_or(ExchangeError::RecordNotFound {
                collection: KycSubmission::COLLECTION,
                id: kyc_id.to_string(),
            })?;

        submission.review(&decision, reviewer)?;
        if !self.stores.kyc.replace(submission.clone(), version).await? {
            return Err(ExchangeError::AlreadyReviewed {
                collection: KycSubmission::COLLECTION,
                id: kyc_id.to_string(),
            });
        }

        let status = match submission.status {
            SubmissionStatus::Approved => KycStatus::Approved,
            _ => KycStatus::Rejected,
        };
        self.update_profile(&submission.user_id, |profile| {
            profile.kyc_status = status;
            Ok(())
        })
        .await?;

        if status == KycStatus::Approved {
            self.settle_referral(&submission.user_id).await?;
        }
        Ok(submission)
    }

    /// Pays the referrer once the referred user clears KYC.
    ///
    /// Returns the settled referral, or `None` when nothing was pending
    /// (not an error) or another settlement won the race. The
    /// pending-to-completed conditional replace happens first: winning it
    /// is what authorizes the payout, so a retry can never pay twice.
    #[instrument(skip(self))]
    pub async fn settle_referral(&self, referred_user_id: &UserId) -> Result<Option<Referral>> {
        let Some(Versioned {
            record: mut referral,
            version,
        }) = self
            .stores
            .referrals
            .pending_for_referred(referred_user_id)
            .await?
        else {
            return Ok(None);
        };

        if !referral.complete() {
            return Ok(None);
        }
        if !self
            .stores
            .referrals
            .replace(referral.clone(), version)
            .await?
        {
            return Ok(None);
        }

        let bonus = Amount::new(referral.bonus_amount)?;
        self.update_profile(&referral.referrer_id, |profile| {
            profile.credit_referral_bonus(bonus);
            Ok(())
        })
        .await?;
        self.stores
            .transactions
            .append(Transaction::new(
                referral.referrer_id.clone(),
                TransactionKind::ReferralBonus,
                bonus,
                "Referral bonus earned",
            ))
            .await?;
        info!(
            referrer = %referral.referrer_id,
            referred = %referred_user_id,
            bonus = %bonus,
            "referral bonus settled"
        );
        Ok(Some(referral))
    }

    // --- history & dashboards ---

    pub async fn transactions_for(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        self.stores.transactions.for_user(user_id, limit).await
    }

    pub async fn submissions_for(&self, user_id: &UserId) -> Result<Vec<GiftCardSubmission>> {
        self.stores.submissions.for_user(user_id).await
    }

    pub async fn withdrawals_for(&self, user_id: &UserId) -> Result<Vec<WithdrawalRequest>> {
        self.stores.withdrawals.for_user(user_id).await
    }

    pub async fn referrals_for(&self, referrer_id: &UserId) -> Result<Vec<Referral>> {
        self.stores.referrals.for_referrer(referrer_id).await
    }

    pub async fn kyc_for(&self, user_id: &UserId) -> Result<Vec<KycSubmission>> {
        self.stores.kyc.for_user(user_id).await
    }

    pub async fn pending_submissions(&self) -> Result<Vec<GiftCardSubmission>> {
        self.stores.submissions.pending().await
    }

    pub async fn pending_kyc(&self) -> Result<Vec<KycSubmission>> {
        self.stores.kyc.pending().await
    }

    pub async fn pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>> {
        self.stores.withdrawals.pending().await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats {
            total_users: self.stores.profiles.count().await?,
            pending_submissions: self.stores.submissions.pending().await?.len(),
            pending_kyc: self.stores.kyc.pending().await?.len(),
            pending_withdrawals: self.stores.withdrawals.pending().await?.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{StaticGateway, store_set};
    use rust_decimal_macros::dec;

    fn engine() -> ExchangeEngine {
        ExchangeEngine::new(
            store_set(),
            Box::new(StaticGateway::default()),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_quote_requires_known_active_rate() {
        let engine = engine();
        let err = engine
            .calculate_exchange("Amazon", dec!(100), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::RateNotFound(_)));

        engine.seed_default_rates().await.unwrap();
        let quote = engine
            .calculate_exchange("Amazon", dec!(100), None)
            .await
            .unwrap();
        assert_eq!(quote.exchange_amount, dec!(82.00));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let engine = engine();
        assert_eq!(engine.seed_default_rates().await.unwrap(), 10);
        assert_eq!(engine.seed_default_rates().await.unwrap(), 0);
        assert_eq!(engine.list_rates().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_update_rate_rejects_inverted_bounds() {
        let engine = engine();
        let err = engine
            .update_rate(
                "Amazon",
                RateUpdate {
                    buy_rate: dec!(0.85),
                    sell_rate: dec!(0.80),
                    status: None,
                },
                UserId::from("admin-1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidRateBounds(_)));
        // Nothing was written
        assert!(engine.list_rates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rate_appends_audit_record() {
        let engine = engine();
        engine.seed_default_rates().await.unwrap();
        engine
            .update_rate(
                "Amazon",
                RateUpdate {
                    buy_rate: dec!(0.84),
                    sell_rate: dec!(0.87),
                    status: None,
                },
                UserId::from("admin-1"),
            )
            .await
            .unwrap();

        let history = engine.rate_history("Amazon").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous.unwrap().buy_rate, dec!(0.82));
        assert_eq!(history[0].new.buy_rate, dec!(0.84));
        assert_eq!(history[0].actor_id, UserId::from("admin-1"));
    }

    #[tokio::test]
    async fn test_wallet_delta_add_then_subtract() {
        let engine = engine();
        let user = UserId::from("user-1");
        engine.enroll_user(user.clone(), "u@example.com", None).await.unwrap();

        let balance = engine
            .apply_wallet_delta(&user, Amount::new(dec!(100)).unwrap(), WalletDirection::Add)
            .await
            .unwrap();
        assert_eq!(balance, Balance::new(dec!(100)));

        let err = engine
            .apply_wallet_delta(
                &user,
                Amount::new(dec!(150)).unwrap(),
                WalletDirection::Subtract,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InsufficientBalance { .. }));
        assert_eq!(
            engine.profile(&user).await.unwrap().wallet_balance,
            Balance::new(dec!(100))
        );
    }

    #[tokio::test]
    async fn test_enroll_rejects_duplicate_profile() {
        let engine = engine();
        let user = UserId::from("user-1");
        engine.enroll_user(user.clone(), "u@example.com", None).await.unwrap();
        let err = engine
            .enroll_user(user, "u@example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::ProfileExists(_)));
    }
}
