mod common;

use async_trait::async_trait;
use cardex::application::config::EngineConfig;
use cardex::application::engine::ExchangeEngine;
use cardex::domain::ports::RateStore;
use cardex::domain::profile::{LoyaltyTier, UserId};
use cardex::domain::rate::{Rate, RateChange, RateStatus, RateUpdate};
use cardex::error::{ExchangeError, Result};
use cardex::infrastructure::in_memory::{InMemoryRateStore, StaticGateway, store_set};
use rust_decimal_macros::dec;

#[tokio::test]
async fn silver_quote_matches_worked_example() {
    let engine = common::engine();
    engine.seed_default_rates().await.unwrap();

    let quote = engine
        .calculate_exchange("Amazon", dec!(100), Some(LoyaltyTier::Silver))
        .await
        .unwrap();
    assert_eq!(quote.exchange_rate, dec!(0.861));
    assert_eq!(quote.exchange_amount, dec!(86.10));
    assert_eq!(quote.tier_bonus, dec!(4.10));
    assert_eq!(quote.currency, "NGN");
}

#[tokio::test]
async fn quote_defaults_to_bronze_and_is_deterministic() {
    let engine = common::engine();
    engine.seed_default_rates().await.unwrap();

    let first = engine
        .calculate_exchange("iTunes", dec!(73.33), None)
        .await
        .unwrap();
    assert_eq!(first.tier, LoyaltyTier::Bronze);
    assert_eq!(first.tier_bonus, dec!(0));

    for _ in 0..5 {
        let again = engine
            .calculate_exchange("iTunes", dec!(73.33), None)
            .await
            .unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn quoting_a_deactivated_rate_fails() {
    let engine = common::engine();
    engine.seed_default_rates().await.unwrap();

    engine
        .update_rate(
            "Steam",
            RateUpdate {
                buy_rate: dec!(0.75),
                sell_rate: dec!(0.78),
                status: Some(RateStatus::Inactive),
            },
            UserId::from("admin-1"),
        )
        .await
        .unwrap();

    let err = engine
        .calculate_exchange("Steam", dec!(100), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::RateNotFound(card) if card == "Steam"));
}

#[tokio::test]
async fn rate_update_is_audited_and_applied() {
    let engine = common::engine();
    engine.seed_default_rates().await.unwrap();

    engine
        .update_rate(
            "Amazon",
            RateUpdate {
                buy_rate: dec!(0.84),
                sell_rate: dec!(0.88),
                status: None,
            },
            UserId::from("admin-1"),
        )
        .await
        .unwrap();

    let quote = engine
        .calculate_exchange("Amazon", dec!(100), None)
        .await
        .unwrap();
    assert_eq!(quote.exchange_amount, dec!(84.00));

    let history = engine.rate_history("Amazon").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous.unwrap().buy_rate, dec!(0.82));
    assert_eq!(history[0].new.buy_rate, dec!(0.84));
    assert_eq!(history[0].actor_id, UserId::from("admin-1"));
}

#[tokio::test]
async fn rejected_bounds_leave_rate_untouched() {
    let engine = common::engine();
    engine.seed_default_rates().await.unwrap();

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

    let quote = engine
        .calculate_exchange("Amazon", dec!(100), None)
        .await
        .unwrap();
    assert_eq!(quote.exchange_amount, dec!(82.00));
    assert!(engine.rate_history("Amazon").await.unwrap().is_empty());
}

#[tokio::test]
async fn trending_returns_five_most_recent_active_rates() {
    let engine = common::engine();
    engine.seed_default_rates().await.unwrap();

    engine
        .update_rate(
            "eBay",
            RateUpdate {
                buy_rate: dec!(0.72),
                sell_rate: dec!(0.75),
                status: None,
            },
            UserId::from("admin-1"),
        )
        .await
        .unwrap();

    let trending = engine.trending_rates().await.unwrap();
    assert_eq!(trending.len(), 5);
    assert_eq!(trending[0].card_type, "eBay");
}

#[tokio::test]
async fn seeding_skips_existing_card_types() {
    let engine = common::engine();
    engine
        .update_rate(
            "Amazon",
            RateUpdate {
                buy_rate: dec!(0.90),
                sell_rate: dec!(0.95),
                status: None,
            },
            UserId::from("admin-1"),
        )
        .await
        .unwrap();

    // Amazon already exists, so the catalog only fills in the other nine.
    assert_eq!(engine.seed_default_rates().await.unwrap(), 9);
    let quote = engine
        .calculate_exchange("Amazon", dec!(100), None)
        .await
        .unwrap();
    assert_eq!(quote.exchange_amount, dec!(90.00));
}

/// Rate store whose audit log is down: every `append_change` errors while
/// the rate table itself keeps working.
#[derive(Default, Clone)]
struct LossyAuditRateStore(InMemoryRateStore);

#[async_trait]
impl RateStore for LossyAuditRateStore {
    async fn upsert(&self, rate: Rate) -> Result<()> {
        self.0.upsert(rate).await
    }

    async fn get(&self, card_type: &str) -> Result<Option<Rate>> {
        self.0.get(card_type).await
    }

    async fn all(&self) -> Result<Vec<Rate>> {
        self.0.all().await
    }

    async fn append_change(&self, _change: RateChange) -> Result<()> {
        Err(ExchangeError::ExternalServiceFailure(
            "audit log unavailable".to_string(),
        ))
    }

    async fn changes_for(&self, card_type: &str, limit: usize) -> Result<Vec<RateChange>> {
        self.0.changes_for(card_type, limit).await
    }
}

#[tokio::test]
async fn audit_append_failure_does_not_fail_the_rate_update() {
    let mut stores = store_set();
    stores.rates = Box::new(LossyAuditRateStore::default());
    let engine = ExchangeEngine::new(
        stores,
        Box::new(StaticGateway::default()),
        EngineConfig::default(),
    );

    let rate = engine
        .update_rate(
            "Amazon",
            RateUpdate {
                buy_rate: dec!(0.84),
                sell_rate: dec!(0.88),
                status: None,
            },
            UserId::from("admin-1"),
        )
        .await
        .unwrap();
    assert_eq!(rate.buy_rate, dec!(0.84));

    // The rate update stands and is quotable; only the history is lost.
    let quote = engine
        .calculate_exchange("Amazon", dec!(100), None)
        .await
        .unwrap();
    assert_eq!(quote.exchange_amount, dec!(84.00));
    assert!(engine.rate_history("Amazon").await.unwrap().is_empty());
}
