#![allow(dead_code)]

use cardex::application::config::EngineConfig;
use cardex::application::engine::ExchangeEngine;
use cardex::domain::money::Amount;
use cardex::domain::ports::PaymentGatewayBox;
use cardex::domain::profile::{UserId, WalletDirection};
use cardex::infrastructure::in_memory::{StaticGateway, store_set};
use rust_decimal::Decimal;

/// Account number whose NUBAN check digit is valid.
pub const GOOD_ACCOUNT: &str = "0123456784";
/// Guaranty Trust Bank, from the built-in directory.
pub const GTB: &str = "058";

pub fn engine() -> ExchangeEngine {
    engine_with_gateway(Box::new(StaticGateway::default()))
}

pub fn engine_with_gateway(gateway: PaymentGatewayBox) -> ExchangeEngine {
    ExchangeEngine::new(store_set(), gateway, EngineConfig::default())
}

pub async fn enroll(engine: &ExchangeEngine, id: &str) -> UserId {
    let user = UserId::from(id);
    engine
        .enroll_user(user.clone(), &format!("{id}@example.com"), None)
        .await
        .expect("enrollment failed");
    user
}

pub async fn enroll_funded(engine: &ExchangeEngine, id: &str, balance: Decimal) -> UserId {
    let user = enroll(engine, id).await;
    engine
        .apply_wallet_delta(&user, Amount::new(balance).unwrap(), WalletDirection::Add)
        .await
        .expect("funding failed");
    user
}
