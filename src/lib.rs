//! Core domain library for a gift-card exchange service.
//!
//! Users hand in gift cards and receive a local-currency credit to an
//! in-app wallet, computed from an admin-managed rate table and a loyalty
//! tier multiplier. Wallet funds can be withdrawn to a bank account
//! through a payment aggregator, and referrers earn a fixed bonus once
//! the user they referred clears KYC.
//!
//! The crate owns the business rules only: quoting, the non-negative
//! wallet invariant, fee reconciliation, review lifecycles, and referral
//! settlement. Persistence and money movement live behind the ports in
//! [`domain::ports`]; UI, auth, and object storage are external
//! collaborators.
//!
//! Construction is explicit: build a [`domain::ports::StoreSet`], pick a
//! gateway, and hand both to [`application::engine::ExchangeEngine`]
//! together with an [`application::config::EngineConfig`].

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::config::EngineConfig;
pub use application::engine::ExchangeEngine;
pub use error::{ExchangeError, Result};
