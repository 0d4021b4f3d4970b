//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `ExchangeEngine`, the single entry point for
//! quoting, rate administration, wallet reconciliation, withdrawals,
//! reviews, and referral settlement, plus the configuration it runs under.

pub mod config;
pub mod engine;
