//! Domain layer: entities, value objects, and the ports the application
//! layer drives them through. Everything here is pure or near-pure; side
//! effects live behind the traits in [`ports`].

pub mod bank;
pub mod kyc;
pub mod money;
pub mod ports;
pub mod profile;
pub mod rate;
pub mod referral;
pub mod submission;
pub mod transaction;
pub mod withdrawal;
