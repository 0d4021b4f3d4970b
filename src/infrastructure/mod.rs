//! Adapters behind the domain's store and gateway ports.
//!
//! `in_memory` is always available and backs the test suite; the
//! persistent RocksDB store and the Flutterwave HTTP gateway are opt-in
//! features so library consumers only pull in what they deploy.

#[cfg(feature = "gateway-flutterwave")]
pub mod flutterwave;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
