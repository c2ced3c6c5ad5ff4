#![deny(missing_docs)]

//! btcx - transactions, scripts and script evaluation.
//!
//! Re-exports all btcx components for convenient single-crate usage.

pub use btcx_primitives as primitives;
pub use btcx_script as script;
pub use btcx_transaction as transaction;
