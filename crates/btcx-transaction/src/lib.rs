//! btcx transaction layer.
//!
//! Provides the transaction model in immutable and mutable form, the
//! consensus wire codec with segwit support, legacy and BIP143 signature
//! hashes, spend verification through the script interpreter, the
//! context-free consensus checks, and P2PKH/P2WPKH signing templates.

pub mod check;
pub mod input;
pub mod outpoint;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;
pub mod verify;
pub mod witness;

mod error;
pub use check::{check_transaction, check_transaction_report, ConsensusViolation};
pub use error::TransactionError;
pub use input::{MutableTxIn, TxIn, TxInLike};
pub use outpoint::{MutableOutPoint, OutPoint, OutPointLike};
pub use output::{MutableTxOut, TxOut, TxOutLike};
pub use sighash::{signature_hash, SighashType};
pub use transaction::{MutableTransaction, Transaction, TransactionLike};
pub use verify::{verify_script, verify_transaction_inputs, TransactionChecker};
pub use witness::{MutableTxInWitness, MutableTxWitness, TxInWitness, TxWitness};

#[cfg(test)]
mod tests;
