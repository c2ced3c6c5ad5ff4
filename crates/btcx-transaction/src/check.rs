//! Context-free consensus checks on a whole transaction.
//!
//! These rules need neither the spent outputs nor the chain state:
//! non-empty input and output lists, a size cap, output value ranges,
//! no duplicate inputs, and the coinbase shape.

use std::collections::HashSet;
use std::fmt;

use btcx_primitives::ChainParams;
use tracing::{debug, debug_span};

use crate::input::TxInLike;
use crate::outpoint::{OutPoint, OutPointLike};
use crate::output::TxOutLike;
use crate::transaction::TransactionLike;
use crate::TransactionError;

/// Largest legacy serialization a transaction may have.
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// One broken whole-transaction rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusViolation {
    NoInputs,
    NoOutputs,
    /// Legacy serialization size in bytes.
    Oversize(usize),
    NegativeOutput { index: usize },
    OutputTooLarge { index: usize },
    /// The running sum of output values left the money range.
    TotalTooLarge,
    DuplicateInput(OutPoint),
    /// Coinbase scriptSig length outside `2..=100`.
    CoinbaseScriptSize(usize),
    /// A non-coinbase input spends the null outpoint.
    NullPrevout { index: usize },
}

impl fmt::Display for ConsensusViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusViolation::NoInputs => write!(f, "vin empty"),
            ConsensusViolation::NoOutputs => write!(f, "vout empty"),
            ConsensusViolation::Oversize(size) => {
                write!(f, "size {} exceeds limit {}", size, MAX_BLOCK_SIZE)
            }
            ConsensusViolation::NegativeOutput { index } => {
                write!(f, "output {} has negative value", index)
            }
            ConsensusViolation::OutputTooLarge { index } => {
                write!(f, "output {} value too large", index)
            }
            ConsensusViolation::TotalTooLarge => write!(f, "total output value too large"),
            ConsensusViolation::DuplicateInput(op) => write!(f, "duplicate input {}", op),
            ConsensusViolation::CoinbaseScriptSize(len) => {
                write!(f, "coinbase scriptSig length {} outside 2..=100", len)
            }
            ConsensusViolation::NullPrevout { index } => {
                write!(f, "input {} spends the null outpoint", index)
            }
        }
    }
}

/// Check `tx`, stopping at the first violation.
pub fn check_transaction<T: TransactionLike>(
    tx: &T,
    params: &ChainParams,
) -> Result<(), TransactionError> {
    match collect_violations(tx, params, false).into_iter().next() {
        Some(v) => Err(v.into()),
        None => Ok(()),
    }
}

/// Check `tx` and return every violation found.
pub fn check_transaction_report<T: TransactionLike>(
    tx: &T,
    params: &ChainParams,
) -> Vec<ConsensusViolation> {
    collect_violations(tx, params, true)
}

fn collect_violations<T: TransactionLike>(
    tx: &T,
    params: &ChainParams,
    full_report: bool,
) -> Vec<ConsensusViolation> {
    let span = debug_span!("check_transaction", txid = %tx.txid());
    let _enter = span.enter();

    let mut found = Vec::new();
    macro_rules! violation {
        ($v:expr) => {{
            let v = $v;
            debug!(violation = %v, "consensus check failed");
            found.push(v);
            if !full_report {
                return found;
            }
        }};
    }

    if tx.inputs().is_empty() {
        violation!(ConsensusViolation::NoInputs);
    }
    if tx.outputs().is_empty() {
        violation!(ConsensusViolation::NoOutputs);
    }

    let size = tx.serialize_legacy().len();
    if size > MAX_BLOCK_SIZE {
        violation!(ConsensusViolation::Oversize(size));
    }

    let mut total: i64 = 0;
    let mut total_ok = true;
    for (index, output) in tx.outputs().iter().enumerate() {
        let value = output.value();
        if value < 0 {
            violation!(ConsensusViolation::NegativeOutput { index });
            continue;
        }
        if value > params.max_money {
            violation!(ConsensusViolation::OutputTooLarge { index });
            continue;
        }
        if total_ok {
            total += value;
            if !params.money_range(total) {
                total_ok = false;
                violation!(ConsensusViolation::TotalTooLarge);
            }
        }
    }

    let mut seen = HashSet::with_capacity(tx.inputs().len());
    for input in tx.inputs() {
        let op = OutPoint::new(*input.prevout().hash(), input.prevout().n());
        if !seen.insert(op) {
            violation!(ConsensusViolation::DuplicateInput(op));
        }
    }

    if tx.is_coinbase() {
        let len = tx.inputs()[0].script_sig().len();
        if !(2..=100).contains(&len) {
            violation!(ConsensusViolation::CoinbaseScriptSize(len));
        }
    } else {
        for (index, input) in tx.inputs().iter().enumerate() {
            if input.prevout().is_null() {
                violation!(ConsensusViolation::NullPrevout { index });
            }
        }
    }

    found
}
