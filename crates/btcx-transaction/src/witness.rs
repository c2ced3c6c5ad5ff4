//! Segregated witness data of a transaction.
//!
//! Each input owns one [`TxInWitness`]; the transaction holds them in a
//! [`TxWitness`] aligned by position with its inputs. A witness set where
//! every stack is empty is "null" and is not serialized at all.

use btcx_primitives::util::{BtcReader, BtcWriter};
use btcx_script::ScriptWitness;

use crate::TransactionError;

// ---------------------------------------------------------------------------
// Per-input witness
// ---------------------------------------------------------------------------

/// Immutable witness of one input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TxInWitness {
    script_witness: ScriptWitness,
}

impl TxInWitness {
    pub fn new(script_witness: ScriptWitness) -> Self {
        TxInWitness { script_witness }
    }

    pub fn script_witness(&self) -> &ScriptWitness {
        &self.script_witness
    }

    pub fn is_null(&self) -> bool {
        self.script_witness.is_null()
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        let script_witness = ScriptWitness::read_from(reader).map_err(|e| {
            TransactionError::MalformedData(format!("reading witness stack: {}", e))
        })?;
        Ok(TxInWitness { script_witness })
    }

    pub fn write_to(&self, writer: &mut BtcWriter) {
        self.script_witness.write_to(writer);
    }

    pub fn to_mutable(&self) -> MutableTxInWitness {
        MutableTxInWitness { script_witness: self.script_witness.clone() }
    }

    pub fn to_immutable(&self) -> TxInWitness {
        self.clone()
    }
}

impl From<MutableTxInWitness> for TxInWitness {
    fn from(w: MutableTxInWitness) -> Self {
        TxInWitness { script_witness: w.script_witness }
    }
}

impl From<ScriptWitness> for TxInWitness {
    fn from(script_witness: ScriptWitness) -> Self {
        TxInWitness { script_witness }
    }
}

/// Witness of one input with an assignable stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutableTxInWitness {
    pub script_witness: ScriptWitness,
}

impl MutableTxInWitness {
    pub fn new(script_witness: ScriptWitness) -> Self {
        MutableTxInWitness { script_witness }
    }

    pub fn is_null(&self) -> bool {
        self.script_witness.is_null()
    }

    pub fn to_mutable(&self) -> MutableTxInWitness {
        self.clone()
    }

    pub fn to_immutable(&self) -> TxInWitness {
        TxInWitness::from(self.clone())
    }
}

impl From<TxInWitness> for MutableTxInWitness {
    fn from(w: TxInWitness) -> Self {
        MutableTxInWitness { script_witness: w.script_witness }
    }
}

impl From<ScriptWitness> for MutableTxInWitness {
    fn from(script_witness: ScriptWitness) -> Self {
        MutableTxInWitness { script_witness }
    }
}

// ---------------------------------------------------------------------------
// Per-transaction witness
// ---------------------------------------------------------------------------

/// Immutable witness section of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TxWitness {
    inputs: Vec<TxInWitness>,
}

impl TxWitness {
    /// Build from per-input witnesses of either form.
    pub fn new<I>(inputs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<TxInWitness>,
    {
        TxWitness { inputs: inputs.into_iter().map(Into::into).collect() }
    }

    pub fn inputs(&self) -> &[TxInWitness] {
        &self.inputs
    }

    /// True when no input carries witness data.
    pub fn is_null(&self) -> bool {
        self.inputs.iter().all(TxInWitness::is_null)
    }

    /// Read exactly one witness stack per input.
    pub fn read_from(reader: &mut BtcReader<'_>, num_inputs: usize) -> Result<Self, TransactionError> {
        let mut inputs = Vec::with_capacity(num_inputs);
        for _ in 0..num_inputs {
            inputs.push(TxInWitness::read_from(reader)?);
        }
        Ok(TxWitness { inputs })
    }

    pub fn to_mutable(&self) -> MutableTxWitness {
        MutableTxWitness { inputs: self.inputs.iter().map(TxInWitness::to_mutable).collect() }
    }

    pub fn to_immutable(&self) -> TxWitness {
        self.clone()
    }
}

impl From<MutableTxWitness> for TxWitness {
    fn from(w: MutableTxWitness) -> Self {
        TxWitness::new(w.inputs)
    }
}

/// Witness section with an assignable list of per-input witnesses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutableTxWitness {
    pub inputs: Vec<MutableTxInWitness>,
}

impl MutableTxWitness {
    pub fn new<I>(inputs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<MutableTxInWitness>,
    {
        MutableTxWitness { inputs: inputs.into_iter().map(Into::into).collect() }
    }

    pub fn is_null(&self) -> bool {
        self.inputs.iter().all(MutableTxInWitness::is_null)
    }

    pub fn to_mutable(&self) -> MutableTxWitness {
        self.clone()
    }

    pub fn to_immutable(&self) -> TxWitness {
        TxWitness::from(self.clone())
    }
}

impl From<TxWitness> for MutableTxWitness {
    fn from(w: TxWitness) -> Self {
        MutableTxWitness::new(w.inputs)
    }
}
