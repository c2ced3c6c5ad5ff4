/// Bitcoin script values, classification, addresses and the script interpreter.
///
/// Provides the [`Script`] byte-string type with its total tokenizer, opcode
/// definitions, per-input witness stacks, address encoding, and a consensus
/// script interpreter covering P2SH and witness v0 programs.

pub mod script;
pub mod opcodes;
pub mod token;
pub mod address;
pub mod witness;
pub mod interpreter;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use token::{ScriptToken, Tokens};
pub use address::{Address, AddressPayload};
pub use witness::ScriptWitness;
