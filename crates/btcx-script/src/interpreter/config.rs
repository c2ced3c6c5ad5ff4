//! Consensus limits enforced by the interpreter.

/// Largest script that may be evaluated.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Largest single stack element or push.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Non-push opcodes allowed per evaluated script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Combined main and alt stack depth.
pub const MAX_STACK_SIZE: usize = 1000;
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;
/// Byte length of numeric operands; CLTV and CSV accept 5.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
pub const LOCKTIME_NUMBER_LENGTH: usize = 5;

/// Lock times below this are block heights, at or above it unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Input sequence that disables lock time for the input.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
/// BIP68 relative lock time bits.
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;
