/// Error types for script operations.
///
/// Covers construction from text, classification mismatches and address
/// codec failures. Invalid scripts themselves are not errors; see
/// [`crate::ScriptToken::Invalid`].
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script cannot be used for the requested operation.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Invalid token in an ASM string.
    #[error("invalid asm token '{0}'")]
    InvalidAsm(String),

    /// Attempted to use `append_opcodes` for a push data opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid address string, or a script with no address form.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Base58 version byte does not belong to the chain.
    #[error("address prefix 0x{0:02x} not valid for {1}")]
    UnexpectedPrefix(u8, String),

    /// Script exceeds a size limit.
    #[error("script too large: {0} bytes")]
    ScriptTooLarge(usize),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Script is not a P2PKH script.
    #[error("not a P2PKH")]
    NotP2PKH,

    /// Push data exceeds the largest push encoding.
    #[error("data too big")]
    DataTooBig,

    /// Multisig parameters out of range.
    #[error("invalid multisig: {0}")]
    InvalidMultisig(String),

    /// Error from primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] btcx_primitives::PrimitivesError),
}
