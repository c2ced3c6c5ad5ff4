/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Scripts are used in transaction inputs (unlocking) and outputs (locking)
/// to define spending conditions. The Script wraps a `Vec<u8>` and keeps the
/// bytes exactly as given, so non-canonical encodings survive a round trip.
/// Classification is purely structural; nothing here executes a script.

use std::fmt;

use btcx_primitives::ec::PublicKey;
use btcx_primitives::hash::{hash160, sha256};

use crate::interpreter::config::{
    MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE,
};
use crate::opcodes::*;
use crate::token::{push_data_prefix, ScriptToken, Tokens};
use crate::ScriptError;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Create a script from raw bytes, preserving their encoding.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from a token sequence.
    ///
    /// Pushes are re-encoded with the shortest length prefix regardless of
    /// the opcode recorded in the token. Fails on an `Invalid` token or an
    /// `Op` token carrying a push opcode.
    pub fn from_tokens<I>(tokens: I) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = ScriptToken>,
    {
        let mut script = Script::new();
        for token in tokens {
            match token {
                ScriptToken::Op(op) => script.append_opcodes(&[op])?,
                ScriptToken::Push { data, .. } => script.append_push_data(&data)?,
                ScriptToken::Invalid { offset, reason } => {
                    return Err(ScriptError::InvalidScript(format!(
                        "invalid token at offset {}: {}",
                        offset, reason
                    )))
                }
            }
        }
        Ok(script)
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Parses space-separated tokens where known opcodes (e.g. "OP_DUP") are
    /// emitted directly, `0` is an empty push, and hex strings are pushed
    /// as data.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for section in asm.split_whitespace() {
            if let Some(opcode) = string_to_opcode(section) {
                script.append_opcodes(&[opcode])?;
            } else if section == "0" {
                script.0.push(OP_0);
            } else {
                let data = hex::decode(section)
                    .map_err(|_| ScriptError::InvalidAsm(section.to_string()))?;
                script.append_push_data(&data)?;
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly) representation.
    ///
    /// Data pushes appear as hex, opcodes by name. An unparsable tail is
    /// rendered as `[error]`.
    pub fn to_asm(&self) -> String {
        self.tokens()
            .map(|t| t.to_asm_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the script's tokens.
    ///
    /// Every call starts from the beginning. A malformed tail ends the
    /// sequence with a single [`ScriptToken::Invalid`].
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens::new(&self.0)
    }

    /// True when the whole script tokenizes.
    pub fn is_valid(&self) -> bool {
        !self.tokens().any(|t| t.is_invalid())
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Pay-to-public-key-hash:
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Pay-to-public-key: `<33 or 65 byte key> OP_CHECKSIG`, directly pushed.
    pub fn is_p2pk(&self) -> bool {
        let b = &self.0;
        match b.len() {
            35 => b[0] == OP_DATA_33 && matches!(b[1], 0x02 | 0x03) && b[34] == OP_CHECKSIG,
            67 => b[0] == OP_DATA_65 && b[1] == 0x04 && b[66] == OP_CHECKSIG,
            _ => false,
        }
    }

    /// Pay-to-script-hash: `OP_HASH160 <20 bytes> OP_EQUAL`.
    ///
    /// The exact byte pattern is consensus; a non-minimal push of the hash
    /// is not P2SH.
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// A version byte (`OP_0` or `OP_1..=OP_16`) followed by one direct push
    /// of 2 to 40 bytes.
    pub fn is_witness_program(&self) -> bool {
        let b = &self.0;
        if b.len() < 4 || b.len() > 42 {
            return false;
        }
        if b[0] != OP_0 && !(OP_1..=OP_16).contains(&b[0]) {
            return false;
        }
        b[1] as usize + 2 == b.len()
    }

    /// Witness version of a witness program.
    pub fn witness_version(&self) -> Option<u8> {
        if self.is_witness_program() {
            decode_op_n(self.0[0])
        } else {
            None
        }
    }

    /// Witness program bytes of a witness program.
    pub fn witness_program(&self) -> Option<&[u8]> {
        if self.is_witness_program() {
            Some(&self.0[2..])
        } else {
            None
        }
    }

    /// Witness v0 key hash: `OP_0 <20 bytes>`.
    pub fn is_p2wpkh(&self) -> bool {
        self.0.len() == 22 && self.0[0] == OP_0 && self.0[1] == OP_DATA_20
    }

    /// Witness v0 script hash: `OP_0 <32 bytes>`.
    pub fn is_p2wsh(&self) -> bool {
        self.0.len() == 34 && self.0[0] == OP_0 && self.0[1] == OP_DATA_32
    }

    /// Bare multisig: `OP_m <pubkey>... OP_n OP_CHECKMULTISIG` with
    /// `1 <= m <= n <= 16` and exactly `n` key pushes of 33 or 65 bytes.
    pub fn is_multisig(&self) -> bool {
        let tokens: Vec<ScriptToken> = self.tokens().collect();
        if tokens.len() < 4 {
            return false;
        }
        let m = match tokens[0] {
            ScriptToken::Op(op) => decode_op_n(op),
            _ => None,
        };
        let n = match tokens[tokens.len() - 2] {
            ScriptToken::Op(op) => decode_op_n(op),
            _ => None,
        };
        let (m, n) = match (m, n) {
            (Some(m), Some(n)) if m >= 1 && m <= n => (m, n),
            _ => return false,
        };
        if tokens[tokens.len() - 1] != ScriptToken::Op(OP_CHECKMULTISIG) {
            return false;
        }
        let keys = &tokens[1..tokens.len() - 2];
        keys.len() == n as usize
            && keys.iter().all(|t| {
                matches!(t.push_data(), Some(d) if d.len() == 33 || d.len() == 65)
            })
    }

    /// Provably unspendable: starts with `OP_RETURN` or exceeds the
    /// maximum script size.
    pub fn is_unspendable(&self) -> bool {
        (!self.0.is_empty() && self.0[0] == OP_RETURN) || self.0.len() > MAX_SCRIPT_SIZE
    }

    /// Only pushes (`OP_RESERVED` and small ints included) and fully valid.
    pub fn is_push_only(&self) -> bool {
        self.tokens().all(|t| match t {
            ScriptToken::Op(op) => op <= OP_16,
            ScriptToken::Push { .. } => true,
            ScriptToken::Invalid { .. } => false,
        })
    }

    /// Every push uses the smallest length prefix for its size, and single
    /// bytes `0..=16` are not pushed as data.
    pub fn has_canonical_pushes(&self) -> bool {
        self.tokens().all(|t| match t {
            ScriptToken::Op(_) => true,
            ScriptToken::Push { opcode, data, .. } => {
                if opcode < OP_PUSHDATA1 && opcode > OP_0 && data.len() == 1 && data[0] <= 16 {
                    return false;
                }
                match opcode {
                    OP_PUSHDATA1 => data.len() >= OP_PUSHDATA1 as usize,
                    OP_PUSHDATA2 => data.len() > 0xff,
                    OP_PUSHDATA4 => data.len() > 0xffff,
                    _ => true,
                }
            }
            ScriptToken::Invalid { .. } => false,
        })
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// The 20-byte hash of a P2PKH script.
    pub fn public_key_hash(&self) -> Result<&[u8], ScriptError> {
        if self.is_p2pkh() {
            Ok(&self.0[3..23])
        } else {
            Err(ScriptError::NotP2PKH)
        }
    }

    /// The 20-byte hash of a P2SH script.
    pub fn script_hash(&self) -> Option<&[u8]> {
        if self.is_p2sh() {
            Some(&self.0[2..22])
        } else {
            None
        }
    }

    /// Count signature operations.
    ///
    /// With `accurate`, a CHECKMULTISIG preceded by `OP_1..=OP_16` counts
    /// that many keys; otherwise every CHECKMULTISIG counts as
    /// [`MAX_PUBKEYS_PER_MULTISIG`]. Counting stops at an invalid tail.
    pub fn sig_op_count(&self, accurate: bool) -> usize {
        let mut count = 0;
        let mut last_op = OP_INVALIDOPCODE;
        for token in self.tokens() {
            let op = match token.opcode() {
                Some(op) => op,
                None => break,
            };
            match op {
                OP_CHECKSIG | OP_CHECKSIGVERIFY => count += 1,
                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                    if accurate && (OP_1..=OP_16).contains(&last_op) {
                        count += (last_op - (OP_1 - 1)) as usize;
                    } else {
                        count += MAX_PUBKEYS_PER_MULTISIG;
                    }
                }
                _ => {}
            }
            last_op = op;
        }
        count
    }

    /// Signature operations of a P2SH spend: the accurate count of the
    /// redeem script pushed last by `script_sig`.
    ///
    /// For a non-P2SH script this is `self.sig_op_count(true)`. A
    /// `script_sig` that is not push-only counts zero.
    pub fn p2sh_sig_op_count(&self, script_sig: &Script) -> usize {
        if !self.is_p2sh() {
            return self.sig_op_count(true);
        }
        let mut last_data: Option<Vec<u8>> = None;
        for token in script_sig.tokens() {
            match token {
                ScriptToken::Push { data, .. } => last_data = Some(data),
                ScriptToken::Op(op) if op <= OP_16 => last_data = None,
                _ => return 0,
            }
        }
        match last_data {
            Some(data) => Script(data).sig_op_count(true),
            None => 0,
        }
    }

    // -----------------------------------------------------------------------
    // Legacy signature-hash helpers
    // -----------------------------------------------------------------------

    /// Remove every occurrence of `pattern` that starts on a token boundary.
    ///
    /// Consecutive occurrences are all removed. Returns the rewritten
    /// script and the number of removals; the script is unchanged when
    /// nothing matched or `pattern` is empty.
    pub fn find_and_delete(&self, pattern: &Script) -> (Script, usize) {
        let b = &pattern.0;
        if b.is_empty() {
            return (self.clone(), 0);
        }
        let bytes = &self.0;
        let mut result = Vec::with_capacity(bytes.len());
        let mut found = 0;
        let mut pc = 0;
        let mut pc2 = 0;
        loop {
            result.extend_from_slice(&bytes[pc2..pc]);
            while bytes.len() - pc >= b.len() && bytes[pc..].starts_with(b) {
                pc += b.len();
                found += 1;
            }
            pc2 = pc;
            let mut tokens = Tokens::new(&bytes[pc..]);
            match tokens.next() {
                Some(ScriptToken::Invalid { .. }) | None => break,
                Some(_) => pc += tokens.position(),
            }
        }
        if found == 0 {
            return (self.clone(), 0);
        }
        result.extend_from_slice(&bytes[pc2..]);
        (Script(result), found)
    }

    /// Copy of the script with every `OP_CODESEPARATOR` dropped.
    ///
    /// Push payloads are never inspected; an invalid tail is kept verbatim.
    pub fn without_codeseparators(&self) -> Script {
        let mut out = Vec::with_capacity(self.0.len());
        let mut tokens = self.tokens();
        let mut start = 0;
        while let Some(token) = tokens.next() {
            let end = if token.is_invalid() { self.0.len() } else { tokens.position() };
            if token != ScriptToken::Op(OP_CODESEPARATOR) {
                out.extend_from_slice(&self.0[start..end]);
            }
            start = end;
        }
        Script(out)
    }

    /// Script code for signing a witness v0 key-hash program: the
    /// equivalent P2PKH script.
    pub fn script_code_for_witness_v0(&self) -> Result<Script, ScriptError> {
        if !self.is_p2wpkh() {
            return Err(ScriptError::InvalidScript(
                "script code only derivable from a witness v0 key hash program".to_string(),
            ));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&self.0[2..22]);
        Ok(Script::p2pkh_script(&hash))
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh_script(hash: &[u8; 20]) -> Script {
        let mut b = Vec::with_capacity(25);
        b.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(hash);
        b.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(b)
    }

    /// `OP_HASH160 <hash> OP_EQUAL`.
    pub fn p2sh_script(hash: &[u8; 20]) -> Script {
        let mut b = Vec::with_capacity(23);
        b.extend_from_slice(&[OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(hash);
        b.push(OP_EQUAL);
        Script(b)
    }

    /// `OP_0 <hash>`.
    pub fn p2wpkh_script(hash: &[u8; 20]) -> Script {
        Script::witness_program_script(0, hash).unwrap_or_default()
    }

    /// `OP_0 <hash>`.
    pub fn p2wsh_script(hash: &[u8; 32]) -> Script {
        Script::witness_program_script(0, hash).unwrap_or_default()
    }

    /// A witness program of any version.
    pub fn witness_program_script(version: u8, program: &[u8]) -> Result<Script, ScriptError> {
        let op = encode_op_n(version).ok_or_else(|| {
            ScriptError::InvalidScript(format!("witness version {} out of range", version))
        })?;
        if program.len() < 2 || program.len() > 40 {
            return Err(ScriptError::InvalidScript(format!(
                "witness program length {} out of range",
                program.len()
            )));
        }
        let mut b = Vec::with_capacity(program.len() + 2);
        b.push(op);
        b.push(program.len() as u8);
        b.extend_from_slice(program);
        Ok(Script(b))
    }

    /// `OP_m <key>... OP_n OP_CHECKMULTISIG`.
    ///
    /// Keys keep their own compressed or uncompressed form.
    pub fn multisig_script(required: usize, keys: &[PublicKey]) -> Result<Script, ScriptError> {
        if keys.is_empty() || keys.len() > 16 {
            return Err(ScriptError::InvalidMultisig(format!(
                "{} keys, need 1 to 16",
                keys.len()
            )));
        }
        if required == 0 || required > keys.len() {
            return Err(ScriptError::InvalidMultisig(format!(
                "{} of {} required",
                required,
                keys.len()
            )));
        }
        let mut script = Script::new();
        script.append_small_int(required as u8)?;
        for key in keys {
            script.append_push_data(&key.to_bytes())?;
        }
        script.append_small_int(keys.len() as u8)?;
        script.0.push(OP_CHECKMULTISIG);
        Ok(script)
    }

    /// P2SH script committing to this script as redeem script.
    ///
    /// Fails when the script is too large to be pushed as a stack element,
    /// since such an output could never be spent.
    pub fn to_p2sh_script_pubkey(&self) -> Result<Script, ScriptError> {
        if self.0.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ScriptTooLarge(self.0.len()));
        }
        Ok(Script::p2sh_script(&hash160(&self.0)))
    }

    /// P2WSH script committing to this script as witness script.
    pub fn to_p2wsh_script_pubkey(&self) -> Script {
        Script::p2wsh_script(&sha256(&self.0))
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes with the shortest PUSHDATA prefix.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append `OP_0..=OP_16` for a value up to 16.
    pub fn append_small_int(&mut self, n: u8) -> Result<(), ScriptError> {
        let op = encode_op_n(n)
            .ok_or_else(|| ScriptError::InvalidScript(format!("{} is not a small integer", n)))?;
        self.0.push(op);
        Ok(())
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (`0x01..=OP_PUSHDATA4`) since they need a
    /// payload. Use `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_asm())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
