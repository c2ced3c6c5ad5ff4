//! Script verification flags (bitmask).

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Evaluate BIP16 pay-to-script-hash redeem scripts.
    pub const P2SH: ScriptFlags = ScriptFlags(1 << 0);
    /// Signatures and public keys must use strict encodings and defined hash types.
    pub const STRICT_ENCODING: ScriptFlags = ScriptFlags(1 << 1);
    /// Signatures must be strict DER (BIP66).
    pub const DER_SIGNATURES: ScriptFlags = ScriptFlags(1 << 2);
    pub const LOW_S: ScriptFlags = ScriptFlags(1 << 3);
    /// The extra CHECKMULTISIG argument must be empty (BIP147).
    pub const NULL_DUMMY: ScriptFlags = ScriptFlags(1 << 4);
    pub const SIG_PUSH_ONLY: ScriptFlags = ScriptFlags(1 << 5);
    pub const MINIMAL_DATA: ScriptFlags = ScriptFlags(1 << 6);
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 7);
    /// Exactly one item may remain after evaluation. Requires P2SH and WITNESS.
    pub const CLEAN_STACK: ScriptFlags = ScriptFlags(1 << 8);
    pub const CHECKLOCKTIMEVERIFY: ScriptFlags = ScriptFlags(1 << 9);
    pub const CHECKSEQUENCEVERIFY: ScriptFlags = ScriptFlags(1 << 10);
    /// Evaluate witness programs (BIP141). Requires P2SH.
    pub const WITNESS: ScriptFlags = ScriptFlags(1 << 11);
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: ScriptFlags = ScriptFlags(1 << 12);
    /// IF/NOTIF arguments in witness v0 scripts must be empty or exactly 0x01.
    pub const MINIMAL_IF: ScriptFlags = ScriptFlags(1 << 13);
    /// Failed signature checks require empty signatures.
    pub const NULL_FAIL: ScriptFlags = ScriptFlags(1 << 14);
    /// Witness v0 public keys must be compressed.
    pub const WITNESS_PUBKEY_TYPE: ScriptFlags = ScriptFlags(1 << 15);
    /// Legacy scripts may not contain OP_CODESEPARATOR or match signatures by find-and-delete.
    pub const CONST_SCRIPTCODE: ScriptFlags = ScriptFlags(1 << 16);

    /// Flags every block must satisfy.
    pub const MANDATORY: ScriptFlags = ScriptFlags::P2SH;

    /// Soft-fork rules active on the main chain today.
    pub const CONSENSUS: ScriptFlags = ScriptFlags(
        ScriptFlags::P2SH.0
            | ScriptFlags::DER_SIGNATURES.0
            | ScriptFlags::NULL_DUMMY.0
            | ScriptFlags::CHECKLOCKTIMEVERIFY.0
            | ScriptFlags::CHECKSEQUENCEVERIFY.0
            | ScriptFlags::WITNESS.0,
    );

    /// Relay policy flags.
    pub const STANDARD: ScriptFlags = ScriptFlags(
        ScriptFlags::CONSENSUS.0
            | ScriptFlags::STRICT_ENCODING.0
            | ScriptFlags::LOW_S.0
            | ScriptFlags::MINIMAL_DATA.0
            | ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS.0
            | ScriptFlags::CLEAN_STACK.0
            | ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM.0
            | ScriptFlags::MINIMAL_IF.0
            | ScriptFlags::NULL_FAIL.0
            | ScriptFlags::WITNESS_PUBKEY_TYPE.0
            | ScriptFlags::CONST_SCRIPTCODE.0,
    );

    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn has_any(self, flags: &[ScriptFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }

    pub fn remove_flag(&mut self, flag: ScriptFlags) {
        self.0 &= !flag.0;
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}
