/// secp256k1 keys and ECDSA signatures, backed by `k256`.
///
/// This is the cryptographic collaborator used by the interpreter and the
/// signing templates: verify, sign, derive a public key, tweak and combine.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
