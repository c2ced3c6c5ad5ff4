//! Crate-level tests: parsing, sizes, mutable and immutable forms,
//! signature hashes, and signing followed by verification.

use std::sync::Once;

use btcx_primitives::chainhash::Hash;
use btcx_primitives::ec::PrivateKey;
use btcx_primitives::hash::hash160;
use btcx_primitives::ChainParams;
use btcx_script::interpreter::{InterpreterErrorCode, ScriptFlags, SigVersion};
use btcx_script::{Address, Script, ScriptWitness};

use crate::sighash::{self, SighashType, SIGHASH_ONE};
use crate::input::SEQUENCE_FINAL;
use crate::template::{p2pkh, p2wpkh, sign_input, UnlockingScriptTemplate};
use crate::*;

// -----------------------------------------------------------------------
// Raw transaction vectors
// -----------------------------------------------------------------------

/// One P2PKH input, two outputs; vsize 235.
const LEGACY_TX_HEX: &str = "0200000001eab856b5c4de81511cedab916630cf0afa38ea4ed8e0e88c8990eda88773cd47010000006b4830450221008f9ea83b8f4a2d23b07a02f25109aa508a78b85643b0a1f1c8a08c48d32f53e6022053e7028a585c55ba53895e9a8ef8def86b1d109ec057400f4d5f152f5bf302d60121020bcf101930dd54e22344d4ef060561fe68f42426fe01f92c694bd119f308d44effffffff027ef91e82100000001976a914f1ef6b3f14c69cafd75b3a5cd2101114bb411d5088ac12533c72040000002200201f828f01c988a992ef9efb4c77a8e3607df0f97edbc3029fe95d62f6b1c436bb00000000";

/// Two P2SH-P2WPKH inputs, two outputs; vsize 257.
const WITNESS_TX_HEX: &str = "020000000001025fdeae88276b595be42d440d638a52d3ea0e1e1c820ab305ce438452468d7a2201000000171600149f2ca9bcbfb16f8a5c4f664aa22a2c833545a2b5fefffffffc25d526160911147b11fefeb6598ae97e093590d642265f27a67e7242a2ac31000000001716001482ad37a540c47bbb740596667f472f9d96f6dfb3feffffff02848a1b000000000017a914dc5d78da1cd6b02e08f0aa7bf608b091094415968700e1f5050000000017a9144b8acc9fc4210a5ce3ff417b00b419fd4fb03f8c8702473044022042c7ca216ace58920d6114ad30798a7a0b2b64faf17803034316dd83c90048a002205e37943bc694622128494fa2d9d3d402a58d91c1661c9a3a28124ff0e457d561012103bb79122851602141d7ec63a7342bc23bc51f050808695c141958cf2c222e38ed02483045022100c6841686570b60540b1c5ef620f3159f1f359a12cf30112650e72c44864b3e7202205c565a6cf05578557232e03d1655b73dcbf4e082c6ff0602707f0c0394c86b7601210292f52933e2105dc7410445be9a9d01589e0b9bc09d7a4e1509dc8e094b9ee9e437040000";

static TRACING_INIT: Once = Once::new();

fn init_logging() {
    use tracing_subscriber::prelude::*;

    TRACING_INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    });
}

fn key(seed: u8) -> PrivateKey {
    PrivateKey::from_bytes(&[seed; 32]).expect("valid key")
}

fn prevout(n: u32) -> OutPoint {
    OutPoint::new(Hash::new([0xab; 32]), n)
}

/// A transaction spending `n` outputs into one output of 1000 satoshis.
fn spending_tx(n: u32) -> MutableTransaction {
    let mut tx = MutableTransaction::default();
    tx.version = 2;
    for i in 0..n {
        tx.inputs.push(MutableTxIn::new(prevout(i), Script::new(), 0xffff_fffd));
    }
    tx.outputs.push(MutableTxOut::new(1000, Script::from_bytes(&[0x51])));
    tx
}

// -----------------------------------------------------------------------
// Parsing and serialization
// -----------------------------------------------------------------------

#[test]
fn test_legacy_roundtrip() {
    let tx = Transaction::from_hex(LEGACY_TX_HEX).expect("should parse legacy tx");
    assert_eq!(tx.version(), 2);
    assert_eq!(tx.inputs().len(), 1);
    assert_eq!(tx.outputs().len(), 2);
    assert!(!tx.has_witness());
    assert_eq!(tx.to_hex(), LEGACY_TX_HEX);
    assert_eq!(tx.txid(), tx.wtxid());
}

#[test]
fn test_witness_roundtrip() {
    let tx = Transaction::from_hex(WITNESS_TX_HEX).expect("should parse witness tx");
    assert!(tx.has_witness());
    assert_eq!(tx.inputs().len(), 2);
    assert_eq!(tx.witness().inputs().len(), 2);
    assert_eq!(tx.input_witness(0).map(|w| w.len()), Some(2));
    assert_eq!(tx.to_hex(), WITNESS_TX_HEX);
    assert_ne!(tx.txid(), tx.wtxid());

    // the legacy form drops marker, flag and witness stacks
    let legacy = Transaction::deserialize(&tx.serialize_legacy()).expect("legacy form parses");
    assert!(!legacy.has_witness());
    assert_eq!(legacy.txid(), tx.txid());
    assert_eq!(legacy.inputs(), tx.inputs());
}

#[test]
fn test_mutable_roundtrip_matches_immutable() {
    let frozen = Transaction::from_hex(WITNESS_TX_HEX).unwrap();
    let thawed = MutableTransaction::from_hex(WITNESS_TX_HEX).unwrap();
    assert_eq!(thawed.to_hex(), WITNESS_TX_HEX);
    assert_eq!(thawed.txid(), frozen.txid());
    assert_eq!(thawed.to_immutable(), frozen);
    assert_eq!(frozen.to_mutable(), thawed);
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = hex::decode(LEGACY_TX_HEX).unwrap();
    bytes.push(0x00);
    match Transaction::deserialize(&bytes) {
        Err(TransactionError::MalformedData(msg)) => assert!(msg.contains("trailing")),
        other => panic!("unexpected result {:?}", other),
    }

    // a stream reader stops after the transaction instead
    let mut reader = btcx_primitives::util::BtcReader::new(&bytes);
    assert!(Transaction::read_from(&mut reader).is_ok());
    assert_eq!(reader.remaining(), 1);
}

#[test]
fn test_truncated_rejected() {
    let bytes = hex::decode(WITNESS_TX_HEX).unwrap();
    for cut in [0, 4, 5, 6, 50, bytes.len() - 1] {
        assert!(
            Transaction::deserialize(&bytes[..cut]).is_err(),
            "truncation at {} should fail",
            cut
        );
    }
}

/// A marker and flag followed by witness stacks that are all empty.
#[test]
fn test_superfluous_witness_rejected() {
    let mut tx = spending_tx(1);
    tx.input_witness_mut(0).push(vec![0x01]);
    let mut bytes = tx.serialize();
    // the single stack is `01 01 01`; replace it with an empty stack
    let lock_time_at = bytes.len() - 4;
    bytes.splice(lock_time_at - 3..lock_time_at, [0x00]);
    match Transaction::deserialize(&bytes) {
        Err(TransactionError::MalformedData(msg)) => assert!(msg.contains("superfluous")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_unknown_flag_rejected() {
    let mut tx = spending_tx(1);
    tx.input_witness_mut(0).push(vec![0x01]);
    let mut bytes = tx.serialize();
    bytes[5] = 0x03;
    assert!(Transaction::deserialize(&bytes).is_err());
}

/// With no inputs, the zero count doubles as the segwit marker and the
/// following byte is read as flags.
#[test]
fn test_empty_transaction_encoding() {
    let tx = Transaction::default();
    assert_eq!(tx.to_hex(), "01000000000000000000");
    let parsed = Transaction::from_hex("01000000000000000000").unwrap();
    assert!(parsed.inputs().is_empty());
    assert!(parsed.outputs().is_empty());
}

#[test]
fn test_witness_padding() {
    // witness for the second input only; the first serializes as empty
    let mut tx = spending_tx(2);
    tx.input_witness_mut(1).push(vec![0xaa]);
    assert_eq!(tx.witness.inputs.len(), 2);
    let parsed = MutableTransaction::deserialize(&tx.serialize()).unwrap();
    assert!(parsed.witness.inputs[0].is_null());
    assert_eq!(parsed.witness.inputs[1].script_witness.stack(), &[vec![0xaa]]);
}

// -----------------------------------------------------------------------
// Sizes and identity
// -----------------------------------------------------------------------

/// Sizes taken from a full node's decoderawtransaction output.
#[test]
fn test_tx_vsize() {
    let no_witness = Transaction::from_hex(LEGACY_TX_HEX).unwrap();
    assert_eq!(no_witness.virtual_size(), 235);
    assert_eq!(no_witness.weight(), 940);

    let with_witness = Transaction::from_hex(WITNESS_TX_HEX).unwrap();
    assert_eq!(with_witness.virtual_size(), 257);

    // 262 outputs need a three-byte count
    let mut tx = no_witness.to_mutable();
    for _ in 0..260 {
        let first = tx.outputs[0].clone();
        tx.outputs.push(first);
    }
    assert_eq!(tx.virtual_size(), 9077);

    let mut tx = with_witness.to_mutable();
    for _ in 0..260 {
        let first = tx.outputs[0].clone();
        tx.outputs.push(first);
    }
    assert_eq!(tx.virtual_size(), 8579);
}

#[test]
fn test_is_coinbase() {
    let mut tx = MutableTransaction::default();
    assert!(!tx.is_coinbase());

    // no check on the outputs
    tx.inputs.push(MutableTxIn::default());
    assert!(tx.is_coinbase());

    tx.inputs[0].prevout.n = 0;
    assert!(!tx.is_coinbase());

    tx.inputs[0] = TxIn::default().into();
    tx.inputs.push(TxIn::default().into());
    assert!(!tx.is_coinbase());
}

#[test]
fn test_txid_cached_and_stable() {
    let tx = Transaction::from_hex(LEGACY_TX_HEX).unwrap();
    let first = tx.txid();
    assert_eq!(tx.txid(), first);
    assert_eq!(tx.clone().txid(), first);
    assert_eq!(tx.get_hash(), tx.wtxid());

    // usable as a map key
    let mut set = std::collections::HashSet::new();
    set.insert(tx.clone());
    assert!(set.contains(&Transaction::from_hex(LEGACY_TX_HEX).unwrap()));
}

#[test]
fn test_serde_hex_string() {
    let tx = Transaction::from_hex(WITNESS_TX_HEX).unwrap();
    let json = serde_json::to_string(&tx).unwrap();
    assert_eq!(json, format!("\"{}\"", WITNESS_TX_HEX));
    let back: MutableTransaction = serde_json::from_str(&json).unwrap();
    assert_eq!(back.to_immutable(), tx);
    assert!(serde_json::from_str::<Transaction>("\"00\"").is_err());
}

#[test]
fn test_mutable_hash_follows_edits() {
    let mut tx = Transaction::from_hex(LEGACY_TX_HEX).unwrap().to_mutable();
    let before = tx.txid();
    tx.lock_time = 1;
    assert_ne!(tx.txid(), before);
}

// -----------------------------------------------------------------------
// Mutable and immutable construction
// -----------------------------------------------------------------------

#[test]
fn test_mutable_tx_creation_with_immutable_parts() {
    let tx = MutableTransaction::new(
        1,
        vec![TxIn::new(OutPoint::new(Hash::new([b'a'; 32]), 0), Script::new(), SEQUENCE_FINAL)],
        vec![TxOut::new(1, Script::new())],
        TxWitness::new(vec![TxInWitness::default()]),
        0,
    );
    // the fields are the mutable types, so assignment compiles
    let mut tx = tx;
    tx.inputs[0].prevout.n = 7;
    tx.outputs[0].value = 2;
    tx.witness.inputs[0].script_witness.push(vec![0x00]);

    let parsed = MutableTransaction::deserialize(&tx.serialize()).unwrap();
    assert_eq!(parsed, tx);
}

#[test]
fn test_immutable_tx_creation_with_mutable_parts() {
    let witness = MutableTxWitness::new(vec![MutableTxInWitness::new(ScriptWitness::new(vec![
        vec![],
    ]))]);
    let tx = Transaction::new(
        1,
        vec![MutableTxIn::new(MutableOutPoint::new(Hash::new([b'a'; 32]), 0), Script::new(), 0)],
        vec![MutableTxOut::new(1, Script::new())],
        witness,
        0,
    );
    let input: &TxIn = &tx.inputs()[0];
    assert_eq!(input.prevout().n(), 0);
    assert!(tx.has_witness());
    assert_eq!(Transaction::deserialize(&tx.serialize()).unwrap(), tx);
}

#[test]
fn test_freeze_thaw() {
    let tx = Transaction::from_hex(WITNESS_TX_HEX).unwrap();
    let mut thawed = tx.to_mutable();
    thawed.version = 3;
    // the original is untouched
    assert_eq!(tx.version(), 2);
    assert_eq!(thawed.to_immutable().version(), 3);
    assert_eq!(tx.to_immutable(), tx);
}

// -----------------------------------------------------------------------
// Signature hashes
// -----------------------------------------------------------------------

#[test]
fn test_sighash_single_without_output() {
    let tx = spending_tx(2);
    let code = Script::from_bytes(&[0x51]);
    let digest =
        sighash::signature_hash(&code, &tx, 1, SighashType::SINGLE, 0, SigVersion::Base).unwrap();
    assert_eq!(digest, SIGHASH_ONE);

    // the witness algorithm has no such sentinel
    let digest =
        sighash::signature_hash(&code, &tx, 1, SighashType::SINGLE, 0, SigVersion::WitnessV0)
            .unwrap();
    assert_ne!(digest, SIGHASH_ONE);
}

#[test]
fn test_sighash_index_out_of_range() {
    let tx = spending_tx(1);
    let code = Script::new();
    for version in [SigVersion::Base, SigVersion::WitnessV0] {
        assert!(sighash::signature_hash(&code, &tx, 1, SighashType::ALL, 0, version).is_err());
    }
}

#[test]
fn test_sighash_amount_commitment() {
    let tx = spending_tx(1);
    let code = Script::p2pkh_script(&[0x11; 20]);
    let h = |amount, version| {
        sighash::signature_hash(&code, &tx, 0, SighashType::ALL, amount, version).unwrap()
    };
    assert_eq!(h(1, SigVersion::Base), h(2, SigVersion::Base));
    assert_ne!(h(1, SigVersion::WitnessV0), h(2, SigVersion::WitnessV0));
}

#[test]
fn test_sighash_codeseparator_removed() {
    let tx = spending_tx(1);
    let plain = Script::from_bytes(&[0x51, 0x52]);
    let separated = Script::from_bytes(&[0x51, 0xab, 0x52]);
    let h = |code: &Script| {
        sighash::signature_hash(code, &tx, 0, SighashType::ALL, 0, SigVersion::Base).unwrap()
    };
    assert_eq!(h(&plain), h(&separated));
}

#[test]
fn test_sighash_modes() {
    let code = Script::p2pkh_script(&[0x11; 20]);
    let base = spending_tx(2);

    let mut more_outputs = base.clone();
    more_outputs.outputs.push(MutableTxOut::new(5, Script::new()));
    let mut other_sequence = base.clone();
    other_sequence.inputs[1].sequence = 7;
    let mut extra_input = base.clone();
    extra_input.inputs.push(MutableTxIn::new(prevout(9), Script::new(), 0));

    for version in [SigVersion::Base, SigVersion::WitnessV0] {
        let h = |tx: &MutableTransaction, hash_type: SighashType| {
            sighash::signature_hash(&code, tx, 0, hash_type, 1000, version).unwrap()
        };

        // ALL commits to everything
        assert_ne!(h(&base, SighashType::ALL), h(&more_outputs, SighashType::ALL));
        assert_ne!(h(&base, SighashType::ALL), h(&other_sequence, SighashType::ALL));

        // NONE ignores outputs and other sequences
        assert_eq!(h(&base, SighashType::NONE), h(&more_outputs, SighashType::NONE));
        assert_eq!(h(&base, SighashType::NONE), h(&other_sequence, SighashType::NONE));

        // SINGLE ignores outputs after the signed index
        assert_eq!(h(&base, SighashType::SINGLE), h(&more_outputs, SighashType::SINGLE));

        // ANYONECANPAY ignores other inputs
        let acp = SighashType::ALL.with_anyone_can_pay();
        assert_eq!(h(&base, acp), h(&extra_input, acp));
        assert_ne!(h(&base, SighashType::ALL), h(&extra_input, SighashType::ALL));

        // the full type is committed, not just the base
        assert_ne!(h(&base, SighashType::ALL), h(&base, SighashType(0x21)));
    }
}

#[test]
fn test_bip143_preimage_layout() {
    let tx = spending_tx(1);
    let code = Script::p2pkh_script(&[0x11; 20]);
    let preimage = sighash::calc_preimage(&code, &tx, 0, SighashType::ALL, 1000).unwrap();
    // 4 + 32 + 32 + 36 + (1 + 25) + 8 + 4 + 32 + 4 + 4
    assert_eq!(preimage.len(), 182);
    assert_eq!(&preimage[0..4], &2i32.to_le_bytes());
    assert_eq!(&preimage[68..100], &[0xab; 32]);
    assert_eq!(&preimage[130..138], &1000i64.to_le_bytes());
    assert_eq!(&preimage[178..182], &1u32.to_le_bytes());
}

// -----------------------------------------------------------------------
// Sign and verify
// -----------------------------------------------------------------------

#[test]
fn test_p2pkh_sign_and_verify() {
    init_logging();
    let params = ChainParams::mainnet();
    let k = key(1);
    let lock = p2pkh::lock(&Address::from_pubkey(&k.pub_key(), &params)).unwrap();
    let spent = vec![TxOut::new(50_000, lock.clone())];

    let mut tx = spending_tx(1);
    sign_input(&mut tx, 0, &p2pkh::unlock(k, None), 50_000).unwrap();
    assert!(!tx.has_witness());
    assert!(tx.inputs[0].script_sig.len() <= p2pkh::unlock(key(1), None).estimate_length());

    verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false).unwrap();
    verify_script(
        &tx.inputs[0].script_sig,
        &lock,
        &ScriptWitness::default(),
        &tx.to_immutable(),
        0,
        ScriptFlags::STANDARD,
        50_000,
    )
    .unwrap();

    // any change to the signed data breaks the signature
    let mut tampered = tx.clone();
    tampered.outputs[0].value += 1;
    assert!(verify_transaction_inputs(&tampered, &spent, ScriptFlags::STANDARD, false).is_err());
}

#[test]
fn test_p2pkh_signature_byte_flip_fails() {
    let k = key(2);
    let lock = Script::p2pkh_script(&k.pub_key().hash160());
    let mut tx = spending_tx(1);
    sign_input(&mut tx, 0, &p2pkh::unlock(k, None), 0).unwrap();

    // byte 10 sits inside the DER r value
    let mut bytes = tx.inputs[0].script_sig.to_bytes().to_vec();
    bytes[10] ^= 0x01;
    tx.inputs[0].script_sig = Script::from(bytes);

    let spent = vec![MutableTxOut::new(0, lock)];
    match verify_transaction_inputs(&tx, &spent, ScriptFlags::CONSENSUS, false) {
        Err(TransactionError::Verify(e)) => assert_eq!(e.code, InterpreterErrorCode::EvalFalse),
        other => panic!("unexpected result {:?}", other),
    }
}

/// Signatures with long-form DER lengths predate BIP66 and still verify
/// when strict DER is not enforced.
#[test]
fn test_p2pkh_long_form_der_length() {
    let k = key(4);
    let lock = Script::p2pkh_script(&k.pub_key().hash160());
    let mut tx = spending_tx(1);
    sign_input(&mut tx, 0, &p2pkh::unlock(k, None), 0).unwrap();

    // <sig+hashtype> <pubkey>: widen the sequence length to 0x81 <len>
    let bytes = tx.inputs[0].script_sig.to_bytes().to_vec();
    let push = bytes[0] as usize;
    let sig = &bytes[1..1 + push];
    let mut script_sig = vec![(push + 1) as u8, 0x30, 0x81, sig[1]];
    script_sig.extend_from_slice(&sig[2..]);
    script_sig.extend_from_slice(&bytes[1 + push..]);
    tx.inputs[0].script_sig = Script::from(script_sig);

    let spent = vec![MutableTxOut::new(0, lock)];
    verify_transaction_inputs(&tx, &spent, ScriptFlags::P2SH, false).unwrap();

    match verify_transaction_inputs(&tx, &spent, ScriptFlags::CONSENSUS, false) {
        Err(TransactionError::Verify(e)) => assert!(
            matches!(e.code, InterpreterErrorCode::SigInvalidDataLen | InterpreterErrorCode::SigTooLong),
            "unexpected code {:?}",
            e.code
        ),
        other => panic!("unexpected result {:?}", other),
    }
}

/// Hybrid public keys (0x06/0x07 prefix) are valid under consensus rules
/// and rejected by strict encoding.
#[test]
fn test_hybrid_pubkey_p2pk() {
    let k = key(5);
    let mut hybrid = k.pub_key().to_uncompressed();
    hybrid[0] = 0x06 | (hybrid[64] & 1);

    let mut lock_bytes = vec![0x41];
    lock_bytes.extend_from_slice(&hybrid);
    lock_bytes.push(0xac);
    let lock = Script::from(lock_bytes);

    let mut tx = spending_tx(1);
    let digest =
        sighash::signature_hash(&lock, &tx, 0, SighashType::ALL, 0, SigVersion::Base).unwrap();
    let mut sig = k.sign(&digest).unwrap().to_der();
    sig.push(0x01);
    let mut script_sig = vec![sig.len() as u8];
    script_sig.extend_from_slice(&sig);
    tx.inputs[0].script_sig = Script::from(script_sig);

    let spent = vec![MutableTxOut::new(0, lock)];
    verify_transaction_inputs(&tx, &spent, ScriptFlags::CONSENSUS, false).unwrap();

    match verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false) {
        Err(TransactionError::Verify(e)) => assert_eq!(e.code, InterpreterErrorCode::PubKeyType),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_p2wpkh_sign_and_verify() {
    init_logging();
    let params = ChainParams::mainnet();
    let k = key(3);
    let addr = Address::from_pubkey_witness(&k.pub_key(), &params).unwrap();
    let lock = p2wpkh::lock(&addr).unwrap();
    assert!(p2pkh::lock(&addr).is_err());

    let mut tx = spending_tx(1);
    sign_input(&mut tx, 0, &p2wpkh::unlock(k, None), 75_000).unwrap();
    assert!(tx.has_witness());
    assert!(tx.inputs[0].script_sig.is_empty());

    let spent = vec![TxOut::new(75_000, lock.clone())];
    verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false).unwrap();
    assert!(tx.virtual_size() < tx.serialize().len());

    // the digest commits to the amount
    let wrong_amount = vec![TxOut::new(75_001, lock)];
    assert!(verify_transaction_inputs(&tx, &wrong_amount, ScriptFlags::STANDARD, false).is_err());
}

#[test]
fn test_p2sh_p2wpkh_verify() {
    let k = key(4);
    let program = Script::p2wpkh_script(&k.pub_key().hash160());
    let lock = Script::p2sh_script(&hash160(program.to_bytes()));

    let mut tx = spending_tx(1);
    sign_input(&mut tx, 0, &p2wpkh::unlock(k, None), 10_000).unwrap();
    let mut script_sig = Script::new();
    script_sig.append_push_data(program.to_bytes()).unwrap();
    tx.inputs[0].script_sig = script_sig;

    let spent = vec![TxOut::new(10_000, lock)];
    verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false).unwrap();
}

#[test]
fn test_p2sh_multisig_and_wrong_redeem_script() {
    init_logging();
    let (k1, k2) = (key(5), key(6));
    // OP_2 <k1> <k2> OP_2 OP_CHECKMULTISIG
    let mut bytes = vec![0x52, 0x21];
    bytes.extend_from_slice(&k1.pub_key().to_compressed());
    bytes.push(0x21);
    bytes.extend_from_slice(&k2.pub_key().to_compressed());
    bytes.extend_from_slice(&[0x52, 0xae]);
    let redeem = Script::from(bytes);
    let lock = Script::p2sh_script(&hash160(redeem.to_bytes()));

    let tx = spending_tx(1);
    let digest =
        sighash::signature_hash(&redeem, &tx, 0, SighashType::ALL, 0, SigVersion::Base).unwrap();
    let sig = |k: &PrivateKey| {
        let mut s = k.sign(&digest).unwrap().to_der();
        s.push(SighashType::ALL.to_byte());
        s
    };

    let mut script_sig = Script::from_bytes(&[0x00]);
    script_sig.append_push_data(&sig(&k1)).unwrap();
    script_sig.append_push_data(&sig(&k2)).unwrap();
    script_sig.append_push_data(redeem.to_bytes()).unwrap();

    let mut tx = tx;
    tx.inputs[0].script_sig = script_sig.clone();
    let spent = vec![TxOut::new(0, lock.clone())];
    verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false).unwrap();

    // a redeem script that does not hash to the committed value
    let mut wrong = Script::from_bytes(&[0x00]);
    wrong.append_push_data(&sig(&k1)).unwrap();
    wrong.append_push_data(&sig(&k2)).unwrap();
    wrong.append_push_data(&[0x51]).unwrap();
    tx.inputs[0].script_sig = wrong;
    match verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false) {
        Err(TransactionError::Verify(e)) => assert_eq!(e.code, InterpreterErrorCode::EvalFalse),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_verify_inputs_full_report() {
    init_logging();
    let (k1, k2) = (key(7), key(8));
    let lock1 = Script::p2pkh_script(&k1.pub_key().hash160());
    let lock2 = Script::p2pkh_script(&k2.pub_key().hash160());

    let mut tx = spending_tx(3);
    sign_input(&mut tx, 0, &p2pkh::unlock(k1.clone(), None), 0).unwrap();
    // inputs 1 and 2 are signed with the wrong key
    sign_input(&mut tx, 1, &p2pkh::unlock(k1, None), 0).unwrap();
    sign_input(&mut tx, 2, &p2pkh::unlock(key(9), None), 0).unwrap();

    let spent = vec![
        TxOut::new(0, lock1),
        TxOut::new(0, lock2.clone()),
        TxOut::new(0, lock2),
    ];

    match verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, true) {
        Err(TransactionError::InputsInvalid(failures)) => {
            let indices: Vec<usize> = failures.iter().map(|(i, _)| *i).collect();
            assert_eq!(indices, vec![1, 2]);
            assert_eq!(failures[0].1.code, InterpreterErrorCode::EqualVerify);
        }
        other => panic!("unexpected result {:?}", other),
    }

    // fail-fast reports the first failure only
    match verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, false) {
        Err(TransactionError::Verify(e)) => assert_eq!(e.code, InterpreterErrorCode::EqualVerify),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_verify_inputs_length_mismatch() {
    let tx = spending_tx(2);
    let spent = vec![TxOut::new(0, Script::new())];
    match verify_transaction_inputs(&tx, &spent, ScriptFlags::STANDARD, true) {
        Err(TransactionError::InvalidTransaction(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_verify_script_index_out_of_range() {
    let tx = spending_tx(1);
    let empty = Script::new();
    assert!(verify_script(
        &empty,
        &Script::from_bytes(&[0x51]),
        &ScriptWitness::default(),
        &tx,
        3,
        ScriptFlags::NONE,
        0
    )
    .is_err());
}

/// Lock time opcodes read the spending transaction through the checker.
#[test]
fn test_checklocktimeverify_against_transaction() {
    // <500> OP_CHECKLOCKTIMEVERIFY
    let lock = Script::from_bytes(&[0x02, 0xf4, 0x01, 0xb1]);
    let mut tx = spending_tx(1);
    let spent = vec![TxOut::new(0, lock)];
    let flags = ScriptFlags::P2SH | ScriptFlags::CHECKLOCKTIMEVERIFY;

    tx.lock_time = 499;
    assert!(verify_transaction_inputs(&tx, &spent, flags, false).is_err());

    tx.lock_time = 500;
    verify_transaction_inputs(&tx, &spent, flags, false).unwrap();

    // a final sequence disables lock time
    tx.inputs[0].sequence = SEQUENCE_FINAL;
    assert!(verify_transaction_inputs(&tx, &spent, flags, false).is_err());
}
