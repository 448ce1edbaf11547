//! Recognition of the standard script templates seen in the chain.

use crate::error::Error;
use crate::opcode::{
    ParsedOpcode, OP_0, OP_1, OP_16, OP_CHECKMULTISIG, OP_CHECKMULTISIGVERIFY, OP_CHECKSIG,
    OP_CHECKSIGVERIFY, OP_DATA_20, OP_DATA_75, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160,
};
use crate::MAX_PUB_KEYS_PER_MULTI_SIG;

/// The standard script templates.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScriptClass {
    /// Pay to a bare public key.
    PubKey,
    /// Pay to the hash of a public key.
    PubKeyHash,
    /// Pay to the hash of a script.
    ScriptHash,
    /// A threshold multi-signature script.
    MultiSig,
    /// None of the recognized templates.
    NonStandard,
}

/// Returns true if the script pays to a bare public key.
pub fn is_pub_key(pops: &[ParsedOpcode]) -> bool {
    pops.len() == 2
        && pops[0].value() > OP_0
        && pops[0].value() <= OP_DATA_75
        && pops[1].value() == OP_CHECKSIG
}

/// Returns true if the script pays to a public key hash.
pub fn is_pub_key_hash(pops: &[ParsedOpcode]) -> bool {
    pops.len() == 5
        && pops[0].value() == OP_DUP
        && pops[1].value() == OP_HASH160
        && pops[2].value() == OP_DATA_20
        && pops[3].value() == OP_EQUALVERIFY
        && pops[4].value() == OP_CHECKSIG
}

/// Returns true if the script is a pay-to-script-hash output.
pub fn is_script_hash(pops: &[ParsedOpcode]) -> bool {
    pops.len() == 3
        && pops[0].value() == OP_HASH160
        && pops[1].value() == OP_DATA_20
        && pops[2].value() == OP_EQUAL
}

/// Returns true if the script is a threshold multi-signature output.
pub fn is_multi_sig(pops: &[ParsedOpcode]) -> bool {
    let l = pops.len();
    // The absolute minimum is one pubkey:
    //   OP_1 <pubkey> OP_1 OP_CHECKMULTISIG
    if l < 4 {
        return false;
    }
    if !is_small_int(pops[0].value()) {
        return false;
    }
    if !is_small_int(pops[l - 2].value()) {
        return false;
    }
    if pops[l - 1].value() != OP_CHECKMULTISIG {
        return false;
    }
    // Valid serialized pubkeys are either 33 or 65 bytes.
    pops[1..l - 2]
        .iter()
        .all(|pop| pop.data().len() == 33 || pop.data().len() == 65)
}

/// Returns true if the script only pushes data.
pub fn is_push_only(pops: &[ParsedOpcode]) -> bool {
    // All opcodes up to OP_16 are data push instructions.
    pops.iter().all(|pop| pop.value() <= OP_16)
}

fn is_small_int(value: u8) -> bool {
    (OP_1..=OP_16).contains(&value)
}

/// Classifies a script against the known standard templates.
pub fn class_of(pops: &[ParsedOpcode]) -> ScriptClass {
    if is_pub_key(pops) {
        ScriptClass::PubKey
    } else if is_pub_key_hash(pops) {
        ScriptClass::PubKeyHash
    } else if is_script_hash(pops) {
        ScriptClass::ScriptHash
    } else if is_multi_sig(pops) {
        ScriptClass::MultiSig
    } else {
        ScriptClass::NonStandard
    }
}

/// Extracts the material a standard public key script pays to: the serialized
/// public key for pay-to-pubkey, or the 20-byte hash for pay-to-pubkey-hash
/// and pay-to-script-hash.
///
/// Fails with [`Error::UnknownAddress`] for any other script pattern.
pub fn payment_data(pops: &[ParsedOpcode]) -> Result<(ScriptClass, Vec<u8>), Error> {
    match class_of(pops) {
        ScriptClass::PubKey => Ok((ScriptClass::PubKey, pops[0].data().to_vec())),
        ScriptClass::PubKeyHash => Ok((ScriptClass::PubKeyHash, pops[2].data().to_vec())),
        ScriptClass::ScriptHash => Ok((ScriptClass::ScriptHash, pops[1].data().to_vec())),
        ScriptClass::MultiSig | ScriptClass::NonStandard => Err(Error::UnknownAddress),
    }
}

/// Counts the signature operations in a script.
///
/// In accurate mode a CHECKMULTISIG preceded by a small integer constant is
/// charged for that many keys; otherwise it is charged the maximum of
/// [`MAX_PUB_KEYS_PER_MULTI_SIG`].
pub fn sig_op_count(pops: &[ParsedOpcode], accurate: bool) -> usize {
    let mut count = 0;
    let mut last_value: Option<u8> = None;
    for pop in pops {
        match pop.value() {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => count += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                count += match last_value {
                    Some(v) if accurate && is_small_int(v) => usize::from(v - (OP_1 - 1)),
                    _ => MAX_PUB_KEYS_PER_MULTI_SIG,
                }
            }
            _ => {}
        }
        last_value = Some(pop.value());
    }
    count
}

/// Counts the signature operations a spend actually pays for.
///
/// For ordinary outputs this is the accurate count over the public key
/// script. For pay-to-script-hash outputs under BIP16 the charged script is
/// the redeem script carried in the signature script's final push, so the
/// count is taken there instead.
pub fn precise_sig_op_count(
    sig_script: &[u8],
    pk_script: &[u8],
    bip16: bool,
) -> Result<usize, Error> {
    let pk_pops = crate::opcode::parse_script(pk_script)?;
    if !(bip16 && is_script_hash(&pk_pops)) {
        return Ok(sig_op_count(&pk_pops, true));
    }

    // The signature script must be push-only for the spend to be valid at
    // all; anything else is charged nothing.
    let sig_pops = match crate::opcode::parse_script(sig_script) {
        Ok(pops) => pops,
        Err(_) => return Ok(0),
    };
    if sig_pops.is_empty() || !is_push_only(&sig_pops) {
        return Ok(0);
    }
    let redeem = sig_pops[sig_pops.len() - 1].data();
    match crate::opcode::parse_script(redeem) {
        Ok(redeem_pops) => Ok(sig_op_count(&redeem_pops, true)),
        Err(_) => Ok(0),
    }
}
