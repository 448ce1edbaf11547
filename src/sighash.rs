//! Signature-hash computation.
//!
//! A signature in a script commits to a canonicalized copy of the spending
//! transaction. The hash type byte tacked onto the end of each signature
//! selects which parts of that transaction the commitment covers.

use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::opcode::{remove_opcode, unparse_script, ParsedOpcode, OP_CODESEPARATOR};
use crate::tx::Transaction;

/// The hash type bits from the end of a signature.
pub const SIG_HASH_OLD: u8 = 0x0;
pub const SIG_HASH_ALL: u8 = 0x1;
pub const SIG_HASH_NONE: u8 = 0x2;
pub const SIG_HASH_SINGLE: u8 = 0x3;
pub const SIG_HASH_ANY_ONE_CAN_PAY: u8 = 0x80;

/// Mask for the mode bits of a hash type.
const SIG_HASH_MASK: u8 = 0x1f;

/// Returns SHA-256(SHA-256(data)).
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// Calculates the double-SHA-256 digest a signature over input `tx_idx`
/// commits to, given the subscript in effect and the hash type.
///
/// The caller provides the transaction with every input's signature script
/// already blanked; the subscript is spliced into the signed input alone.
pub fn calc_script_hash(
    script: &[ParsedOpcode],
    hash_type: u8,
    tx: &Transaction,
    tx_idx: usize,
    pver: u32,
) -> Result<[u8; 32], Error> {
    if tx_idx >= tx.tx_in.len() {
        return Err(Error::InvalidArgs);
    }

    // Remove all instances of OP_CODESEPARATOR still left in the script.
    let script = remove_opcode(script, OP_CODESEPARATOR);
    let script_bytes = unparse_script(&script)?;

    // Deep copy, with the subscript on the input being signed and every
    // other input's script empty.
    let mut tx_copy = tx.clone();
    for (i, tx_in) in tx_copy.tx_in.iter_mut().enumerate() {
        if i == tx_idx {
            tx_in.signature_script = script_bytes.clone();
        } else {
            tx_in.signature_script = Vec::new();
        }
    }

    match hash_type & SIG_HASH_MASK {
        SIG_HASH_NONE => {
            // Commit to no outputs and let other inputs be updated freely.
            tx_copy.tx_out.clear();
            for (i, tx_in) in tx_copy.tx_in.iter_mut().enumerate() {
                if i != tx_idx {
                    tx_in.sequence = 0;
                }
            }
        }
        SIG_HASH_SINGLE => {
            // Commit only to the output paired with this input; earlier
            // outputs are blanked to value -1 with an empty script.
            tx_copy.tx_out.truncate(tx_idx + 1);
            let blank = tx_copy.tx_out.len().min(tx_idx);
            for tx_out in &mut tx_copy.tx_out[..blank] {
                tx_out.value = -1;
                tx_out.pk_script = Vec::new();
            }
            for (i, tx_in) in tx_copy.tx_in.iter_mut().enumerate() {
                if i != tx_idx {
                    tx_in.sequence = 0;
                }
            }
        }
        // SigHashOld, SigHashAll, and undefined hash types all sign the
        // whole transaction, matching the reference implementation.
        _ => {}
    }

    if hash_type & SIG_HASH_ANY_ONE_CAN_PAY != 0 {
        tx_copy.tx_in = vec![tx_copy.tx_in[tx_idx].clone()];
    }

    // Wire-serialized transaction followed by the 4-byte little-endian hash
    // type.
    let mut buf = tx_copy.serialize(pver);
    buf.extend_from_slice(&u32::from(hash_type).to_le_bytes());
    Ok(double_sha256(&buf))
}
