//! The minimal transaction model the engine and sighash builder operate on.
//!
//! Only construction, deep cloning, and wire serialization are provided; the
//! engine never needs to decode a transaction from bytes.

/// A reference to the output being spent: the hash of the transaction that
/// created it and the output's index within that transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutPoint {
    pub hash: [u8; 32],
    pub index: u32,
}

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_out_point: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: i64,
    pub pk_script: Vec<u8>,
}

/// A transaction in the form the sighash computation canonicalizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub tx_in: Vec<TxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// Serializes the transaction in wire format.
    ///
    /// The transaction encoding is the same for every protocol version; the
    /// parameter exists so callers can thread through the version they
    /// negotiated, matching the rest of the wire surface.
    pub fn serialize(&self, _pver: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_len());

        buf.extend_from_slice(&self.version.to_le_bytes());

        write_var_int(&mut buf, self.tx_in.len() as u64);
        for tx_in in &self.tx_in {
            buf.extend_from_slice(&tx_in.previous_out_point.hash);
            buf.extend_from_slice(&tx_in.previous_out_point.index.to_le_bytes());
            write_var_int(&mut buf, tx_in.signature_script.len() as u64);
            buf.extend_from_slice(&tx_in.signature_script);
            buf.extend_from_slice(&tx_in.sequence.to_le_bytes());
        }

        write_var_int(&mut buf, self.tx_out.len() as u64);
        for tx_out in &self.tx_out {
            buf.extend_from_slice(&tx_out.value.to_le_bytes());
            write_var_int(&mut buf, tx_out.pk_script.len() as u64);
            buf.extend_from_slice(&tx_out.pk_script);
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    fn serialized_len(&self) -> usize {
        let ins: usize = self
            .tx_in
            .iter()
            .map(|i| 36 + var_int_len(i.signature_script.len() as u64) + i.signature_script.len() + 4)
            .sum();
        let outs: usize = self
            .tx_out
            .iter()
            .map(|o| 8 + var_int_len(o.pk_script.len() as u64) + o.pk_script.len())
            .sum();
        4 + var_int_len(self.tx_in.len() as u64)
            + ins
            + var_int_len(self.tx_out.len() as u64)
            + outs
            + 4
    }
}

/// Appends a variable-length integer in Bitcoin's compact-size encoding.
fn write_var_int(buf: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

fn var_int_len(value: u64) -> usize {
    if value < 0xfd {
        1
    } else if value <= 0xffff {
        3
    } else if value <= 0xffff_ffff {
        5
    } else {
        9
    }
}
