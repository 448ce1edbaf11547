//! The script execution engine.

use log::trace;
use secp256k1::{Secp256k1, VerifyOnly};

use crate::error::Error;
use crate::opcode::{parse_script, ParsedOpcode};
use crate::pattern;
use crate::stack::Stack;
use crate::tx::Transaction;

/// One mark on the conditional-execution stack.
///
/// `Skip` records a branch opened while the enclosing branch was already
/// non-executing, so a later OP_ELSE must not resurrect it.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CondValue {
    True,
    False,
    Skip,
}

/// The virtual machine that executes scripts.
///
/// An engine validates one transaction input: it runs the input's signature
/// script followed by the previous output's public key script (and, for
/// pay-to-script-hash outputs, the redeem script carried in the final push of
/// the signature script), and reports whether the spend is authorized.
pub struct Engine {
    scripts: Vec<Vec<ParsedOpcode>>,
    script_idx: usize,
    pub(crate) script_off: usize,
    pub(crate) last_code_sep: usize,
    pub(crate) dstack: Stack,
    pub(crate) astack: Stack,
    pub(crate) tx: Transaction,
    pub(crate) tx_idx: usize,
    pub(crate) pver: u32,
    pub(crate) cond_stack: Vec<CondValue>,
    num_ops: usize,
    bip16: bool,
    saved_first_stack: Vec<Vec<u8>>,
    pub(crate) secp: Secp256k1<VerifyOnly>,
}

impl Engine {
    /// Returns a new engine for the given signature script, public key
    /// script, and spending transaction input.
    ///
    /// When `bip16` is set, pay-to-script-hash outputs are fully validated:
    /// the signature script must then be push-only, and the final push is
    /// executed as a script of its own.
    pub fn new(
        sig_script: &[u8],
        pk_script: &[u8],
        tx_idx: usize,
        tx: &Transaction,
        pver: u32,
        bip16: bool,
    ) -> Result<Engine, Error> {
        if tx_idx >= tx.tx_in.len() {
            return Err(Error::InvalidArgs);
        }

        let raw_scripts = [sig_script, pk_script];
        let mut scripts = Vec::with_capacity(raw_scripts.len());
        for scr in raw_scripts {
            scripts.push(parse_script(scr)?);
        }

        // Zero-length leading scripts have nothing to execute; start at the
        // first script with content.
        let mut script_idx = 0;
        while script_idx < raw_scripts.len() && raw_scripts[script_idx].is_empty() {
            script_idx += 1;
        }

        let mut bip16_active = false;
        if bip16 && pattern::is_script_hash(&scripts[1]) {
            // Pay-to-script-hash only admits signature scripts that push
            // data.
            if !pattern::is_push_only(&scripts[0]) {
                return Err(Error::InvalidArgs);
            }
            bip16_active = true;
        }

        // The engine owns a copy of the transaction with every input's
        // signature script blanked; sighash computations splice the active
        // subscript into this canonical form.
        let mut tx_copy = tx.clone();
        for tx_in in &mut tx_copy.tx_in {
            tx_in.signature_script = Vec::new();
        }

        Ok(Engine {
            scripts,
            script_idx,
            script_off: 0,
            last_code_sep: 0,
            dstack: Stack::new(),
            astack: Stack::new(),
            tx: tx_copy,
            tx_idx,
            pver,
            cond_stack: vec![CondValue::True],
            num_ops: 0,
            bip16: bip16_active,
            saved_first_stack: Vec::new(),
            secp: Secp256k1::verification_only(),
        })
    }

    /// Executes every script in the engine and returns `Ok(())` only for a
    /// successful validation.
    pub fn execute(&mut self) -> Result<(), Error> {
        // All scripts may have been empty, in which case there is nothing to
        // step.
        let mut done = self.script_idx >= self.scripts.len();
        while !done {
            if log::log_enabled!(log::Level::Trace) {
                match self.disasm_pc() {
                    Ok(dis) => trace!("stepping {dis}"),
                    Err(err) => trace!("stepping ({err})"),
                }
            }

            done = self.step()?;

            if log::log_enabled!(log::Level::Trace) {
                if self.dstack.depth() != 0 {
                    trace!("stack {:?}", self.stack());
                }
                if self.astack.depth() != 0 {
                    trace!("altstack {:?}", self.alt_stack());
                }
            }
        }

        if self.cond_stack.len() != 1 {
            // A conditional block was left open at the end of a script.
            return Err(Error::MissingEndif);
        }
        if !self.dstack.pop_bool()? {
            if log::log_enabled!(log::Level::Trace) {
                for idx in 0..self.scripts.len() {
                    let dis = self
                        .disasm_script(idx)
                        .unwrap_or_else(|err| format!("(disassembly failed: {err})"));
                    trace!("script{idx}: {dis}");
                }
            }
            return Err(Error::ScriptFailed);
        }
        Ok(())
    }

    /// Executes the next instruction and advances the program counter to the
    /// following opcode, or the next script once the current one ends.
    ///
    /// Returns true once the final instruction has run. If an error is
    /// returned the result of any further call on the engine is undefined.
    pub fn step(&mut self) -> Result<bool, Error> {
        self.valid_pc()?;
        let pop = self.scripts[self.script_idx][self.script_off].clone();

        // Disabled and always-illegal opcodes fail inside exec even on a
        // non-executing branch; everything else is gated on the innermost
        // conditional mark unless it directs flow control itself.
        pop.exec(self)?;

        self.script_off += 1;
        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }
        self.script_off = 0;

        if self.script_idx == 0 && self.bip16 {
            self.saved_first_stack = self.stack();
        } else if self.script_idx == 1 && self.bip16 {
            // The public key script authenticated a hash; the final push of
            // the signature script is the real script and must now succeed
            // on its own.
            if !self.dstack.pop_bool()? {
                return Err(Error::ScriptFailed);
            }
            let script = self.saved_first_stack.last().cloned().ok_or(Error::Underflow)?;
            let pops = parse_script(&script)?;
            self.scripts.push(pops);

            // Restore the first script's stack, less the redeem script
            // itself.
            let mut stack = self.saved_first_stack.clone();
            stack.pop();
            self.set_stack(stack);
        }

        self.script_idx += 1;
        // There are zero-length scripts in the wild; skip over them.
        if self.script_idx < self.scripts.len() && self.scripts[self.script_idx].is_empty() {
            self.script_idx += 1;
        }
        self.last_code_sep = 0;
        Ok(self.script_idx >= self.scripts.len())
    }

    /// True when the innermost conditional mark permits execution.
    pub(crate) fn executing(&self) -> bool {
        matches!(self.cond_stack.last(), Some(CondValue::True))
    }

    /// Charges `n` operations against the per-engine limit.
    pub(crate) fn add_ops(&mut self, n: usize) -> Result<(), Error> {
        self.num_ops += n;
        if self.num_ops > crate::MAX_OPS_PER_SCRIPT {
            return Err(Error::TooManyOperations);
        }
        Ok(())
    }

    /// The currently executing script from the last OP_CODESEPARATOR onward.
    pub(crate) fn sub_script(&self) -> Vec<ParsedOpcode> {
        self.scripts[self.script_idx][self.last_code_sep..].to_vec()
    }

    /// Returns the current script index and opcode offset, or an error if
    /// the position is not valid for execution.
    pub fn cur_pc(&self) -> Result<(usize, usize), Error> {
        self.valid_pc()?;
        Ok((self.script_idx, self.script_off))
    }

    fn valid_pc(&self) -> Result<(), Error> {
        if self.script_idx >= self.scripts.len() {
            return Err(Error::InvalidProgramCounter);
        }
        if self.script_off >= self.scripts[self.script_idx].len() {
            return Err(Error::InvalidProgramCounter);
        }
        Ok(())
    }

    /// Disassembles the opcode that will execute on the next call to
    /// [`Engine::step`].
    pub fn disasm_pc(&self) -> Result<String, Error> {
        let (script_idx, script_off) = self.cur_pc()?;
        Ok(self.disasm(script_idx, script_off))
    }

    /// Disassembles the script at the given index, one opcode per line.
    pub fn disasm_script(&self, idx: usize) -> Result<String, Error> {
        if idx >= self.scripts.len() {
            return Err(Error::InvalidProgramCounter);
        }
        let mut disstr = String::new();
        for off in 0..self.scripts[idx].len() {
            disstr.push_str(&self.disasm(idx, off));
            disstr.push('\n');
        }
        Ok(disstr)
    }

    fn disasm(&self, script_idx: usize, script_off: usize) -> String {
        format!(
            "{:02x}:{:04x}: {}",
            script_idx,
            script_off,
            self.scripts[script_idx][script_off].print(false)
        )
    }

    /// Returns the data stack bottom-up, so the last item is the top of the
    /// stack.
    pub fn stack(&self) -> Vec<Vec<u8>> {
        self.dstack.as_items()
    }

    /// Replaces the data stack; the last item becomes the top of the stack.
    pub fn set_stack(&mut self, data: Vec<Vec<u8>>) {
        self.dstack.set_items(data);
    }

    /// Returns the alt stack bottom-up, so the last item is the top of the
    /// stack.
    pub fn alt_stack(&self) -> Vec<Vec<u8>> {
        self.astack.as_items()
    }

    /// Replaces the alt stack; the last item becomes the top of the stack.
    pub fn set_alt_stack(&mut self, data: Vec<Vec<u8>>) {
        self.astack.set_items(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::*;
    use crate::sighash::{self, SIG_HASH_ALL};
    use crate::tx::{OutPoint, TxIn, TxOut};
    use ripemd::Ripemd160;
    use secp256k1::SecretKey;
    use sha2::{Digest, Sha256};

    lazy_static::lazy_static! {
        static ref SPENDING_TX: Transaction = Transaction {
            version: 1,
            tx_in: vec![TxIn {
                previous_out_point: OutPoint {
                    hash: [3; 32],
                    index: 0,
                },
                signature_script: Vec::new(),
                sequence: 0xffffffff,
            }],
            tx_out: vec![TxOut {
                value: 50_000,
                pk_script: Vec::new(),
            }],
            lock_time: 0,
        };
    }

    fn spending_tx() -> Transaction {
        SPENDING_TX.clone()
    }

    fn run(sig_script: &[u8], pk_script: &[u8]) -> Result<(), Error> {
        let tx = spending_tx();
        Engine::new(sig_script, pk_script, 0, &tx, 0, false)?.execute()
    }

    #[test]
    fn empty_scripts_leave_an_empty_stack() {
        assert_eq!(run(&[], &[]), Err(Error::Underflow));
    }

    #[test]
    fn true_literal_succeeds() {
        assert_eq!(run(&[0x51], &[]), Ok(()));
    }

    #[test]
    fn false_literal_fails_on_stack() {
        assert_eq!(run(&[0x00], &[]), Err(Error::ScriptFailed));
    }

    #[test]
    fn op_return_fails_early() {
        assert_eq!(run(&[0x51], &[0x6a]), Err(Error::EarlyReturn));
    }

    #[test]
    fn unbalanced_if_is_reported() {
        assert_eq!(run(&[0x51], &[0x63]), Err(Error::MissingEndif));
    }

    #[test]
    fn disabled_opcodes_fail_even_when_skipped() {
        let disabled = [
            OP_CAT, OP_SUBSTR, OP_LEFT, OP_RIGHT, OP_INVERT, OP_AND, OP_OR, OP_XOR, OP_2MUL,
            OP_2DIV, OP_MUL, OP_DIV, OP_MOD, OP_LSHIFT, OP_RSHIFT,
        ];
        for opcode in disabled {
            // OP_IF with a false condition still trips over the opcode.
            assert_eq!(
                run(&[0x00], &[0x63, opcode, 0x68]),
                Err(Error::OpDisabled),
                "opcode {opcode:#04x}"
            );
            assert_eq!(run(&[0x51], &[opcode]), Err(Error::OpDisabled));
        }
    }

    #[test]
    fn verif_fails_even_when_skipped() {
        assert_eq!(
            run(&[0x00], &[0x63, OP_VERIF, 0x68]),
            Err(Error::ReservedOpcode)
        );
        assert_eq!(
            run(&[0x00], &[0x63, OP_VERNOTIF, 0x68]),
            Err(Error::ReservedOpcode)
        );
    }

    #[test]
    fn reserved_opcodes_only_fail_when_executed() {
        assert_eq!(run(&[0x51], &[OP_RESERVED]), Err(Error::ReservedOpcode));
        // Skipped branches tolerate them.
        assert_eq!(run(&[0x00], &[0x63, OP_RESERVED, 0x68, 0x51]), Ok(()));
    }

    #[test]
    fn else_and_endif_require_an_if() {
        assert_eq!(run(&[0x51], &[OP_ELSE, 0x68]), Err(Error::NoIf));
        assert_eq!(run(&[0x51], &[OP_ENDIF]), Err(Error::NoIf));
    }

    #[test]
    fn nested_conditionals_track_skip() {
        // 0 IF (1 IF RETURN ELSE RETURN ENDIF) ELSE 1 ENDIF
        // Nothing inside the outer branch may execute, including the inner
        // ELSE.
        let pk_script = [
            0x63, 0x51, 0x63, 0x6a, 0x67, 0x6a, 0x68, 0x67, 0x51, 0x68,
        ];
        assert_eq!(run(&[0x00], &pk_script), Ok(()));
    }

    #[test]
    fn else_toggles_execution() {
        // 0 IF 0 ELSE 1 ENDIF
        assert_eq!(run(&[0x00], &[0x63, 0x00, 0x67, 0x51, 0x68]), Ok(()));
        // 1 IF 1 ELSE 0 ENDIF
        assert_eq!(run(&[0x51], &[0x63, 0x51, 0x67, 0x00, 0x68]), Ok(()));
    }

    #[test]
    fn operation_limit_is_enforced() {
        // 201 non-push operations are fine.
        let mut pk_script = vec![OP_NOP; 200];
        pk_script.push(0x51); // the push is free
        assert_eq!(run(&[0x51], &pk_script), Ok(()));

        // One more and the engine gives up. The counter spans all scripts.
        let pk_script = vec![OP_NOP; 202];
        assert_eq!(run(&[0x51], &pk_script), Err(Error::TooManyOperations));
    }

    #[test]
    fn multisig_counts_pubkeys_against_the_limit() {
        // 190 NOPs plus OP_CHECKMULTISIG with 20 keys blows the cap even
        // though the script has far fewer than 201 opcodes.
        let mut pk_script = vec![OP_NOP; 190];
        pk_script.push(0x00); // dummy
        pk_script.push(0x00); // zero signatures
        for _ in 0..20 {
            pk_script.extend([0x01, 0x0a]); // fake key pushes
        }
        pk_script.extend([0x01, 20]); // twenty keys
        pk_script.push(OP_CHECKMULTISIG);
        assert_eq!(run(&[0x51], &pk_script), Err(Error::TooManyOperations));
    }

    #[test]
    fn multisig_pubkey_count_is_bounded() {
        // 21 keys is out of range no matter what else is on the stack.
        let mut pk_script = Vec::new();
        pk_script.push(0x00); // dummy
        pk_script.push(0x00); // zero signatures
        for _ in 0..21 {
            pk_script.extend([0x01, 0xaa]);
        }
        pk_script.extend([0x01, 21]); // twenty-one keys
        pk_script.push(OP_CHECKMULTISIG);
        assert_eq!(run(&[0x51], &pk_script), Err(Error::TooManyPubkeys));
    }

    #[test]
    fn multisig_zero_of_zero_succeeds() {
        // dummy, zero signatures, zero keys.
        assert_eq!(run(&[0x00], &[0x00, 0x00, OP_CHECKMULTISIG]), Ok(()));
    }

    #[test]
    fn multisig_consumes_the_extra_element() {
        // Without the dummy element the final pop underflows.
        assert_eq!(run(&[], &[0x00, 0x00, OP_CHECKMULTISIG]), Err(Error::Underflow));
    }

    #[test]
    fn engine_rejects_out_of_range_input_index() {
        let tx = spending_tx();
        assert!(matches!(
            Engine::new(&[0x51], &[], 1, &tx, 0, false),
            Err(Error::InvalidArgs)
        ));
    }

    fn hash160(data: &[u8]) -> Vec<u8> {
        Ripemd160::digest(Sha256::digest(data)).to_vec()
    }

    fn p2sh_script(redeem: &[u8]) -> Vec<u8> {
        let mut pk_script = vec![0xa9, 0x14];
        pk_script.extend(hash160(redeem));
        pk_script.push(0x87);
        pk_script
    }

    #[test]
    fn p2sh_redemption_runs_the_redeem_script() {
        let redeem = [0x51];
        let sig_script = [0x01, 0x51]; // push the redeem script
        let tx = spending_tx();
        assert_eq!(
            Engine::new(&sig_script, &p2sh_script(&redeem), 0, &tx, 0, true)
                .and_then(|mut vm| vm.execute()),
            Ok(())
        );

        // A redeem script that evaluates false fails the spend.
        let redeem = [0x00];
        let sig_script = [0x01, 0x00];
        assert_eq!(
            Engine::new(&sig_script, &p2sh_script(&redeem), 0, &tx, 0, true)
                .and_then(|mut vm| vm.execute()),
            Err(Error::ScriptFailed)
        );
    }

    #[test]
    fn p2sh_requires_push_only_signature_scripts() {
        let redeem = [0x51];
        // OP_NOP is not a push.
        let sig_script = [OP_NOP, 0x01, 0x51];
        let tx = spending_tx();
        assert!(matches!(
            Engine::new(&sig_script, &p2sh_script(&redeem), 0, &tx, 0, true),
            Err(Error::InvalidArgs)
        ));

        // Without bip16 the same scripts construct fine.
        assert!(Engine::new(&sig_script, &p2sh_script(&redeem), 0, &tx, 0, false).is_ok());
    }

    #[test]
    fn p2sh_wrong_redeem_script_hash_fails() {
        let redeem = [0x51];
        let sig_script = [0x01, 0x52]; // pushes the wrong script
        let tx = spending_tx();
        assert_eq!(
            Engine::new(&sig_script, &p2sh_script(&redeem), 0, &tx, 0, true)
                .and_then(|mut vm| vm.execute()),
            Err(Error::ScriptFailed)
        );
    }

    #[test]
    fn step_past_the_end_is_an_error() {
        let tx = spending_tx();
        let mut vm = Engine::new(&[0x51], &[], 0, &tx, 0, false).unwrap();
        assert_eq!(vm.step(), Ok(true));
        assert_eq!(vm.step(), Err(Error::InvalidProgramCounter));
    }

    #[test]
    fn stack_setters_round_trip() {
        let tx = spending_tx();
        let mut vm = Engine::new(&[0x51], &[], 0, &tx, 0, false).unwrap();
        vm.set_stack(vec![vec![1], vec![2]]);
        assert_eq!(vm.stack(), vec![vec![1], vec![2]]);
        vm.set_alt_stack(vec![vec![9]]);
        assert_eq!(vm.alt_stack(), vec![vec![9]]);
    }

    #[test]
    fn disasm_pc_formats_position_and_mnemonic() {
        let tx = spending_tx();
        let vm = Engine::new(&[0x02, 0xbe, 0xef], &[0x76], 0, &tx, 0, false).unwrap();
        assert_eq!(vm.disasm_pc().unwrap(), "00:0000: OP_DATA_2 0xbeef");
        assert_eq!(vm.disasm_script(1).unwrap(), "01:0000: OP_DUP\n");
        assert_eq!(vm.disasm_script(2), Err(Error::InvalidProgramCounter));
    }

    #[test]
    fn alt_stack_moves_values_between_stacks() {
        // 1 TOALTSTACK 2 DROP FROMALTSTACK
        let pk_script = [0x51, OP_TOALTSTACK, 0x52, OP_DROP, OP_FROMALTSTACK];
        assert_eq!(run(&[], &pk_script), Ok(()));
    }

    #[test]
    fn code_separator_narrows_the_subscript() {
        let tx = spending_tx();
        // NOP CODESEPARATOR NOP: after stepping past the separator only the
        // final NOP remains in the subscript.
        let mut vm = Engine::new(&[0x51], &[OP_NOP, OP_CODESEPARATOR, OP_NOP], 0, &tx, 0, false)
            .unwrap();
        vm.step().unwrap(); // OP_1
        vm.step().unwrap(); // OP_NOP
        vm.step().unwrap(); // OP_CODESEPARATOR
        let sub = vm.sub_script();
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].value(), OP_NOP);
    }

    // Builds a key pair, signs the sighash for a pay-to-pubkey output, and
    // spends it through the engine.
    #[test]
    fn check_sig_verifies_a_real_signature() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x2a; 32]).unwrap();
        let pub_key = secret.public_key(&secp).serialize();

        let mut pk_script = vec![0x21];
        pk_script.extend(pub_key);
        pk_script.push(OP_CHECKSIG);

        let tx = spending_tx();
        let subscript = parse_script(&pk_script).unwrap();
        let hash = sighash::calc_script_hash(&subscript, SIG_HASH_ALL, &blanked(&tx), 0, 0).unwrap();

        let msg = secp256k1::Message::from_digest(hash);
        let mut sig = secp.sign_ecdsa(&msg, &secret).serialize_der().to_vec();
        sig.push(SIG_HASH_ALL);

        let mut sig_script = vec![sig.len() as u8];
        sig_script.extend(&sig);

        assert_eq!(
            Engine::new(&sig_script, &pk_script, 0, &tx, 0, false)
                .and_then(|mut vm| vm.execute()),
            Ok(())
        );

        // Corrupting the signature flips the result to a stack failure, not
        // an error.
        let mut bad_sig_script = sig_script.clone();
        let last = bad_sig_script.len() - 2;
        bad_sig_script[last] ^= 0x01;
        assert_eq!(
            Engine::new(&bad_sig_script, &pk_script, 0, &tx, 0, false)
                .and_then(|mut vm| vm.execute()),
            Err(Error::ScriptFailed)
        );

        // A signature from the wrong key fails the same way.
        let other = SecretKey::from_slice(&[0x2b; 32]).unwrap();
        let mut wrong = secp.sign_ecdsa(&msg, &other).serialize_der().to_vec();
        wrong.push(SIG_HASH_ALL);
        let mut wrong_script = vec![wrong.len() as u8];
        wrong_script.extend(&wrong);
        assert_eq!(
            Engine::new(&wrong_script, &pk_script, 0, &tx, 0, false)
                .and_then(|mut vm| vm.execute()),
            Err(Error::ScriptFailed)
        );
    }

    #[test]
    fn check_multisig_verifies_one_of_two() {
        let secp = Secp256k1::new();
        let secret1 = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let secret2 = SecretKey::from_slice(&[0x22; 32]).unwrap();
        let pub1 = secret1.public_key(&secp).serialize();
        let pub2 = secret2.public_key(&secp).serialize();

        // 1 <pub1> <pub2> 2 CHECKMULTISIG
        let mut pk_script = vec![0x51, 0x21];
        pk_script.extend(pub1);
        pk_script.push(0x21);
        pk_script.extend(pub2);
        pk_script.extend([0x52, OP_CHECKMULTISIG]);

        let tx = spending_tx();
        let subscript = parse_script(&pk_script).unwrap();
        let hash = sighash::calc_script_hash(&subscript, SIG_HASH_ALL, &blanked(&tx), 0, 0).unwrap();
        let msg = secp256k1::Message::from_digest(hash);

        let mut sig = secp.sign_ecdsa(&msg, &secret2).serialize_der().to_vec();
        sig.push(SIG_HASH_ALL);

        // dummy, then the signature.
        let mut sig_script = vec![0x00, sig.len() as u8];
        sig_script.extend(&sig);

        assert_eq!(
            Engine::new(&sig_script, &pk_script, 0, &tx, 0, false)
                .and_then(|mut vm| vm.execute()),
            Ok(())
        );
    }

    #[test]
    fn check_sig_removes_signature_pushes_from_the_subscript() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x2a; 32]).unwrap();
        let pub_key = secret.public_key(&secp).serialize();

        // The script the engine actually hashes: every push whose data
        // equals the signature is stripped from the subscript first, so a
        // signature over this tail must validate a script that also carries
        // the signature as a literal push up front.
        let mut tail = vec![OP_DROP, 0x21];
        tail.extend(pub_key);
        tail.push(OP_CHECKSIG);

        let tx = spending_tx();
        let hash = sighash::calc_script_hash(
            &parse_script(&tail).unwrap(),
            SIG_HASH_ALL,
            &blanked(&tx),
            0,
            0,
        )
        .unwrap();
        let msg = secp256k1::Message::from_digest(hash);
        let mut sig = secp.sign_ecdsa(&msg, &secret).serialize_der().to_vec();
        sig.push(SIG_HASH_ALL);

        // Embed the full signature bytes, hash type included, ahead of the
        // tail.
        let mut pk_script = vec![sig.len() as u8];
        pk_script.extend(&sig);
        pk_script.extend(&tail);

        let mut sig_script = vec![sig.len() as u8];
        sig_script.extend(&sig);

        // Hashing the whole script would commit to the embedded push and
        // produce a different message than the one signed.
        let full_hash = sighash::calc_script_hash(
            &parse_script(&pk_script).unwrap(),
            SIG_HASH_ALL,
            &blanked(&tx),
            0,
            0,
        )
        .unwrap();
        assert_ne!(hash, full_hash);

        assert_eq!(
            Engine::new(&sig_script, &pk_script, 0, &tx, 0, false)
                .and_then(|mut vm| vm.execute()),
            Ok(())
        );
    }

    #[test]
    fn check_multisig_removes_signature_pushes_from_the_subscript() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let pub_key = secret.public_key(&secp).serialize();

        // 1-of-1 multisig behind a pushed-and-dropped copy of the
        // signature; the digest must cover only this tail.
        let mut tail = vec![OP_DROP, 0x51, 0x21];
        tail.extend(pub_key);
        tail.extend([0x51, OP_CHECKMULTISIG]);

        let tx = spending_tx();
        let hash = sighash::calc_script_hash(
            &parse_script(&tail).unwrap(),
            SIG_HASH_ALL,
            &blanked(&tx),
            0,
            0,
        )
        .unwrap();
        let msg = secp256k1::Message::from_digest(hash);
        let mut sig = secp.sign_ecdsa(&msg, &secret).serialize_der().to_vec();
        sig.push(SIG_HASH_ALL);

        let mut pk_script = vec![sig.len() as u8];
        pk_script.extend(&sig);
        pk_script.extend(&tail);

        // dummy, then the signature.
        let mut sig_script = vec![0x00, sig.len() as u8];
        sig_script.extend(&sig);

        assert_eq!(
            Engine::new(&sig_script, &pk_script, 0, &tx, 0, false)
                .and_then(|mut vm| vm.execute()),
            Ok(())
        );
    }

    #[test]
    fn numeric_opcode_behavior() {
        let cases: &[(&str, &[u8], Result<(), Error>)] = &[
            ("add", &[0x52, 0x53, OP_ADD, 0x55, OP_NUMEQUAL], Ok(())),
            ("sub takes operands in order", &[0x55, 0x53, OP_SUB, 0x52, OP_NUMEQUAL], Ok(())),
            ("negate", &[0x51, OP_NEGATE, 0x4f, OP_NUMEQUAL], Ok(())),
            ("abs", &[0x4f, OP_ABS, 0x51, OP_NUMEQUAL], Ok(())),
            ("not", &[0x00, OP_NOT], Ok(())),
            ("zero not-equal", &[0x52, OP_0NOTEQUAL], Ok(())),
            ("one add", &[0x51, OP_1ADD, 0x52, OP_NUMEQUAL], Ok(())),
            ("one sub", &[0x52, OP_1SUB, 0x51, OP_NUMEQUAL], Ok(())),
            ("min", &[0x52, 0x53, OP_MIN, 0x52, OP_NUMEQUAL], Ok(())),
            ("max", &[0x52, 0x53, OP_MAX, 0x53, OP_NUMEQUAL], Ok(())),
            ("within bounds", &[0x52, 0x51, 0x53, OP_WITHIN], Ok(())),
            (
                "within is exclusive at the top",
                &[0x53, 0x51, 0x53, OP_WITHIN],
                Err(Error::ScriptFailed),
            ),
            ("less than", &[0x51, 0x52, OP_LESSTHAN], Ok(())),
            (
                "greater than",
                &[0x51, 0x52, OP_GREATERTHAN],
                Err(Error::ScriptFailed),
            ),
            ("less than or equal", &[0x52, 0x52, OP_LESSTHANOREQUAL], Ok(())),
            ("greater than or equal", &[0x52, 0x52, OP_GREATERTHANOREQUAL], Ok(())),
            ("bool and", &[0x51, 0x52, OP_BOOLAND], Ok(())),
            ("bool or", &[0x00, 0x00, OP_BOOLOR], Err(Error::ScriptFailed)),
            ("num not-equal", &[0x52, 0x53, OP_NUMNOTEQUAL], Ok(())),
            (
                "num equal verify leaves nothing",
                &[0x52, 0x52, OP_NUMEQUALVERIFY, 0x51],
                Ok(()),
            ),
            (
                "num equal verify failure",
                &[0x52, 0x53, OP_NUMEQUALVERIFY],
                Err(Error::VerifyFailed),
            ),
            (
                "operands wider than four bytes",
                &[0x05, 1, 2, 3, 4, 5, OP_1ADD],
                Err(Error::NumberTooBig),
            ),
        ];
        for (name, pk_script, expected) in cases {
            assert_eq!(run(&[], pk_script), *expected, "{name}");
        }
    }

    #[test]
    fn stack_opcode_behavior() {
        let cases: &[(&str, &[u8], Result<(), Error>)] = &[
            ("depth", &[0x51, 0x52, OP_DEPTH, 0x52, OP_NUMEQUAL], Ok(())),
            ("size leaves the element", &[0x02, 0xaa, 0xbb, OP_SIZE, 0x52, OP_NUMEQUAL], Ok(())),
            ("ifdup duplicates a true value", &[0x51, OP_IFDUP, OP_DROP], Ok(())),
            (
                "ifdup leaves a false value alone",
                &[0x00, OP_IFDUP],
                Err(Error::ScriptFailed),
            ),
            ("pick copies", &[0x53, 0x52, 0x51, 0x52, OP_PICK, 0x53, OP_NUMEQUAL], Ok(())),
            ("roll moves", &[0x53, 0x52, 0x51, 0x52, OP_ROLL, 0x53, OP_NUMEQUAL], Ok(())),
            (
                "pick past the bottom",
                &[0x51, 0x52, OP_PICK],
                Err(Error::Underflow),
            ),
            ("rot", &[0x51, 0x52, 0x53, OP_ROT, 0x51, OP_NUMEQUAL], Ok(())),
            ("swap", &[0x51, 0x52, OP_SWAP, 0x51, OP_NUMEQUAL], Ok(())),
            ("verify consumes a true value", &[0x51, 0x51, OP_VERIFY], Ok(())),
            (
                "verify failure",
                &[0x51, 0x00, OP_VERIFY],
                Err(Error::VerifyFailed),
            ),
            ("equal", &[0x02, 0xaa, 0xbb, 0x02, 0xaa, 0xbb, OP_EQUAL], Ok(())),
            (
                "equal verify failure",
                &[0x01, 0xaa, 0x01, 0xbb, OP_EQUALVERIFY],
                Err(Error::VerifyFailed),
            ),
        ];
        for (name, pk_script, expected) in cases {
            assert_eq!(run(&[], pk_script), *expected, "{name}");
        }
    }

    #[test]
    fn hash_opcodes_compose() {
        // SHA256 twice matches HASH256.
        let pk_script = [
            0x03, 0x01, 0x02, 0x03, OP_SHA256, OP_SHA256, 0x03, 0x01, 0x02, 0x03, OP_HASH256,
            OP_EQUAL,
        ];
        assert_eq!(run(&[], &pk_script), Ok(()));

        // RIPEMD160 over SHA256 matches HASH160.
        let pk_script = [
            0x03, 0x01, 0x02, 0x03, OP_SHA256, OP_RIPEMD160, 0x03, 0x01, 0x02, 0x03, OP_HASH160,
            OP_EQUAL,
        ];
        assert_eq!(run(&[], &pk_script), Ok(()));

        // SHA1 produces a 20-byte digest.
        let pk_script = [0x01, 0xaa, OP_SHA1, OP_SIZE, 0x01, 0x14, OP_NUMEQUAL];
        assert_eq!(run(&[], &pk_script), Ok(()));
    }

    // The engine blanks its internal copy; tests that precompute sighashes
    // must hash against the same form.
    fn blanked(tx: &Transaction) -> Transaction {
        let mut tx = tx.clone();
        for tx_in in &mut tx.tx_in {
            tx_in.signature_script = Vec::new();
        }
        tx
    }
}
