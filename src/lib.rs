//! A Bitcoin transaction script engine.
//!
//! Scripts are small, stack-based byte-coded programs. A transaction output
//! locks its coins behind a public key script; the input spending it supplies
//! a signature script, and the two run back to back on a shared stack. The
//! spend is authorized only if execution ends with a true value on top.
//!
//! [`Engine`] is the entry point:
//!
//! ```no_run
//! use txscript::Engine;
//! # fn example(sig_script: &[u8], pk_script: &[u8], tx: &txscript::Transaction) {
//! let mut vm = Engine::new(sig_script, pk_script, 0, tx, 0, true).unwrap();
//! match vm.execute() {
//!     Ok(()) => println!("input authorized"),
//!     Err(err) => println!("script failed: {err}"),
//! }
//! # }
//! ```
//!
//! Every limit, opcode quirk, and hashing rule in here is consensus-critical;
//! the engine reproduces the reference behavior down to the historical bugs,
//! such as the extra stack element OP_CHECKMULTISIG consumes.

pub mod engine;
mod error;
pub mod num;
pub mod opcode;
pub mod pattern;
pub mod sighash;
pub mod stack;
pub mod tx;

pub use engine::Engine;
pub use error::Error;
pub use opcode::{disasm_string, parse_script, unparse_script, ParsedOpcode};
pub use pattern::ScriptClass;
pub use stack::Stack;
pub use tx::{OutPoint, Transaction, TxIn, TxOut};

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;

/// Maximum number of public keys a multisig operation may name.
pub const MAX_PUB_KEYS_PER_MULTI_SIG: usize = 20;

/// Maximum number of bytes pushable to the stack.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// The Unix timestamp from which BIP16 pay-to-script-hash rules apply in the
/// blockchain: Sun Apr 1 00:00:00 UTC 2012.
pub const BIP16_ACTIVATION: u64 = 1333238400;
