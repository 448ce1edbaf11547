//! Opcode definitions, script parsing, and opcode execution.
//!
//! Every one of the 256 opcode values is assigned a descriptor in
//! [`OPCODE_TABLE`]. A descriptor knows its byte value, mnemonic, how its
//! immediate data is encoded, and the function that executes it against an
//! [`Engine`].

use ripemd::Ripemd160;
use secp256k1::{ecdsa, Message, PublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::engine::{CondValue, Engine};
use crate::error::Error;
use crate::sighash;
use crate::{MAX_PUB_KEYS_PER_MULTI_SIG, MAX_SCRIPT_ELEMENT_SIZE};

// Push opcodes.
pub const OP_0: u8 = 0x00; // aka OP_FALSE
pub const OP_DATA_1: u8 = 0x01;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_DATA_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_RESERVED: u8 = 0x50;
pub const OP_1: u8 = 0x51; // aka OP_TRUE
pub const OP_2: u8 = 0x52;
pub const OP_3: u8 = 0x53;
pub const OP_4: u8 = 0x54;
pub const OP_5: u8 = 0x55;
pub const OP_6: u8 = 0x56;
pub const OP_7: u8 = 0x57;
pub const OP_8: u8 = 0x58;
pub const OP_9: u8 = 0x59;
pub const OP_10: u8 = 0x5a;
pub const OP_11: u8 = 0x5b;
pub const OP_12: u8 = 0x5c;
pub const OP_13: u8 = 0x5d;
pub const OP_14: u8 = 0x5e;
pub const OP_15: u8 = 0x5f;
pub const OP_16: u8 = 0x60;

// Control opcodes.
pub const OP_NOP: u8 = 0x61;
pub const OP_VER: u8 = 0x62;
pub const OP_IF: u8 = 0x63;
pub const OP_NOTIF: u8 = 0x64;
pub const OP_VERIF: u8 = 0x65;
pub const OP_VERNOTIF: u8 = 0x66;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;

// Stack opcodes.
pub const OP_TOALTSTACK: u8 = 0x6b;
pub const OP_FROMALTSTACK: u8 = 0x6c;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_2DUP: u8 = 0x6e;
pub const OP_3DUP: u8 = 0x6f;
pub const OP_2OVER: u8 = 0x70;
pub const OP_2ROT: u8 = 0x71;
pub const OP_2SWAP: u8 = 0x72;
pub const OP_IFDUP: u8 = 0x73;
pub const OP_DEPTH: u8 = 0x74;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_NIP: u8 = 0x77;
pub const OP_OVER: u8 = 0x78;
pub const OP_PICK: u8 = 0x79;
pub const OP_ROLL: u8 = 0x7a;
pub const OP_ROT: u8 = 0x7b;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_TUCK: u8 = 0x7d;

// Splice opcodes.
pub const OP_CAT: u8 = 0x7e;
pub const OP_SUBSTR: u8 = 0x7f;
pub const OP_LEFT: u8 = 0x80;
pub const OP_RIGHT: u8 = 0x81;
pub const OP_SIZE: u8 = 0x82;

// Bitwise logic opcodes.
pub const OP_INVERT: u8 = 0x83;
pub const OP_AND: u8 = 0x84;
pub const OP_OR: u8 = 0x85;
pub const OP_XOR: u8 = 0x86;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_RESERVED1: u8 = 0x89;
pub const OP_RESERVED2: u8 = 0x8a;

// Numeric opcodes.
pub const OP_1ADD: u8 = 0x8b;
pub const OP_1SUB: u8 = 0x8c;
pub const OP_2MUL: u8 = 0x8d;
pub const OP_2DIV: u8 = 0x8e;
pub const OP_NEGATE: u8 = 0x8f;
pub const OP_ABS: u8 = 0x90;
pub const OP_NOT: u8 = 0x91;
pub const OP_0NOTEQUAL: u8 = 0x92;
pub const OP_ADD: u8 = 0x93;
pub const OP_SUB: u8 = 0x94;
pub const OP_MUL: u8 = 0x95;
pub const OP_DIV: u8 = 0x96;
pub const OP_MOD: u8 = 0x97;
pub const OP_LSHIFT: u8 = 0x98;
pub const OP_RSHIFT: u8 = 0x99;
pub const OP_BOOLAND: u8 = 0x9a;
pub const OP_BOOLOR: u8 = 0x9b;
pub const OP_NUMEQUAL: u8 = 0x9c;
pub const OP_NUMEQUALVERIFY: u8 = 0x9d;
pub const OP_NUMNOTEQUAL: u8 = 0x9e;
pub const OP_LESSTHAN: u8 = 0x9f;
pub const OP_GREATERTHAN: u8 = 0xa0;
pub const OP_LESSTHANOREQUAL: u8 = 0xa1;
pub const OP_GREATERTHANOREQUAL: u8 = 0xa2;
pub const OP_MIN: u8 = 0xa3;
pub const OP_MAX: u8 = 0xa4;
pub const OP_WITHIN: u8 = 0xa5;

// Crypto opcodes.
pub const OP_RIPEMD160: u8 = 0xa6;
pub const OP_SHA1: u8 = 0xa7;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

// Reserved opcodes.
pub const OP_NOP1: u8 = 0xb0;
pub const OP_NOP2: u8 = 0xb1;
pub const OP_NOP3: u8 = 0xb2;
pub const OP_NOP4: u8 = 0xb3;
pub const OP_NOP5: u8 = 0xb4;
pub const OP_NOP6: u8 = 0xb5;
pub const OP_NOP7: u8 = 0xb6;
pub const OP_NOP8: u8 = 0xb7;
pub const OP_NOP9: u8 = 0xb8;
pub const OP_NOP10: u8 = 0xb9;

/// How an opcode's immediate data is encoded in a script.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OpcodeLen {
    /// A single-byte instruction carrying no immediate data.
    Bare,
    /// The opcode byte followed by exactly this many data bytes.
    Data(usize),
    /// The opcode byte followed by a little-endian length prefix of this
    /// width (1, 2, or 4), then that many data bytes.
    Pushdata(usize),
}

type ExecFn = fn(&ParsedOpcode, &mut Engine) -> Result<(), Error>;

/// An entry in the opcode dispatch table.
#[derive(Copy, Clone, PartialEq)]
pub struct Opcode {
    pub value: u8,
    pub name: &'static str,
    pub length: OpcodeLen,
    /// True for the opcodes that participate in flow control even when they
    /// sit on a non-executing branch.
    pub conditional: bool,
    exec: ExecFn,
}

impl std::fmt::Debug for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opcode")
            .field("value", &self.value)
            .field("name", &self.name)
            .field("length", &self.length)
            .finish()
    }
}

const fn op(value: u8, name: &'static str, length: OpcodeLen, exec: ExecFn) -> Opcode {
    Opcode {
        value,
        name,
        length,
        conditional: false,
        exec,
    }
}

const fn cond_op(value: u8, name: &'static str, exec: ExecFn) -> Opcode {
    Opcode {
        value,
        name,
        length: OpcodeLen::Bare,
        conditional: true,
        exec,
    }
}

use OpcodeLen::{Bare, Data, Pushdata};

/// The dispatch table, indexed by opcode byte value.
pub(crate) static OPCODE_TABLE: [Opcode; 256] = [
    op(0x00, "OP_0", Bare, opcode_false),
    op(0x01, "OP_DATA_1", Data(1), opcode_push_data),
    op(0x02, "OP_DATA_2", Data(2), opcode_push_data),
    op(0x03, "OP_DATA_3", Data(3), opcode_push_data),
    op(0x04, "OP_DATA_4", Data(4), opcode_push_data),
    op(0x05, "OP_DATA_5", Data(5), opcode_push_data),
    op(0x06, "OP_DATA_6", Data(6), opcode_push_data),
    op(0x07, "OP_DATA_7", Data(7), opcode_push_data),
    op(0x08, "OP_DATA_8", Data(8), opcode_push_data),
    op(0x09, "OP_DATA_9", Data(9), opcode_push_data),
    op(0x0a, "OP_DATA_10", Data(10), opcode_push_data),
    op(0x0b, "OP_DATA_11", Data(11), opcode_push_data),
    op(0x0c, "OP_DATA_12", Data(12), opcode_push_data),
    op(0x0d, "OP_DATA_13", Data(13), opcode_push_data),
    op(0x0e, "OP_DATA_14", Data(14), opcode_push_data),
    op(0x0f, "OP_DATA_15", Data(15), opcode_push_data),
    op(0x10, "OP_DATA_16", Data(16), opcode_push_data),
    op(0x11, "OP_DATA_17", Data(17), opcode_push_data),
    op(0x12, "OP_DATA_18", Data(18), opcode_push_data),
    op(0x13, "OP_DATA_19", Data(19), opcode_push_data),
    op(0x14, "OP_DATA_20", Data(20), opcode_push_data),
    op(0x15, "OP_DATA_21", Data(21), opcode_push_data),
    op(0x16, "OP_DATA_22", Data(22), opcode_push_data),
    op(0x17, "OP_DATA_23", Data(23), opcode_push_data),
    op(0x18, "OP_DATA_24", Data(24), opcode_push_data),
    op(0x19, "OP_DATA_25", Data(25), opcode_push_data),
    op(0x1a, "OP_DATA_26", Data(26), opcode_push_data),
    op(0x1b, "OP_DATA_27", Data(27), opcode_push_data),
    op(0x1c, "OP_DATA_28", Data(28), opcode_push_data),
    op(0x1d, "OP_DATA_29", Data(29), opcode_push_data),
    op(0x1e, "OP_DATA_30", Data(30), opcode_push_data),
    op(0x1f, "OP_DATA_31", Data(31), opcode_push_data),
    op(0x20, "OP_DATA_32", Data(32), opcode_push_data),
    op(0x21, "OP_DATA_33", Data(33), opcode_push_data),
    op(0x22, "OP_DATA_34", Data(34), opcode_push_data),
    op(0x23, "OP_DATA_35", Data(35), opcode_push_data),
    op(0x24, "OP_DATA_36", Data(36), opcode_push_data),
    op(0x25, "OP_DATA_37", Data(37), opcode_push_data),
    op(0x26, "OP_DATA_38", Data(38), opcode_push_data),
    op(0x27, "OP_DATA_39", Data(39), opcode_push_data),
    op(0x28, "OP_DATA_40", Data(40), opcode_push_data),
    op(0x29, "OP_DATA_41", Data(41), opcode_push_data),
    op(0x2a, "OP_DATA_42", Data(42), opcode_push_data),
    op(0x2b, "OP_DATA_43", Data(43), opcode_push_data),
    op(0x2c, "OP_DATA_44", Data(44), opcode_push_data),
    op(0x2d, "OP_DATA_45", Data(45), opcode_push_data),
    op(0x2e, "OP_DATA_46", Data(46), opcode_push_data),
    op(0x2f, "OP_DATA_47", Data(47), opcode_push_data),
    op(0x30, "OP_DATA_48", Data(48), opcode_push_data),
    op(0x31, "OP_DATA_49", Data(49), opcode_push_data),
    op(0x32, "OP_DATA_50", Data(50), opcode_push_data),
    op(0x33, "OP_DATA_51", Data(51), opcode_push_data),
    op(0x34, "OP_DATA_52", Data(52), opcode_push_data),
    op(0x35, "OP_DATA_53", Data(53), opcode_push_data),
    op(0x36, "OP_DATA_54", Data(54), opcode_push_data),
    op(0x37, "OP_DATA_55", Data(55), opcode_push_data),
    op(0x38, "OP_DATA_56", Data(56), opcode_push_data),
    op(0x39, "OP_DATA_57", Data(57), opcode_push_data),
    op(0x3a, "OP_DATA_58", Data(58), opcode_push_data),
    op(0x3b, "OP_DATA_59", Data(59), opcode_push_data),
    op(0x3c, "OP_DATA_60", Data(60), opcode_push_data),
    op(0x3d, "OP_DATA_61", Data(61), opcode_push_data),
    op(0x3e, "OP_DATA_62", Data(62), opcode_push_data),
    op(0x3f, "OP_DATA_63", Data(63), opcode_push_data),
    op(0x40, "OP_DATA_64", Data(64), opcode_push_data),
    op(0x41, "OP_DATA_65", Data(65), opcode_push_data),
    op(0x42, "OP_DATA_66", Data(66), opcode_push_data),
    op(0x43, "OP_DATA_67", Data(67), opcode_push_data),
    op(0x44, "OP_DATA_68", Data(68), opcode_push_data),
    op(0x45, "OP_DATA_69", Data(69), opcode_push_data),
    op(0x46, "OP_DATA_70", Data(70), opcode_push_data),
    op(0x47, "OP_DATA_71", Data(71), opcode_push_data),
    op(0x48, "OP_DATA_72", Data(72), opcode_push_data),
    op(0x49, "OP_DATA_73", Data(73), opcode_push_data),
    op(0x4a, "OP_DATA_74", Data(74), opcode_push_data),
    op(0x4b, "OP_DATA_75", Data(75), opcode_push_data),
    op(0x4c, "OP_PUSHDATA1", Pushdata(1), opcode_push_data),
    op(0x4d, "OP_PUSHDATA2", Pushdata(2), opcode_push_data),
    op(0x4e, "OP_PUSHDATA4", Pushdata(4), opcode_push_data),
    op(0x4f, "OP_1NEGATE", Bare, opcode_1negate),
    op(0x50, "OP_RESERVED", Bare, opcode_reserved),
    op(0x51, "OP_1", Bare, opcode_n),
    op(0x52, "OP_2", Bare, opcode_n),
    op(0x53, "OP_3", Bare, opcode_n),
    op(0x54, "OP_4", Bare, opcode_n),
    op(0x55, "OP_5", Bare, opcode_n),
    op(0x56, "OP_6", Bare, opcode_n),
    op(0x57, "OP_7", Bare, opcode_n),
    op(0x58, "OP_8", Bare, opcode_n),
    op(0x59, "OP_9", Bare, opcode_n),
    op(0x5a, "OP_10", Bare, opcode_n),
    op(0x5b, "OP_11", Bare, opcode_n),
    op(0x5c, "OP_12", Bare, opcode_n),
    op(0x5d, "OP_13", Bare, opcode_n),
    op(0x5e, "OP_14", Bare, opcode_n),
    op(0x5f, "OP_15", Bare, opcode_n),
    op(0x60, "OP_16", Bare, opcode_n),
    op(0x61, "OP_NOP", Bare, opcode_nop),
    op(0x62, "OP_VER", Bare, opcode_reserved),
    cond_op(0x63, "OP_IF", opcode_if),
    cond_op(0x64, "OP_NOTIF", opcode_notif),
    op(0x65, "OP_VERIF", Bare, opcode_reserved),
    op(0x66, "OP_VERNOTIF", Bare, opcode_reserved),
    cond_op(0x67, "OP_ELSE", opcode_else),
    cond_op(0x68, "OP_ENDIF", opcode_endif),
    op(0x69, "OP_VERIFY", Bare, opcode_verify),
    op(0x6a, "OP_RETURN", Bare, opcode_return),
    op(0x6b, "OP_TOALTSTACK", Bare, opcode_to_alt_stack),
    op(0x6c, "OP_FROMALTSTACK", Bare, opcode_from_alt_stack),
    op(0x6d, "OP_2DROP", Bare, opcode_2drop),
    op(0x6e, "OP_2DUP", Bare, opcode_2dup),
    op(0x6f, "OP_3DUP", Bare, opcode_3dup),
    op(0x70, "OP_2OVER", Bare, opcode_2over),
    op(0x71, "OP_2ROT", Bare, opcode_2rot),
    op(0x72, "OP_2SWAP", Bare, opcode_2swap),
    op(0x73, "OP_IFDUP", Bare, opcode_if_dup),
    op(0x74, "OP_DEPTH", Bare, opcode_depth),
    op(0x75, "OP_DROP", Bare, opcode_drop),
    op(0x76, "OP_DUP", Bare, opcode_dup),
    op(0x77, "OP_NIP", Bare, opcode_nip),
    op(0x78, "OP_OVER", Bare, opcode_over),
    op(0x79, "OP_PICK", Bare, opcode_pick),
    op(0x7a, "OP_ROLL", Bare, opcode_roll),
    op(0x7b, "OP_ROT", Bare, opcode_rot),
    op(0x7c, "OP_SWAP", Bare, opcode_swap),
    op(0x7d, "OP_TUCK", Bare, opcode_tuck),
    op(0x7e, "OP_CAT", Bare, opcode_disabled),
    op(0x7f, "OP_SUBSTR", Bare, opcode_disabled),
    op(0x80, "OP_LEFT", Bare, opcode_disabled),
    op(0x81, "OP_RIGHT", Bare, opcode_disabled),
    op(0x82, "OP_SIZE", Bare, opcode_size),
    op(0x83, "OP_INVERT", Bare, opcode_disabled),
    op(0x84, "OP_AND", Bare, opcode_disabled),
    op(0x85, "OP_OR", Bare, opcode_disabled),
    op(0x86, "OP_XOR", Bare, opcode_disabled),
    op(0x87, "OP_EQUAL", Bare, opcode_equal),
    op(0x88, "OP_EQUALVERIFY", Bare, opcode_equal_verify),
    op(0x89, "OP_RESERVED1", Bare, opcode_reserved),
    op(0x8a, "OP_RESERVED2", Bare, opcode_reserved),
    op(0x8b, "OP_1ADD", Bare, opcode_1add),
    op(0x8c, "OP_1SUB", Bare, opcode_1sub),
    op(0x8d, "OP_2MUL", Bare, opcode_disabled),
    op(0x8e, "OP_2DIV", Bare, opcode_disabled),
    op(0x8f, "OP_NEGATE", Bare, opcode_negate),
    op(0x90, "OP_ABS", Bare, opcode_abs),
    op(0x91, "OP_NOT", Bare, opcode_not),
    op(0x92, "OP_0NOTEQUAL", Bare, opcode_0not_equal),
    op(0x93, "OP_ADD", Bare, opcode_add),
    op(0x94, "OP_SUB", Bare, opcode_sub),
    op(0x95, "OP_MUL", Bare, opcode_disabled),
    op(0x96, "OP_DIV", Bare, opcode_disabled),
    op(0x97, "OP_MOD", Bare, opcode_disabled),
    op(0x98, "OP_LSHIFT", Bare, opcode_disabled),
    op(0x99, "OP_RSHIFT", Bare, opcode_disabled),
    op(0x9a, "OP_BOOLAND", Bare, opcode_bool_and),
    op(0x9b, "OP_BOOLOR", Bare, opcode_bool_or),
    op(0x9c, "OP_NUMEQUAL", Bare, opcode_num_equal),
    op(0x9d, "OP_NUMEQUALVERIFY", Bare, opcode_num_equal_verify),
    op(0x9e, "OP_NUMNOTEQUAL", Bare, opcode_num_not_equal),
    op(0x9f, "OP_LESSTHAN", Bare, opcode_less_than),
    op(0xa0, "OP_GREATERTHAN", Bare, opcode_greater_than),
    op(0xa1, "OP_LESSTHANOREQUAL", Bare, opcode_less_than_or_equal),
    op(0xa2, "OP_GREATERTHANOREQUAL", Bare, opcode_greater_than_or_equal),
    op(0xa3, "OP_MIN", Bare, opcode_min),
    op(0xa4, "OP_MAX", Bare, opcode_max),
    op(0xa5, "OP_WITHIN", Bare, opcode_within),
    op(0xa6, "OP_RIPEMD160", Bare, opcode_ripemd160),
    op(0xa7, "OP_SHA1", Bare, opcode_sha1),
    op(0xa8, "OP_SHA256", Bare, opcode_sha256),
    op(0xa9, "OP_HASH160", Bare, opcode_hash160),
    op(0xaa, "OP_HASH256", Bare, opcode_hash256),
    op(0xab, "OP_CODESEPARATOR", Bare, opcode_code_separator),
    op(0xac, "OP_CHECKSIG", Bare, opcode_check_sig),
    op(0xad, "OP_CHECKSIGVERIFY", Bare, opcode_check_sig_verify),
    op(0xae, "OP_CHECKMULTISIG", Bare, opcode_check_multi_sig),
    op(0xaf, "OP_CHECKMULTISIGVERIFY", Bare, opcode_check_multi_sig_verify),
    op(0xb0, "OP_NOP1", Bare, opcode_nop),
    op(0xb1, "OP_NOP2", Bare, opcode_nop),
    op(0xb2, "OP_NOP3", Bare, opcode_nop),
    op(0xb3, "OP_NOP4", Bare, opcode_nop),
    op(0xb4, "OP_NOP5", Bare, opcode_nop),
    op(0xb5, "OP_NOP6", Bare, opcode_nop),
    op(0xb6, "OP_NOP7", Bare, opcode_nop),
    op(0xb7, "OP_NOP8", Bare, opcode_nop),
    op(0xb8, "OP_NOP9", Bare, opcode_nop),
    op(0xb9, "OP_NOP10", Bare, opcode_nop),
    op(0xba, "OP_UNKNOWN186", Bare, opcode_invalid),
    op(0xbb, "OP_UNKNOWN187", Bare, opcode_invalid),
    op(0xbc, "OP_UNKNOWN188", Bare, opcode_invalid),
    op(0xbd, "OP_UNKNOWN189", Bare, opcode_invalid),
    op(0xbe, "OP_UNKNOWN190", Bare, opcode_invalid),
    op(0xbf, "OP_UNKNOWN191", Bare, opcode_invalid),
    op(0xc0, "OP_UNKNOWN192", Bare, opcode_invalid),
    op(0xc1, "OP_UNKNOWN193", Bare, opcode_invalid),
    op(0xc2, "OP_UNKNOWN194", Bare, opcode_invalid),
    op(0xc3, "OP_UNKNOWN195", Bare, opcode_invalid),
    op(0xc4, "OP_UNKNOWN196", Bare, opcode_invalid),
    op(0xc5, "OP_UNKNOWN197", Bare, opcode_invalid),
    op(0xc6, "OP_UNKNOWN198", Bare, opcode_invalid),
    op(0xc7, "OP_UNKNOWN199", Bare, opcode_invalid),
    op(0xc8, "OP_UNKNOWN200", Bare, opcode_invalid),
    op(0xc9, "OP_UNKNOWN201", Bare, opcode_invalid),
    op(0xca, "OP_UNKNOWN202", Bare, opcode_invalid),
    op(0xcb, "OP_UNKNOWN203", Bare, opcode_invalid),
    op(0xcc, "OP_UNKNOWN204", Bare, opcode_invalid),
    op(0xcd, "OP_UNKNOWN205", Bare, opcode_invalid),
    op(0xce, "OP_UNKNOWN206", Bare, opcode_invalid),
    op(0xcf, "OP_UNKNOWN207", Bare, opcode_invalid),
    op(0xd0, "OP_UNKNOWN208", Bare, opcode_invalid),
    op(0xd1, "OP_UNKNOWN209", Bare, opcode_invalid),
    op(0xd2, "OP_UNKNOWN210", Bare, opcode_invalid),
    op(0xd3, "OP_UNKNOWN211", Bare, opcode_invalid),
    op(0xd4, "OP_UNKNOWN212", Bare, opcode_invalid),
    op(0xd5, "OP_UNKNOWN213", Bare, opcode_invalid),
    op(0xd6, "OP_UNKNOWN214", Bare, opcode_invalid),
    op(0xd7, "OP_UNKNOWN215", Bare, opcode_invalid),
    op(0xd8, "OP_UNKNOWN216", Bare, opcode_invalid),
    op(0xd9, "OP_UNKNOWN217", Bare, opcode_invalid),
    op(0xda, "OP_UNKNOWN218", Bare, opcode_invalid),
    op(0xdb, "OP_UNKNOWN219", Bare, opcode_invalid),
    op(0xdc, "OP_UNKNOWN220", Bare, opcode_invalid),
    op(0xdd, "OP_UNKNOWN221", Bare, opcode_invalid),
    op(0xde, "OP_UNKNOWN222", Bare, opcode_invalid),
    op(0xdf, "OP_UNKNOWN223", Bare, opcode_invalid),
    op(0xe0, "OP_UNKNOWN224", Bare, opcode_invalid),
    op(0xe1, "OP_UNKNOWN225", Bare, opcode_invalid),
    op(0xe2, "OP_UNKNOWN226", Bare, opcode_invalid),
    op(0xe3, "OP_UNKNOWN227", Bare, opcode_invalid),
    op(0xe4, "OP_UNKNOWN228", Bare, opcode_invalid),
    op(0xe5, "OP_UNKNOWN229", Bare, opcode_invalid),
    op(0xe6, "OP_UNKNOWN230", Bare, opcode_invalid),
    op(0xe7, "OP_UNKNOWN231", Bare, opcode_invalid),
    op(0xe8, "OP_UNKNOWN232", Bare, opcode_invalid),
    op(0xe9, "OP_UNKNOWN233", Bare, opcode_invalid),
    op(0xea, "OP_UNKNOWN234", Bare, opcode_invalid),
    op(0xeb, "OP_UNKNOWN235", Bare, opcode_invalid),
    op(0xec, "OP_UNKNOWN236", Bare, opcode_invalid),
    op(0xed, "OP_UNKNOWN237", Bare, opcode_invalid),
    op(0xee, "OP_UNKNOWN238", Bare, opcode_invalid),
    op(0xef, "OP_UNKNOWN239", Bare, opcode_invalid),
    op(0xf0, "OP_UNKNOWN240", Bare, opcode_invalid),
    op(0xf1, "OP_UNKNOWN241", Bare, opcode_invalid),
    op(0xf2, "OP_UNKNOWN242", Bare, opcode_invalid),
    op(0xf3, "OP_UNKNOWN243", Bare, opcode_invalid),
    op(0xf4, "OP_UNKNOWN244", Bare, opcode_invalid),
    op(0xf5, "OP_UNKNOWN245", Bare, opcode_invalid),
    op(0xf6, "OP_UNKNOWN246", Bare, opcode_invalid),
    op(0xf7, "OP_UNKNOWN247", Bare, opcode_invalid),
    op(0xf8, "OP_UNKNOWN248", Bare, opcode_invalid),
    op(0xf9, "OP_UNKNOWN249", Bare, opcode_invalid),
    op(0xfa, "OP_UNKNOWN250", Bare, opcode_invalid),
    op(0xfb, "OP_UNKNOWN251", Bare, opcode_invalid),
    op(0xfc, "OP_UNKNOWN252", Bare, opcode_invalid),
    op(0xfd, "OP_UNKNOWN253", Bare, opcode_invalid),
    op(0xfe, "OP_UNKNOWN254", Bare, opcode_invalid),
    op(0xff, "OP_UNKNOWN255", Bare, opcode_invalid),
];

/// An opcode together with its decoded immediate data.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedOpcode {
    opcode: Opcode,
    data: Vec<u8>,
}

impl ParsedOpcode {
    /// The opcode's byte value.
    pub fn value(&self) -> u8 {
        self.opcode.value
    }

    /// The opcode's mnemonic.
    pub fn name(&self) -> &'static str {
        self.opcode.name
    }

    /// The immediate data carried by the opcode.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True for the opcodes that track flow control on non-executing
    /// branches: OP_IF, OP_NOTIF, OP_ELSE, and OP_ENDIF.
    pub fn is_conditional(&self) -> bool {
        self.opcode.conditional
    }

    /// True for the opcodes whose execution is disabled outright.
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.opcode.value,
            OP_CAT
                | OP_SUBSTR
                | OP_LEFT
                | OP_RIGHT
                | OP_INVERT
                | OP_AND
                | OP_OR
                | OP_XOR
                | OP_2MUL
                | OP_2DIV
                | OP_MUL
                | OP_DIV
                | OP_MOD
                | OP_LSHIFT
                | OP_RSHIFT
        )
    }

    /// True for the opcodes that fail on sight, executing branch or not.
    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode.value, OP_VERIF | OP_VERNOTIF)
    }

    /// Executes the opcode against the engine.
    ///
    /// Disabled and always-illegal opcodes fail here regardless of which
    /// branch they sit on, and non-push opcodes are charged against the
    /// engine's operation counter before the conditional gate is consulted.
    pub(crate) fn exec(&self, vm: &mut Engine) -> Result<(), Error> {
        if self.is_disabled() {
            return Err(Error::OpDisabled);
        }
        if self.always_illegal() {
            return Err(Error::ReservedOpcode);
        }

        // OP_RESERVED counts as a push operation here.
        if self.opcode.value > OP_16 {
            vm.add_ops(1)?;
        } else if self.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(Error::ElementTooBig);
        }

        if !vm.executing() && !self.is_conditional() {
            return Ok(());
        }
        (self.opcode.exec)(self, vm)
    }

    /// Serializes the opcode back to script bytes, validating that the
    /// immediate data matches the descriptor's encoding contract.
    pub fn bytes(&self) -> Result<Vec<u8>, Error> {
        match self.opcode.length {
            OpcodeLen::Bare => {
                if !self.data.is_empty() {
                    return Err(Error::InvalidOpcode);
                }
                Ok(vec![self.opcode.value])
            }
            OpcodeLen::Data(n) => {
                if self.data.len() != n {
                    return Err(Error::InvalidOpcode);
                }
                let mut ret = Vec::with_capacity(1 + n);
                ret.push(self.opcode.value);
                ret.extend_from_slice(&self.data);
                Ok(ret)
            }
            OpcodeLen::Pushdata(width) => {
                let l = self.data.len() as u64;
                if width < 8 && l >> (8 * width) != 0 {
                    return Err(Error::InvalidOpcode);
                }
                let mut ret = Vec::with_capacity(1 + width + self.data.len());
                ret.push(self.opcode.value);
                ret.extend_from_slice(&l.to_le_bytes()[..width]);
                ret.extend_from_slice(&self.data);
                Ok(ret)
            }
        }
    }

    /// Renders the opcode for disassembly. In one-line mode data pushes are
    /// shown as bare hex; otherwise the mnemonic and, for length-prefixed
    /// pushes, the encoded length are included.
    pub fn print(&self, oneline: bool) -> String {
        let hex: String = self.data.iter().map(|b| format!("{b:02x}")).collect();
        match self.opcode.length {
            OpcodeLen::Bare => self.opcode.name.to_string(),
            _ if oneline => hex,
            OpcodeLen::Data(_) => format!("{} 0x{}", self.opcode.name, hex),
            OpcodeLen::Pushdata(_) => {
                format!("{} 0x{:02x} 0x{}", self.opcode.name, self.data.len(), hex)
            }
        }
    }
}

/// Parses raw script bytes into a sequence of opcodes using the standard
/// table.
pub fn parse_script(script: &[u8]) -> Result<Vec<ParsedOpcode>, Error> {
    parse_script_template(script, &OPCODE_TABLE)
}

/// Parses raw script bytes against the provided opcode table.
///
/// Exists separately from [`parse_script`] so tests can exercise the parser
/// with altered descriptors.
pub(crate) fn parse_script_template(
    script: &[u8],
    table: &[Opcode; 256],
) -> Result<Vec<ParsedOpcode>, Error> {
    let mut pops = Vec::new();
    let mut i = 0;
    while i < script.len() {
        let opcode = table[script[i] as usize];
        match opcode.length {
            OpcodeLen::Bare => {
                pops.push(ParsedOpcode {
                    opcode,
                    data: Vec::new(),
                });
                i += 1;
            }
            OpcodeLen::Data(n) => {
                if script.len() - i < n + 1 {
                    return Err(Error::ShortScript);
                }
                pops.push(ParsedOpcode {
                    opcode,
                    data: script[i + 1..i + 1 + n].to_vec(),
                });
                i += 1 + n;
            }
            OpcodeLen::Pushdata(width) => {
                if !matches!(width, 1 | 2 | 4) {
                    return Err(Error::InvalidOpcode);
                }
                // The length prefix must be followed by at least one more
                // byte of script.
                if script.len() - i - 1 <= width {
                    return Err(Error::ShortScript);
                }
                let mut l = 0usize;
                for b in script[i + 1..i + 1 + width].iter().rev() {
                    l = (l << 8) | usize::from(*b);
                }
                let off = i + 1 + width;
                if l > script.len() - off {
                    return Err(Error::ShortScript);
                }
                if l > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(Error::ElementTooBig);
                }
                pops.push(ParsedOpcode {
                    opcode,
                    data: script[off..off + l].to_vec(),
                });
                i = off + l;
            }
        }
    }
    Ok(pops)
}

/// Serializes a sequence of parsed opcodes back into script bytes.
pub fn unparse_script(pops: &[ParsedOpcode]) -> Result<Vec<u8>, Error> {
    let mut script = Vec::new();
    for pop in pops {
        script.extend_from_slice(&pop.bytes()?);
    }
    Ok(script)
}

/// Returns the script minus every occurrence of the given opcode.
pub fn remove_opcode(pops: &[ParsedOpcode], opcode: u8) -> Vec<ParsedOpcode> {
    pops.iter()
        .filter(|pop| pop.opcode.value != opcode)
        .cloned()
        .collect()
}

/// Returns the script minus any opcode whose immediate data equals `data`.
pub fn remove_opcode_by_data(pops: &[ParsedOpcode], data: &[u8]) -> Vec<ParsedOpcode> {
    pops.iter()
        .filter(|pop| pop.data != data)
        .cloned()
        .collect()
}

/// Formats a disassembled script for one-line printing.
pub fn disasm_string(script: &[u8]) -> Result<String, Error> {
    let pops = parse_script(script)?;
    Ok(pops
        .iter()
        .map(|pop| pop.print(true))
        .collect::<Vec<_>>()
        .join(" "))
}

// *********************
// Opcode implementations
// *********************

fn opcode_false(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.push_byte_array(Vec::new())
}

fn opcode_push_data(pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.push_byte_array(pop.data.clone())
}

fn opcode_1negate(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.push_int(-1)
}

fn opcode_n(pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.push_int(i64::from(pop.opcode.value - (OP_1 - 1)))
}

fn opcode_nop(_pop: &ParsedOpcode, _vm: &mut Engine) -> Result<(), Error> {
    Ok(())
}

fn opcode_reserved(_pop: &ParsedOpcode, _vm: &mut Engine) -> Result<(), Error> {
    Err(Error::ReservedOpcode)
}

fn opcode_invalid(_pop: &ParsedOpcode, _vm: &mut Engine) -> Result<(), Error> {
    Err(Error::InvalidOpcode)
}

fn opcode_disabled(_pop: &ParsedOpcode, _vm: &mut Engine) -> Result<(), Error> {
    Err(Error::OpDisabled)
}

fn opcode_if(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let cond = if vm.executing() {
        if vm.dstack.pop_bool()? {
            CondValue::True
        } else {
            CondValue::False
        }
    } else {
        CondValue::Skip
    };
    vm.cond_stack.push(cond);
    Ok(())
}

fn opcode_notif(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let cond = if vm.executing() {
        if vm.dstack.pop_bool()? {
            CondValue::False
        } else {
            CondValue::True
        }
    } else {
        CondValue::Skip
    };
    vm.cond_stack.push(cond);
    Ok(())
}

fn opcode_else(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    // The sentinel at the bottom of the conditional stack cannot be toggled,
    // only marks pushed by OP_IF/OP_NOTIF.
    if vm.cond_stack.len() < 2 {
        return Err(Error::NoIf);
    }
    let cond = vm.cond_stack.last_mut().expect("length checked above");
    *cond = match *cond {
        CondValue::True => CondValue::False,
        CondValue::False => CondValue::True,
        CondValue::Skip => CondValue::Skip,
    };
    Ok(())
}

fn opcode_endif(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    if vm.cond_stack.len() < 2 {
        return Err(Error::NoIf);
    }
    vm.cond_stack.pop();
    Ok(())
}

fn abstract_verify(vm: &mut Engine) -> Result<(), Error> {
    if vm.dstack.pop_bool()? {
        Ok(())
    } else {
        Err(Error::VerifyFailed)
    }
}

fn opcode_verify(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    abstract_verify(vm)
}

fn opcode_return(_pop: &ParsedOpcode, _vm: &mut Engine) -> Result<(), Error> {
    Err(Error::EarlyReturn)
}

fn opcode_to_alt_stack(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let so = vm.dstack.pop_byte_array()?;
    vm.astack.push_byte_array(so)
}

fn opcode_from_alt_stack(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let so = vm.astack.pop_byte_array()?;
    vm.dstack.push_byte_array(so)
}

fn opcode_2drop(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.drop_n(2)
}

fn opcode_2dup(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.dup_n(2)
}

fn opcode_3dup(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.dup_n(3)
}

fn opcode_2over(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.over_n(2)
}

fn opcode_2rot(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.rot_n(2)
}

fn opcode_2swap(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.swap_n(2)
}

fn opcode_if_dup(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    if vm.dstack.peek_bool(0)? {
        let so = vm.dstack.peek_byte_array(0)?.to_vec();
        vm.dstack.push_byte_array(so)?;
    }
    Ok(())
}

fn opcode_depth(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let depth = vm.dstack.depth();
    vm.dstack.push_int(depth as i64)
}

fn opcode_drop(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.drop_n(1)
}

fn opcode_dup(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.dup_n(1)
}

fn opcode_nip(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.nip_n(1).map(|_| ())
}

fn opcode_over(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.over_n(1)
}

fn opcode_pick(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let val = vm.dstack.pop_int()?;
    let idx = usize::try_from(val).map_err(|_| Error::Underflow)?;
    vm.dstack.pick_n(idx)
}

fn opcode_roll(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let val = vm.dstack.pop_int()?;
    let idx = usize::try_from(val).map_err(|_| Error::Underflow)?;
    vm.dstack.roll_n(idx)
}

fn opcode_rot(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.rot_n(1)
}

fn opcode_swap(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.swap_n(1)
}

fn opcode_tuck(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.dstack.tuck_n(1)
}

fn opcode_size(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let size = vm.dstack.peek_byte_array(0)?.len();
    vm.dstack.push_int(size as i64)
}

fn opcode_equal(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let a = vm.dstack.pop_byte_array()?;
    let b = vm.dstack.pop_byte_array()?;
    vm.dstack.push_bool(a == b)
}

fn opcode_equal_verify(pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    opcode_equal(pop, vm)?;
    abstract_verify(vm)
}

fn opcode_1add(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let m = vm.dstack.pop_int()?;
    vm.dstack.push_int(m + 1)
}

fn opcode_1sub(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let m = vm.dstack.pop_int()?;
    vm.dstack.push_int(m - 1)
}

fn opcode_negate(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let m = vm.dstack.pop_int()?;
    vm.dstack.push_int(-m)
}

fn opcode_abs(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let m = vm.dstack.pop_int()?;
    vm.dstack.push_int(m.abs())
}

fn opcode_not(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let m = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(m == 0))
}

fn opcode_0not_equal(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let m = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(m != 0))
}

fn opcode_add(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(v0 + v1)
}

fn opcode_sub(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(v1 - v0)
}

fn opcode_bool_and(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v0 != 0 && v1 != 0))
}

fn opcode_bool_or(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v0 != 0 || v1 != 0))
}

fn opcode_num_equal(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v0 == v1))
}

fn opcode_num_equal_verify(pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    opcode_num_equal(pop, vm)?;
    abstract_verify(vm)
}

fn opcode_num_not_equal(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v0 != v1))
}

fn opcode_less_than(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v1 < v0))
}

fn opcode_greater_than(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v1 > v0))
}

fn opcode_less_than_or_equal(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v1 <= v0))
}

fn opcode_greater_than_or_equal(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(i64::from(v1 >= v0))
}

fn opcode_min(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(v0.min(v1))
}

fn opcode_max(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let v0 = vm.dstack.pop_int()?;
    let v1 = vm.dstack.pop_int()?;
    vm.dstack.push_int(v0.max(v1))
}

fn opcode_within(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let max_val = vm.dstack.pop_int()?;
    let min_val = vm.dstack.pop_int()?;
    let x = vm.dstack.pop_int()?;
    vm.dstack.push_bool(min_val <= x && x < max_val)
}

fn opcode_ripemd160(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let buf = vm.dstack.pop_byte_array()?;
    vm.dstack.push_byte_array(Ripemd160::digest(&buf).to_vec())
}

fn opcode_sha1(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let buf = vm.dstack.pop_byte_array()?;
    vm.dstack.push_byte_array(Sha1::digest(&buf).to_vec())
}

fn opcode_sha256(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let buf = vm.dstack.pop_byte_array()?;
    vm.dstack.push_byte_array(Sha256::digest(&buf).to_vec())
}

fn opcode_hash160(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let buf = vm.dstack.pop_byte_array()?;
    vm.dstack
        .push_byte_array(Ripemd160::digest(Sha256::digest(&buf)).to_vec())
}

fn opcode_hash256(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let buf = vm.dstack.pop_byte_array()?;
    vm.dstack
        .push_byte_array(Sha256::digest(Sha256::digest(&buf)).to_vec())
}

fn opcode_code_separator(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    vm.last_code_sep = vm.script_off + 1;
    Ok(())
}

/// Verifies a DER signature over a sighash with the given serialized public
/// key. Parse failures simply fail the check.
fn check_sig(vm: &Engine, sig_hash: [u8; 32], sig_der: &[u8], pk_bytes: &[u8]) -> bool {
    let pub_key = match PublicKey::from_slice(pk_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = match ecdsa::Signature::from_der(sig_der) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    vm.secp
        .verify_ecdsa(&Message::from_digest(sig_hash), &signature, &pub_key)
        .is_ok()
}

fn opcode_check_sig(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let pk_bytes = vm.dstack.pop_byte_array()?;
    let full_sig = vm.dstack.pop_byte_array()?;

    // The hash type is one byte tacked onto the end of the signature; only
    // the DER parse wants it stripped.
    let (hash_type, sig_der) = match full_sig.split_last() {
        Some((ht, der)) => (*ht, der),
        None => {
            vm.dstack.push_bool(false)?;
            return Ok(());
        }
    };

    // The script from the last OP_CODESEPARATOR onward, minus the signature
    // itself in the unlikely event it appears there. A push's immediate data
    // is the signature exactly as it sits on the stack, hash type included,
    // so the full bytes are what the removal has to match.
    let sub_script = remove_opcode_by_data(&vm.sub_script(), &full_sig);

    let hash = sighash::calc_script_hash(&sub_script, hash_type, &vm.tx, vm.tx_idx, vm.pver)?;
    let valid = check_sig(vm, hash, sig_der, &pk_bytes);
    vm.dstack.push_bool(valid)
}

fn opcode_check_sig_verify(pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    opcode_check_sig(pop, vm)?;
    abstract_verify(vm)
}

fn opcode_check_multi_sig(_pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    let num_keys = vm.dstack.pop_int()?;
    if num_keys < 0 || num_keys > MAX_PUB_KEYS_PER_MULTI_SIG as i64 {
        return Err(Error::TooManyPubkeys);
    }
    let num_keys = num_keys as usize;

    // Each public key that may be checked counts toward the operation limit.
    vm.add_ops(num_keys)?;

    let mut pub_keys = Vec::with_capacity(num_keys);
    for _ in 0..num_keys {
        pub_keys.push(vm.dstack.pop_byte_array()?);
    }

    let num_sigs = vm.dstack.pop_int()?;
    if num_sigs < 0 || num_sigs > num_keys as i64 {
        return Err(Error::InvalidArgs);
    }
    let mut signatures = Vec::with_capacity(num_sigs as usize);
    for _ in 0..num_sigs {
        signatures.push(vm.dstack.pop_byte_array()?);
    }

    // A bug in the reference implementation consumes one extra, unexamined
    // stack element. Consensus requires keeping it.
    vm.dstack.pop_byte_array()?;

    // Drop each signature from the subscript, matching the full bytes as
    // pushed (hash type included). An empty pattern would match every bare
    // opcode, so empty signatures are left alone.
    let mut sub_script = vm.sub_script();
    for sig in &signatures {
        if !sig.is_empty() {
            sub_script = remove_opcode_by_data(&sub_script, sig);
        }
    }

    // Signatures must appear in the same order as their matching public
    // keys; walk both lists, discarding keys that fail to verify.
    let mut success = true;
    let mut key_idx = 0;
    'sig_loop: for raw_sig in &signatures {
        let (hash_type, sig_der) = match raw_sig.split_last() {
            Some((ht, der)) => (*ht, der),
            None => (0, &[][..]),
        };
        let hash = sighash::calc_script_hash(&sub_script, hash_type, &vm.tx, vm.tx_idx, vm.pver)?;
        loop {
            if key_idx >= pub_keys.len() {
                // Ran out of keys before satisfying every signature.
                success = false;
                break 'sig_loop;
            }
            let pk_bytes = &pub_keys[key_idx];
            key_idx += 1;
            if !sig_der.is_empty() && check_sig(vm, hash, sig_der, pk_bytes) {
                break;
            }
        }
    }

    vm.dstack.push_bool(success)
}

fn opcode_check_multi_sig_verify(pop: &ParsedOpcode, vm: &mut Engine) -> Result<(), Error> {
    opcode_check_multi_sig(pop, vm)?;
    abstract_verify(vm)
}
