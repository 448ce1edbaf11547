use thiserror::Error;

/// Every way a script can fail to parse, serialize, or execute.
///
/// Errors abort execution immediately; once one is returned, further calls on
/// the engine that produced it are undefined. Note that signature opcodes
/// translate signature/pubkey parse and verification failures into a pushed
/// false value rather than an error, as consensus requires.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    /// An opcode's immediate data extends past the end of the script.
    #[error("execute past end of script")]
    ShortScript,

    /// An opcode required more items than the stack held.
    #[error("stack underflow")]
    Underflow,

    /// An argument to an opcode or constructor was outside the acceptable
    /// range, such as a negative signature count for OP_CHECKMULTISIG.
    #[error("invalid argument")]
    InvalidArgs,

    /// A disabled opcode was encountered, on any branch.
    #[error("disabled opcode")]
    OpDisabled,

    /// OP_VERIFY or one of the OP_*VERIFY variants saw a false condition.
    #[error("verify failed")]
    VerifyFailed,

    /// A numeric operand was wider than four bytes.
    #[error("number too big")]
    NumberTooBig,

    /// An undefined opcode byte, or a parsed opcode whose immediate data does
    /// not match its descriptor's encoding contract.
    #[error("invalid opcode")]
    InvalidOpcode,

    /// A reserved opcode was executed.
    #[error("reserved opcode")]
    ReservedOpcode,

    /// OP_RETURN was executed.
    #[error("script returned early")]
    EarlyReturn,

    /// OP_ELSE or OP_ENDIF appeared without a matching OP_IF or OP_NOTIF.
    #[error("OP_ELSE or OP_ENDIF with no matching OP_IF")]
    NoIf,

    /// A conditional block was still open when its script ended.
    #[error("execution ended inside a conditional block")]
    MissingEndif,

    /// OP_CHECKMULTISIG saw a pubkey count outside [0, 20].
    #[error("invalid pubkey count in OP_CHECKMULTISIG")]
    TooManyPubkeys,

    /// The script contained more non-push operations than allowed.
    #[error("too many operations in script")]
    TooManyOperations,

    /// An element larger than the maximum allowed size was pushed.
    #[error("element in script too large")]
    ElementTooBig,

    /// Execution finished with a false value on top of the stack.
    #[error("execute fail, fail on stack")]
    ScriptFailed,

    /// The payment extraction helper did not recognize the script pattern.
    #[error("non-recognized address")]
    UnknownAddress,

    /// The program counter does not reference a valid instruction, which
    /// happens when stepping an engine that has already finished.
    #[error("program counter past input scripts")]
    InvalidProgramCounter,
}
