//! Witnesses and their verification.
//!
//! A witness proves the right to spend outputs locked to a script hash: the
//! verification script must hash to that script hash, and running the
//! invocation script followed by the verification script must leave exactly
//! one true value.

use crate::types::bytes::Bytes;
use crate::types::hash::{UInt160, hash160};
use crate::virtual_machine::{ExecutionEngine, Fault, VmError, VmState};
use crate::{debug, warn};
use chainvm_derive::{BinaryCodec, Error};

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Witness {
    /// Pushes the arguments, usually signatures.
    pub invocation_script: Bytes,
    /// Checks the arguments, usually against public keys.
    pub verification_script: Bytes,
}

impl Witness {
    pub fn new(invocation_script: impl Into<Bytes>, verification_script: impl Into<Bytes>) -> Self {
        Self {
            invocation_script: invocation_script.into(),
            verification_script: verification_script.into(),
        }
    }

    /// Script hash this witness can unlock.
    pub fn script_hash(&self) -> UInt160 {
        hash160(&self.verification_script)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("verification script hashes to {actual}, expected {expected}")]
    ScriptHashMismatch { expected: UInt160, actual: UInt160 },
    #[error("cannot load witness scripts: {0}")]
    Load(VmError),
    #[error("witness faulted: {0}")]
    Faulted(Fault),
    #[error("witness stopped in state {0}")]
    NotHalted(VmState),
    #[error("witness left {0} results, expected exactly one")]
    ResultCount(usize),
    #[error("witness returned false")]
    Rejected,
}

/// Runs `witness` on `engine` and checks it unlocks `script_hash`.
///
/// The engine should be fresh and carry the crypto service and the
/// transaction being verified as its script container.
pub fn verify_witness(
    mut engine: ExecutionEngine,
    witness: &Witness,
    script_hash: &UInt160,
) -> Result<(), VerificationError> {
    let actual = witness.script_hash();
    if actual != *script_hash {
        warn!("witness for {script_hash} carries verification script {actual}");
        return Err(VerificationError::ScriptHashMismatch {
            expected: *script_hash,
            actual,
        });
    }

    engine
        .load_script(witness.verification_script.clone())
        .map_err(VerificationError::Load)?;
    engine
        .load_script(witness.invocation_script.clone())
        .map_err(VerificationError::Load)?;

    let result = match engine.execute() {
        VmState::Halt => check_result(&engine),
        VmState::Fault => Err(match engine.fault() {
            Some(fault) => VerificationError::Faulted(fault.clone()),
            None => VerificationError::NotHalted(VmState::Fault),
        }),
        state => Err(VerificationError::NotHalted(state)),
    };

    match &result {
        Ok(()) => debug!("witness for {script_hash} verified"),
        Err(e) => warn!("witness for {script_hash} rejected: {e}"),
    }
    result
}

fn check_result(engine: &ExecutionEngine) -> Result<(), VerificationError> {
    let results = engine.result_stack();
    if results.len() != 1 {
        return Err(VerificationError::ResultCount(results.len()));
    }
    match results.peek(0) {
        Ok(item) if item.to_bool() => Ok(()),
        _ => Err(VerificationError::Rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};
    use crate::virtual_machine::ErrorKind;
    use crate::virtual_machine::isa::OpCode;
    use crate::virtual_machine::script_builder::ScriptBuilder;

    /// Verification script accepting exactly the value 5.
    fn expects_five() -> Bytes {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_int(5).emit(OpCode::NumEqual);
        sb.into_bytes()
    }

    fn pushes(value: i64) -> Bytes {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_int(value);
        sb.into_bytes()
    }

    fn verify(witness: &Witness) -> Result<(), VerificationError> {
        verify_witness(ExecutionEngine::default(), witness, &witness.script_hash())
    }

    #[test]
    fn wire_format_is_two_var_bytes() {
        let witness = Witness::new([0x51u8], [0x52u8, 0x53]);
        let bytes = witness.to_bytes();
        assert_eq!(bytes.as_slice(), &[1, 0x51, 2, 0x52, 0x53]);
        assert_eq!(Witness::from_bytes(&bytes).unwrap(), witness);
    }

    #[test]
    fn script_hash_covers_verification_script() {
        let witness = Witness::new(pushes(5), expects_five());
        assert_eq!(witness.script_hash(), hash160(&expects_five()));
    }

    #[test]
    fn accepts_matching_invocation() {
        assert_eq!(verify(&Witness::new(pushes(5), expects_five())), Ok(()));
    }

    #[test]
    fn rejects_false_result() {
        assert_eq!(
            verify(&Witness::new(pushes(4), expects_five())),
            Err(VerificationError::Rejected)
        );
    }

    #[test]
    fn rejects_wrong_script_hash() {
        let witness = Witness::new(pushes(5), expects_five());
        let other = UInt160([9; 20]);
        assert!(matches!(
            verify_witness(ExecutionEngine::default(), &witness, &other),
            Err(VerificationError::ScriptHashMismatch { expected, .. }) if expected == other
        ));
    }

    #[test]
    fn reports_faults_with_their_kind() {
        // Nothing for NUMEQUAL to compare against.
        let witness = Witness::new(Bytes::default(), expects_five());
        match verify(&witness) {
            Err(VerificationError::Faulted(fault)) => {
                assert_eq!(fault.kind(), ErrorKind::StackUnderflow);
                assert_eq!(fault.opcode, Some(OpCode::NumEqual));
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn requires_single_result() {
        let witness = Witness::new(pushes(7), pushes(1));
        assert_eq!(verify(&witness), Err(VerificationError::ResultCount(2)));
    }
}
