//! Bytecode emitter.
//!
//! ```
//! use chainvm::virtual_machine::isa::OpCode;
//! use chainvm::virtual_machine::script_builder::ScriptBuilder;
//!
//! let mut sb = ScriptBuilder::new();
//! sb.emit_push_int(2).emit_push_int(3).emit(OpCode::Add);
//! assert_eq!(sb.as_slice(), &[0x52, 0x53, 0x93]);
//! ```

use crate::types::bytes::Bytes;
use crate::types::encoding::write_var_bytes;
use crate::types::hash::UInt160;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::operand::Operand;
use crate::virtual_machine::stack_item::integer_to_bytes;
use num_bigint::BigInt;

/// Longest interop name SYSCALL accepts.
pub const MAX_SYSCALL_NAME: usize = 252;

#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.script
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::new(self.script)
    }

    pub fn emit(&mut self, op: OpCode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Emits `op` followed by raw operand bytes.
    pub fn emit_with(&mut self, op: OpCode, operand: &[u8]) -> &mut Self {
        self.script.push(op as u8);
        self.script.extend_from_slice(operand);
        self
    }

    /// Pushes an integer using the shortest encoding.
    pub fn emit_push_int(&mut self, value: impl Into<BigInt>) -> &mut Self {
        let value = value.into();
        match i8::try_from(&value) {
            Ok(-1) => self.emit(OpCode::PushM1),
            Ok(0) => self.emit(OpCode::Push0),
            Ok(n @ 1..=16) => {
                self.script.push(OpCode::Push1 as u8 + (n as u8 - 1));
                self
            }
            _ => self.emit_push_bytes(&integer_to_bytes(&value)),
        }
    }

    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        self.emit(if value { OpCode::Push1 } else { OpCode::Push0 })
    }

    /// Pushes raw bytes with PUSHBYTESn or the narrowest PUSHDATA.
    pub fn emit_push_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len <= OpCode::PushBytes75 as usize {
            self.script.push(len as u8);
        } else if len <= u8::MAX as usize {
            self.emit_with(OpCode::PushData1, &[len as u8]);
        } else if len <= u16::MAX as usize {
            self.emit_with(OpCode::PushData2, &(len as u16).to_le_bytes());
        } else {
            self.emit_with(OpCode::PushData4, &(len as u32).to_le_bytes());
        }
        self.script.extend_from_slice(data);
        self
    }

    /// Emits an opcode taking an i16 offset (the JMP family and CALL).
    pub fn emit_jump(&mut self, op: OpCode, offset: i16) -> Result<&mut Self, VmError> {
        if op.operand() != Operand::Fixed(2) {
            return Err(VmError::InvalidArgument("opcode does not take a jump offset"));
        }
        Ok(self.emit_with(op, &offset.to_le_bytes()))
    }

    pub fn emit_call_i(&mut self, rvcount: u8, pcount: u8, offset: i16) -> &mut Self {
        let [lo, hi] = offset.to_le_bytes();
        self.emit_with(OpCode::CallI, &[rvcount, pcount, lo, hi])
    }

    pub fn emit_app_call(&mut self, script_hash: &UInt160, tail: bool) -> &mut Self {
        let op = if tail { OpCode::TailCall } else { OpCode::AppCall };
        self.emit_with(op, script_hash.as_slice())
    }

    pub fn emit_syscall(&mut self, name: &str) -> Result<&mut Self, VmError> {
        if name.len() > MAX_SYSCALL_NAME {
            return Err(VmError::InvalidArgument("interop name too long"));
        }
        self.emit(OpCode::Syscall);
        write_var_bytes(name.as_bytes(), &mut self.script);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::instruction::Instruction;

    #[test]
    fn small_integers_use_shortcuts() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_int(-1).emit_push_int(0).emit_push_int(1).emit_push_int(16);
        assert_eq!(sb.as_slice(), &[0x4F, 0x00, 0x51, 0x60]);
    }

    #[test]
    fn other_integers_push_bytes() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_int(17).emit_push_int(-2).emit_push_int(256);
        assert_eq!(sb.as_slice(), &[0x01, 0x11, 0x01, 0xFE, 0x02, 0x00, 0x01]);
    }

    #[test]
    fn push_bytes_picks_narrowest_form() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_bytes(&[0xAA; 75]);
        assert_eq!(sb.as_slice()[0], 75);
        assert_eq!(sb.len(), 76);

        let mut sb = ScriptBuilder::new();
        sb.emit_push_bytes(&[0xAA; 76]);
        assert_eq!(&sb.as_slice()[..2], &[0x4C, 76]);

        let mut sb = ScriptBuilder::new();
        sb.emit_push_bytes(&[0xAA; 256]);
        assert_eq!(&sb.as_slice()[..3], &[0x4D, 0x00, 0x01]);

        let script = sb.into_bytes();
        let instr = Instruction::decode(&script, 0).unwrap();
        assert_eq!(instr.operand().len(), 256);
    }

    #[test]
    fn jumps_require_offset_opcodes() {
        let mut sb = ScriptBuilder::new();
        sb.emit_jump(OpCode::JmpIfNot, -3).unwrap();
        assert_eq!(sb.as_slice(), &[0x64, 0xFD, 0xFF]);
        assert!(sb.emit_jump(OpCode::Add, 1).is_err());
    }

    #[test]
    fn syscall_and_calls() {
        let mut sb = ScriptBuilder::new();
        sb.emit_syscall("Neo.Runtime.Log").unwrap();
        assert_eq!(&sb.as_slice()[..2], &[0x68, 15]);
        assert!(ScriptBuilder::new().emit_syscall(&"x".repeat(253)).is_err());

        let mut sb = ScriptBuilder::new();
        sb.emit_call_i(1, 2, 5).emit_app_call(&UInt160::zero(), true);
        assert_eq!(&sb.as_slice()[..5], &[0xE0, 1, 2, 5, 0]);
        assert_eq!(sb.as_slice()[5], 0x69);
        assert_eq!(sb.len(), 26);
    }
}
