//! Decoded instructions.

use crate::types::bytes::Bytes;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::operand::Operand;
use std::fmt;
use std::ops::Range;

/// An opcode together with its inline operand.
///
/// Holds a handle on the script it was decoded from, so the operand is
/// borrowed rather than copied.
#[derive(Clone, Debug)]
pub struct Instruction {
    opcode: OpCode,
    position: usize,
    operand: Range<usize>,
    end: usize,
    script: Bytes,
}

impl Instruction {
    /// Decodes the instruction starting at `position`.
    ///
    /// Past the end of the script this yields an implicit `RET`.
    pub fn decode(script: &Bytes, position: usize) -> Result<Instruction, VmError> {
        let Some(&byte) = script.get(position) else {
            return Ok(Instruction {
                opcode: OpCode::Ret,
                position,
                operand: position..position,
                end: position + 1,
                script: script.clone(),
            });
        };
        let opcode = OpCode::try_from(byte)?;
        let start = position + 1;

        let operand = match opcode.operand() {
            Operand::None => start..start,
            Operand::Fixed(n) => start..start + n,
            Operand::Prefixed(width) => {
                let width = width as usize;
                let prefix = script
                    .get(start..start + width)
                    .ok_or(VmError::MalformedOperand("truncated length prefix"))?;
                let mut le = [0u8; 8];
                le[..width].copy_from_slice(prefix);
                let len = usize::try_from(u64::from_le_bytes(le))
                    .map_err(|_| VmError::MalformedOperand("length prefix overflows"))?;
                let data = start + width;
                data..data.saturating_add(len)
            }
            Operand::VarBytes { max } => {
                let mut rest = script
                    .get(start..)
                    .ok_or(VmError::MalformedOperand("missing length prefix"))?;
                let before = rest.len();
                let len = crate::types::encoding::read_len(&mut rest, max)
                    .map_err(|_| VmError::MalformedOperand("invalid var-int length"))?;
                let data = start + (before - rest.len());
                data..data + len
            }
        };

        if operand.end > script.len() {
            return Err(VmError::MalformedOperand("operand runs past end of script"));
        }

        Ok(Instruction {
            opcode,
            position,
            end: operand.end,
            operand,
            script: script.clone(),
        })
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Offset of the opcode byte in its script.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Offset of the next instruction.
    pub fn next_position(&self) -> usize {
        self.end
    }

    /// Operand payload (without any length prefix).
    pub fn operand(&self) -> &[u8] {
        self.script.get(self.operand.clone()).unwrap_or(&[])
    }

    /// Reads a fixed-size operand or a fixed-size prefix of it.
    pub fn operand_array<const N: usize>(&self) -> Result<[u8; N], VmError> {
        self.operand()
            .get(..N)
            .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
            .ok_or(VmError::MalformedOperand("operand too short"))
    }

    /// The first two operand bytes as a signed jump offset.
    pub fn offset_i16(&self) -> Result<i16, VmError> {
        self.operand_array::<2>().map(i16::from_le_bytes)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: {}", self.position, self.opcode)?;
        if !self.operand().is_empty() {
            write!(f, " 0x{}", hex::encode(self.operand()))?;
        }
        Ok(())
    }
}
