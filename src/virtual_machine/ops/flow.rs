use crate::types::hash::UInt160;
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::evaluation_stack::EvaluationStack;
use crate::virtual_machine::execution_context::{ExecutionContext, RETURN_ALL};
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::state::VmState;
use crate::debug;

pub(super) fn nop(_: &Instruction, _: &mut ExecutionEngine) -> Result<VmState, VmError> {
    Ok(VmState::None)
}

/// JMP, JMPIF and JMPIFNOT. The target is validated even when the branch is
/// not taken.
pub(super) fn jmp(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let offset = instr.offset_i16()?;
    let ctx = engine.current_context_mut()?;
    ctx.jump_target(instr.position(), offset)?;
    let taken = match instr.opcode() {
        OpCode::JmpIf => ctx.estack_mut().pop_bool()?,
        OpCode::JmpIfNot => !ctx.estack_mut().pop_bool()?,
        _ => true,
    };
    if taken {
        ctx.jump(instr.position(), offset)?;
    }
    Ok(VmState::None)
}

pub(super) fn call(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let offset = instr.offset_i16()?;
    let ctx = engine.current_context()?;
    let mut callee = ExecutionContext::new(ctx.script().clone(), RETURN_ALL);
    callee.jump(instr.position(), offset)?;
    enter(engine, callee, None)
}

/// CALL_I rvcount pcount offset.
pub(super) fn call_i(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let [rvcount, pcount, lo, hi] = instr.operand_array::<4>()?;
    let offset = i16::from_le_bytes([lo, hi]);
    let ctx = engine.current_context()?;
    let mut callee = ExecutionContext::new(ctx.script().clone(), i32::from(rvcount));
    callee.jump(instr.position(), offset)?;
    enter(engine, callee, Some(usize::from(pcount)))
}

/// Pushes `callee`, moving `count` items (or the whole stack) into it.
fn enter(
    engine: &mut ExecutionEngine,
    mut callee: ExecutionContext,
    count: Option<usize>,
) -> Result<VmState, VmError> {
    let frames = engine.invocation_stack();
    if frames.len() >= frames.max_depth() {
        return Err(VmError::CallStackOverflow {
            max: frames.max_depth(),
        });
    }
    let caller = engine.estack_mut()?;
    match count {
        Some(n) => caller.move_to(callee.estack_mut(), n)?,
        None => caller.move_all_to(callee.estack_mut()),
    }
    engine.invocation_stack_mut().push(callee)?;
    Ok(VmState::None)
}

pub(super) fn ret(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let mut frame = engine
        .invocation_stack_mut()
        .pop()
        .ok_or(VmError::NoContext)?;

    if engine.invocation_stack().is_empty() {
        return_values(&mut frame, engine.result_stack_mut())?;
        return Ok(VmState::Halt);
    }

    let caller = engine.current_context_mut()?;
    return_values(&mut frame, caller.estack_mut())?;
    if frame.rvcount() == RETURN_ALL {
        frame.altstack_mut().move_all_to(caller.altstack_mut());
    }
    Ok(VmState::None)
}

fn return_values(frame: &mut ExecutionContext, target: &mut EvaluationStack) -> Result<(), VmError> {
    let count = match usize::try_from(frame.rvcount()) {
        Ok(n) => n,
        Err(_) => frame.estack().len(),
    };
    frame.estack_mut().move_to(target, count)
}

/// APPCALL and TAILCALL.
pub(super) fn app_call(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let operand = instr.operand_array::<20>()?;
    let hash = if operand.iter().all(|&b| b == 0) {
        let bytes = engine.estack_mut()?.pop_bytes()?;
        UInt160::from_slice(&bytes).ok_or(VmError::InvalidArgument("script hash must be 20 bytes"))?
    } else {
        UInt160(operand)
    };

    let script = engine
        .script_table()?
        .script(&hash)
        .ok_or(VmError::UnknownScript(hash))?;
    debug!("{} {hash} ({} bytes)", instr.opcode(), script.len());

    let callee = ExecutionContext::new(script, RETURN_ALL);
    if instr.opcode() == OpCode::TailCall {
        let mut caller = engine
            .invocation_stack_mut()
            .pop()
            .ok_or(VmError::NoContext)?;
        let mut callee = callee;
        caller.estack_mut().move_all_to(callee.estack_mut());
        engine.invocation_stack_mut().push(callee)?;
        return Ok(VmState::None);
    }
    enter(engine, callee, None)
}

pub(super) fn syscall(instr: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let name = std::str::from_utf8(instr.operand())
        .map_err(|_| VmError::MalformedOperand("interop name is not utf-8"))?;
    let callable = engine
        .interop()
        .get(name)
        .ok_or_else(|| VmError::UnknownInterop(name.to_string()))?;
    callable(engine)?;
    Ok(VmState::None)
}
