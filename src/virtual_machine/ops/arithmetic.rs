//! Integer arithmetic and comparison.
//!
//! Operands and results are bounded by `max_integer_size` bytes.
//! Comparisons and boolean operators push `Boolean` items.

use super::{pop_integer, push, push_integer};
use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::instruction::Instruction;
use crate::virtual_machine::state::VmState;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

macro_rules! unary_op {
    ($name:ident, |$x:ident| $body:expr) => {
        pub(super) fn $name(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
            let $x = pop_integer(engine)?;
            push_integer(engine, $body)
        }
    };
}

macro_rules! binary_op {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        pub(super) fn $name(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
            let $b = pop_integer(engine)?;
            let $a = pop_integer(engine)?;
            push_integer(engine, $body)
        }
    };
}

macro_rules! compare_op {
    ($name:ident, $op:tt) => {
        pub(super) fn $name(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
            let b = pop_integer(engine)?;
            let a = pop_integer(engine)?;
            push(engine, a $op b)
        }
    };
}

unary_op!(inc, |x| x + 1);
unary_op!(dec, |x| x - 1);
unary_op!(sign, |x| x.signum());
unary_op!(negate, |x| -x);
unary_op!(abs, |x| x.abs());

binary_op!(add, |a, b| a + b);
binary_op!(sub, |a, b| a - b);
binary_op!(mul, |a, b| a * b);
binary_op!(min, |a, b| a.min(b));
binary_op!(max, |a, b| a.max(b));

compare_op!(num_equal, ==);
compare_op!(num_not_equal, !=);
compare_op!(lt, <);
compare_op!(gt, >);
compare_op!(lte, <=);
compare_op!(gte, >=);

pub(super) fn not(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let x = engine.estack_mut()?.pop_bool()?;
    push(engine, !x)
}

pub(super) fn nz(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let x = pop_integer(engine)?;
    push(engine, !x.is_zero())
}

pub(super) fn bool_and(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    let b = estack.pop_bool()?;
    let a = estack.pop_bool()?;
    push(engine, a && b)
}

pub(super) fn bool_or(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let estack = engine.estack_mut()?;
    let b = estack.pop_bool()?;
    let a = estack.pop_bool()?;
    push(engine, a || b)
}

/// Truncating division; the remainder takes the dividend's sign.
fn divide(engine: &mut ExecutionEngine, f: fn(BigInt, BigInt) -> BigInt) -> Result<VmState, VmError> {
    let b = pop_integer(engine)?;
    let a = pop_integer(engine)?;
    if b.is_zero() {
        return Err(VmError::DivisionByZero);
    }
    push_integer(engine, f(a, b))
}

pub(super) fn div(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    divide(engine, |a, b| a / b)
}

pub(super) fn modulo(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    divide(engine, |a, b| a % b)
}

/// Pops a shift amount. `None` means the shift is zero and the operand
/// stays on the stack untouched.
fn pop_shift(engine: &mut ExecutionEngine) -> Result<Option<i64>, VmError> {
    let shift = pop_integer(engine)?;
    let max = engine.config().max_shift;
    match shift.to_i64() {
        Some(0) => Ok(None),
        Some(n) if n.unsigned_abs() <= max.unsigned_abs() => Ok(Some(n)),
        Some(n) => Err(VmError::InvalidShift(n)),
        None => Err(VmError::InvalidShift(if shift.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        })),
    }
}

fn shift_left(x: BigInt, n: i64) -> BigInt {
    if n >= 0 {
        x << n.unsigned_abs()
    } else {
        x >> n.unsigned_abs()
    }
}

pub(super) fn shl(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let Some(n) = pop_shift(engine)? else {
        return Ok(VmState::None);
    };
    let x = pop_integer(engine)?;
    push_integer(engine, shift_left(x, n))
}

pub(super) fn shr(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let Some(n) = pop_shift(engine)? else {
        return Ok(VmState::None);
    };
    let x = pop_integer(engine)?;
    push_integer(engine, shift_left(x, -n))
}

/// WITHIN x a b pushes `a <= x < b`.
pub(super) fn within(_: &Instruction, engine: &mut ExecutionEngine) -> Result<VmState, VmError> {
    let b = pop_integer(engine)?;
    let a = pop_integer(engine)?;
    let x = pop_integer(engine)?;
    push(engine, a <= x && x < b)
}
