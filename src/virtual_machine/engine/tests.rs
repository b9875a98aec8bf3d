use super::*;
use crate::types::hash::hash160;
use crate::virtual_machine::errors::ErrorKind;
use crate::virtual_machine::interop;
use crate::virtual_machine::script_builder::ScriptBuilder;
use crate::virtual_machine::stack_item::StackItem;
use num_bigint::BigInt;

fn build(f: impl FnOnce(&mut ScriptBuilder)) -> Vec<u8> {
    let mut sb = ScriptBuilder::new();
    f(&mut sb);
    sb.as_slice().to_vec()
}

fn load_with(config: EngineConfig, script: &[u8]) -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(config);
    engine.load_script(script).unwrap();
    engine
}

fn run_with(config: EngineConfig, script: &[u8]) -> ExecutionEngine {
    let mut engine = load_with(config, script);
    engine.execute();
    engine
}

fn run_vm(script: &[u8]) -> ExecutionEngine {
    run_with(EngineConfig::default(), script)
}

/// Results from bottom to top.
fn results(engine: &ExecutionEngine) -> Vec<StackItem> {
    let mut items: Vec<StackItem> = engine.result_stack().iter().cloned().collect();
    items.reverse();
    items
}

fn run_halt(script: &[u8]) -> Vec<StackItem> {
    let engine = run_vm(script);
    assert_eq!(engine.state(), VmState::Halt, "fault: {:?}", engine.fault());
    results(&engine)
}

fn run_ints(script: &[u8]) -> Vec<i64> {
    run_halt(script)
        .iter()
        .map(|item| i64::try_from(item.to_integer().unwrap()).unwrap())
        .collect()
}

fn run_bytes(script: &[u8]) -> Vec<u8> {
    let results = run_halt(script);
    assert_eq!(results.len(), 1);
    results[0].to_bytes().unwrap().to_vec()
}

fn expect_fault(engine: &ExecutionEngine) -> Fault {
    assert_eq!(engine.state(), VmState::Fault);
    engine.fault().cloned().expect("fault recorded")
}

fn run_expect_err(script: &[u8]) -> Fault {
    expect_fault(&run_vm(script))
}

// ==================== States ====================

#[test]
fn push_then_throw_if_not_halts() {
    let engine = run_vm(&[0x51, 0xF1]);
    assert_eq!(engine.state(), VmState::Halt);
    assert!(engine.result_stack().is_empty());
    assert!(engine.invocation_stack().is_empty());
    assert_eq!(engine.instructions_executed(), 3);
}

#[test]
fn throw_if_not_on_false_faults_after_popping() {
    let engine = run_vm(&[0x00, 0xF1]);
    let fault = expect_fault(&engine);
    assert_eq!(fault.error, VmError::LogicalFailure("THROWIFNOT"));
    assert_eq!(fault.opcode, Some(OpCode::ThrowIfNot));
    assert_eq!(fault.ip, 1);
    assert_eq!(fault.kind(), ErrorKind::LogicalFailure);
    assert!(engine.current_context().unwrap().estack().is_empty());
}

#[test]
fn throw_always_faults() {
    assert_eq!(run_expect_err(&[0xF0]).error, VmError::LogicalFailure("THROW"));
}

#[test]
fn empty_script_and_empty_engine_halt() {
    assert!(run_halt(&[]).is_empty());
    let mut engine = ExecutionEngine::default();
    assert_eq!(engine.execute(), VmState::Halt);
}

#[test]
fn terminal_states_are_absorbing() {
    let mut engine = run_vm(&[0x51]);
    assert_eq!(engine.state(), VmState::Halt);
    let executed = engine.instructions_executed();
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(engine.step_into(), VmState::Halt);
    assert_eq!(engine.instructions_executed(), executed);

    let mut engine = run_vm(&[0x75]);
    assert_eq!(engine.execute(), VmState::Fault);
    assert_eq!(engine.step_over(), VmState::Fault);
    assert_eq!(engine.step_out(), VmState::Fault);
}

#[test]
fn loading_after_termination_is_rejected() {
    let mut engine = run_vm(&[0x51]);
    assert_eq!(
        engine.load_script(&[0x52, 0x53][..]).err(),
        Some(VmError::EngineStopped(VmState::Halt))
    );
    assert_eq!(engine.state(), VmState::Halt);
    assert!(engine.invocation_stack().is_empty());
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(results(&engine), vec![StackItem::from(1i64)]);

    let mut engine = run_vm(&[0x75]);
    let err = engine.load_script(&[0x51][..]).err().unwrap();
    assert_eq!(err, VmError::EngineStopped(VmState::Fault));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(engine.state(), VmState::Fault);
}

#[test]
fn pop_from_empty_stack_underflows() {
    let fault = run_expect_err(&[0x75]);
    assert_eq!(fault.error, VmError::StackUnderflow { needed: 1, depth: 0 });
    assert_eq!(fault.kind(), ErrorKind::StackUnderflow);
}

#[test]
fn unassigned_opcode_faults_without_opcode() {
    let fault = run_expect_err(&[0x51, 0xFF]);
    assert_eq!(fault.error, VmError::InvalidOpcode(0xFF));
    assert_eq!(fault.opcode, None);
    assert_eq!(fault.ip, 1);
}

#[test]
fn truncated_operand_is_malformed() {
    let fault = run_expect_err(&[0x03, 0x01]);
    assert_eq!(fault.opcode, Some(OpCode::PushBytes3));
    assert_eq!(fault.kind(), ErrorKind::MalformedOperand);
}

#[test]
fn instruction_budget() {
    let config = EngineConfig {
        max_instructions: Some(3),
        ..EngineConfig::default()
    };
    // JMP 0 loops forever.
    let engine = run_with(config, &[0x62, 0x00, 0x00]);
    let fault = expect_fault(&engine);
    assert_eq!(fault.error, VmError::InstructionBudgetExceeded { limit: 3 });
    assert_eq!(engine.instructions_executed(), 3);
}

#[test]
fn stack_size_limit() {
    let config = EngineConfig {
        max_stack_size: 4,
        ..EngineConfig::default()
    };
    let fault = expect_fault(&run_with(config, &[0x51; 5]));
    assert_eq!(fault.error, VmError::StackSizeExceeded { size: 5, max: 4 });
    assert_eq!(fault.kind(), ErrorKind::ResourceLimitExceeded);
}

#[test]
fn nested_items_count_toward_stack_size() {
    // PUSH1 PUSH2 PUSH2 PACK DUP: two slots sharing a two-element array.
    let script = [0x51u8, 0x52, 0x52, 0xC1, 0x76];
    let engine = run_vm(&script);
    assert_eq!(engine.state(), VmState::Halt);
    assert_eq!(engine.stack_size(), 4);

    let config = EngineConfig {
        max_stack_size: 3,
        ..EngineConfig::default()
    };
    let fault = expect_fault(&run_with(config, &script));
    assert_eq!(fault.error, VmError::StackSizeExceeded { size: 4, max: 3 });
    assert_eq!(fault.opcode, Some(OpCode::Dup));
}

#[test]
fn deep_nesting_hits_stack_size_limit() {
    // Wraps the array in another one-element array on every iteration.
    let script = build(|sb| {
        sb.emit_push_int(0)
            .emit(OpCode::NewArray)
            .emit_push_int(100_000);
        let loop_start = sb.len();
        sb.emit(OpCode::Swap)
            .emit_push_int(1)
            .emit(OpCode::Pack)
            .emit(OpCode::Swap)
            .emit(OpCode::Dec)
            .emit(OpCode::Dup);
        let offset = loop_start as i16 - sb.len() as i16;
        sb.emit_jump(OpCode::JmpIf, offset).unwrap();
    });
    let engine = run_vm(&script);
    let fault = expect_fault(&engine);
    assert_eq!(fault.kind(), ErrorKind::ResourceLimitExceeded);
    assert!(matches!(
        fault.error,
        VmError::StackSizeExceeded { max: 2048, .. }
    ));
    assert!(engine.instructions_executed() < 20_000);
    drop(engine);
}

// ==================== Push ====================

#[test]
fn push_constants() {
    assert_eq!(run_ints(&[0x4F, 0x00, 0x51, 0x60]), vec![-1, 0, 1, 16]);
    assert!(run_halt(&[0x00])[0].to_bytes().unwrap().is_empty());
    assert_eq!(run_bytes(&[0x02, 0xAB, 0xCD]), vec![0xAB, 0xCD]);
    assert_eq!(run_bytes(&[0x4C, 0x01, 0x7F]), vec![0x7F]);
}

#[test]
fn push_data_respects_item_limit() {
    let config = EngineConfig {
        max_item_size: 2,
        ..EngineConfig::default()
    };
    let fault = expect_fault(&run_with(config, &[0x4C, 0x03, 1, 2, 3]));
    assert_eq!(fault.error, VmError::ItemTooLarge { size: 3, max: 2 });
}

// ==================== Flow control ====================

#[test]
fn jmpif_branches_on_popped_condition() {
    // 0: PUSHx, 1: JMPIF +4, 4: PUSH2, 5: PUSH3
    assert_eq!(run_ints(&[0x51, 0x63, 0x04, 0x00, 0x52, 0x53]), vec![3]);
    assert_eq!(run_ints(&[0x00, 0x63, 0x04, 0x00, 0x52, 0x53]), vec![2, 3]);
    assert_eq!(run_ints(&[0x00, 0x64, 0x04, 0x00, 0x52, 0x53]), vec![3]);
}

#[test]
fn jump_to_script_end_is_implicit_ret() {
    assert!(run_halt(&[0x62, 0x03, 0x00]).is_empty());
}

#[test]
fn jump_out_of_range_faults() {
    let fault = run_expect_err(&[0x62, 0x04, 0x00]);
    assert_eq!(fault.error, VmError::JumpOutOfRange { target: 4, len: 3 });
    assert_eq!(fault.kind(), ErrorKind::MalformedOperand);

    let fault = run_expect_err(&[0x62, 0xFF, 0xFF]);
    assert_eq!(fault.error, VmError::JumpOutOfRange { target: -1, len: 3 });

    // Checked even when the branch is not taken.
    let fault = run_expect_err(&[0x00, 0x63, 0x10, 0x00]);
    assert_eq!(fault.kind(), ErrorKind::MalformedOperand);
}

/// 0: PUSH2, 1: CALL +4, 4: RET, 5: PUSH3, 6: ADD, 7: RET
const CALL_SCRIPT: [u8; 8] = [0x52, 0x65, 0x04, 0x00, 0x66, 0x53, 0x93, 0x66];

#[test]
fn call_moves_stack_and_returns_everything() {
    assert_eq!(run_ints(&CALL_SCRIPT), vec![5]);
}

#[test]
fn call_recursion_overflows_invocation_stack() {
    let config = EngineConfig {
        max_invocation_depth: 16,
        ..EngineConfig::default()
    };
    let engine = run_with(config, &[0x65, 0x00, 0x00]);
    let fault = expect_fault(&engine);
    assert_eq!(fault.error, VmError::CallStackOverflow { max: 16 });
    assert_eq!(fault.kind(), ErrorKind::CallStackOverflow);
    assert_eq!(engine.invocation_stack().len(), 16);
}

#[test]
fn call_i_moves_parameters_and_return_count() {
    // 0: PUSH1, 1: PUSH2, 2: CALL_I 1 1 +7, 7: ADD, 8: RET,
    // 9: PUSH10, 10: ADD, 11: RET
    let script = [
        0x51, 0x52, 0xE0, 0x01, 0x01, 0x07, 0x00, 0x93, 0x66, 0x5A, 0x93, 0x66,
    ];
    assert_eq!(run_ints(&script), vec![13]);
}

#[test]
fn ret_with_too_few_values_underflows() {
    // CALL_I expecting two results from a callee that leaves one.
    let script = [0x51, 0xE0, 0x02, 0x01, 0x06, 0x00, 0x66];
    let fault = run_expect_err(&script);
    assert_eq!(fault.error, VmError::StackUnderflow { needed: 2, depth: 1 });
    assert_eq!(fault.opcode, Some(OpCode::Ret));
}

#[test]
fn ret_moves_alt_stack_to_caller() {
    // 0: CALL +5, 3: FROMALTSTACK, 4: RET, 5: PUSH1, 6: TOALTSTACK, 7: RET
    let script = [0x65, 0x05, 0x00, 0x6C, 0x66, 0x51, 0x6B, 0x66];
    assert_eq!(run_ints(&script), vec![1]);
}

#[test]
fn later_loaded_script_returns_into_earlier_one() {
    let mut engine = ExecutionEngine::default();
    engine.load_script(&[0x93][..]).unwrap();
    engine.load_script(&[0x52, 0x53][..]).unwrap();
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(engine.result_stack().peek(0).unwrap(), &StackItem::from(5i64));
}

// ==================== Debugging ====================

#[test]
fn breakpoint_pauses_and_execute_resumes() {
    let mut engine = load_with(EngineConfig::default(), &CALL_SCRIPT);
    let hash = hash160(&CALL_SCRIPT);
    engine.add_breakpoint(hash, 5);

    assert_eq!(engine.execute(), VmState::Break);
    assert_eq!(engine.invocation_stack().len(), 2);
    assert_eq!(engine.current_context().unwrap().ip(), 5);

    assert!(engine.remove_breakpoint(&hash, 5));
    assert!(!engine.remove_breakpoint(&hash, 5));
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(results(&engine), vec![StackItem::from(5i64)]);
}

#[test]
fn step_over_runs_calls_as_one_step() {
    let mut engine = load_with(EngineConfig::default(), &CALL_SCRIPT);
    assert_eq!(engine.step_into(), VmState::None);
    assert_eq!(engine.step_over(), VmState::Break);
    let ctx = engine.current_context().unwrap();
    assert_eq!(ctx.ip(), 4);
    assert_eq!(ctx.estack().peek(0).unwrap(), &StackItem::from(5i64));
    assert_eq!(engine.invocation_stack().len(), 1);
    assert_eq!(engine.step_into(), VmState::Halt);
}

#[test]
fn step_out_finishes_current_frame() {
    let mut engine = load_with(EngineConfig::default(), &CALL_SCRIPT);
    engine.step_into();
    engine.step_into();
    assert_eq!(engine.invocation_stack().len(), 2);
    assert_eq!(engine.step_out(), VmState::Break);
    assert_eq!(engine.invocation_stack().len(), 1);
    assert_eq!(engine.current_context().unwrap().ip(), 4);
    assert_eq!(engine.execute(), VmState::Halt);
}

// ==================== Stack ====================

#[test]
fn stack_shuffles() {
    let base = [0x51, 0x52, 0x53];
    let with = |ops: &[u8]| -> Vec<i64> {
        let mut script = base.to_vec();
        script.extend_from_slice(ops);
        run_ints(&script)
    };
    assert_eq!(with(&[0x75]), vec![1, 2]);
    assert_eq!(with(&[0x76]), vec![1, 2, 3, 3]);
    assert_eq!(with(&[0x77]), vec![1, 3]);
    assert_eq!(with(&[0x78]), vec![1, 2, 3, 2]);
    assert_eq!(with(&[0x7B]), vec![2, 3, 1]);
    assert_eq!(with(&[0x7C]), vec![1, 3, 2]);
    assert_eq!(with(&[0x7D]), vec![1, 3, 2, 3]);
    assert_eq!(with(&[0x74]), vec![1, 2, 3, 3]);
    assert_eq!(with(&[0x52, 0x79]), vec![1, 2, 3, 1]);
    assert_eq!(with(&[0x52, 0x7A]), vec![2, 3, 1]);
    assert_eq!(with(&[0x00, 0x7A]), vec![1, 2, 3]);
    assert_eq!(with(&[0x52, 0x72]), vec![3, 2, 1]);
    assert_eq!(with(&[0x00, 0x72]), vec![1, 2, 3]);
    assert_eq!(with(&[0x52, 0x73]), vec![1, 3, 2, 3]);
    assert_eq!(with(&[0x52, 0x6D]), vec![2, 3]);
}

#[test]
fn indexed_shuffles_reject_bad_counts() {
    assert_eq!(
        run_expect_err(&[0x51, 0x00, 0x73]).error,
        VmError::InvalidCount(0)
    );
    assert_eq!(
        run_expect_err(&[0x51, 0x4F, 0x79]).kind(),
        ErrorKind::IndexOutOfRange
    );
    assert_eq!(
        run_expect_err(&[0x51, 0x53, 0x79]).kind(),
        ErrorKind::StackUnderflow
    );
}

#[test]
fn alt_stack_round_trip() {
    // PUSH1 TOALTSTACK DUPFROMALTSTACK FROMALTSTACK
    assert_eq!(run_ints(&[0x51, 0x6B, 0x6A, 0x6C]), vec![1, 1]);
    assert_eq!(run_expect_err(&[0x6C]).kind(), ErrorKind::StackUnderflow);
}

// ==================== Splice ====================

#[test]
fn cat_and_size() {
    let script = build(|sb| {
        sb.emit_push_bytes(b"ab").emit_push_bytes(b"c").emit(OpCode::Cat);
    });
    assert_eq!(run_bytes(&script), b"abc");

    let script = build(|sb| {
        sb.emit_push_bytes(b"abc").emit(OpCode::Size);
    });
    assert_eq!(run_ints(&script), vec![3]);
}

#[test]
fn cat_respects_item_limit() {
    let config = EngineConfig {
        max_item_size: 4,
        ..EngineConfig::default()
    };
    let script = build(|sb| {
        sb.emit_push_bytes(b"abc").emit_push_bytes(b"de").emit(OpCode::Cat);
    });
    let fault = expect_fault(&run_with(config, &script));
    assert_eq!(fault.error, VmError::ItemTooLarge { size: 5, max: 4 });
}

fn substr(data: &[u8], index: i64, count: i64) -> Vec<u8> {
    let script = build(|sb| {
        sb.emit_push_bytes(data)
            .emit_push_int(index)
            .emit_push_int(count)
            .emit(OpCode::SubStr);
    });
    run_bytes(&script)
}

#[test]
fn substr_truncates_past_end() {
    assert_eq!(substr(b"abcdef", 1, 3), b"bcd");
    assert_eq!(substr(b"abcdef", 4, 10), b"ef");
    assert!(substr(b"abcdef", 10, 2).is_empty());
    assert!(substr(b"abcdef", 2, 0).is_empty());
}

#[test]
fn substr_rejects_negative_arguments() {
    let script = build(|sb| {
        sb.emit_push_bytes(b"abc").emit_push_int(0).emit_push_int(-1).emit(OpCode::SubStr);
    });
    let fault = run_expect_err(&script);
    assert_eq!(fault.error, VmError::InvalidCount(-1));
    assert_eq!(fault.kind(), ErrorKind::IndexOutOfRange);
}

#[test]
fn left_and_right() {
    let slice = |op: OpCode, count: i64| {
        build(|sb| {
            sb.emit_push_bytes(b"abc").emit_push_int(count).emit(op);
        })
    };
    assert_eq!(run_bytes(&slice(OpCode::Left, 2)), b"ab");
    assert_eq!(run_bytes(&slice(OpCode::Left, 5)), b"abc");
    assert_eq!(run_bytes(&slice(OpCode::Right, 2)), b"bc");
    assert_eq!(run_bytes(&slice(OpCode::Right, 3)), b"abc");
    assert_eq!(
        run_expect_err(&slice(OpCode::Right, 4)).error,
        VmError::IndexOutOfRange { index: 4, len: 3 }
    );
}

// ==================== Bitwise and arithmetic ====================

fn binary(a: i64, b: i64, op: OpCode) -> Vec<StackItem> {
    run_halt(&build(|sb| {
        sb.emit_push_int(a).emit_push_int(b).emit(op);
    }))
}

fn binary_int(a: i64, b: i64, op: OpCode) -> i64 {
    i64::try_from(binary(a, b, op)[0].to_integer().unwrap()).unwrap()
}

fn binary_bool(a: i64, b: i64, op: OpCode) -> bool {
    binary(a, b, op)[0].to_bool()
}

fn unary_int(x: i64, op: OpCode) -> i64 {
    run_ints(&build(|sb| {
        sb.emit_push_int(x).emit(op);
    }))[0]
}

#[test]
fn bitwise_ops() {
    assert_eq!(binary_int(12, 10, OpCode::And), 8);
    assert_eq!(binary_int(12, 10, OpCode::Or), 14);
    assert_eq!(binary_int(12, 10, OpCode::Xor), 6);
    assert_eq!(binary_int(-1, 0x7F, OpCode::And), 0x7F);
    assert_eq!(unary_int(0, OpCode::Invert), -1);
    assert_eq!(unary_int(5, OpCode::Invert), -6);
}

#[test]
fn equal_compares_across_primitive_variants() {
    let script = build(|sb| {
        sb.emit_push_int(1).emit_push_bytes(&[1]).emit(OpCode::Equal);
    });
    assert_eq!(run_halt(&script), vec![StackItem::Boolean(true)]);
    assert!(!binary_bool(1, 2, OpCode::Equal));
}

#[test]
fn arithmetic_ops() {
    assert_eq!(binary_int(2, 3, OpCode::Add), 5);
    assert_eq!(binary_int(2, 3, OpCode::Sub), -1);
    assert_eq!(binary_int(-4, 3, OpCode::Mul), -12);
    assert_eq!(binary_int(7, 2, OpCode::Div), 3);
    assert_eq!(binary_int(-7, 2, OpCode::Div), -3);
    assert_eq!(binary_int(-7, 2, OpCode::Mod), -1);
    assert_eq!(binary_int(7, -2, OpCode::Mod), 1);
    assert_eq!(binary_int(4, 9, OpCode::Min), 4);
    assert_eq!(binary_int(4, 9, OpCode::Max), 9);
    assert_eq!(unary_int(5, OpCode::Inc), 6);
    assert_eq!(unary_int(0, OpCode::Dec), -1);
    assert_eq!(unary_int(-7, OpCode::Sign), -1);
    assert_eq!(unary_int(0, OpCode::Sign), 0);
    assert_eq!(unary_int(3, OpCode::Negate), -3);
    assert_eq!(unary_int(-4, OpCode::Abs), 4);
}

#[test]
fn boolean_and_comparison_ops() {
    assert!(binary_bool(2, 3, OpCode::Lt));
    assert!(!binary_bool(2, 3, OpCode::Gt));
    assert!(binary_bool(3, 3, OpCode::Lte));
    assert!(binary_bool(3, 3, OpCode::Gte));
    assert!(binary_bool(3, 3, OpCode::NumEqual));
    assert!(binary_bool(3, 4, OpCode::NumNotEqual));
    assert!(binary_bool(1, 0, OpCode::BoolOr));
    assert!(!binary_bool(1, 0, OpCode::BoolAnd));
    assert_eq!(run_halt(&[0x00, 0x91]), vec![StackItem::Boolean(true)]);
    assert_eq!(run_halt(&[0x00, 0x92]), vec![StackItem::Boolean(false)]);
}

#[test]
fn within_is_half_open() {
    let within = |x: i64| {
        run_halt(&build(|sb| {
            sb.emit_push_int(x)
                .emit_push_int(1)
                .emit_push_int(10)
                .emit(OpCode::Within);
        }))[0]
            .to_bool()
    };
    assert!(within(1));
    assert!(within(9));
    assert!(!within(10));
    assert!(!within(0));
}

#[test]
fn division_by_zero_faults() {
    let fault = run_expect_err(&[0x51, 0x00, 0x96]);
    assert_eq!(fault.error, VmError::DivisionByZero);
    assert_eq!(run_expect_err(&[0x51, 0x00, 0x97]).error, VmError::DivisionByZero);
}

#[test]
fn integer_size_limits() {
    // 33-byte operand.
    let script = build(|sb| {
        sb.emit_push_bytes(&[1; 33]).emit_push_int(1).emit(OpCode::Add);
    });
    assert_eq!(
        run_expect_err(&script).error,
        VmError::IntegerTooLarge { size: 33, max: 32 }
    );

    // 2^255 - 1 + 1 needs 33 bytes.
    let mut max = vec![0xFF; 31];
    max.push(0x7F);
    let script = build(|sb| {
        sb.emit_push_bytes(&max).emit_push_int(1).emit(OpCode::Add);
    });
    assert_eq!(run_expect_err(&script).kind(), ErrorKind::IntegerOverflow);

    let script = build(|sb| {
        sb.emit_push_bytes(&max).emit_push_int(1).emit(OpCode::Sub);
    });
    assert_eq!(run_halt(&script).len(), 1);
}

#[test]
fn shifts() {
    assert_eq!(binary_int(1, 8, OpCode::Shl), 256);
    assert_eq!(binary_int(256, 8, OpCode::Shr), 1);
    assert_eq!(binary_int(1, -1, OpCode::Shl), 0);
    assert_eq!(binary_int(1, -3, OpCode::Shr), 8);
    assert_eq!(binary_int(-8, 1, OpCode::Shr), -4);
    assert_eq!(binary_int(5, 0, OpCode::Shl), 5);
}

#[test]
fn zero_shift_leaves_operand_untouched() {
    // Nothing below the shift amount; the operand is never popped.
    assert!(run_halt(&[0x00, 0x98]).is_empty());
    assert!(run_halt(&[0x00, 0x99]).is_empty());
}

#[test]
fn shift_out_of_range_faults() {
    let script = build(|sb| {
        sb.emit_push_int(1).emit_push_int(257).emit(OpCode::Shl);
    });
    let fault = run_expect_err(&script);
    assert_eq!(fault.error, VmError::InvalidShift(257));
    assert_eq!(fault.kind(), ErrorKind::InvalidShift);
}

// ==================== Arrays, structs and maps ====================

#[test]
fn pack_puts_top_item_first() {
    let script = build(|sb| {
        sb.emit_push_int(3)
            .emit_push_int(2)
            .emit_push_int(1)
            .emit_push_int(3)
            .emit(OpCode::Pack)
            .emit(OpCode::Dup)
            .emit_push_int(0)
            .emit(OpCode::PickItem)
            .emit(OpCode::Swap)
            .emit(OpCode::Unpack);
    });
    assert_eq!(run_ints(&script), vec![1, 3, 2, 1, 3]);
}

#[test]
fn pack_checks_depth_and_size() {
    assert_eq!(
        run_expect_err(&[0x51, 0x53, 0xC1]).error,
        VmError::StackUnderflow { needed: 3, depth: 1 }
    );
    let config = EngineConfig {
        max_array_size: 4,
        ..EngineConfig::default()
    };
    let fault = expect_fault(&run_with(config, &[0x55, 0xC5]));
    assert_eq!(fault.error, VmError::ArrayTooLarge { size: 5, max: 4 });
}

#[test]
fn array_size_of_containers_and_bytes() {
    assert_eq!(run_ints(&[0x51, 0x52, 0x52, 0xC1, 0xC0]), vec![2]);
    let script = build(|sb| {
        sb.emit_push_bytes(b"abc").emit(OpCode::ArraySize);
    });
    assert_eq!(run_ints(&script), vec![3]);
}

#[test]
fn new_array_is_filled_with_false_and_settable() {
    let script = build(|sb| {
        sb.emit_push_int(2)
            .emit(OpCode::NewArray)
            .emit(OpCode::Dup)
            .emit_push_int(0)
            .emit_push_int(5)
            .emit(OpCode::SetItem);
    });
    let results = run_halt(&script);
    let items = results[0].as_array().unwrap().borrow();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], StackItem::from(5i64));
    assert!(matches!(items[1], StackItem::Boolean(false)));
}

#[test]
fn new_struct_converts_arrays() {
    let results = run_halt(&[0x51, 0x51, 0xC1, 0xC6]);
    assert_eq!(results[0].type_name(), "Struct");
    let results = run_halt(&[0x51, 0xC6, 0xC5]);
    assert_eq!(results[0].type_name(), "Array");
    assert_eq!(results[0].as_array().unwrap().borrow().len(), 1);
}

#[test]
fn append_copies_structs() {
    let script = build(|sb| {
        sb.emit_push_int(0)
            .emit(OpCode::NewArray)
            .emit_push_int(0)
            .emit(OpCode::NewStruct)
            .emit(OpCode::Over)
            .emit(OpCode::Over)
            .emit(OpCode::Append)
            .emit_push_int(7)
            .emit(OpCode::Append);
    });
    let results = run_halt(&script);
    assert_eq!(results.len(), 1);
    let array = results[0].as_array().unwrap().borrow();
    assert_eq!(array.len(), 1);
    assert_eq!(array[0].type_name(), "Struct");
    assert!(array[0].as_array().unwrap().borrow().is_empty());
}

#[test]
fn reverse_and_remove_mutate_shared_array() {
    let script = build(|sb| {
        sb.emit_push_int(1)
            .emit_push_int(2)
            .emit_push_int(3)
            .emit_push_int(3)
            .emit(OpCode::Pack)
            .emit(OpCode::Dup)
            .emit(OpCode::Reverse)
            .emit(OpCode::Dup)
            .emit_push_int(0)
            .emit(OpCode::Remove)
            .emit(OpCode::Unpack)
            .emit(OpCode::Drop);
    });
    assert_eq!(run_ints(&script), vec![3, 2]);
}

#[test]
fn has_key_on_arrays() {
    let script = build(|sb| {
        sb.emit_push_int(1)
            .emit_push_int(1)
            .emit(OpCode::Pack)
            .emit(OpCode::Dup)
            .emit_push_int(0)
            .emit(OpCode::HasKey)
            .emit(OpCode::Swap)
            .emit_push_int(1)
            .emit(OpCode::HasKey);
    });
    assert_eq!(
        run_halt(&script),
        vec![StackItem::Boolean(true), StackItem::Boolean(false)]
    );
}

#[test]
fn pick_item_out_of_range() {
    let fault = run_expect_err(&[0x51, 0x51, 0xC1, 0x51, 0xC3]);
    assert_eq!(fault.error, VmError::IndexOutOfRange { index: 1, len: 1 });
}

#[test]
fn map_set_pick_and_has_key() {
    let script = build(|sb| {
        sb.emit(OpCode::NewMap)
            .emit(OpCode::Dup)
            .emit_push_int(1)
            .emit_push_int(2)
            .emit(OpCode::SetItem)
            .emit(OpCode::Dup)
            .emit_push_bytes(&[1])
            .emit_push_int(3)
            .emit(OpCode::SetItem)
            .emit(OpCode::Dup)
            .emit_push_int(1)
            .emit(OpCode::PickItem)
            .emit(OpCode::Over)
            .emit_push_int(5)
            .emit(OpCode::HasKey);
    });
    let results = run_halt(&script);
    assert_eq!(results[0].as_map().unwrap().borrow().len(), 1);
    assert_eq!(results[1], StackItem::from(3i64));
    assert_eq!(results[2], StackItem::Boolean(false));
}

#[test]
fn map_keys_and_values() {
    let script = build(|sb| {
        sb.emit(OpCode::NewMap)
            .emit(OpCode::Dup)
            .emit_push_int(1)
            .emit_push_int(2)
            .emit(OpCode::SetItem)
            .emit(OpCode::Dup)
            .emit(OpCode::Keys)
            .emit(OpCode::Swap)
            .emit(OpCode::Values);
    });
    let results = run_halt(&script);
    assert_eq!(results[0].as_array().unwrap().borrow()[0], StackItem::from(1i64));
    assert_eq!(results[1].as_array().unwrap().borrow()[0], StackItem::from(2i64));
}

#[test]
fn map_remove_missing_key_is_ok() {
    assert_eq!(run_halt(&[0xC7, 0x76, 0x51, 0xCA]).len(), 1);
}

#[test]
fn map_lookup_errors() {
    assert_eq!(run_expect_err(&[0xC7, 0x51, 0xC3]).error, VmError::KeyNotFound);
    // NEWMAP, PUSH0 NEWARRAY as key, PUSH1 as value
    let fault = run_expect_err(&[0xC7, 0x00, 0xC5, 0x51, 0xC4]);
    assert_eq!(fault.error, VmError::InvalidMapKey("Array"));
}

// ==================== Crypto ====================

struct EqualityCrypto;

impl Crypto for EqualityCrypto {
    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        message == b"msg" && signature == public_key
    }
}

struct FixedMessage;

impl ScriptContainer for FixedMessage {
    fn message(&self) -> Vec<u8> {
        b"msg".to_vec()
    }
}

fn crypto_engine(script: &[u8]) -> ExecutionEngine {
    let mut engine = ExecutionEngine::default()
        .with_crypto(Arc::new(EqualityCrypto))
        .with_container(Arc::new(FixedMessage));
    engine.load_script(script).unwrap();
    engine.execute();
    engine
}

fn crypto_result(script: &[u8]) -> bool {
    let engine = crypto_engine(script);
    assert_eq!(engine.state(), VmState::Halt, "fault: {:?}", engine.fault());
    engine.result_stack().peek(0).unwrap().to_bool()
}

#[test]
fn hashes() {
    let script = build(|sb| {
        sb.emit_push_bytes(b"abc").emit(OpCode::Sha256);
    });
    assert_eq!(
        hex::encode(run_bytes(&script)),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    let script = build(|sb| {
        sb.emit_push_bytes(b"").emit(OpCode::Hash160);
    });
    assert_eq!(run_bytes(&script), hash160(b"").0.to_vec());
    let script = build(|sb| {
        sb.emit_push_bytes(b"abc").emit(OpCode::Hash256);
    });
    assert_eq!(run_bytes(&script).len(), 32);
}

#[test]
fn check_sig_uses_container_message() {
    let sig = |key: u8| {
        build(|sb| {
            sb.emit_push_bytes(&[0x0A]).emit_push_bytes(&[key]).emit(OpCode::CheckSig);
        })
    };
    assert!(crypto_result(&sig(0x0A)));
    assert!(!crypto_result(&sig(0x0B)));

    let fault = run_expect_err(&sig(0x0A));
    assert_eq!(fault.kind(), ErrorKind::UnknownInterop);
}

#[test]
fn verify_takes_message_from_stack() {
    let script = build(|sb| {
        sb.emit_push_bytes(b"msg")
            .emit_push_bytes(&[0x0A])
            .emit_push_bytes(&[0x0A])
            .emit(OpCode::Verify);
    });
    assert!(crypto_result(&script));
}

fn multisig(signatures: &[u8], keys: &[u8], packed: bool) -> Vec<u8> {
    build(|sb| {
        for list in [signatures, keys] {
            for &b in list {
                sb.emit_push_bytes(&[b]);
            }
            sb.emit_push_int(list.len() as i64);
            if packed {
                sb.emit(OpCode::Pack);
            }
        }
        sb.emit(OpCode::CheckMultiSig);
    })
}

#[test]
fn check_multisig_requires_ordered_signatures() {
    for packed in [false, true] {
        assert!(crypto_result(&multisig(&[1, 3], &[1, 2, 3], packed)));
        assert!(crypto_result(&multisig(&[2], &[1, 2, 3], packed)));
        assert!(!crypto_result(&multisig(&[3, 1], &[1, 2, 3], packed)));
        assert!(!crypto_result(&multisig(&[4], &[1, 2, 3], packed)));
    }
}

#[test]
fn check_multisig_rejects_bad_counts() {
    let engine = crypto_engine(&multisig(&[1, 2], &[1], false));
    assert_eq!(expect_fault(&engine).kind(), ErrorKind::InvalidArgument);

    let engine = crypto_engine(&multisig(&[], &[1], true));
    assert_eq!(expect_fault(&engine).error, VmError::InvalidCount(0));
}

// ==================== Interop and contract calls ====================

#[test]
fn default_interops_report_script_hashes() {
    let entry = [0x61];
    let called = build(|sb| {
        sb.emit_syscall(interop::GET_EXECUTING_SCRIPT_HASH).unwrap();
        sb.emit_syscall(interop::GET_CALLING_SCRIPT_HASH).unwrap();
        sb.emit_syscall(interop::GET_ENTRY_SCRIPT_HASH).unwrap();
    });
    let mut engine = ExecutionEngine::default();
    engine.load_script(&entry[..]).unwrap();
    engine.load_script(called.clone()).unwrap();
    assert_eq!(engine.execute(), VmState::Halt);

    let results = results(&engine);
    assert_eq!(results[0].to_bytes().unwrap().as_slice(), hash160(&called).as_slice());
    assert_eq!(results[1].to_bytes().unwrap().as_slice(), hash160(&entry).as_slice());
    assert_eq!(results[2].to_bytes().unwrap().as_slice(), hash160(&entry).as_slice());
}

#[test]
fn calling_script_hash_without_caller_is_empty() {
    let script = build(|sb| {
        sb.emit_syscall(interop::GET_CALLING_SCRIPT_HASH).unwrap();
    });
    assert!(run_bytes(&script).is_empty());
}

#[test]
fn unknown_interop_faults() {
    let script = build(|sb| {
        sb.emit_syscall("Test.Missing").unwrap();
    });
    let fault = run_expect_err(&script);
    assert_eq!(fault.error, VmError::UnknownInterop("Test.Missing".into()));
    assert_eq!(fault.kind(), ErrorKind::UnknownInterop);
}

#[test]
fn custom_interops_and_their_errors() {
    let mut service = InteropService::new();
    service
        .register("Test.Double", |engine| {
            let value = engine.estack_mut()?.pop_int()?;
            engine.estack_mut()?.push(value * 2);
            Ok(())
        })
        .register("Test.Fail", |_| {
            Err(VmError::Interop {
                name: "Test.Fail".into(),
                message: "refused".into(),
            })
        });
    let service = Arc::new(service);

    let script = build(|sb| {
        sb.emit_push_int(21);
        sb.emit_syscall("Test.Double").unwrap();
    });
    let mut engine = ExecutionEngine::default().with_interop(Arc::clone(&service));
    engine.load_script(script).unwrap();
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(results(&engine), vec![StackItem::from(42i64)]);

    let script = build(|sb| {
        sb.emit_syscall("Test.Fail").unwrap();
    });
    let mut engine = ExecutionEngine::default().with_interop(service);
    engine.load_script(script).unwrap();
    engine.execute();
    assert_eq!(expect_fault(&engine).kind(), ErrorKind::InteropFailure);
}

fn contract_table() -> (UInt160, Arc<HashMap<UInt160, Bytes>>) {
    let callee = Bytes::from(&[0x93u8]);
    let hash = hash160(&callee);
    let mut table = HashMap::new();
    table.insert(hash, callee);
    (hash, Arc::new(table))
}

fn run_with_table(script: &[u8], table: Arc<HashMap<UInt160, Bytes>>) -> ExecutionEngine {
    let mut engine = ExecutionEngine::default().with_script_table(table);
    engine.load_script(script).unwrap();
    engine.execute();
    engine
}

#[test]
fn app_call_runs_resolved_script_on_caller_stack() {
    let (hash, table) = contract_table();
    let script = build(|sb| {
        sb.emit_push_int(2).emit_push_int(3).emit_app_call(&hash, false);
    });
    let engine = run_with_table(&script, table);
    assert_eq!(engine.state(), VmState::Halt, "fault: {:?}", engine.fault());
    assert_eq!(results(&engine), vec![StackItem::from(5i64)]);
}

#[test]
fn app_call_with_zero_hash_pops_target() {
    let (hash, table) = contract_table();
    let script = build(|sb| {
        sb.emit_push_int(2)
            .emit_push_int(3)
            .emit_push_bytes(hash.as_slice())
            .emit_app_call(&UInt160::zero(), false);
    });
    let engine = run_with_table(&script, table);
    assert_eq!(results(&engine), vec![StackItem::from(5i64)]);
}

#[test]
fn tail_call_replaces_caller() {
    let (hash, table) = contract_table();
    let script = build(|sb| {
        sb.emit_push_int(2)
            .emit_push_int(3)
            .emit_app_call(&hash, true)
            .emit_push_int(7);
    });
    let engine = run_with_table(&script, table);
    assert_eq!(engine.state(), VmState::Halt);
    assert_eq!(results(&engine), vec![StackItem::from(5i64)]);
}

#[test]
fn app_call_failures() {
    let (_, table) = contract_table();
    let missing = UInt160([7; 20]);
    let script = build(|sb| {
        sb.emit_app_call(&missing, false);
    });
    let engine = run_with_table(&script, table);
    assert_eq!(expect_fault(&engine).error, VmError::UnknownScript(missing));

    let fault = run_expect_err(&script);
    assert_eq!(fault.error, VmError::ServiceUnavailable("script table"));
}

// ==================== Concurrency ====================

#[test]
fn engines_on_separate_threads_share_services() {
    let mut service = InteropService::default();
    service.register("Test.Double", |engine| {
        let value = engine.estack_mut()?.pop_int()?;
        engine.estack_mut()?.push(value * 2);
        Ok(())
    });
    let service = Arc::new(service);
    let (hash, table) = contract_table();

    let handles: Vec<_> = (0..4i64)
        .map(|n| {
            let service = Arc::clone(&service);
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                let script = build(|sb| {
                    sb.emit_push_int(n).emit_push_int(1).emit_app_call(&hash, false);
                    sb.emit_syscall("Test.Double").unwrap();
                });
                let mut engine = ExecutionEngine::default()
                    .with_interop(service)
                    .with_script_table(table);
                engine.load_script(script).unwrap();
                assert_eq!(engine.execute(), VmState::Halt);
                engine.result_stack().peek(0).unwrap().to_integer().unwrap()
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), BigInt::from(2 * (n + 1)));
    }
}
