//! The fetch-decode-execute loop.
//!
//! An engine runs one top-level invocation: load one or more scripts, then
//! [`execute`](ExecutionEngine::execute) or step until the state becomes
//! `Halt` or `Fault`. Handlers never panic on bad input; every failure is
//! recorded as a [`Fault`] and the engine stops for good.

use crate::types::bytes::Bytes;
use crate::types::hash::UInt160;
use crate::virtual_machine::config::EngineConfig;
use crate::virtual_machine::errors::{Fault, VmError};
use crate::virtual_machine::evaluation_stack::EvaluationStack;
use crate::virtual_machine::execution_context::{ExecutionContext, RETURN_ALL};
use crate::virtual_machine::interop::InteropService;
use crate::virtual_machine::invocation_stack::InvocationStack;
use crate::virtual_machine::isa::OpCode;
use crate::virtual_machine::ops;
use crate::virtual_machine::providers::{Crypto, ScriptContainer, ScriptTable};
use crate::virtual_machine::stack_item::count_reachable;
use crate::virtual_machine::state::VmState;
use crate::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Stack-based bytecode engine.
///
/// Not `Send`: containers on the stacks are shared through `Rc`. Run one
/// engine per thread; the collaborator services are `Arc`s and can be
/// shared freely.
pub struct ExecutionEngine {
    state: VmState,
    config: EngineConfig,
    invocation_stack: InvocationStack,
    result_stack: EvaluationStack,
    interop: Arc<InteropService>,
    script_table: Option<Arc<dyn ScriptTable>>,
    crypto: Option<Arc<dyn Crypto>>,
    container: Option<Arc<dyn ScriptContainer>>,
    breakpoints: HashMap<UInt160, HashSet<usize>>,
    executed: u64,
    fault: Option<Fault>,
}

impl ExecutionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: VmState::None,
            invocation_stack: InvocationStack::new(config.max_invocation_depth),
            config,
            result_stack: EvaluationStack::new(),
            interop: Arc::new(InteropService::default()),
            script_table: None,
            crypto: None,
            container: None,
            breakpoints: HashMap::new(),
            executed: 0,
            fault: None,
        }
    }

    pub fn with_interop(mut self, interop: Arc<InteropService>) -> Self {
        self.interop = interop;
        self
    }

    pub fn with_script_table(mut self, table: Arc<dyn ScriptTable>) -> Self {
        self.script_table = Some(table);
        self
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn Crypto>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    pub fn with_container(mut self, container: Arc<dyn ScriptContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// Pushes a new top-level frame for `script`.
    ///
    /// Scripts loaded later run first; when one returns, its results land on
    /// the evaluation stack of the frame loaded before it. A halted or
    /// faulted engine accepts no more scripts.
    pub fn load_script(&mut self, script: impl Into<Bytes>) -> Result<&mut ExecutionContext, VmError> {
        if self.state.is_terminal() {
            return Err(VmError::EngineStopped(self.state));
        }
        let ctx = ExecutionContext::new(script.into(), RETURN_ALL);
        self.invocation_stack.push(ctx)?;
        self.current_context_mut()
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Why the engine faulted, if it did.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Values returned by the outermost frame.
    pub fn result_stack(&self) -> &EvaluationStack {
        &self.result_stack
    }

    pub fn invocation_stack(&self) -> &InvocationStack {
        &self.invocation_stack
    }

    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    pub fn current_context(&self) -> Result<&ExecutionContext, VmError> {
        self.invocation_stack.current().ok_or(VmError::NoContext)
    }

    pub fn current_context_mut(&mut self) -> Result<&mut ExecutionContext, VmError> {
        self.invocation_stack.current_mut().ok_or(VmError::NoContext)
    }

    /// Evaluation stack of the executing frame.
    pub fn estack_mut(&mut self) -> Result<&mut EvaluationStack, VmError> {
        Ok(self.current_context_mut()?.estack_mut())
    }

    pub(crate) fn invocation_stack_mut(&mut self) -> &mut InvocationStack {
        &mut self.invocation_stack
    }

    pub(crate) fn result_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.result_stack
    }

    pub(crate) fn interop(&self) -> &Arc<InteropService> {
        &self.interop
    }

    pub(crate) fn script_table(&self) -> Result<&Arc<dyn ScriptTable>, VmError> {
        self.script_table
            .as_ref()
            .ok_or(VmError::ServiceUnavailable("script table"))
    }

    pub(crate) fn crypto(&self) -> Result<&Arc<dyn Crypto>, VmError> {
        self.crypto.as_ref().ok_or(VmError::ServiceUnavailable("crypto"))
    }

    pub(crate) fn container(&self) -> Result<&Arc<dyn ScriptContainer>, VmError> {
        self.container
            .as_ref()
            .ok_or(VmError::ServiceUnavailable("script container"))
    }

    // ==================== Breakpoints ====================

    /// Pauses with `Break` whenever a frame running `script_hash` reaches
    /// `position`.
    pub fn add_breakpoint(&mut self, script_hash: UInt160, position: usize) {
        self.breakpoints
            .entry(script_hash)
            .or_default()
            .insert(position);
    }

    pub fn remove_breakpoint(&mut self, script_hash: &UInt160, position: usize) -> bool {
        let Some(positions) = self.breakpoints.get_mut(script_hash) else {
            return false;
        };
        let removed = positions.remove(&position);
        if positions.is_empty() {
            self.breakpoints.remove(script_hash);
        }
        removed
    }

    fn at_breakpoint(&self) -> bool {
        if self.breakpoints.is_empty() {
            return false;
        }
        self.invocation_stack.current().is_some_and(|ctx| {
            self.breakpoints
                .get(&ctx.script_hash())
                .is_some_and(|positions| positions.contains(&ctx.ip()))
        })
    }

    // ==================== Execution control ====================

    /// Runs until `Halt`, `Fault` or the next breakpoint.
    pub fn execute(&mut self) -> VmState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.state = VmState::None;
        while self.state == VmState::None {
            self.step_into();
        }
        self.state
    }

    /// Executes exactly one instruction.
    pub fn step(&mut self) -> VmState {
        self.step_into()
    }

    /// Executes one instruction, entering calls.
    pub fn step_into(&mut self) -> VmState {
        if self.state.is_terminal() {
            return self.state;
        }
        if self.invocation_stack.is_empty() {
            self.state = VmState::Halt;
            return self.state;
        }
        self.state = VmState::None;

        match self.execute_next() {
            Ok(state) => self.state = state,
            Err(fault) => {
                warn!(
                    "FAULT at ip {} ({}): {}",
                    fault.ip,
                    fault.opcode.map_or("?", |op| op.mnemonic()),
                    fault.error
                );
                self.fault = Some(fault);
                self.state = VmState::Fault;
            }
        }

        match self.state {
            VmState::Halt => debug!(
                "HALT after {} instructions with {} results",
                self.executed,
                self.result_stack.len()
            ),
            VmState::None if self.at_breakpoint() => {
                self.state = VmState::Break;
                debug!(
                    "BREAK at ip {}",
                    self.invocation_stack.current().map_or(0, |ctx| ctx.ip())
                );
            }
            _ => {}
        }
        self.state
    }

    /// Runs until control is back in the current frame, treating calls as
    /// one step.
    pub fn step_over(&mut self) -> VmState {
        if self.state.is_terminal() {
            return self.state;
        }
        let depth = self.invocation_stack.len();
        loop {
            self.step_into();
            if self.state != VmState::None || self.invocation_stack.len() <= depth {
                break;
            }
        }
        if self.state == VmState::None {
            self.state = VmState::Break;
        }
        self.state
    }

    /// Runs until the current frame has returned.
    pub fn step_out(&mut self) -> VmState {
        if self.state.is_terminal() {
            return self.state;
        }
        let depth = self.invocation_stack.len();
        loop {
            self.step_into();
            if self.state != VmState::None || self.invocation_stack.len() < depth {
                break;
            }
        }
        if self.state == VmState::None {
            self.state = VmState::Break;
        }
        self.state
    }

    /// Decodes and dispatches the next instruction of the current frame.
    fn execute_next(&mut self) -> Result<VmState, Fault> {
        let ctx = self.current_context().map_err(|error| Fault {
            error,
            opcode: None,
            ip: 0,
        })?;
        let ip = ctx.ip();
        let fault = |error: VmError, opcode: Option<OpCode>| Fault { error, opcode, ip };

        let opcode = ctx.next().map_err(|e| fault(e, None))?;
        let instruction = ctx
            .current_instruction()
            .map_err(|e| fault(e, Some(opcode)))?;

        if let Some(limit) = self.config.max_instructions
            && self.executed >= limit
        {
            return Err(fault(
                VmError::InstructionBudgetExceeded { limit },
                Some(opcode),
            ));
        }
        self.executed += 1;

        self.current_context_mut()
            .map_err(|e| fault(e, Some(opcode)))?
            .advance(instruction.next_position() - ip);

        let handler = ops::handler(opcode);
        let state = handler(&instruction, self).map_err(|e| fault(e, Some(opcode)))?;

        self.check_stack_size().map_err(|e| fault(e, Some(opcode)))?;
        Ok(state)
    }

    /// Items across every frame's stacks and the result stack, including
    /// items held inside arrays, structs and maps.
    pub fn stack_size(&self) -> usize {
        self.count_items(usize::MAX)
    }

    fn count_items(&self, limit: usize) -> usize {
        let frames = self
            .invocation_stack
            .iter()
            .flat_map(|ctx| ctx.estack().iter().chain(ctx.altstack().iter()));
        count_reachable(frames.chain(self.result_stack.iter()), limit)
    }

    fn check_stack_size(&self) -> Result<(), VmError> {
        let size = self.count_items(self.config.max_stack_size);
        if size > self.config.max_stack_size {
            return Err(VmError::StackSizeExceeded {
                size,
                max: self.config.max_stack_size,
            });
        }
        Ok(())
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests;
