//! Named host callables reachable through `SYSCALL`.
//!
//! A callable receives the whole engine: it pops its own arguments from the
//! current evaluation stack and pushes its results back. Services are
//! immutable once built and are shared between engines behind an `Arc`.

use crate::virtual_machine::engine::ExecutionEngine;
use crate::virtual_machine::errors::VmError;
use std::collections::HashMap;
use std::sync::Arc;

pub type InteropFn = Arc<dyn Fn(&mut ExecutionEngine) -> Result<(), VmError> + Send + Sync>;

pub const GET_EXECUTING_SCRIPT_HASH: &str = "System.ExecutionEngine.GetExecutingScriptHash";
pub const GET_CALLING_SCRIPT_HASH: &str = "System.ExecutionEngine.GetCallingScriptHash";
pub const GET_ENTRY_SCRIPT_HASH: &str = "System.ExecutionEngine.GetEntryScriptHash";

/// Registry of interop callables.
///
/// [`InteropService::default`] comes with the execution-engine queries
/// registered; [`InteropService::new`] starts empty.
#[derive(Clone)]
pub struct InteropService {
    callables: HashMap<String, InteropFn>,
}

impl InteropService {
    pub fn new() -> Self {
        Self {
            callables: HashMap::new(),
        }
    }

    /// Registers `f` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut ExecutionEngine) -> Result<(), VmError> + Send + Sync + 'static,
    {
        self.callables.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<InteropFn> {
        self.callables.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.callables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callables.is_empty()
    }
}

impl Default for InteropService {
    fn default() -> Self {
        let mut service = Self::new();
        service
            .register(GET_EXECUTING_SCRIPT_HASH, |engine| {
                let hash = engine.current_context()?.script_hash();
                engine.estack_mut()?.push(hash.0.to_vec());
                Ok(())
            })
            .register(GET_CALLING_SCRIPT_HASH, |engine| {
                let hash = engine.invocation_stack().peek(1).map(|ctx| ctx.script_hash());
                let bytes = hash.map(|h| h.0.to_vec()).unwrap_or_default();
                engine.estack_mut()?.push(bytes);
                Ok(())
            })
            .register(GET_ENTRY_SCRIPT_HASH, |engine| {
                let hash = engine
                    .invocation_stack()
                    .entry()
                    .ok_or(VmError::NoContext)?
                    .script_hash();
                engine.estack_mut()?.push(hash.0.to_vec());
                Ok(())
            });
        service
    }
}

impl std::fmt::Debug for InteropService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.callables.keys().collect();
        names.sort();
        f.debug_struct("InteropService").field("callables", &names).finish()
    }
}
