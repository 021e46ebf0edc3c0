//! Before/after hooks per CRUD operation.
//!
//! Hooks are observers: they receive a [`HookContext`] describing the request and,
//! for `after` hooks, the persisted result. Their return value is ignored and they
//! cannot veto the operation.

use crate::case::hook_setter_name;
use crate::config::Resource;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// When a hook runs relative to the persistence call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Before, Phase::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

/// The five generated operations of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    GetItem,
    GetCollection,
    CreateItem,
    UpdateItem,
    DeleteItem,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::GetItem,
        Operation::GetCollection,
        Operation::CreateItem,
        Operation::UpdateItem,
        Operation::DeleteItem,
    ];

    /// Operation key as used in hook tables and logs (e.g. "getCollection").
    pub fn key(&self) -> &'static str {
        match self {
            Operation::GetItem => "getItem",
            Operation::GetCollection => "getCollection",
            Operation::CreateItem => "createItem",
            Operation::UpdateItem => "updateItem",
            Operation::DeleteItem => "deleteItem",
        }
    }

    /// Verb used in setter names.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::GetItem | Operation::GetCollection => "Get",
            Operation::CreateItem => "Create",
            Operation::UpdateItem => "Update",
            Operation::DeleteItem => "Delete",
        }
    }
}

/// Request data handed to the endpoint's hooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct HookArgs<'a> {
    /// Path identifier for item routes.
    pub identifier: Option<&'a str>,
    /// Raw query parameters (collection route only).
    pub query: Option<&'a HashMap<String, String>>,
    /// Parsed request body (create and update).
    pub body: Option<&'a Value>,
    /// Persisted result; set for `after` hooks only.
    pub result: Option<&'a Value>,
}

/// Everything a hook sees when it is invoked.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub collection_name: &'a str,
    pub phase: Phase,
    pub operation: Operation,
    pub identifier: Option<&'a str>,
    pub query: Option<&'a HashMap<String, String>>,
    pub body: Option<&'a Value>,
    pub result: Option<&'a Value>,
}

pub type Hook = Arc<dyn Fn(&HookContext<'_>) + Send + Sync>;

/// Per-resource hook lists. Both phases always hold all five operation keys.
#[derive(Clone)]
pub struct HookTable {
    before: BTreeMap<Operation, Vec<Hook>>,
    after: BTreeMap<Operation, Vec<Hook>>,
}

impl HookTable {
    pub fn new() -> Self {
        let empty = || Operation::ALL.iter().map(|op| (*op, Vec::new())).collect::<BTreeMap<_, _>>();
        HookTable {
            before: empty(),
            after: empty(),
        }
    }

    pub fn phase(&self, phase: Phase) -> &BTreeMap<Operation, Vec<Hook>> {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
        }
    }

    pub fn hooks(&self, phase: Phase, operation: Operation) -> &[Hook] {
        self.phase(phase)
            .get(&operation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn push(&mut self, phase: Phase, operation: Operation, hook: Hook) {
        let table = match phase {
            Phase::Before => &mut self.before,
            Phase::After => &mut self.after,
        };
        table.entry(operation).or_default().push(hook);
    }
}

impl Default for HookTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |m: &BTreeMap<Operation, Vec<Hook>>| {
            m.iter().map(|(op, v)| (op.key(), v.len())).collect::<BTreeMap<_, _>>()
        };
        f.debug_struct("HookTable")
            .field("before", &counts(&self.before))
            .field("after", &counts(&self.after))
            .finish()
    }
}

/// Appends callbacks to one (phase, operation) list of a resource.
#[derive(Clone)]
pub struct HookRegistrar {
    resource: Arc<Resource>,
    phase: Phase,
    operation: Operation,
    name: String,
}

impl HookRegistrar {
    /// Conventional setter name, e.g. "beforeGetBooks".
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Append `hook`; hooks run in registration order.
    pub fn register<F>(&self, hook: F)
    where
        F: Fn(&HookContext<'_>) + Send + Sync + 'static,
    {
        let mut table = self
            .resource
            .hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.push(self.phase, self.operation, Arc::new(hook));
        tracing::debug!(hook = %self.name, "hook registered");
    }
}

impl fmt::Debug for HookRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistrar").field("name", &self.name).finish()
    }
}

pub fn create_hook(resource: &Arc<Resource>, phase: Phase, operation: Operation) -> HookRegistrar {
    HookRegistrar {
        resource: Arc::clone(resource),
        phase,
        operation,
        name: hook_setter_name(phase, operation, &resource.collection_name, &resource.item_name),
    }
}

/// Run every hook registered for (phase, operation) in order, each with the same context.
pub fn exec_hooks(resource: &Resource, phase: Phase, operation: Operation, args: HookArgs<'_>) {
    // Snapshot so a hook may register further hooks without deadlocking.
    let hooks: Vec<Hook> = {
        let table = resource.hooks.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        table.hooks(phase, operation).to_vec()
    };
    tracing::trace!(
        resource = %resource.collection_name,
        phase = phase.as_str(),
        operation = operation.key(),
        count = hooks.len(),
        "hooks"
    );
    if hooks.is_empty() {
        return;
    }
    let ctx = HookContext {
        collection_name: &resource.collection_name,
        phase,
        operation,
        identifier: args.identifier,
        query: args.query,
        body: args.body,
        result: args.result,
    };
    for hook in &hooks {
        hook(&ctx);
    }
}

macro_rules! hook_setter {
    ($method:ident, $phase:expr, $operation:expr) => {
        pub fn $method<F>(&self, hook: F)
        where
            F: Fn(&HookContext<'_>) + Send + Sync + 'static,
        {
            self.registrar($phase, $operation).register(hook)
        }
    };
}

/// Typed access to the ten setters of one resource.
#[derive(Clone, Debug)]
pub struct ResourceHooks {
    resource: Arc<Resource>,
}

impl ResourceHooks {
    pub fn new(resource: Arc<Resource>) -> Self {
        ResourceHooks { resource }
    }

    pub fn registrar(&self, phase: Phase, operation: Operation) -> HookRegistrar {
        create_hook(&self.resource, phase, operation)
    }

    /// All ten registrars, `before` first, operations in declaration order.
    pub fn registrars(&self) -> Vec<HookRegistrar> {
        Phase::ALL
            .iter()
            .flat_map(|p| Operation::ALL.iter().map(move |op| (*p, *op)))
            .map(|(p, op)| self.registrar(p, op))
            .collect()
    }

    hook_setter!(before_get_collection, Phase::Before, Operation::GetCollection);
    hook_setter!(before_get_item, Phase::Before, Operation::GetItem);
    hook_setter!(before_create_item, Phase::Before, Operation::CreateItem);
    hook_setter!(before_update_item, Phase::Before, Operation::UpdateItem);
    hook_setter!(before_delete_item, Phase::Before, Operation::DeleteItem);
    hook_setter!(after_get_collection, Phase::After, Operation::GetCollection);
    hook_setter!(after_get_item, Phase::After, Operation::GetItem);
    hook_setter!(after_create_item, Phase::After, Operation::CreateItem);
    hook_setter!(after_update_item, Phase::After, Operation::UpdateItem);
    hook_setter!(after_delete_item, Phase::After, Operation::DeleteItem);
}
