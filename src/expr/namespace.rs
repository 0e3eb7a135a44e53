use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::core::{DbError, Result, Value};

/// A domain-type constructor: takes the call's evaluated arguments and
/// produces a `Value::Custom`. Registered once per tag (e.g. `"CID"`).
pub type Constructor = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Per-`Database` registry of bound identifiers and domain-type
/// constructors visible to predicate and algebra expressions (`spec.md`
/// §3's "Expression namespace"). Deliberately **not** a single process-wide
/// instance: `spec.md` §9's redesign note asks a systems-language
/// reimplementation to localize this to avoid cross-database leakage. Each
/// `Database::open` clones its namespace from [`default_namespace`] so
/// registering a domain type once at process startup is still convenient.
#[derive(Clone)]
pub struct ExpressionNamespace {
    bindings: HashMap<String, Value>,
    constructors: HashMap<String, Constructor>,
}

impl ExpressionNamespace {
    pub fn new() -> Self {
        ExpressionNamespace { bindings: HashMap::new(), constructors: HashMap::new() }
    }

    /// Seeds a fresh namespace from the process-wide default registry.
    pub fn seeded() -> Self {
        let default = default_namespace().read().expect("default namespace lock poisoned");
        default.clone()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }

    pub fn register_constructor(&mut self, tag: impl Into<String>, ctor: Constructor) {
        self.constructors.insert(tag.into(), ctor);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.constructors.get(name) {
            Some(ctor) => ctor(args),
            None => Err(DbError::InvalidPredicate {
                source: name.to_string(),
                reason: format!("'{name}' is not a registered domain-type constructor"),
            }),
        }
    }
}

impl Default for ExpressionNamespace {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref DEFAULT_NAMESPACE: RwLock<ExpressionNamespace> =
        RwLock::new(ExpressionNamespace::new());
}

/// Registers a domain-type constructor in the process-wide default
/// registry, visible to every `Database` opened afterwards via
/// [`ExpressionNamespace::seeded`].
pub fn register_default_constructor(tag: impl Into<String>, ctor: Constructor) {
    default_namespace().write().expect("default namespace lock poisoned").register_constructor(tag, ctor);
}

fn default_namespace() -> &'static RwLock<ExpressionNamespace> {
    &DEFAULT_NAMESPACE
}
