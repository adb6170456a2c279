//! Host capabilities injected into namespaces
//!
//! Expression evaluation, structured-data decoding and module loading are
//! supplied by the host. Every namespace carries a shared [`Host`]; children
//! inherit their parent's.

use crate::config::EfusConfig;
use crate::error::{EfusError, Result};
use crate::expr::ArithmeticEvaluator;
use crate::instr::ImportNames;
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use crate::yaml::SerdeYamlDecoder;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Evaluates the source of a parenthesized expression
pub trait ExprEvaluator {
    fn eval_expr(&self, source: &str, namespace: &NamespaceRef) -> Result<RuntimeValue>;
}

/// Decodes fenced structured-data blocks
pub trait YamlDecoder {
    fn decode(&self, text: &str) -> Result<RuntimeValue>;
}

/// Loads symbols for `using` statements
pub trait ModuleLoader {
    fn load(&self, module: &str, names: &ImportNames) -> Result<Vec<(String, RuntimeValue)>>;
}

/// In-memory [`ModuleLoader`] hosts register modules into
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RefCell<HashMap<String, BTreeMap<String, RuntimeValue>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add symbols to `module`, creating it if needed
    pub fn register<I, K>(&self, module: &str, symbols: I)
    where
        I: IntoIterator<Item = (K, RuntimeValue)>,
        K: Into<String>,
    {
        let mut modules = self.modules.borrow_mut();
        let entry = modules.entry(module.to_string()).or_default();
        entry.extend(symbols.into_iter().map(|(k, v)| (k.into(), v)));
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, module: &str, names: &ImportNames) -> Result<Vec<(String, RuntimeValue)>> {
        let modules = self.modules.borrow();
        let symbols = modules.get(module).ok_or_else(|| EfusError::Import {
            module: module.to_string(),
            message: "no such module".into(),
        })?;

        match names {
            ImportNames::All => Ok(symbols
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()),
            ImportNames::Names(names) => names
                .iter()
                .map(|name| {
                    symbols
                        .get(name)
                        .map(|value| (name.clone(), value.clone()))
                        .ok_or_else(|| EfusError::Import {
                            module: module.to_string(),
                            message: format!("module has no name `{name}`"),
                        })
                })
                .collect(),
        }
    }
}

/// Capability set shared by a namespace tree
pub struct Host {
    pub expr: Rc<dyn ExprEvaluator>,
    pub yaml: Rc<dyn YamlDecoder>,
    pub modules: Rc<dyn ModuleLoader>,
    /// Maximum nesting of `Namespace::update` notifications
    pub max_notify_depth: usize,
    pub cast_diagnostics: bool,
}

impl Host {
    pub fn from_config(config: &EfusConfig) -> Self {
        Self {
            max_notify_depth: config.max_notify_depth,
            cast_diagnostics: config.cast_diagnostics,
            ..Self::default()
        }
    }

    pub fn with_modules(mut self, modules: Rc<dyn ModuleLoader>) -> Self {
        self.modules = modules;
        self
    }
}

impl Default for Host {
    fn default() -> Self {
        let defaults = EfusConfig::default();
        Self {
            expr: Rc::new(ArithmeticEvaluator),
            yaml: Rc::new(SerdeYamlDecoder),
            modules: Rc::new(ModuleRegistry::new()),
            max_notify_depth: defaults.max_notify_depth,
            cast_diagnostics: defaults.cast_diagnostics,
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("max_notify_depth", &self.max_notify_depth)
            .field("cast_diagnostics", &self.cast_diagnostics)
            .finish_non_exhaustive()
    }
}
