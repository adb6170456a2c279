//! # efus
//!
//! efus is a small indentation-sensitive markup language describing trees
//! of reactive components:
//! - Each line is a tag `name[&alias] attr=value ...` or a `using` import
//! - Indentation builds nesting
//! - Tags resolve to component factories through an observable namespace
//! - `&name` attributes bind live to namespace entries and re-evaluate the
//!   owning component's arguments when the entry changes
//!
//! ## Example
//!
//! ```ignore
//! using ui.basic: *
//!
//! box width=10 height=20
//!   label&title text="Hello, %(user)s"
//!   label text=&status
//! ```

pub mod capability;
pub mod component;
pub mod composite;
pub mod config;
pub mod defaults;
pub mod error;
pub mod expr;
pub mod factory;
pub mod format;
pub mod instr;
pub mod namespace;
pub mod params;
pub mod parser;
pub mod runtime;
pub mod subscribe;
pub mod types;
pub mod value;
pub mod yaml;

#[cfg(test)]
mod tests;

use std::path::Path;

// Re-export key types
pub use capability::{ExprEvaluator, Host, ModuleLoader, ModuleRegistry, YamlDecoder};
pub use component::{Behavior, Component, ComponentRef, Lifecycle};
pub use composite::CompositeFactory;
pub use config::{ConfigError, EfusConfig, DEFAULT_CONFIG_FILE};
pub use error::{EfusError, Result, SourceLocation};
pub use expr::ArithmeticEvaluator;
pub use factory::{ComponentFactory, WidgetFactory};
pub use format::percent_format;
pub use instr::{Attributes, Efus, ImportNames, Instr, RootDef, TagDef, UsingDef};
pub use namespace::{Binding, Namespace, NamespaceRef};
pub use params::{CompArgs, CompParams, CompParamsBuilder, ParamSpec};
pub use parser::{parse_code, parse_file, Parser};
pub use runtime::RuntimeValue;
pub use subscribe::{Subscribable, Subscriber, Subscribers, Subscription, SubscriptionId};
pub use types::{casts, CastHook, TypeSpec};
pub use value::{Number, Value};
pub use yaml::SerdeYamlDecoder;

// Re-export shared types from efus-types
pub use efus_types::{LineCol, Span};

/// Where a program comes from
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Text(&'a str),
    Path(&'a Path),
}

/// Parse and evaluate a program.
///
/// Without a namespace a fresh root namespace is used.
pub fn run(source: Source<'_>, namespace: Option<NamespaceRef>) -> Result<Option<ComponentRef>> {
    let program = match source {
        Source::Text(text) => parse_code(text, None)?,
        Source::Path(path) => parse_file(path)?,
    };
    let namespace = namespace.unwrap_or_else(Namespace::new);
    program.eval(&namespace)
}

pub fn run_file(path: impl AsRef<Path>, namespace: Option<NamespaceRef>) -> Result<Option<ComponentRef>> {
    run(Source::Path(path.as_ref()), namespace)
}
