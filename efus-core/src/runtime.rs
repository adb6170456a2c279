//! Runtime values stored in namespaces and component arguments

use crate::component::ComponentRef;
use crate::factory::ComponentFactory;
use crate::namespace::Binding;
use crate::value::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value produced by evaluation.
///
/// Shared variants (bindings, factories, components) compare by identity,
/// everything else by value.
#[derive(Clone)]
pub enum RuntimeValue {
    Nil,
    All,
    Bool(bool),
    Number(Number),
    Str(String),
    Size(Number, Number),
    List(Vec<RuntimeValue>),
    Map(BTreeMap<String, RuntimeValue>),
    Binding(Rc<Binding>),
    Factory(Rc<dyn ComponentFactory>),
    Component(ComponentRef),
    /// Unevaluated markup value, resolved when cast
    Object(Value),
}

impl RuntimeValue {
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeValue::Nil => "Nil",
            RuntimeValue::All => "All",
            RuntimeValue::Bool(_) => "Bool",
            RuntimeValue::Number(_) => "Number",
            RuntimeValue::Str(_) => "Str",
            RuntimeValue::Size(..) => "Size",
            RuntimeValue::List(_) => "List",
            RuntimeValue::Map(_) => "Map",
            RuntimeValue::Binding(_) => "Binding",
            RuntimeValue::Factory(_) => "Factory",
            RuntimeValue::Component(_) => "Component",
            RuntimeValue::Object(_) => "Object",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, RuntimeValue::Nil)
    }

    /// Truthiness: Nil, false, zero and empty containers are falsy
    pub fn truthy(&self) -> bool {
        match self {
            RuntimeValue::Nil => false,
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::Number(n) => !n.is_zero(),
            RuntimeValue::Str(s) => !s.is_empty(),
            RuntimeValue::List(items) => !items.is_empty(),
            RuntimeValue::Map(map) => !map.is_empty(),
            RuntimeValue::Object(value) => !value.is_nil(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            RuntimeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RuntimeValue>> {
        match self {
            RuntimeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            RuntimeValue::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&Rc<Binding>> {
        match self {
            RuntimeValue::Binding(binding) => Some(binding),
            _ => None,
        }
    }

    /// Walk a `:`-separated path through nested maps
    pub fn lookup(&self, path: &str) -> Option<&RuntimeValue> {
        path.split(crate::params::PATH_SEPARATOR)
            .try_fold(self, |base, segment| base.as_map()?.get(segment))
    }

    /// Plain-text rendering used by `%s` formatting
    pub fn to_text(&self) -> String {
        match self {
            RuntimeValue::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        use RuntimeValue::*;
        match (self, other) {
            (Nil, Nil) | (All, All) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Size(w1, h1), Size(w2, h2)) => w1 == w2 && h1 == h2,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Binding(a), Binding(b)) => Rc::ptr_eq(a, b),
            (Factory(a), Factory(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Component(a), Component(b)) => Rc::ptr_eq(a, b),
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Nil => write!(f, "nil"),
            RuntimeValue::All => write!(f, "*"),
            RuntimeValue::Bool(b) => write!(f, "{b}"),
            RuntimeValue::Number(n) => write!(f, "{n}"),
            RuntimeValue::Str(s) => write!(f, "{s:?}"),
            RuntimeValue::Size(w, h) => write!(f, "{w}x{h}"),
            RuntimeValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            RuntimeValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            RuntimeValue::Binding(binding) => write!(f, "&{}", binding.name()),
            RuntimeValue::Factory(factory) => write!(f, "<factory {}>", factory.name()),
            RuntimeValue::Component(component) => write!(f, "<component {}>", component.name()),
            RuntimeValue::Object(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Object(value) => f.debug_tuple("Object").field(value).finish(),
            other => write!(f, "{}({other})", other.kind()),
        }
    }
}

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        RuntimeValue::Bool(b)
    }
}

impl From<i32> for RuntimeValue {
    fn from(i: i32) -> Self {
        RuntimeValue::Number(Number::Int(i64::from(i)))
    }
}

impl From<i64> for RuntimeValue {
    fn from(i: i64) -> Self {
        RuntimeValue::Number(Number::Int(i))
    }
}

impl From<f64> for RuntimeValue {
    fn from(d: f64) -> Self {
        RuntimeValue::Number(Number::Decimal(d))
    }
}

impl From<Number> for RuntimeValue {
    fn from(n: Number) -> Self {
        RuntimeValue::Number(n)
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::Str(s.to_string())
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        RuntimeValue::Str(s)
    }
}

impl From<Value> for RuntimeValue {
    fn from(value: Value) -> Self {
        RuntimeValue::Object(value)
    }
}

impl From<ComponentRef> for RuntimeValue {
    fn from(component: ComponentRef) -> Self {
        RuntimeValue::Component(component)
    }
}

impl From<BTreeMap<String, RuntimeValue>> for RuntimeValue {
    fn from(map: BTreeMap<String, RuntimeValue>) -> Self {
        RuntimeValue::Map(map)
    }
}

impl From<Vec<RuntimeValue>> for RuntimeValue {
    fn from(items: Vec<RuntimeValue>) -> Self {
        RuntimeValue::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, RuntimeValue)]) -> RuntimeValue {
        RuntimeValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_truthiness() {
        assert!(!RuntimeValue::Nil.truthy());
        assert!(!RuntimeValue::from(0).truthy());
        assert!(!RuntimeValue::from("").truthy());
        assert!(RuntimeValue::from("x").truthy());
        assert!(RuntimeValue::All.truthy());
    }

    #[test]
    fn test_lookup_path() {
        let value = map(&[("border", map(&[("width", RuntimeValue::from(3))]))]);
        assert_eq!(value.lookup("border:width"), Some(&RuntimeValue::from(3)));
        assert_eq!(value.lookup("border:color"), None);
        assert_eq!(value.lookup("border:width:deeper"), None);
    }

    #[test]
    fn test_display() {
        let value = map(&[
            ("a", RuntimeValue::from(1)),
            ("b", RuntimeValue::List(vec!["x".into(), RuntimeValue::Nil])),
        ]);
        assert_eq!(value.to_string(), "{a: 1, b: [\"x\", nil]}");
        assert_eq!(RuntimeValue::from("x").to_text(), "x");
    }
}
