//! Parameter type specifications and type-directed casting

use crate::error::{EfusError, Result};
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use crate::value::Number;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{trace, warn};

/// Host-defined type that knows how to recognise and build its values
pub trait CastHook {
    fn name(&self) -> &str;

    fn matches(&self, value: &RuntimeValue) -> bool;

    fn cast_from(&self, value: RuntimeValue, namespace: &NamespaceRef) -> Result<RuntimeValue>;
}

/// Declared type of a component parameter
#[derive(Clone)]
pub enum TypeSpec {
    Any,
    Nil,
    Bool,
    /// Integer or decimal
    Number,
    Int,
    Decimal,
    Str,
    Size,
    List(Box<TypeSpec>),
    Map(Box<TypeSpec>, Box<TypeSpec>),
    /// Alternatives tried in order
    Union(Vec<TypeSpec>),
    Binding,
    Component,
    Factory,
    Custom(Rc<dyn CastHook>),
}

impl TypeSpec {
    pub fn union(alternatives: impl IntoIterator<Item = TypeSpec>) -> Self {
        TypeSpec::Union(alternatives.into_iter().collect())
    }

    pub fn list(item: TypeSpec) -> Self {
        TypeSpec::List(Box::new(item))
    }

    pub fn map(key: TypeSpec, value: TypeSpec) -> Self {
        TypeSpec::Map(Box::new(key), Box::new(value))
    }

    /// Whether this type names `Binding`, directly or as a union alternative
    pub fn contains_binding(&self) -> bool {
        match self {
            TypeSpec::Binding => true,
            TypeSpec::Union(alternatives) => alternatives.iter().any(TypeSpec::contains_binding),
            _ => false,
        }
    }

    pub fn matches(&self, value: &RuntimeValue) -> bool {
        match (self, value) {
            (TypeSpec::Any, _) => true,
            (TypeSpec::Nil, RuntimeValue::Nil) => true,
            (TypeSpec::Bool, RuntimeValue::Bool(_)) => true,
            (TypeSpec::Number, RuntimeValue::Number(_)) => true,
            (TypeSpec::Int, RuntimeValue::Number(Number::Int(_))) => true,
            (TypeSpec::Decimal, RuntimeValue::Number(Number::Decimal(_))) => true,
            (TypeSpec::Str, RuntimeValue::Str(_)) => true,
            (TypeSpec::Size, RuntimeValue::Size(..)) => true,
            (TypeSpec::List(item), RuntimeValue::List(items)) => items.iter().all(|i| item.matches(i)),
            (TypeSpec::Map(key, val), RuntimeValue::Map(map)) => map
                .iter()
                .all(|(k, v)| key.matches(&RuntimeValue::Str(k.clone())) && val.matches(v)),
            (TypeSpec::Union(alternatives), value) => alternatives.iter().any(|a| a.matches(value)),
            (TypeSpec::Binding, RuntimeValue::Binding(_)) => true,
            (TypeSpec::Component, RuntimeValue::Component(_)) => true,
            (TypeSpec::Factory, RuntimeValue::Factory(_)) => true,
            (TypeSpec::Custom(hook), value) => hook.matches(value),
            _ => false,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Any => write!(f, "Any"),
            TypeSpec::Nil => write!(f, "Nil"),
            TypeSpec::Bool => write!(f, "Bool"),
            TypeSpec::Number => write!(f, "Number"),
            TypeSpec::Int => write!(f, "Int"),
            TypeSpec::Decimal => write!(f, "Decimal"),
            TypeSpec::Str => write!(f, "Str"),
            TypeSpec::Size => write!(f, "Size"),
            TypeSpec::List(item) => write!(f, "List[{item}]"),
            TypeSpec::Map(key, value) => write!(f, "Map[{key}, {value}]"),
            TypeSpec::Union(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            TypeSpec::Binding => write!(f, "Binding"),
            TypeSpec::Component => write!(f, "Component"),
            TypeSpec::Factory => write!(f, "Factory"),
            TypeSpec::Custom(hook) => write!(f, "{}", hook.name()),
        }
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSpec({self})")
    }
}

/// Convert `value` to the type described by `spec`
pub fn casts(value: RuntimeValue, spec: &TypeSpec, namespace: &NamespaceRef) -> Result<RuntimeValue> {
    if value.is_nil() || matches!(spec, TypeSpec::Nil) {
        return Ok(RuntimeValue::Nil);
    }

    match spec {
        TypeSpec::Union(alternatives) => cast_union(value, spec, alternatives, namespace),
        TypeSpec::Map(key, val) if !spec.matches(&value) => cast_map(value, spec, key, val, namespace),
        _ => cast_single(value, spec, namespace),
    }
}

fn cast_union(
    value: RuntimeValue,
    spec: &TypeSpec,
    alternatives: &[TypeSpec],
    namespace: &NamespaceRef,
) -> Result<RuntimeValue> {
    if alternatives.iter().any(|alt| alt.matches(&value)) {
        return Ok(value);
    }

    let mut last_failure = None;
    for alt in alternatives {
        match casts(value.clone(), alt, namespace) {
            Ok(cast) => return Ok(cast),
            Err(err) => {
                trace!(alternative = %alt, error = %err, "union alternative rejected");
                last_failure = Some(err);
            }
        }
    }

    let diagnostics = namespace.host().cast_diagnostics;
    let cause = match last_failure {
        Some(err) if diagnostics => {
            warn!(value = %value, target = %spec, error = %err, "every union alternative failed");
            Some(Box::new(err))
        }
        _ => None,
    };
    Err(EfusError::Cast {
        value: value.to_string(),
        target: spec.to_string(),
        cause,
    })
}

fn cast_map(
    value: RuntimeValue,
    spec: &TypeSpec,
    key: &TypeSpec,
    val: &TypeSpec,
    namespace: &NamespaceRef,
) -> Result<RuntimeValue> {
    let RuntimeValue::Map(map) = value else {
        return Err(EfusError::cast(value, spec));
    };
    let mut out = BTreeMap::new();
    for (k, v) in map {
        let k = match casts(RuntimeValue::Str(k), key, namespace)? {
            RuntimeValue::Str(s) => s,
            other => other.to_string(),
        };
        out.insert(k, casts(v, val, namespace)?);
    }
    Ok(RuntimeValue::Map(out))
}

fn cast_single(value: RuntimeValue, spec: &TypeSpec, namespace: &NamespaceRef) -> Result<RuntimeValue> {
    if spec.matches(&value) {
        return Ok(value);
    }

    match (spec, value) {
        (TypeSpec::Custom(hook), value) => hook.cast_from(value, namespace),
        (TypeSpec::Binding, value) => binding_from(value, namespace),
        (_, RuntimeValue::Binding(binding)) => casts(binding.get(), spec, namespace),
        (_, RuntimeValue::Object(object)) => object.cast_to(spec, namespace),
        (spec, value) => convert(value, spec, namespace),
    }
}

fn binding_from(value: RuntimeValue, namespace: &NamespaceRef) -> Result<RuntimeValue> {
    match value {
        RuntimeValue::Str(name) => Ok(RuntimeValue::Binding(namespace.create_binding(&name)?)),
        RuntimeValue::Object(object) => casts(object.eval(namespace)?, &TypeSpec::Binding, namespace),
        other => Err(EfusError::cast(other, TypeSpec::Binding)),
    }
}

/// Built-in constructor conversions
fn convert(value: RuntimeValue, spec: &TypeSpec, namespace: &NamespaceRef) -> Result<RuntimeValue> {
    let converted = match (spec, &value) {
        (TypeSpec::Str, RuntimeValue::Number(n)) => Some(RuntimeValue::Str(n.to_string())),
        (TypeSpec::Str, RuntimeValue::Bool(b)) => Some(RuntimeValue::Str(b.to_string())),
        (TypeSpec::Str, RuntimeValue::Size(w, h)) => Some(RuntimeValue::Str(format!("{w}x{h}"))),

        (TypeSpec::Number, RuntimeValue::Str(s)) => parse_number(s).map(RuntimeValue::Number),
        (TypeSpec::Number | TypeSpec::Int, RuntimeValue::Bool(b)) => {
            Some(RuntimeValue::from(i64::from(*b)))
        }
        (TypeSpec::Int, RuntimeValue::Number(n)) => n.truncate().map(RuntimeValue::from),
        (TypeSpec::Int, RuntimeValue::Str(s)) => s.trim().parse::<i64>().ok().map(RuntimeValue::from),
        (TypeSpec::Decimal, RuntimeValue::Number(n)) => Some(RuntimeValue::from(n.as_f64())),
        (TypeSpec::Decimal, RuntimeValue::Str(s)) => s.trim().parse::<f64>().ok().map(RuntimeValue::from),
        (TypeSpec::Decimal, RuntimeValue::Bool(b)) => Some(RuntimeValue::from(f64::from(u8::from(*b)))),

        (TypeSpec::Bool, other) => Some(RuntimeValue::Bool(other.truthy())),

        (TypeSpec::Size, RuntimeValue::List(items)) => match items.as_slice() {
            [RuntimeValue::Number(w), RuntimeValue::Number(h)] => Some(RuntimeValue::Size(*w, *h)),
            _ => None,
        },
        (TypeSpec::Size, RuntimeValue::Str(s)) => parse_size(s),

        (TypeSpec::List(item), RuntimeValue::Size(w, h)) => {
            let items = [RuntimeValue::Number(*w), RuntimeValue::Number(*h)]
                .into_iter()
                .map(|v| casts(v, item, namespace))
                .collect::<Result<Vec<_>>>()?;
            Some(RuntimeValue::List(items))
        }
        (TypeSpec::List(item), RuntimeValue::List(items)) => {
            let items = items
                .iter()
                .map(|v| casts(v.clone(), item, namespace))
                .collect::<Result<Vec<_>>>()?;
            Some(RuntimeValue::List(items))
        }
        _ => None,
    };
    converted.ok_or_else(|| EfusError::cast(value, spec))
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    text.parse::<i64>()
        .map(Number::Int)
        .or_else(|_| text.parse::<f64>().map(Number::Decimal))
        .ok()
}

fn parse_size(text: &str) -> Option<RuntimeValue> {
    let (w, h) = text.trim().split_once('x')?;
    Some(RuntimeValue::Size(parse_number(w)?, parse_number(h)?))
}
