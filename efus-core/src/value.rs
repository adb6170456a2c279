//! Markup values
//!
//! A [`Value`] is a literal as written in efus source. Values are inert until
//! evaluated against a namespace, which turns them into [`RuntimeValue`]s.

use crate::error::{EfusError, Result};
use crate::format::percent_format;
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use crate::types::{casts, TypeSpec};
use std::cmp::Ordering;
use std::fmt;

/// Integer or decimal number
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Decimal(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Decimal(d) => d,
        }
    }

    /// Drop the fraction; `None` for non-finite or out-of-range decimals
    pub fn truncate(&self) -> Option<i64> {
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        match *self {
            Number::Int(i) => Some(i),
            Number::Decimal(d) => {
                let t = d.trunc();
                (t.is_finite() && (-LIMIT..LIMIT).contains(&t)).then_some(t as i64)
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_f64() == 0.0
    }

    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map(Number::Int)
                .unwrap_or(Number::Decimal(a as f64 + b as f64)),
            (a, b) => Number::Decimal(a.as_f64() + b.as_f64()),
        }
    }

    pub fn sub(self, other: Number) -> Number {
        self.add(other.neg())
    }

    pub fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map(Number::Int)
                .unwrap_or(Number::Decimal(a as f64 * b as f64)),
            (a, b) => Number::Decimal(a.as_f64() * b.as_f64()),
        }
    }

    /// True division; always produces a decimal
    pub fn div(self, other: Number) -> Option<Number> {
        if other.is_zero() {
            return None;
        }
        Some(Number::Decimal(self.as_f64() / other.as_f64()))
    }

    /// Remainder with the sign of the divisor
    pub fn rem(self, other: Number) -> Option<Number> {
        match (self, other) {
            (_, b) if b.is_zero() => None,
            (Number::Int(a), Number::Int(b)) => {
                // `i64::MIN % -1` overflows only in the quotient
                let r = a.wrapping_rem(b);
                Some(Number::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                Some(Number::Decimal(a - b * (a / b).floor()))
            }
        }
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(i) => i
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Decimal(-(i as f64))),
            Number::Decimal(d) => Number::Decimal(-d),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Decimal(d) if d.fract() == 0.0 && d.is_finite() => write!(f, "{d:.1}"),
            Number::Decimal(d) => write!(f, "{d}"),
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Int(i)
    }
}

impl From<f64> for Number {
    fn from(d: f64) -> Self {
        Number::Decimal(d)
    }
}

/// Literal value as written in efus source
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Falsy nothing
    Nil,
    /// Marker matching everything
    All,
    Number(Number),
    /// String with deferred `%(name)s` formatting
    Str(String),
    /// Number multiplied by a unit looked up in the namespace, e.g. `12px`
    Scalar { coefficient: Number, unit: String },
    /// `WxH` pair
    Size(Number, Number),
    /// Bare name
    Var(String),
    /// Parenthesized expression, evaluated by the host expression evaluator
    Expr(String),
    /// Fenced structured-data payload
    Yaml(String),
    /// `&name`: a dynamic binding to a namespace entry
    NameBinding(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::All => "All",
            Value::Number(_) => "Number",
            Value::Str(_) => "Str",
            Value::Scalar { .. } => "Scalar",
            Value::Size(..) => "Size",
            Value::Var(_) => "Var",
            Value::Expr(_) => "Expr",
            Value::Yaml(_) => "Yaml",
            Value::NameBinding(_) => "NameBinding",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Evaluate against `namespace`
    pub fn eval(&self, namespace: &NamespaceRef) -> Result<RuntimeValue> {
        match self {
            Value::Nil => Ok(RuntimeValue::Nil),
            Value::All => Ok(RuntimeValue::All),
            Value::Number(n) => Ok(RuntimeValue::Number(*n)),
            Value::Str(template) => percent_format(template, namespace).map(RuntimeValue::Str),
            Value::Scalar { coefficient, unit } => match namespace.get_name(unit)? {
                RuntimeValue::Number(factor) => Ok(RuntimeValue::Number(coefficient.mul(factor))),
                RuntimeValue::Size(w, h) => {
                    Ok(RuntimeValue::Size(coefficient.mul(w), coefficient.mul(h)))
                }
                other => Err(EfusError::cast(
                    format!("unit `{unit}` ({})", other.kind()),
                    "Number",
                )),
            },
            Value::Size(w, h) => Ok(RuntimeValue::Size(*w, *h)),
            Value::Var(name) => namespace.get_name(name),
            Value::Expr(source) => {
                let evaluator = namespace.host().expr.clone();
                evaluator.eval_expr(source, namespace)
            }
            Value::Yaml(text) => namespace.host().yaml.decode(text),
            Value::NameBinding(name) => Ok(RuntimeValue::Binding(namespace.create_binding(name)?)),
        }
    }

    /// Convert this value to `target` by evaluating it first
    pub fn cast_to(&self, target: &TypeSpec, namespace: &NamespaceRef) -> Result<RuntimeValue> {
        casts(self.eval(namespace)?, target, namespace)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::All => write!(f, "*"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Scalar { coefficient, unit } => write!(f, "{coefficient}{unit}"),
            Value::Size(w, h) => write!(f, "{w}x{h}"),
            Value::Var(name) => write!(f, "{name}"),
            Value::Expr(source) => write!(f, "({source})"),
            Value::Yaml(text) => write!(f, "---\n{text}\n..."),
            Value::NameBinding(name) => write!(f, "&{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;

    #[test]
    fn test_number_equality_across_kinds() {
        assert_eq!(Number::Int(10), Number::Decimal(10.0));
        assert_ne!(Number::Int(10), Number::Decimal(10.5));
        assert!(Number::Int(2) < Number::Decimal(2.5));
    }

    #[test]
    fn test_number_arithmetic() {
        assert_eq!(Number::Int(3).mul(Number::Int(4)), Number::Int(12));
        assert!(matches!(Number::Int(3).mul(Number::Decimal(0.5)), Number::Decimal(_)));
        assert_eq!(Number::Int(7).div(Number::Int(2)), Some(Number::Decimal(3.5)));
        assert_eq!(Number::Int(1).div(Number::Int(0)), None);
        assert_eq!(Number::Int(-7).rem(Number::Int(3)), Some(Number::Int(2)));
        assert_eq!(Number::Int(7).rem(Number::Int(-3)), Some(Number::Int(-2)));
        assert_eq!(Number::Int(i64::MAX).add(Number::Int(1)).as_f64(), i64::MAX as f64 + 1.0);
        assert_eq!(Number::Int(i64::MIN).rem(Number::Int(-1)), Some(Number::Int(0)));
    }

    #[test]
    fn test_number_truncate() {
        assert_eq!(Number::Decimal(-2.7).truncate(), Some(-2));
        assert_eq!(Number::Decimal(1e20).truncate(), None);
        assert_eq!(Number::Decimal(f64::NAN).truncate(), None);
        assert_eq!(Number::Decimal(f64::NEG_INFINITY).truncate(), None);
        assert_eq!(Number::Decimal(-9_223_372_036_854_775_808.0).truncate(), Some(i64::MIN));
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Number::Int(4).to_string(), "4");
        assert_eq!(Number::Decimal(4.0).to_string(), "4.0");
        assert_eq!(Number::Decimal(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_eval_literals() {
        let ns = Namespace::new();
        assert_eq!(
            Value::Number(Number::Int(3)).eval(&ns).unwrap(),
            RuntimeValue::Number(Number::Int(3))
        );
        assert_eq!(
            Value::Size(Number::Int(4), Number::Int(5)).eval(&ns).unwrap(),
            RuntimeValue::Size(Number::Int(4), Number::Int(5))
        );
        assert!(Value::Nil.eval(&ns).unwrap().is_nil());
    }

    #[test]
    fn test_eval_scalar_uses_unit() {
        let ns = Namespace::new();
        ns.set("em", 16);
        let value = Value::Scalar {
            coefficient: Number::Decimal(1.5),
            unit: "em".into(),
        };
        assert_eq!(value.eval(&ns).unwrap(), RuntimeValue::from(24.0));
    }

    #[test]
    fn test_eval_scalar_unknown_unit() {
        let ns = Namespace::new();
        let value = Value::Scalar {
            coefficient: Number::Int(2),
            unit: "furlong".into(),
        };
        assert!(matches!(
            value.eval(&ns),
            Err(EfusError::NameNotFound { name }) if name == "furlong"
        ));
    }

    #[test]
    fn test_eval_var() {
        let ns = Namespace::new();
        ns.set("title", "Hello");
        assert_eq!(
            Value::Var("title".into()).eval(&ns).unwrap(),
            RuntimeValue::from("Hello")
        );
        assert!(Value::Var("missing".into()).eval(&ns).is_err());
    }

    #[test]
    fn test_eval_string_formats_against_namespace() {
        let ns = Namespace::new();
        ns.set("user", "ada");
        let value = Value::Str("hi %(user)s".into());
        assert_eq!(value.eval(&ns).unwrap(), RuntimeValue::from("hi ada"));
    }

    #[test]
    fn test_display_round_trips_source_form() {
        assert_eq!(Value::Str("hi".into()).to_string(), "\"hi\"");
        assert_eq!(
            Value::Scalar {
                coefficient: Number::Int(12),
                unit: "px".into()
            }
            .to_string(),
            "12px"
        );
        assert_eq!(Value::NameBinding("count".into()).to_string(), "&count");
        assert_eq!(Value::Expr("1 + 2".into()).to_string(), "(1 + 2)");
    }
}
