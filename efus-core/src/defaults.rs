//! Process-wide default namespace entries
//!
//! The table is built once and copied into every root namespace on
//! construction, so no namespace ever shares it by reference.

use crate::runtime::RuntimeValue;
use crate::value::Number;
use once_cell::sync::Lazy;

/// Plain constant that can live in a process-wide table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Nil,
    All,
    Bool(bool),
    Number(f64),
    Int(i64),
}

impl Constant {
    pub fn to_value(self) -> RuntimeValue {
        match self {
            Constant::Nil => RuntimeValue::Nil,
            Constant::All => RuntimeValue::All,
            Constant::Bool(b) => RuntimeValue::Bool(b),
            Constant::Number(d) => RuntimeValue::Number(Number::Decimal(d)),
            Constant::Int(i) => RuntimeValue::Number(Number::Int(i)),
        }
    }
}

pub static DEFAULTS: Lazy<Vec<(&'static str, Constant)>> = Lazy::new(|| {
    vec![
        ("nil", Constant::Nil),
        ("all", Constant::All),
        ("true", Constant::Bool(true)),
        ("false", Constant::Bool(false)),
        // Base unit for scalars such as `12px`
        ("px", Constant::Int(1)),
    ]
});

/// Fresh copies of the default entries
pub fn default_entries() -> impl Iterator<Item = (String, RuntimeValue)> {
    DEFAULTS
        .iter()
        .map(|(name, constant)| (name.to_string(), constant.to_value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_contain_booleans_and_px() {
        let entries: Vec<_> = default_entries().collect();
        assert!(entries.contains(&("true".to_string(), RuntimeValue::Bool(true))));
        assert!(entries.contains(&("px".to_string(), RuntimeValue::from(1))));
    }
}
