//! Structured-data blocks decoded with serde_yaml

use crate::capability::YamlDecoder;
use crate::error::Result;
use crate::runtime::RuntimeValue;
use crate::value::Number;
use serde_yaml::Value as Yaml;
use std::collections::BTreeMap;

/// Default [`YamlDecoder`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeYamlDecoder;

impl YamlDecoder for SerdeYamlDecoder {
    fn decode(&self, text: &str) -> Result<RuntimeValue> {
        let yaml: Yaml = serde_yaml::from_str(text)?;
        Ok(from_yaml_value(yaml))
    }
}

pub fn from_yaml_number(number: &serde_yaml::Number) -> RuntimeValue {
    match number.as_i64() {
        Some(i) => RuntimeValue::Number(Number::Int(i)),
        None => RuntimeValue::Number(Number::Decimal(number.as_f64().unwrap_or(f64::NAN))),
    }
}

/// Map a YAML document onto runtime values.
///
/// Mapping keys are stringified; tagged values decode to their payload.
pub fn from_yaml_value(yaml: Yaml) -> RuntimeValue {
    match yaml {
        Yaml::Null => RuntimeValue::Nil,
        Yaml::Bool(b) => RuntimeValue::Bool(b),
        Yaml::Number(n) => from_yaml_number(&n),
        Yaml::String(s) => RuntimeValue::Str(s),
        Yaml::Sequence(items) => RuntimeValue::List(items.into_iter().map(from_yaml_value).collect()),
        Yaml::Mapping(mapping) => {
            let map: BTreeMap<String, RuntimeValue> = mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), from_yaml_value(value)))
                .collect();
            RuntimeValue::Map(map)
        }
        Yaml::Tagged(tagged) => from_yaml_value(tagged.value),
    }
}

fn yaml_key(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
