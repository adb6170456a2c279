//! `%(name)s` string interpolation

use crate::error::{EfusError, Result};
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use once_cell::sync::Lazy;
use regex::Regex;

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^%\(([^)]*)\)([-+ 0#]*)(\d+)?(?:\.(\d+))?([srdif])").expect("valid regex")
});

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
}

/// Substitute `%(name)X` directives with values looked up in `namespace`.
///
/// Supported conversions are `s`, `r`, `d`, `i` and `f`, with the usual
/// flag, width and precision modifiers. `%%` produces a literal `%`.
pub fn percent_format(template: &str, namespace: &NamespaceRef) -> Result<String> {
    if !template.contains('%') {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(tail) = rest.strip_prefix("%%") {
            out.push('%');
            rest = tail;
            continue;
        }

        let Some(caps) = DIRECTIVE.captures(rest) else {
            return Err(EfusError::Format {
                message: format!("unsupported directive in {template:?}"),
            });
        };

        let name = &caps[1];
        let flags = &caps[2];
        let spec = Spec {
            left: flags.contains('-'),
            plus: flags.contains('+'),
            space: flags.contains(' '),
            zero: flags.contains('0'),
            width: caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| {
                EfusError::Format {
                    message: "width out of range".into(),
                }
            })?,
            precision: caps.get(4).and_then(|m| m.as_str().parse().ok()),
        };
        let value = namespace.get_name(name)?;
        let conversion = caps[5].chars().next().unwrap_or('s');
        out.push_str(&convert(&value, conversion, &spec)?);

        rest = &rest[caps[0].len()..];
    }
    out.push_str(rest);
    Ok(out)
}

fn convert(value: &RuntimeValue, conversion: char, spec: &Spec) -> Result<String> {
    let body = match conversion {
        's' => {
            let text = value.to_text();
            match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        }
        'r' => value.to_string(),
        'd' | 'i' => {
            let n = numeric(value, conversion)?;
            let int = n.truncate().ok_or_else(|| EfusError::Format {
                message: format!("{n} does not fit `%{conversion}`"),
            })?;
            signed(int.to_string(), spec)
        }
        'f' => {
            let n = numeric(value, conversion)?;
            let precision = spec.precision.unwrap_or(6);
            signed(format!("{:.*}", precision, n.as_f64()), spec)
        }
        other => {
            return Err(EfusError::Format {
                message: format!("unsupported conversion `{other}`"),
            })
        }
    };
    Ok(pad(body, conversion, spec))
}

fn numeric(value: &RuntimeValue, conversion: char) -> Result<crate::value::Number> {
    match value {
        RuntimeValue::Number(n) => Ok(*n),
        RuntimeValue::Bool(b) => Ok(crate::value::Number::Int(i64::from(*b))),
        other => Err(EfusError::Format {
            message: format!("%{conversion} format requires a number, not {}", other.kind()),
        }),
    }
}

fn signed(digits: String, spec: &Spec) -> String {
    if digits.starts_with('-') {
        digits
    } else if spec.plus {
        format!("+{digits}")
    } else if spec.space {
        format!(" {digits}")
    } else {
        digits
    }
}

fn pad(body: String, conversion: char, spec: &Spec) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let fill = spec.width - len;
    if spec.left {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.zero && conversion != 's' && conversion != 'r' {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), body[1..].to_string()),
            _ => (String::new(), body),
        };
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;

    fn ns() -> NamespaceRef {
        let ns = Namespace::new();
        ns.set("name", "ada");
        ns.set("count", 7);
        ns.set("ratio", 0.25);
        ns
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(percent_format("hello", &ns()).unwrap(), "hello");
    }

    #[test]
    fn test_named_directives() {
        let ns = ns();
        assert_eq!(
            percent_format("%(name)s has %(count)d items", &ns).unwrap(),
            "ada has 7 items"
        );
        assert_eq!(percent_format("%(ratio).2f", &ns).unwrap(), "0.25");
        assert_eq!(percent_format("%(name)r", &ns).unwrap(), "\"ada\"");
    }

    #[test]
    fn test_width_and_flags() {
        let ns = ns();
        assert_eq!(percent_format("[%(count)03d]", &ns).unwrap(), "[007]");
        assert_eq!(percent_format("[%(name)-5s]", &ns).unwrap(), "[ada  ]");
        assert_eq!(percent_format("[%(name)5s]", &ns).unwrap(), "[  ada]");
        assert_eq!(percent_format("%(count)+d", &ns).unwrap(), "+7");
    }

    #[test]
    fn test_escaped_percent() {
        assert_eq!(percent_format("100%%", &ns()).unwrap(), "100%");
    }

    #[test]
    fn test_missing_name() {
        let err = percent_format("%(ghost)s", &ns()).unwrap_err();
        assert!(matches!(err, EfusError::NameNotFound { name } if name == "ghost"));
    }

    #[test]
    fn test_positional_directive_rejected() {
        assert!(matches!(
            percent_format("50%s", &ns()),
            Err(EfusError::Format { .. })
        ));
    }

    #[test]
    fn test_number_conversion_of_string_fails() {
        assert!(percent_format("%(name)d", &ns()).is_err());
    }

    #[test]
    fn test_integer_conversion_range() {
        let ns = ns();
        ns.set("huge", 1e20);
        ns.set("odd", 2.9);
        assert_eq!(percent_format("%(odd)d", &ns).unwrap(), "2");
        assert!(matches!(
            percent_format("%(huge)d", &ns),
            Err(EfusError::Format { message }) if message.contains("does not fit")
        ));
    }
}
