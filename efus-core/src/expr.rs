//! Default evaluator for parenthesized expressions
//!
//! Supports numbers, quoted strings, names (with `.field` access into maps),
//! parentheses, unary `-`/`!`/`not`, arithmetic, comparisons and the
//! short-circuiting `&&`/`||`, with the usual precedence.

use crate::capability::ExprEvaluator;
use crate::error::{EfusError, Result};
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use crate::value::Number;
use std::cmp::Ordering;

/// Binary operators (higher number = tighter binding), all left-associative
const PRECEDENCE: &[(&[&str], u8)] = &[
    (&["||"], 1),
    (&["&&"], 2),
    (&["==", "!="], 3),
    (&["<", "<=", ">", ">="], 4),
    (&["+", "-"], 5),
    (&["*", "/", "%"], 6),
];

fn get_precedence(op: &str) -> Option<u8> {
    PRECEDENCE
        .iter()
        .find(|(ops, _)| ops.contains(&op))
        .map(|(_, prec)| *prec)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Dot,
}

const OPERATORS: &[&str] = &[
    "||", "&&", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "!",
];

/// [`ExprEvaluator`] for simple arithmetic and comparisons
#[derive(Debug, Default, Clone, Copy)]
pub struct ArithmeticEvaluator;

impl ExprEvaluator for ArithmeticEvaluator {
    fn eval_expr(&self, source: &str, namespace: &NamespaceRef) -> Result<RuntimeValue> {
        let fail = |message: String| EfusError::Expr {
            expression: source.to_string(),
            message,
        };
        let tokens = tokenize(source).map_err(fail)?;
        let mut parser = ExprParser {
            tokens,
            pos: 0,
            skipping: false,
            namespace,
        };
        let value = parser.expression(0).map_err(|err| match err {
            Failure::Message(message) => fail(message),
            Failure::Efus(err) => err,
        })?;
        match parser.peek() {
            None => Ok(value),
            Some(token) => Err(fail(format!("unexpected {token:?}"))),
        }
    }
}

fn tokenize(source: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '0'..='9' => {
                let mut end = start;
                let mut seen_dot = false;
                while let Some(&(i, c)) = chars.peek() {
                    let fraction = c == '.'
                        && !seen_dot
                        && source[i + 1..].starts_with(|d: char| d.is_ascii_digit());
                    if c.is_ascii_digit() || fraction {
                        seen_dot |= fraction;
                        end = i + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[start..end];
                let number = if seen_dot {
                    text.parse().map(Number::Decimal).map_err(|e| format!("{e}"))?
                } else {
                    text.parse().map(Number::Int).map_err(|e| format!("{e}"))?
                };
                tokens.push(Token::Number(number));
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, 't')) => text.push('\t'),
                            Some((_, other)) => text.push(other),
                            None => break,
                        },
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => text.push(ch),
                    }
                }
                if !closed {
                    return Err("unterminated string".into());
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &source[start..end];
                tokens.push(match word {
                    "and" => Token::Op("&&"),
                    "or" => Token::Op("||"),
                    "not" => Token::Op("!"),
                    _ => Token::Ident(word.to_string()),
                });
            }
            _ => {
                let rest = &source[start..];
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(*op))
                    .ok_or_else(|| format!("unexpected character `{c}`"))?;
                for _ in 0..op.len() {
                    chars.next();
                }
                tokens.push(Token::Op(*op));
            }
        }
    }
    Ok(tokens)
}

enum Failure {
    Message(String),
    Efus(EfusError),
}

impl From<EfusError> for Failure {
    fn from(err: EfusError) -> Self {
        Failure::Efus(err)
    }
}

type Eval<T> = std::result::Result<T, Failure>;

fn fail<T>(message: impl Into<String>) -> Eval<T> {
    Err(Failure::Message(message.into()))
}

struct ExprParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    /// Set while parsing an operand that `&&`/`||` has already decided
    skipping: bool,
    namespace: &'a NamespaceRef,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Precedence climbing over the binary operator table
    fn expression(&mut self, min_prec: u8) -> Eval<RuntimeValue> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let Some(prec) = get_precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let decided = match op {
                "||" => lhs.truthy(),
                "&&" => !lhs.truthy(),
                _ => false,
            };
            if decided || self.skipping {
                let outer = std::mem::replace(&mut self.skipping, true);
                let parsed = self.expression(prec + 1);
                self.skipping = outer;
                parsed?;
            } else {
                let rhs = self.expression(prec + 1)?;
                lhs = binary(op, lhs, rhs)?;
            }
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Eval<RuntimeValue> {
        match self.peek() {
            Some(Token::Op("-")) => {
                self.pos += 1;
                match self.unary()? {
                    _ if self.skipping => Ok(RuntimeValue::Nil),
                    RuntimeValue::Number(n) => Ok(RuntimeValue::Number(n.neg())),
                    other => fail(format!("cannot negate {}", other.kind())),
                }
            }
            Some(Token::Op("!")) => {
                self.pos += 1;
                Ok(RuntimeValue::Bool(!self.unary()?.truthy()))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Eval<RuntimeValue> {
        let mut value = self.primary()?;
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            let Some(Token::Ident(field)) = self.next() else {
                return fail("expected a field name after `.`");
            };
            if self.skipping {
                continue;
            }
            value = match value.as_map().and_then(|map| map.get(&field)) {
                Some(inner) => inner.clone(),
                None => return fail(format!("{} has no field `{field}`", value.kind())),
            };
        }
        Ok(value)
    }

    fn primary(&mut self) -> Eval<RuntimeValue> {
        match self.next() {
            Some(Token::Number(n)) => Ok(RuntimeValue::Number(n)),
            Some(Token::Str(s)) => Ok(RuntimeValue::Str(s)),
            Some(Token::Ident(_)) if self.skipping => Ok(RuntimeValue::Nil),
            Some(Token::Ident(name)) => Ok(self.namespace.get_name(&name)?),
            Some(Token::LParen) => {
                let value = self.expression(0)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => fail("expected `)`"),
                }
            }
            Some(token) => fail(format!("unexpected {token:?}")),
            None => fail("unexpected end of expression"),
        }
    }
}

fn binary(op: &str, lhs: RuntimeValue, rhs: RuntimeValue) -> Eval<RuntimeValue> {
    use RuntimeValue::{Bool, Number as Num, Str};
    let value = match (op, lhs, rhs) {
        ("||", l, r) => {
            if l.truthy() {
                l
            } else {
                r
            }
        }
        ("&&", l, r) => {
            if l.truthy() {
                r
            } else {
                l
            }
        }
        ("==", l, r) => Bool(l == r),
        ("!=", l, r) => Bool(l != r),
        ("<" | "<=" | ">" | ">=", l, r) => {
            let ordering = match (&l, &r) {
                (Num(a), Num(b)) => a.partial_cmp(b),
                (Str(a), Str(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return fail(format!("cannot compare {} and {}", l.kind(), r.kind()));
            };
            Bool(match op {
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        ("+", Str(a), Str(b)) => Str(a + &b),
        ("+", Num(a), Num(b)) => Num(a.add(b)),
        ("-", Num(a), Num(b)) => Num(a.sub(b)),
        ("*", Num(a), Num(b)) => Num(a.mul(b)),
        ("/", Num(a), Num(b)) => match a.div(b) {
            Some(n) => Num(n),
            None => return fail("division by zero"),
        },
        ("%", Num(a), Num(b)) => match a.rem(b) {
            Some(n) => Num(n),
            None => return fail("modulo by zero"),
        },
        (op, l, r) => {
            return fail(format!(
                "unsupported operands for `{op}`: {} and {}",
                l.kind(),
                r.kind()
            ))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;

    fn eval(source: &str) -> Result<RuntimeValue> {
        let ns = Namespace::new();
        ns.set("width", 40);
        ns.set("name", "efus");
        let mut theme = std::collections::BTreeMap::new();
        theme.insert("gap".to_string(), RuntimeValue::from(4));
        ns.set("theme", theme);
        ArithmeticEvaluator.eval_expr(source, &ns)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), RuntimeValue::from(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), RuntimeValue::from(9));
        assert_eq!(eval("10 - 4 - 3").unwrap(), RuntimeValue::from(3));
        assert_eq!(eval("-2 * 3").unwrap(), RuntimeValue::from(-6));
    }

    #[test]
    fn test_division_is_decimal() {
        assert_eq!(eval("width / 8").unwrap(), RuntimeValue::from(5.0));
        assert_eq!(eval("7 % 3").unwrap(), RuntimeValue::from(1));
        assert_eq!(eval("1.5 * 2").unwrap(), RuntimeValue::from(3.0));
    }

    #[test]
    fn test_names_and_fields() {
        assert_eq!(eval("width + theme.gap").unwrap(), RuntimeValue::from(44));
        assert_eq!(eval("name + '!'").unwrap(), RuntimeValue::from("efus!"));
        assert!(matches!(
            eval("missing + 1"),
            Err(EfusError::NameNotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("width > 30 && width <= 40").unwrap(), RuntimeValue::Bool(true));
        assert_eq!(eval("not (width == 40)").unwrap(), RuntimeValue::Bool(false));
        assert_eq!(eval("nil || 'fallback'").unwrap(), RuntimeValue::from("fallback"));
    }

    #[test]
    fn test_logic_skips_decided_operand() {
        assert_eq!(eval("width || missing").unwrap(), RuntimeValue::from(40));
        assert_eq!(eval("0 && (1 / 0)").unwrap(), RuntimeValue::from(0));
        assert_eq!(
            eval("nil && missing.field + -name || 'ok'").unwrap(),
            RuntimeValue::from("ok")
        );
        // A skipped operand must still parse
        assert!(matches!(eval("width || (1 +"), Err(EfusError::Expr { .. })));
        // The undecided side is still evaluated
        assert!(matches!(
            eval("nil || missing"),
            Err(EfusError::NameNotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(eval("1 / 0"), Err(EfusError::Expr { .. })));
        assert!(matches!(eval("1 +"), Err(EfusError::Expr { .. })));
        assert!(matches!(eval("1 2"), Err(EfusError::Expr { .. })));
        assert!(matches!(eval("'open"), Err(EfusError::Expr { .. })));
        let err = eval("name - 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expression `name - 1` failed: unsupported operands for `-`: Str and Number"
        );
    }
}
