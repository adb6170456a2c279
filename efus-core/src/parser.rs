//! Indentation-sensitive parser for efus markup
//!
//! Every logical line is either a `using` statement or a tag definition
//! `name[&alias] attr=value ...`. Indentation decides nesting: a line
//! indented deeper than the previous one becomes its child, a line at the
//! same depth its sibling, and a shallower line closes blocks until it finds
//! its parent.

use crate::error::{EfusError, Result, SourceLocation, Span};
use crate::instr::{Attributes, Efus, ImportNames, Instr, RootDef, TagDef, UsingDef};
use crate::value::{Number, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static USING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^using\s+([\w.]+)(?:\s*:\s*(\*|\w+(?:\s*,\s*\w+)*))?\s*$").expect("valid using regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)(?:&(\w+))?").expect("valid tag regex"));
static ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w[\w:]*)=").expect("valid attribute regex"));
static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*").expect("valid identifier regex"));
static SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)x(\d+)").expect("valid size regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?\d+(?:\.\d+)?)([A-Za-z_]\w*)?").expect("valid number regex")
});

const YAML_FENCE: &str = "---";
const YAML_CLOSE: &str = "\n...";

/// One open block: its indentation and the position of its instruction
#[derive(Debug, Clone)]
struct Frame {
    indent: isize,
    path: Vec<usize>,
}

/// Incremental efus parser.
///
/// Text may be fed in several chunks; each chunk should end on a line
/// boundary.
#[derive(Debug)]
pub struct Parser {
    text: String,
    idx: usize,
    file: Option<String>,
    root: Instr,
    frames: Vec<Frame>,
}

impl Parser {
    pub fn new(file: Option<&str>) -> Self {
        Self {
            text: String::new(),
            idx: 0,
            file: file.map(str::to_string),
            root: Instr::Root(RootDef::default()),
            frames: vec![Frame {
                indent: -1,
                path: Vec::new(),
            }],
        }
    }

    /// Parse `text` as the continuation of everything fed so far
    pub fn feed(&mut self, text: &str) -> Result<&Instr> {
        self.text.push_str(text);
        while let Some(indent) = self.next_indent() {
            let start = self.idx;
            let instr = self.statement()?;
            self.place(indent as isize, instr, start)?;
        }
        Ok(&self.root)
    }

    /// Number of blocks open below the root
    pub fn open_depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn root(&self) -> &Instr {
        &self.root
    }

    pub fn finish(self) -> Efus {
        Efus::new(self.root, self.file)
    }

    fn location(&self, offset: usize) -> SourceLocation {
        SourceLocation::new(self.file.as_deref(), &self.text, offset)
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> EfusError {
        EfusError::syntax(message, self.location(offset))
    }

    fn rest(&self) -> &str {
        &self.text[self.idx..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skip blank lines and measure the indentation of the next statement.
    ///
    /// At end of input the cursor goes back to the start of the last line
    /// so a later `feed` continues from there.
    fn next_indent(&mut self) -> Option<usize> {
        let mut begin = self.idx;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => self.idx += 1,
                '\n' => {
                    self.idx += 1;
                    begin = self.idx;
                }
                _ => return Some(self.idx - begin),
            }
        }
        self.idx = begin;
        None
    }

    fn line_end(&self) -> usize {
        self.rest()
            .find('\n')
            .map_or(self.text.len(), |pos| self.idx + pos)
    }

    fn statement(&mut self) -> Result<Instr> {
        let start = self.idx;
        let line = &self.text[start..self.line_end()];
        let line = line.trim_end_matches('\r');

        if let Some(caps) = USING.captures(line) {
            let module = caps[1].to_string();
            let names = match caps.get(2).map(|m| m.as_str()) {
                None | Some("*") => ImportNames::All,
                Some(names) => ImportNames::Names(names.split(',').map(|n| n.trim().to_string()).collect()),
            };
            self.idx = self.line_end();
            debug!(module = %module, "parsed using");
            return Ok(Instr::Using(UsingDef {
                module,
                names,
                span: Span::new(start, self.idx),
            }));
        }
        if line.starts_with("using ") || line.starts_with("using\t") {
            return Err(self.error("Malformed using statement", start));
        }

        let Some(caps) = TAG.captures(line) else {
            return Err(self.error("Expected a tag or using statement", start));
        };
        let matched = caps[0].len();
        let name = caps[1].to_string();
        let alias = caps.get(2).map(|m| m.as_str().to_string());
        if !at_boundary(&line[matched..]) {
            return Err(self.error("Invalid tag name", start + matched));
        }
        self.idx += matched;

        let attributes = self.attributes()?;
        Ok(Instr::Tag(TagDef {
            name,
            alias,
            attributes,
            children: Vec::new(),
            span: Span::new(start, self.idx),
        }))
    }

    fn attributes(&mut self) -> Result<Attributes> {
        let mut attributes = Attributes::new();
        loop {
            while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                self.idx += 1;
            }
            if matches!(self.peek(), None | Some('\n')) {
                return Ok(attributes);
            }

            let start = self.idx;
            let Some(caps) = ATTR.captures(self.rest()) else {
                return Err(self.error("Expected an attribute `name=value`", start));
            };
            let name = caps[1].to_string();
            let matched = caps[0].len();
            self.idx += matched;
            let value = self.value()?;
            attributes.insert(name, value);
        }
    }

    /// Parse one attribute value, trying each literal form in order
    fn value(&mut self) -> Result<Value> {
        let start = self.idx;
        let rest = self.rest();

        if let Some(open) = yaml_open(rest) {
            return self.yaml_block(open);
        }

        if let Some(m) = IDENT.find(rest) {
            let end = m.end();
            if at_boundary(&rest[end..]) {
                let name = m.as_str().to_string();
                self.idx += end;
                return Ok(Value::Var(name));
            }
        }

        if let Some(caps) = SIZE.captures(rest) {
            let matched = caps[0].len();
            if at_boundary(&rest[matched..]) {
                let width = self.integer(&caps[1], start)?;
                let height = self.integer(&caps[2], start)?;
                self.idx += matched;
                return Ok(Value::Size(width, height));
            }
        }

        if let Some(caps) = NUMBER.captures(rest) {
            let matched = caps[0].len();
            if at_boundary(&rest[matched..]) {
                let number = self.number(&caps[1], start)?;
                let unit = caps.get(2).map(|m| m.as_str().to_string());
                self.idx += matched;
                return Ok(match unit {
                    Some(unit) => Value::Scalar {
                        coefficient: number,
                        unit,
                    },
                    None => Value::Number(number),
                });
            }
        }

        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.string(quote),
            Some('(') => self.expr(),
            Some('&') => self.name_binding(),
            _ => Err(self.error("Unknown literal", start)),
        }
    }

    fn integer(&self, digits: &str, offset: usize) -> Result<Number> {
        digits
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| self.error("Number out of range", offset))
    }

    fn number(&self, digits: &str, offset: usize) -> Result<Number> {
        if digits.contains('.') {
            digits
                .parse::<f64>()
                .map(Number::Decimal)
                .map_err(|_| self.error("Invalid decimal number", offset))
        } else {
            self.integer(digits, offset)
        }
    }

    /// `---\n ... \n...`, dedented by the indentation of its first line
    fn yaml_block(&mut self, open: usize) -> Result<Value> {
        let start = self.idx;
        let body_start = start + open;
        let Some(len) = self.text[body_start..].find(YAML_CLOSE) else {
            return Err(self.error("Unterminated YAML block", start));
        };
        let body = &self.text[body_start..body_start + len];
        let body = body.strip_suffix('\r').unwrap_or(body);
        let indent = body.len() - body.trim_start_matches([' ', '\t']).len();
        let text = body
            .lines()
            .map(|line| {
                let strip = line.len() - line.trim_start_matches([' ', '\t']).len();
                &line[strip.min(indent)..]
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.idx = body_start + len + YAML_CLOSE.len();
        Ok(Value::Yaml(text))
    }

    fn string(&mut self, quote: char) -> Result<Value> {
        let start = self.idx;
        self.idx += quote.len_utf8();
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("Unterminated string at end of input", start));
            };
            self.idx += c.len_utf8();
            match c {
                '\n' => return Err(self.error("Unterminated string before end of line", start)),
                c if c == quote => return Ok(Value::Str(out)),
                '\\' => self.escape(&mut out, start)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String, start: usize) -> Result<()> {
        let Some(c) = self.peek() else {
            return Err(self.error("Unterminated string at end of input", start));
        };
        let escape_at = self.idx - 1;
        self.idx += c.len_utf8();
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' => out.push(c),
            '\n' => {}
            'x' | 'u' => {
                let digits = if c == 'x' { 2 } else { 4 };
                let hex = self.rest().get(..digits).unwrap_or_default();
                let decoded = (hex.len() == digits && hex.chars().all(|h| h.is_ascii_hexdigit()))
                    .then(|| u32::from_str_radix(hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => {
                        out.push(ch);
                        self.idx += digits;
                    }
                    None => return Err(self.error(format!("Invalid \\{c} escape"), escape_at)),
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    /// Parenthesized expression; nesting and quotes are tracked so inner
    /// parentheses and quoted `)` do not close it
    fn expr(&mut self) -> Result<Value> {
        let start = self.idx;
        let mut stack: Vec<char> = Vec::new();
        while let Some(c) = self.peek() {
            self.idx += c.len_utf8();
            let in_quote = matches!(stack.last(), Some('"' | '\''));
            match c {
                '\\' if in_quote => {
                    if let Some(next) = self.peek() {
                        self.idx += next.len_utf8();
                    }
                }
                '"' | '\'' if in_quote && stack.last() == Some(&c) => {
                    stack.pop();
                }
                '"' | '\'' if !in_quote => stack.push(c),
                '(' if !in_quote => stack.push(c),
                ')' if !in_quote => {
                    stack.pop();
                    if stack.is_empty() {
                        let source = self.text[start + 1..self.idx - 1].to_string();
                        return Ok(Value::Expr(source));
                    }
                }
                _ => {}
            }
        }
        Err(self.error("Unterminated expression at end of input", start))
    }

    fn name_binding(&mut self) -> Result<Value> {
        let start = self.idx;
        let rest = &self.text[start + 1..];
        if rest.starts_with('(') {
            return Err(self.error("Expression bindings are not supported", start));
        }
        match IDENT.find(rest) {
            Some(m) if at_boundary(&rest[m.end()..]) => {
                let (name, end) = (m.as_str().to_string(), m.end());
                self.idx = start + 1 + end;
                Ok(Value::NameBinding(name))
            }
            _ => Err(self.error("Expected a name after `&`", start)),
        }
    }

    /// Attach `instr` to the tree according to its indentation
    fn place(&mut self, indent: isize, instr: Instr, offset: usize) -> Result<()> {
        let top = self.frames.last().map_or(-1, |frame| frame.indent);
        let parent = if indent > top {
            self.frames.len() - 1
        } else if indent == top {
            self.frames.pop();
            self.frames.len() - 1
        } else {
            while self.frames.last().is_some_and(|frame| indent <= frame.indent) {
                self.frames.pop();
            }
            if self.frames.is_empty() {
                return Err(self.error("Fatal: code has two parse roots", offset));
            }
            self.frames.len() - 1
        };

        let mut path = self.frames[parent].path.clone();
        let attached = node_at(&mut self.root, &path)
            .and_then(Instr::children_mut)
            .map(|children| {
                children.push(instr);
                children.len() - 1
            });
        match attached {
            Some(index) => {
                path.push(index);
                self.frames.push(Frame { indent, path });
                Ok(())
            }
            None => Err(self.error("Using statements cannot have children", offset)),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(None)
    }
}

fn node_at<'a>(root: &'a mut Instr, path: &[usize]) -> Option<&'a mut Instr> {
    path.iter()
        .try_fold(root, |node, &index| node.children_mut()?.get_mut(index))
}

/// Length of a YAML opening fence (`---` plus its line ending) at the start of `rest`
fn yaml_open(rest: &str) -> Option<usize> {
    let after = rest.strip_prefix(YAML_FENCE)?;
    let newline = after.strip_prefix('\r').unwrap_or(after);
    newline
        .starts_with('\n')
        .then(|| rest.len() - newline.len() + 1)
}

/// A literal must be followed by whitespace or the end of input
fn at_boundary(rest: &str) -> bool {
    rest.chars().next().map_or(true, char::is_whitespace)
}

/// Parse a complete program
pub fn parse_code(text: &str, file: Option<&str>) -> Result<Efus> {
    let mut parser = Parser::new(file);
    parser.feed(text)?;
    Ok(parser.finish())
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Efus> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| EfusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_code(&text, Some(&path.display().to_string()))
}
