//! Instruction tree produced by the parser

use crate::component::ComponentRef;
use crate::error::{EfusError, Result, Span};
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Attribute values of a tag, by name
pub type Attributes = BTreeMap<String, Value>;

/// Name of the namespace slot a program may fill to choose its result
pub const RETURN_SLOT: &str = "return";

/// Names requested by a `using` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportNames {
    /// `using module: *`
    All,
    Names(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RootDef {
    pub children: Vec<Instr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagDef {
    pub name: String,
    pub alias: Option<String>,
    pub attributes: Attributes,
    pub children: Vec<Instr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsingDef {
    pub module: String,
    pub names: ImportNames,
    pub span: Span,
}

/// One statement of an efus program and its nested statements
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Root(RootDef),
    Tag(TagDef),
    Using(UsingDef),
}

impl Instr {
    pub fn kind(&self) -> &'static str {
        match self {
            Instr::Root(_) => "RootDef",
            Instr::Tag(_) => "TagDef",
            Instr::Using(_) => "UsingDef",
        }
    }

    pub fn children(&self) -> &[Instr] {
        match self {
            Instr::Root(root) => &root.children,
            Instr::Tag(tag) => &tag.children,
            Instr::Using(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Instr>> {
        match self {
            Instr::Root(root) => Some(&mut root.children),
            Instr::Tag(tag) => Some(&mut tag.children),
            Instr::Using(_) => None,
        }
    }

    /// Evaluate this instruction and its children.
    ///
    /// Children are evaluated against the same namespace with the produced
    /// component as their parent, and attached to it.
    pub fn eval(
        &self,
        namespace: &NamespaceRef,
        parent: Option<&ComponentRef>,
    ) -> Result<Option<ComponentRef>> {
        match self {
            Instr::Root(root) => root.eval(namespace, parent),
            Instr::Tag(tag) => tag.eval(namespace, parent),
            Instr::Using(using) => {
                debug!(module = %using.module, offset = using.span.start, "using");
                namespace.import_module(&using.module, &using.names)?;
                Ok(None)
            }
        }
    }

    /// Indented outline of the tree, one statement per line
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.write_dump(&mut out, 0);
        out
    }

    fn write_dump(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.to_string());
        out.push('\n');
        for child in self.children() {
            child.write_dump(out, depth + 1);
        }
    }
}

impl RootDef {
    fn eval(&self, namespace: &NamespaceRef, parent: Option<&ComponentRef>) -> Result<Option<ComponentRef>> {
        namespace.set(RETURN_SLOT, RuntimeValue::Nil);
        let mut last = None;
        for child in &self.children {
            if let Some(component) = child.eval(namespace, parent)? {
                last = Some(component);
            }
        }
        match namespace.local(RETURN_SLOT) {
            None | Some(RuntimeValue::Nil) => Ok(last),
            Some(RuntimeValue::Component(component)) => Ok(Some(component)),
            Some(other) => Err(EfusError::cast(
                format!("`{RETURN_SLOT}` value {other}"),
                "Component",
            )),
        }
    }
}

impl TagDef {
    fn eval(&self, namespace: &NamespaceRef, parent: Option<&ComponentRef>) -> Result<Option<ComponentRef>> {
        let factory = match namespace.get_name(&self.name) {
            Ok(RuntimeValue::Factory(factory)) => factory,
            Ok(other) => {
                return Err(EfusError::NotAComponent {
                    name: self.name.clone(),
                    kind: other.kind(),
                })
            }
            Err(EfusError::NameNotFound { name }) => return Err(EfusError::ComponentNotFound { name }),
            Err(err) => return Err(err),
        };

        debug!(
            tag = %self.name,
            offset = self.span.start,
            attributes = self.attributes.len(),
            "creating component"
        );
        let this = factory.create(namespace, &self.attributes, parent)?;
        if let (Some(alias), Some(component)) = (&self.alias, &this) {
            namespace.set(alias, component.clone());
        }

        for child in &self.children {
            let created = child.eval(namespace, this.as_ref())?;
            if let (Some(this), Some(created)) = (&this, created) {
                this.add_child(created);
            }
        }
        Ok(this)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Root(_) => write!(f, "root"),
            Instr::Tag(tag) => {
                write!(f, "{}", tag.name)?;
                if let Some(alias) = &tag.alias {
                    write!(f, "&{alias}")?;
                }
                for (name, value) in &tag.attributes {
                    write!(f, " {name}={value}")?;
                }
                Ok(())
            }
            Instr::Using(using) => {
                write!(f, "using {}", using.module)?;
                match &using.names {
                    ImportNames::All => write!(f, ": *"),
                    ImportNames::Names(names) => write!(f, ": {}", names.join(", ")),
                }
            }
        }
    }
}

/// A parsed efus program
#[derive(Debug, Clone, PartialEq)]
pub struct Efus {
    pub root: Instr,
    pub file: Option<String>,
}

impl Efus {
    pub fn new(root: Instr, file: Option<String>) -> Self {
        Self { root, file }
    }

    /// Evaluate the program with `parent` as the parent of its top-level
    /// components
    pub fn translate(
        &self,
        namespace: &NamespaceRef,
        parent: Option<&ComponentRef>,
    ) -> Result<Option<ComponentRef>> {
        debug!(file = self.file.as_deref().unwrap_or(crate::error::STRING_SOURCE), "evaluating");
        self.root.eval(namespace, parent)
    }

    pub fn eval(&self, namespace: &NamespaceRef) -> Result<Option<ComponentRef>> {
        self.translate(namespace, None)
    }
}
