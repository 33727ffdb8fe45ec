use std::fmt;

use oxc_span::Span;
use oxc_syntax::symbol::SymbolId;

use crate::scope::ScopeId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(pub(crate) usize);

impl BindingId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a name was declared
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
#[cfg_attr(feature = "json-out", serde(rename_all = "kebab-case"))]
pub enum BindingKind {
    Variable,
    ObjectField,
    ArrayElement,
    NestedField,
    Parameter,
    Function,
    Class,
    Import,
}

impl BindingKind {
    /// Tie-breaker for findings that start at the same offset
    pub fn precedence(self) -> u8 {
        match self {
            BindingKind::Variable
            | BindingKind::Function
            | BindingKind::Class
            | BindingKind::Import => 0,
            BindingKind::ObjectField | BindingKind::ArrayElement | BindingKind::NestedField => 1,
            BindingKind::Parameter => 2,
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            BindingKind::Variable => "variable",
            BindingKind::ObjectField => "object field",
            BindingKind::ArrayElement => "array element",
            BindingKind::NestedField => "nested field",
            BindingKind::Parameter => "parameter",
            BindingKind::Function => "function",
            BindingKind::Class => "class",
            BindingKind::Import => "import",
        };
        write!(fmt, "{}", text)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Slot {
    Named,
    /// `...rest` in an object/array pattern or parameter list
    Rest,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    /// The identifier at the declaration site
    pub span: Span,
    pub symbol: SymbolId,
    pub kind: BindingKind,
    pub slot: Slot,
    pub scope: ScopeId,
    pub site: SiteId,
    /// Initializer or body in which references are self references
    pub own: Option<Span>,
    pub exported: bool,
    pub exempt: bool,
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.name == other.name
    }
}
impl Eq for Binding {}

impl Binding {
    pub fn is_rest(&self) -> bool {
        self.slot == Slot::Rest
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(pub(crate) usize);

/// Shape of a binding pattern, kept after the syntax tree is gone.
#[derive(Debug, Clone)]
pub enum Pattern {
    Name(BindingId),
    /// `target = value`
    Default { target: Box<Pattern>, pure: bool },
    /// `...target`
    Rest(Box<Pattern>),
    Object(Vec<Item>),
    /// Holes are left out
    Array(Vec<Item>),
}

/// Entry of a comma separated list: a pattern property or element, a
/// parameter, a declarator or an import clause part.
#[derive(Debug, Clone)]
pub struct Item {
    pub span: Span,
    pub pattern: Pattern,
    /// `[key]: target` with a key that has effects
    pub effects: bool,
}

impl Pattern {
    /// Binding leaves, left to right
    pub fn leaves(&self) -> Vec<BindingId> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut Vec<BindingId>) {
        match self {
            Pattern::Name(id) => leaves.push(*id),
            Pattern::Default { target, .. } | Pattern::Rest(target) => {
                target.collect_leaves(leaves)
            }
            Pattern::Object(items) | Pattern::Array(items) => {
                for item in items {
                    item.pattern.collect_leaves(leaves);
                }
            }
        }
    }
}

/// The construct that declared a group of bindings
#[derive(Debug, Clone)]
pub enum Site {
    /// `var`, `let` or `const` statement
    Declaration {
        span: Span,
        /// Directly inside a statement list
        listed: bool,
        /// Each item's `effects` is an initializer with effects
        declarators: Vec<Item>,
    },
    Params {
        span: Span,
        items: Vec<Item>,
        /// End of a TypeScript `this` parameter
        this_end: Option<u32>,
        parenthesized: bool,
        /// The function reads `arguments`
        pinned: bool,
    },
    Function {
        span: Span,
        listed: bool,
    },
    Class {
        span: Span,
        name: BindingId,
        listed: bool,
        pure: bool,
    },
    Import {
        span: Span,
        /// Default, namespace and `{ … }` parts
        clause: Vec<Item>,
    },
    Catch,
}

impl Site {
    /// Source range the whole site occupies, if it can be deleted as one
    pub fn span(&self) -> Option<Span> {
        match self {
            Site::Declaration { span, .. }
            | Site::Params { span, .. }
            | Site::Function { span, .. }
            | Site::Class { span, .. }
            | Site::Import { span, .. } => Some(*span),
            Site::Catch => None,
        }
    }
}
