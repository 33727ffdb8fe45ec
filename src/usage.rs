use std::collections::HashSet;

use oxc_semantic::Semantic;
use oxc_span::Span;
use tracing::warn;

use crate::{
    binding::{Binding, BindingId},
    scope::{covers, ScopeTree},
};

/// Names that resolve outside of any unit.
pub const KNOWN_GLOBALS: &[&str] = &[
    // runtime
    "globalThis", "window", "self", "document", "console", "process", "require", "module",
    "exports", "__dirname", "__filename", "global", "navigator", "location", "localStorage",
    "sessionStorage", "performance", "crypto", "fetch", "alert", "atob", "btoa", "Buffer",
    "setTimeout", "clearTimeout", "setInterval", "clearInterval", "setImmediate",
    "clearImmediate", "queueMicrotask", "structuredClone", "undefined", "NaN", "Infinity",
    "isNaN", "isFinite", "parseInt", "parseFloat", "encodeURI", "decodeURI",
    "encodeURIComponent", "decodeURIComponent", "arguments",
    // constructors and namespaces
    "Object", "Function", "Array", "String", "Number", "Boolean", "Symbol", "BigInt", "Math",
    "JSON", "Date", "RegExp", "Error", "TypeError", "RangeError", "SyntaxError",
    "ReferenceError", "EvalError", "URIError", "AggregateError", "Promise", "Proxy", "Reflect",
    "Map", "Set", "WeakMap", "WeakSet", "WeakRef", "FinalizationRegistry", "Intl",
    "ArrayBuffer", "SharedArrayBuffer", "DataView", "Int8Array", "Uint8Array",
    "Uint8ClampedArray", "Int16Array", "Uint16Array", "Int32Array", "Uint32Array",
    "Float32Array", "Float64Array", "BigInt64Array", "BigUint64Array", "URL",
    "URLSearchParams", "TextEncoder", "TextDecoder", "AbortController", "Event", "EventTarget",
    "Headers", "Request", "Response", "FormData", "Blob", "File", "ReadableStream",
    "WritableStream",
    // TypeScript
    "Record", "Partial", "Required", "Readonly", "Pick", "Omit", "Exclude", "Extract",
    "NonNullable", "ReturnType", "Parameters", "InstanceType", "Awaited", "PromiseLike",
    "ArrayLike", "Iterable", "Iterator", "AsyncIterable", "PropertyKey", "ThisType",
    // JSX
    "React",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resolution {
    Binding(BindingId),
    /// A built-in or configured global
    Global,
    /// No declaration anywhere; treated as used
    Unresolved,
}

/// One identifier occurrence that is not a declaration site
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    pub resolution: Resolution,
    pub access: Access,
    /// Inside the declaration of the binding it resolves to
    pub self_reference: bool,
}

/// Per-binding reference counts
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Tally {
    pub reads: usize,
    pub writes: usize,
    pub self_refs: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    /// Sorted by position
    pub references: Vec<Reference>,
}

impl Usage {
    /// Attach every resolved reference to the binding it names, and
    /// sort the rest into globals and unresolved names.
    pub fn collect(semantic: &Semantic<'_>, tree: &ScopeTree, globals: &[String]) -> Self {
        let mut references = Vec::new();
        let mut seen = HashSet::new();
        for (id, binding) in tree.bindings() {
            // redeclarations share the symbol of the first binding
            if !seen.insert(binding.symbol) {
                continue;
            }
            for reference in semantic.symbol_references(binding.symbol) {
                let span = semantic.reference_span(reference);
                if tree.is_export_mark(span) {
                    continue;
                }
                let read = reference.is_read() || !reference.is_write();
                let write = reference.is_write();
                let self_reference = is_self_reference(binding, span);
                let accesses: &[Access] = if self_reference {
                    &[Access::Write]
                } else {
                    match (read, write) {
                        (true, true) => &[Access::Read, Access::Write],
                        (false, true) => &[Access::Write],
                        _ => &[Access::Read],
                    }
                };
                for access in accesses {
                    references.push(Reference {
                        name: binding.name.clone(),
                        span,
                        resolution: Resolution::Binding(id),
                        access: *access,
                        self_reference,
                    });
                }
            }
        }

        let scoping = semantic.scoping();
        for (name, ids) in scoping.root_unresolved_references() {
            let name = name.to_string();
            let global = KNOWN_GLOBALS.contains(&name.as_str())
                || globals.iter().any(|global| *global == name);
            let mut valued = false;
            for id in ids {
                let reference = scoping.get_reference(*id);
                valued |= !reference.is_type();
                let span = semantic.reference_span(reference);
                if tree.is_export_mark(span) {
                    continue;
                }
                references.push(Reference {
                    name: name.clone(),
                    span,
                    resolution: if global {
                        Resolution::Global
                    } else {
                        Resolution::Unresolved
                    },
                    access: if reference.is_write() && !reference.is_read() {
                        Access::Write
                    } else {
                        Access::Read
                    },
                    self_reference: false,
                });
            }
            if !global && valued {
                warn!(name = %name, "unresolved reference treated as used");
            }
        }

        references.sort_by_key(|reference| (reference.span.start, reference.span.end));
        Usage { references }
    }

    /// Count references per binding, skipping those inside `removed`.
    pub fn tallies(&self, tree: &ScopeTree, removed: &[Span]) -> Vec<Tally> {
        let mut tallies = vec![Tally::default(); tree.binding_count()];
        for reference in &self.references {
            let id = match reference.resolution {
                Resolution::Binding(id) => id,
                _ => continue,
            };
            if removed.iter().any(|span| covers(*span, reference.span)) {
                continue;
            }
            let tally = &mut tallies[id.index()];
            if reference.self_reference {
                tally.self_refs += 1;
            } else {
                match reference.access {
                    Access::Read => tally.reads += 1,
                    Access::Write => tally.writes += 1,
                }
            }
        }
        tallies
    }
}

/// Whether `span` lies in the initializer or body of the binding's own
/// declaration. Destructuring siblings may legitimately read each other,
/// so only single-name declarations carry an `own` range.
fn is_self_reference(binding: &Binding, span: Span) -> bool {
    binding
        .own
        .map_or(false, |own| covers(own, span) && !covers(binding.span, span))
}
