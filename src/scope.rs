use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
};

use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_semantic::Scoping;
use oxc_span::{GetSpan, Span};
use oxc_syntax::{
    scope::{ScopeFlags, ScopeId as SemanticScopeId},
    symbol::SymbolId,
};

use crate::{
    binding::{Binding, BindingId, BindingKind, Item, Pattern, Site, SiteId, Slot},
    dead_code::{is_pure, is_pure_class},
    error::{Error, Result},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub(crate) usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
}

/// Lexical region that declares variables
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    names: HashMap<String, BindingId>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<BindingId> {
        self.names.get(name).copied()
    }

    /// The Bindings this Scope introduces, in no particular order
    pub fn bindings(&self) -> impl Iterator<Item = BindingId> + '_ {
        self.names.values().copied()
    }
}

/// Arena of scopes, bindings and declaration sites for one unit.
///
/// Owns no syntax: declaration sites keep the spans and pattern shapes
/// the later stages need, so the tree outlives the parsed program.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    sites: Vec<Site>,
    by_symbol: HashMap<SymbolId, BindingId>,
    /// Identifiers in `export { a }`, `export default a` and `export = a`
    export_marks: HashSet<Span>,
}

impl ScopeTree {
    /// Build the tree in one traversal, then mark exports.
    pub fn build(program: &Program<'_>, scoping: &Scoping, src: &str) -> Result<Self> {
        let mut builder = Builder {
            src,
            scoping,
            tree: ScopeTree::default(),
            scope_ids: HashMap::new(),
            stack: Vec::new(),
            listed: HashSet::new(),
            functions: Vec::new(),
            setter: None,
            exported_spans: Vec::new(),
            exported_names: Vec::new(),
            error: None,
        };
        builder.visit_program(program);
        builder.finish()
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0]
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| (BindingId(i), binding))
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.0]
    }

    /// The first binding declared for `symbol`
    pub fn binding_of(&self, symbol: SymbolId) -> Option<BindingId> {
        self.by_symbol.get(&symbol).copied()
    }

    /// Whether the identifier at `span` names an export rather than using it
    pub fn is_export_mark(&self, span: Span) -> bool {
        self.export_marks.contains(&span)
    }

    /// Innermost binding of `name` visible from `scope`
    pub fn resolve(&self, mut scope: ScopeId, name: &str) -> Option<BindingId> {
        loop {
            let current = self.scope(scope);
            if let Some(id) = current.get(name) {
                return Some(id);
            }
            scope = current.parent?;
        }
    }

    fn open(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent,
            children: Vec::new(),
            names: HashMap::new(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.0].children.push(id);
        }
        id
    }
}

pub(crate) fn covers(outer: Span, inner: Span) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

struct Builder<'s> {
    src: &'s str,
    scoping: &'s Scoping,
    tree: ScopeTree,
    scope_ids: HashMap<SemanticScopeId, ScopeId>,
    stack: Vec<ScopeId>,
    /// Declarations sitting directly in a statement list
    listed: HashSet<Span>,
    /// Parameter sites of the enclosing non-arrow functions
    functions: Vec<Option<SiteId>>,
    /// The next function is this setter
    setter: Option<Span>,
    exported_spans: Vec<Span>,
    exported_names: Vec<String>,
    error: Option<Error>,
}

impl<'s> Builder<'s> {
    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn next_site(&self) -> SiteId {
        SiteId(self.tree.sites.len())
    }

    fn declare(
        &mut self,
        ident: &BindingIdentifier<'_>,
        site: SiteId,
        kind: BindingKind,
        slot: Slot,
        own: Option<Span>,
        mut exempt: bool,
    ) -> Result<BindingId> {
        let symbol = ident
            .symbol_id
            .get()
            .ok_or_else(|| Error::structural("binding without a symbol", ident.span))?;
        let id = BindingId(self.tree.bindings.len());
        if let Some(previous) = self.tree.by_symbol.get(&symbol) {
            // redeclaration keeps both alive
            self.tree.bindings[previous.0].exempt = true;
            exempt = true;
        } else {
            self.tree.by_symbol.insert(symbol, id);
        }
        self.tree.bindings.push(Binding {
            name: ident.name.to_string(),
            span: ident.span,
            symbol,
            kind,
            slot,
            // placed in `finish`
            scope: ScopeId(0),
            site,
            own,
            exported: false,
            exempt,
        });
        Ok(id)
    }

    /// Declare every leaf of a binding pattern.
    fn pattern(
        &mut self,
        pattern: &BindingPattern<'_>,
        site: SiteId,
        kind: BindingKind,
        slot: Slot,
        own: Option<Span>,
        exempt: bool,
    ) -> Result<Pattern> {
        let nested = |container: BindingKind| match kind {
            BindingKind::Variable | BindingKind::Parameter => container,
            _ => BindingKind::NestedField,
        };
        let shape = match &pattern.kind {
            BindingPatternKind::BindingIdentifier(ident) => {
                Pattern::Name(self.declare(ident, site, kind, slot, own, exempt)?)
            }
            BindingPatternKind::AssignmentPattern(assign) => {
                let target = self.pattern(&assign.left, site, kind, slot, own, exempt)?;
                Pattern::Default {
                    target: Box::new(target),
                    pure: is_pure(&assign.right),
                }
            }
            BindingPatternKind::ObjectPattern(object) => {
                let field = nested(BindingKind::ObjectField);
                let mut items = Vec::with_capacity(object.properties.len() + 1);
                for property in &object.properties {
                    let value = self.pattern(&property.value, site, field, Slot::Named, None, exempt)?;
                    let effects = property.computed
                        && !property.key.as_expression().map_or(true, is_pure);
                    items.push(Item {
                        span: property.span,
                        pattern: value,
                        effects,
                    });
                }
                if let Some(rest) = &object.rest {
                    let target = self.pattern(&rest.argument, site, field, Slot::Rest, None, exempt)?;
                    items.push(Item {
                        span: rest.span,
                        pattern: Pattern::Rest(Box::new(target)),
                        effects: false,
                    });
                }
                Pattern::Object(items)
            }
            BindingPatternKind::ArrayPattern(array) => {
                let element = nested(BindingKind::ArrayElement);
                let mut items = Vec::with_capacity(array.elements.len() + 1);
                for target in array.elements.iter().flatten() {
                    let value = self.pattern(target, site, element, Slot::Named, None, exempt)?;
                    items.push(Item {
                        span: target.span(),
                        pattern: value,
                        effects: false,
                    });
                }
                if let Some(rest) = &array.rest {
                    let target = self.pattern(&rest.argument, site, element, Slot::Rest, None, exempt)?;
                    items.push(Item {
                        span: rest.span,
                        pattern: Pattern::Rest(Box::new(target)),
                        effects: false,
                    });
                }
                Pattern::Array(items)
            }
        };
        Ok(shape)
    }

    fn params(
        &mut self,
        params: &FormalParameters<'_>,
        this_end: Option<u32>,
        parenthesized: bool,
        setter: bool,
    ) -> Result<SiteId> {
        let site = self.next_site();
        let mut items = Vec::with_capacity(params.items.len() + 1);
        for param in &params.items {
            // constructor parameter properties are class members
            let property = param.accessibility.is_some() || param.readonly || param.r#override;
            let pattern = self.pattern(
                &param.pattern,
                site,
                BindingKind::Parameter,
                Slot::Named,
                None,
                setter || property,
            )?;
            items.push(Item {
                span: param.span,
                pattern,
                effects: false,
            });
        }
        if let Some(rest) = &params.rest {
            let target = self.pattern(
                &rest.argument,
                site,
                BindingKind::Parameter,
                Slot::Rest,
                None,
                setter,
            )?;
            items.push(Item {
                span: rest.span,
                pattern: Pattern::Rest(Box::new(target)),
                effects: false,
            });
        }
        self.tree.sites.push(Site::Params {
            span: params.span,
            items,
            this_end,
            parenthesized,
            pinned: false,
        });
        Ok(site)
    }

    fn declaration(&mut self, declaration: &VariableDeclaration<'_>) -> Result<()> {
        let site = self.next_site();
        let mut declarators = Vec::with_capacity(declaration.declarations.len());
        for declarator in &declaration.declarations {
            let own = match declarator.id.kind {
                BindingPatternKind::BindingIdentifier(_) => Some(declarator.span),
                _ => None,
            };
            let pattern = self.pattern(
                &declarator.id,
                site,
                BindingKind::Variable,
                Slot::Named,
                own,
                false,
            )?;
            declarators.push(Item {
                span: declarator.span,
                pattern,
                effects: !declarator.init.as_ref().map_or(true, is_pure),
            });
        }
        self.tree.sites.push(Site::Declaration {
            span: declaration.span,
            listed: self.listed.contains(&declaration.span),
            declarators,
        });
        Ok(())
    }

    fn import(&mut self, import: &ImportDeclaration<'_>) -> Result<()> {
        let specifiers = match &import.specifiers {
            Some(specifiers) if !specifiers.is_empty() => specifiers,
            // `import 'polyfill'` declares nothing
            _ => return Ok(()),
        };
        let site = self.next_site();
        let mut clause = Vec::with_capacity(3);
        let mut named = Vec::new();
        for specifier in specifiers {
            let (span, local, list) = match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                    (default.span, &default.local, &mut clause)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                    (namespace.span, &namespace.local, &mut clause)
                }
                ImportDeclarationSpecifier::ImportSpecifier(specifier) => {
                    (specifier.span, &specifier.local, &mut named)
                }
            };
            let id = self.declare(local, site, BindingKind::Import, Slot::Named, None, false)?;
            list.push(Item {
                span,
                pattern: Pattern::Name(id),
                effects: false,
            });
        }
        if let (Some(first), Some(last)) = (named.first(), named.last()) {
            let span = self.braces(first.span, last.span);
            clause.push(Item {
                span,
                pattern: Pattern::Object(named),
                effects: false,
            });
        }
        self.tree.sites.push(Site::Import {
            span: import.span,
            clause,
        });
        Ok(())
    }

    /// `{ … }` around the named specifiers from `first` to `last`
    fn braces(&self, first: Span, last: Span) -> Span {
        let start = self.src[..first.start as usize]
            .rfind('{')
            .map_or(first.start, |i| i as u32);
        let end = self.src[last.end as usize..]
            .find('}')
            .map_or(last.end, |i| last.end + i as u32 + 1);
        Span::new(start, end)
    }

    fn export_name(&mut self, reference: &IdentifierReference<'_>) {
        self.exported_names.push(reference.name.to_string());
        self.tree.export_marks.insert(reference.span);
    }

    fn finish(mut self) -> Result<ScopeTree> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let root = self.tree.root();
        for index in 0..self.tree.bindings.len() {
            let symbol = self.tree.bindings[index].symbol;
            let scope = self
                .scope_ids
                .get(&self.scoping.symbol_scope_id(symbol))
                .copied()
                .unwrap_or(root);
            let binding = &mut self.tree.bindings[index];
            binding.scope = scope;
            self.tree.scopes[scope.0]
                .names
                .entry(binding.name.clone())
                .or_insert(BindingId(index));
        }

        for binding in &mut self.tree.bindings {
            if binding.scope == root
                && self
                    .exported_spans
                    .iter()
                    .any(|span| covers(*span, binding.span))
            {
                binding.exported = true;
            }
        }
        for name in std::mem::take(&mut self.exported_names) {
            if let Some(id) = self.tree.scope(root).get(&name) {
                self.tree.bindings[id.0].exported = true;
            }
        }
        Ok(self.tree)
    }
}

impl<'a, 's> Visit<'a> for Builder<'s> {
    fn enter_scope(&mut self, flags: ScopeFlags, scope_id: &Cell<Option<SemanticScopeId>>) {
        let kind = if flags.is_top() {
            ScopeKind::Module
        } else if flags.is_function() {
            ScopeKind::Function
        } else {
            ScopeKind::Block
        };
        let parent = self.stack.last().copied();
        let id = self.tree.open(kind, parent);
        if let Some(semantic_id) = scope_id.get() {
            self.scope_ids.insert(semantic_id, id);
        }
        self.stack.push(id);
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }

    fn visit_statements(&mut self, it: &ArenaVec<'a, Statement<'a>>) {
        for statement in it.iter() {
            let span = match statement {
                Statement::VariableDeclaration(declaration) => declaration.span,
                Statement::FunctionDeclaration(function) => function.span,
                Statement::ClassDeclaration(class) => class.span,
                _ => continue,
            };
            self.listed.insert(span);
        }
        walk::walk_statements(self, it);
    }

    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        // `declare const` has no runtime counterpart
        if !it.declare {
            if let Err(error) = self.declaration(it) {
                self.fail(error);
            }
        }
        walk::walk_variable_declaration(self, it);
    }

    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        let setter = self.setter.take() == Some(it.span);
        // overloads and `declare function` have no body
        let params = if it.body.is_some() {
            if it.r#type == FunctionType::FunctionDeclaration {
                if let Some(ident) = &it.id {
                    let site = self.next_site();
                    let kind = BindingKind::Function;
                    match self.declare(ident, site, kind, Slot::Named, Some(it.span), false) {
                        Ok(_) => self.tree.sites.push(Site::Function {
                            span: it.span,
                            listed: self.listed.contains(&it.span),
                        }),
                        Err(error) => self.fail(error),
                    }
                }
            }
            let this_end = it.this_param.as_ref().map(|this| this.span.end);
            match self.params(&it.params, this_end, true, setter) {
                Ok(site) => Some(site),
                Err(error) => {
                    self.fail(error);
                    None
                }
            }
        } else {
            None
        };
        self.functions.push(params);
        walk::walk_function(self, it, flags);
        self.functions.pop();
    }

    fn visit_arrow_function_expression(&mut self, it: &ArrowFunctionExpression<'a>) {
        let first = it
            .params
            .items
            .first()
            .map(|param| param.span)
            .or_else(|| it.params.rest.as_ref().map(|rest| rest.span));
        // `x => …`
        let parenthesized = first.map_or(true, |first| {
            self.src[..first.start as usize].trim_end().ends_with('(')
        });
        if let Err(error) = self.params(&it.params, None, parenthesized, false) {
            self.fail(error);
        }
        walk::walk_arrow_function_expression(self, it);
    }

    fn visit_class(&mut self, it: &Class<'a>) {
        if it.r#type == ClassType::ClassDeclaration && !it.declare {
            if let Some(ident) = &it.id {
                let site = self.next_site();
                let kind = BindingKind::Class;
                match self.declare(ident, site, kind, Slot::Named, Some(it.span), false) {
                    Ok(name) => self.tree.sites.push(Site::Class {
                        span: it.span,
                        name,
                        listed: self.listed.contains(&it.span),
                        pure: is_pure_class(it),
                    }),
                    Err(error) => self.fail(error),
                }
            }
        }
        walk::walk_class(self, it);
    }

    fn visit_method_definition(&mut self, it: &MethodDefinition<'a>) {
        if it.kind == MethodDefinitionKind::Set {
            self.setter = Some(it.value.span);
        }
        walk::walk_method_definition(self, it);
    }

    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        if it.kind == PropertyKind::Set {
            self.setter = Some(it.value.span());
        }
        walk::walk_object_property(self, it);
    }

    fn visit_catch_clause(&mut self, it: &CatchClause<'a>) {
        if let Some(param) = &it.param {
            let site = self.next_site();
            match self.pattern(&param.pattern, site, BindingKind::Variable, Slot::Named, None, false) {
                Ok(_) => self.tree.sites.push(Site::Catch),
                Err(error) => self.fail(error),
            }
        }
        walk::walk_catch_clause(self, it);
    }

    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        if let Err(error) = self.import(it) {
            self.fail(error);
        }
        walk::walk_import_declaration(self, it);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(declaration) = &it.declaration {
            self.exported_spans.push(declaration.span());
        }
        // `export { a } from 'm'` names nothing local
        if it.source.is_none() {
            for specifier in &it.specifiers {
                if let ModuleExportName::IdentifierReference(local) = &specifier.local {
                    self.export_name(local);
                }
            }
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        match &it.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                self.exported_spans.push(function.span)
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                self.exported_spans.push(class.span)
            }
            ExportDefaultDeclarationKind::Identifier(ident) => self.export_name(ident),
            _ => {}
        }
        walk::walk_export_default_declaration(self, it);
    }

    fn visit_ts_export_assignment(&mut self, it: &TSExportAssignment<'a>) {
        if let Expression::Identifier(ident) = &it.expression {
            self.export_name(ident);
        }
        walk::walk_ts_export_assignment(self, it);
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if it.name.as_str() == "arguments" {
            if let Some(Some(site)) = self.functions.last() {
                if let Site::Params { pinned, .. } = &mut self.tree.sites[site.0] {
                    *pinned = true;
                }
            }
        }
    }
}
