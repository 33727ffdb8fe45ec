use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};

use oxc_ast::ast::*;
use oxc_span::Span;
use oxc_syntax::operator::UnaryOperator;

use crate::{
    binding::{Binding, BindingId, BindingKind, Pattern, Site, SiteId},
    edit::Suggestion,
    scope::{covers, ScopeTree},
    span::{LineIndex, LineSpan},
    usage::{Tally, Usage},
};

/// Why a Finding is reported but left in place
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
#[cfg_attr(feature = "json-out", serde(rename_all = "kebab-case"))]
pub enum Retention {
    /// Array element followed by a live element
    Positional,
    /// Sibling of a live `...rest` capture
    RestSibling,
    /// Assigned after its declaration
    Assigned,
    /// Initializer, default or computed key must still run
    SideEffects,
    /// Exported while exports are checked
    Exported,
    /// Cannot be deleted without breaking syntax
    Syntax,
}

impl fmt::Display for Retention {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Retention::Positional => "positional",
            Retention::RestSibling => "rest-sibling",
            Retention::Assigned => "assigned",
            Retention::SideEffects => "side-effects",
            Retention::Exported => "exported",
            Retention::Syntax => "syntax",
        };
        write!(fmt, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
pub struct Finding {
    #[cfg_attr(feature = "json-out", serde(skip))]
    pub binding: BindingId,
    pub name: String,
    pub kind: BindingKind,
    #[cfg_attr(feature = "json-out", serde(skip))]
    pub range: Span,
    pub span: LineSpan,
    pub retention: Option<Retention>,
    /// The edit that removes this binding, once edits are computed
    pub suggestion: Option<Suggestion>,
}

impl Finding {
    pub fn is_removable(&self) -> bool {
        self.retention.is_none()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Unused {}: {}", self.kind, self.name)?;
        if let Some(retention) = self.retention {
            write!(fmt, " (kept: {})", retention)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "json-out", derive(serde::Deserialize))]
#[cfg_attr(feature = "json-out", serde(default, rename_all = "camelCase"))]
pub struct Settings {
    /// Exported bindings are live
    pub treat_exports_as_used: bool,
    /// Check parameters (only trailing ones are ever removed)
    pub allow_unused_trailing_params: bool,
    /// Report without computing edits
    pub report_only: bool,
    /// Never report `...rest` captures
    pub ignore_rest_captures: bool,
    /// Never report names starting with `_`
    pub ignore_underscore: bool,
    /// Extra known globals
    pub globals: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            treat_exports_as_used: true,
            allow_unused_trailing_params: true,
            report_only: false,
            ignore_rest_captures: false,
            ignore_underscore: false,
            globals: Vec::new(),
        }
    }
}

/// What a previous classification round scheduled for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Round {
    pub removed: Vec<Span>,
    pub bindings: BTreeSet<BindingId>,
}

impl Settings {
    /// Classify every binding of the unit.
    ///
    /// References inside `round.removed` are discounted, and bindings
    /// declared inside removed code are not reported again.
    pub fn classify(
        &self,
        tree: &ScopeTree,
        usage: &Usage,
        round: &Round,
        lines: &LineIndex,
    ) -> Vec<Finding> {
        let tallies = usage.tallies(tree, &round.removed);
        let mut classifier = Classifier {
            settings: self,
            tree,
            tallies,
            candidates: HashSet::new(),
            retention: HashMap::new(),
            dropped: HashSet::new(),
        };
        for (id, binding) in tree.bindings() {
            let gone = !round.bindings.contains(&id)
                && round
                    .removed
                    .iter()
                    .any(|span| covers(*span, binding.span));
            if !gone && classifier.is_candidate(id, binding) {
                classifier.candidates.insert(id);
                if let Some(retention) = classifier.own_retention(id, binding) {
                    classifier.retention.insert(id, retention);
                }
            }
        }
        classifier.structure();

        let mut findings = classifier
            .candidates
            .iter()
            .filter(|id| !classifier.dropped.contains(*id))
            .map(|&id| {
                let binding = tree.binding(id);
                Finding {
                    binding: id,
                    name: binding.name.clone(),
                    kind: binding.kind,
                    range: binding.span,
                    span: lines.span(binding.span),
                    retention: classifier.retention.get(&id).copied(),
                    suggestion: None,
                }
            })
            .collect::<Vec<_>>();
        findings.sort_unstable_by_key(|finding| (finding.range.start, finding.kind.precedence()));
        findings
    }
}

struct Classifier<'a> {
    settings: &'a Settings,
    tree: &'a ScopeTree,
    tallies: Vec<Tally>,
    candidates: HashSet<BindingId>,
    retention: HashMap<BindingId, Retention>,
    /// Candidates that are not Findings at all
    dropped: HashSet<BindingId>,
}

impl<'a> Classifier<'a> {
    fn is_candidate(&self, id: BindingId, binding: &Binding) -> bool {
        let parameter = matches!(self.tree.site(binding.site), Site::Params { .. });
        !binding.exempt
            && !(self.settings.ignore_underscore && binding.name.starts_with('_'))
            && !(parameter && !self.settings.allow_unused_trailing_params)
            && !(binding.is_rest() && self.settings.ignore_rest_captures)
            && !(binding.exported && self.settings.treat_exports_as_used)
            && self.tallies[id.index()].reads == 0
    }

    /// Retention that follows from the binding alone
    fn own_retention(&self, id: BindingId, binding: &Binding) -> Option<Retention> {
        if binding.exported {
            return Some(Retention::Exported);
        }
        if self.tallies[id.index()].writes > 0 {
            return Some(Retention::Assigned);
        }
        let fixed = match self.tree.site(binding.site) {
            Site::Catch => true,
            Site::Declaration { listed, .. }
            | Site::Function { listed, .. }
            | Site::Class { listed, .. } => !listed,
            // `x => …`
            Site::Params { parenthesized, .. } => !parenthesized,
            Site::Import { .. } => false,
        };
        if fixed {
            return Some(Retention::Syntax);
        }
        None
    }

    fn is_removable_leaf(&self, id: BindingId) -> bool {
        self.candidates.contains(&id) && !self.retention.contains_key(&id)
    }

    /// Give every removable leaf below `pattern` a retention reason.
    fn retain(&mut self, pattern: &Pattern, retention: Retention) {
        for id in pattern.leaves() {
            if self.candidates.contains(&id) {
                self.retention.entry(id).or_insert(retention);
            }
        }
    }

    fn drop_leaves(&mut self, pattern: &Pattern) {
        self.dropped.extend(pattern.leaves());
    }

    /// Decide positional, rest-sibling and side-effect retention per
    /// declaration site.
    fn structure(&mut self) {
        let tree = self.tree;
        let sites = self
            .candidates
            .iter()
            .map(|id| tree.binding(*id).site)
            .collect::<BTreeSet<SiteId>>();

        for site in sites {
            match tree.site(site) {
                Site::Declaration { declarators, .. } => {
                    for declarator in declarators {
                        if self.pattern_removable(&declarator.pattern) && declarator.effects {
                            self.retain(&declarator.pattern, Retention::SideEffects);
                        }
                    }
                }
                Site::Params { items, pinned, .. } => {
                    if *pinned {
                        // the function reads `arguments`
                        for item in items {
                            self.drop_leaves(&item.pattern);
                        }
                        continue;
                    }
                    let mut seen_live = false;
                    for item in items.iter().rev() {
                        let removable = self.pattern_removable(&item.pattern);
                        if !removable {
                            seen_live = true;
                        } else if seen_live {
                            // removing it would shift the parameters after it
                            self.drop_leaves(&item.pattern);
                        }
                    }
                }
                Site::Class { name, pure, .. } => {
                    if !pure {
                        self.retain(&Pattern::Name(*name), Retention::SideEffects);
                    }
                }
                Site::Function { .. } | Site::Import { .. } | Site::Catch => {}
            }
        }
    }

    /// Whether the whole pattern can be deleted. Marks positional,
    /// rest-sibling and side-effect retention on the way.
    fn pattern_removable(&mut self, pattern: &Pattern) -> bool {
        match pattern {
            Pattern::Name(id) => self.is_removable_leaf(*id),
            Pattern::Default { target, pure } => {
                let removable = self.pattern_removable(target);
                if removable && !pure {
                    self.retain(target, Retention::SideEffects);
                    return false;
                }
                removable
            }
            Pattern::Rest(target) => self.pattern_removable(target),
            Pattern::Object(items) => {
                let mut removables = Vec::with_capacity(items.len());
                let mut rest_live = false;
                for item in items {
                    let mut removable = self.pattern_removable(&item.pattern);
                    if removable && item.effects {
                        // `[key()]: v` still has to evaluate its key
                        self.retain(&item.pattern, Retention::SideEffects);
                        removable = false;
                    }
                    if matches!(item.pattern, Pattern::Rest(_)) {
                        rest_live |= !removable;
                    }
                    removables.push(removable);
                }
                if rest_live {
                    for (item, removable) in items.iter().zip(&removables) {
                        if *removable {
                            self.retain(&item.pattern, Retention::RestSibling);
                        }
                    }
                    return false;
                }
                !items.is_empty() && removables.iter().all(|removable| *removable)
            }
            Pattern::Array(items) => {
                let mut seen_live = false;
                let mut all = !items.is_empty();
                for item in items.iter().rev() {
                    let removable = self.pattern_removable(&item.pattern);
                    if !removable {
                        seen_live = true;
                        all = false;
                    } else if seen_live {
                        self.retain(&item.pattern, Retention::Positional);
                    }
                }
                all
            }
        }
    }
}

fn is_pure_key(key: &PropertyKey<'_>, computed: bool) -> bool {
    !computed || key.as_expression().map_or(true, is_pure)
}

/// Whether declaring `class` runs no user code beyond the declaration.
pub(crate) fn is_pure_class(class: &Class<'_>) -> bool {
    class.decorators.is_empty()
        && class.super_class.as_ref().map_or(true, is_pure)
        && class.body.body.iter().all(|member| match member {
            ClassElement::StaticBlock(block) => block.body.is_empty(),
            ClassElement::MethodDefinition(method) => {
                method.decorators.is_empty()
                    && method
                        .value
                        .params
                        .items
                        .iter()
                        .all(|param| param.decorators.is_empty())
                    && is_pure_key(&method.key, method.computed)
            }
            ClassElement::PropertyDefinition(property) => {
                property.decorators.is_empty()
                    && is_pure_key(&property.key, property.computed)
                    && (!property.r#static || property.value.as_ref().map_or(true, is_pure))
            }
            ClassElement::AccessorProperty(property) => {
                property.decorators.is_empty()
                    && is_pure_key(&property.key, property.computed)
                    && (!property.r#static || property.value.as_ref().map_or(true, is_pure))
            }
            ClassElement::TSIndexSignature(_) => true,
        })
}

/// Whether evaluating `expression` can have no observable effect.
/// Function and class bodies are not evaluated and do not count.
pub(crate) fn is_pure(expression: &Expression<'_>) -> bool {
    match expression {
        Expression::BooleanLiteral(_)
        | Expression::NullLiteral(_)
        | Expression::NumericLiteral(_)
        | Expression::BigIntLiteral(_)
        | Expression::RegExpLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::Identifier(_)
        | Expression::MetaProperty(_)
        | Expression::ThisExpression(_)
        | Expression::Super(_)
        | Expression::FunctionExpression(_)
        | Expression::ArrowFunctionExpression(_) => true,
        Expression::TemplateLiteral(template) => template.expressions.iter().all(is_pure),
        Expression::ArrayExpression(array) => array.elements.iter().all(|element| match element {
            ArrayExpressionElement::SpreadElement(spread) => is_pure(&spread.argument),
            ArrayExpressionElement::Elision(_) => true,
            _ => element.as_expression().map_or(true, is_pure),
        }),
        Expression::ObjectExpression(object) => {
            object.properties.iter().all(|property| match property {
                ObjectPropertyKind::ObjectProperty(property) => {
                    is_pure_key(&property.key, property.computed) && is_pure(&property.value)
                }
                ObjectPropertyKind::SpreadProperty(spread) => is_pure(&spread.argument),
            })
        }
        Expression::ClassExpression(class) => is_pure_class(class),
        Expression::UnaryExpression(unary) => {
            unary.operator != UnaryOperator::Delete && is_pure(&unary.argument)
        }
        Expression::BinaryExpression(binary) => is_pure(&binary.left) && is_pure(&binary.right),
        Expression::LogicalExpression(logical) => {
            is_pure(&logical.left) && is_pure(&logical.right)
        }
        Expression::ConditionalExpression(conditional) => {
            is_pure(&conditional.test)
                && is_pure(&conditional.consequent)
                && is_pure(&conditional.alternate)
        }
        Expression::SequenceExpression(sequence) => sequence.expressions.iter().all(is_pure),
        Expression::ParenthesizedExpression(inner) => is_pure(&inner.expression),
        Expression::StaticMemberExpression(member) => is_pure(&member.object),
        Expression::ComputedMemberExpression(member) => {
            is_pure(&member.object) && is_pure(&member.expression)
        }
        Expression::PrivateFieldExpression(member) => is_pure(&member.object),
        Expression::TSAsExpression(inner) => is_pure(&inner.expression),
        Expression::TSSatisfiesExpression(inner) => is_pure(&inner.expression),
        Expression::TSNonNullExpression(inner) => is_pure(&inner.expression),
        Expression::TSTypeAssertion(inner) => is_pure(&inner.expression),
        Expression::TSInstantiationExpression(inner) => is_pure(&inner.expression),
        // calls, `new`, assignments, updates, `await`, `yield`, JSX
        _ => false,
    }
}
