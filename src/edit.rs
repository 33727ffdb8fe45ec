use std::collections::{BTreeSet, HashSet};

use oxc_span::Span;
use thiserror::Error;

use crate::{
    binding::{BindingId, Item, Pattern, Site, SiteId},
    dead_code::Finding,
    scope::{covers, ScopeTree},
};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub(crate) fn delete(start: usize, end: usize) -> Self {
        Edit {
            start,
            end,
            replacement: String::new(),
        }
    }

    pub fn range(&self) -> Span {
        Span::new(self.start as u32, self.end as u32)
    }
}

/// Two computed edits overlap in code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("overlapping edits {first:?} and {second:?}")]
pub struct EditConflict {
    pub first: Span,
    pub second: Span,
}

/// How a removable Finding would be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
#[cfg_attr(feature = "json-out", serde(rename_all = "camelCase"))]
pub struct Suggestion {
    pub edit: Edit,
    /// The edit shrinks an enclosing list or pattern instead of deleting
    /// the whole declaration
    pub collapses_container: bool,
}

/// Applies sorted, non-overlapping `edits` to `src`.
pub fn apply_edits<'a>(src: &str, edits: impl Iterator<Item = &'a Edit>) -> String {
    let mut pos = 0;
    let mut result = String::with_capacity(src.len());
    for edit in edits {
        if pos <= edit.start {
            result.push_str(&src[pos..edit.start]);
            result.push_str(&edit.replacement);
            pos = edit.end;
        }
    }
    result.push_str(&src[pos..]);
    result
}

/// Computes the edits deleting every removable Finding from `src`, and
/// attaches to each of those Findings the edit that removes it.
///
/// The returned edits are sorted and disjoint. Edits contained in a larger
/// one are dropped; overlaps in code fail with `EditConflict`.
pub fn edit_dead_code(
    src: &str,
    tree: &ScopeTree,
    findings: &mut [Finding],
) -> Result<Vec<Edit>, EditConflict> {
    let planner = Planner {
        src,
        dead: findings
            .iter()
            .filter(|finding| finding.is_removable())
            .map(|finding| finding.binding)
            .collect(),
    };
    // group the findings by the site that declared them
    let sites = findings
        .iter()
        .filter(|finding| finding.is_removable())
        .map(|finding| tree.binding(finding.binding).site)
        .collect::<BTreeSet<SiteId>>();

    let mut edits = Vec::new();
    for site in sites {
        match tree.site(site) {
            Site::Declaration {
                span, declarators, ..
            } => planner.declaration(*span, declarators, &mut edits),
            Site::Params {
                span,
                items,
                this_end,
                ..
            } => planner.params(*span, items, *this_end, &mut edits),
            Site::Import { span, clause } => planner.import(*span, clause, &mut edits),
            Site::Function { span, .. } | Site::Class { span, .. } => {
                edits.push(planner.statement(*span))
            }
            Site::Catch => {}
        }
    }
    let edits = normalize(src, edits)?;

    for finding in findings.iter_mut().filter(|finding| finding.is_removable()) {
        let site = tree.site(tree.binding(finding.binding).site);
        finding.suggestion = edits
            .iter()
            .find(|edit| covers(edit.range(), finding.range))
            .map(|edit| Suggestion {
                edit: edit.clone(),
                collapses_container: site
                    .span()
                    .map_or(true, |site| !covers(edit.range(), site)),
            });
    }
    Ok(edits)
}

/// Sort, drop contained edits and merge deletions that only share
/// whitespace. Any other overlap is a conflict.
pub(crate) fn normalize(src: &str, mut edits: Vec<Edit>) -> Result<Vec<Edit>, EditConflict> {
    edits.sort_unstable_by(|e1, e2| e1.start.cmp(&e2.start).then(e2.end.cmp(&e1.end)));
    let mut result: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if let Some(last) = result.last_mut() {
            if edit.start < last.end {
                if edit.end <= last.end {
                    // contained in the previous edit
                    continue;
                }
                let shared = &src[edit.start..last.end];
                if !(last.replacement.is_empty()
                    && edit.replacement.is_empty()
                    && shared.trim().is_empty())
                {
                    return Err(EditConflict {
                        first: last.range(),
                        second: edit.range(),
                    });
                }
                last.end = edit.end;
                continue;
            }
        }
        result.push(edit);
    }
    Ok(result)
}

struct Planner<'a> {
    src: &'a str,
    dead: HashSet<BindingId>,
}

impl<'a> Planner<'a> {
    /// A pattern is dead when it has leaves and all of them are removable.
    fn is_dead(&self, pattern: &Pattern) -> bool {
        let leaves = pattern.leaves();
        !leaves.is_empty() && leaves.iter().all(|id| self.dead.contains(id))
    }

    fn dead_items(&self, items: &[Item]) -> Vec<bool> {
        items.iter().map(|item| self.is_dead(&item.pattern)).collect()
    }

    fn declaration(&self, span: Span, declarators: &[Item], edits: &mut Vec<Edit>) {
        let dead = self.dead_items(declarators);
        if dead.iter().all(|dead| *dead) {
            edits.push(self.statement(span));
            return;
        }
        self.list(declarators, &dead, false, edits);
    }

    fn params(&self, span: Span, items: &[Item], this_end: Option<u32>, edits: &mut Vec<Edit>) {
        let dead = self.dead_items(items);
        if !items.is_empty() && dead.iter().all(|dead| *dead) {
            // collapse to `()`, or to `(this: T)`
            let text = &self.src[span.start as usize..span.end as usize];
            if text.starts_with('(') && text.ends_with(')') {
                let start = this_end.unwrap_or(span.start + 1);
                edits.push(Edit::delete(start as usize, span.end as usize - 1));
            } else {
                let first = items[0].span.start;
                let last = items[items.len() - 1].span.end;
                edits.push(Edit::delete(
                    this_end.unwrap_or(first) as usize,
                    last as usize,
                ));
            }
            return;
        }
        self.list(items, &dead, true, edits);
    }

    fn import(&self, span: Span, clause: &[Item], edits: &mut Vec<Edit>) {
        let leaves = clause
            .iter()
            .flat_map(|item| item.pattern.leaves())
            .collect::<Vec<_>>();
        if leaves.iter().all(|id| self.dead.contains(id)) {
            edits.push(self.statement(span));
            return;
        }
        let dead = self.dead_items(clause);
        self.list(clause, &dead, false, edits);
    }

    /// Delete the dead items of a list, then descend into the live ones.
    fn list(&self, items: &[Item], dead: &[bool], trailing_only: bool, edits: &mut Vec<Edit>) {
        let spans = items.iter().map(|item| item.span).collect::<Vec<_>>();
        list_edits(&spans, dead, trailing_only, edits);
        for (item, _) in items.iter().zip(dead).filter(|(_, dead)| !**dead) {
            self.pattern(&item.pattern, edits);
        }
    }

    /// Edits inside a pattern that stays.
    fn pattern(&self, pattern: &Pattern, edits: &mut Vec<Edit>) {
        match pattern {
            Pattern::Name(_) => {}
            Pattern::Default { target, .. } | Pattern::Rest(target) => self.pattern(target, edits),
            Pattern::Object(items) => {
                let dead = self.dead_items(items);
                self.list(items, &dead, false, edits);
            }
            Pattern::Array(items) => {
                let dead = self.dead_items(items);
                self.list(items, &dead, true, edits);
            }
        }
    }

    /// Deletes a whole statement, together with its line when it stands
    /// alone on it.
    fn statement(&self, span: Span) -> Edit {
        let start = span.start as usize;
        let end = span.end as usize;
        let src = self.src;

        let line_start = src[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = src[end..].find('\n').map_or(src.len(), |i| end + i + 1);
        let before = &src[line_start..start];
        let after = &src[end..line_end];
        if before.trim().is_empty() && after.trim().is_empty() {
            return Edit::delete(line_start, line_end);
        }

        // remove whitespace before node
        let spaces_before = before.len() - before.trim_end_matches([' ', '\t']).len();
        if spaces_before > 0 && start - spaces_before > line_start {
            return Edit::delete(start - spaces_before, end);
        }
        let spaces_after = after.len() - after.trim_start_matches([' ', '\t']).len();
        Edit::delete(start, end + spaces_after)
    }
}

/// Deletes the `dead` items of a comma-separated list with their
/// separators. With `trailing_only`, only the dead run after the last
/// live item goes. The caller handles lists without live items.
fn list_edits(items: &[Span], dead: &[bool], trailing_only: bool, edits: &mut Vec<Edit>) {
    let last_live = match dead.iter().rposition(|dead| !*dead) {
        Some(last_live) => last_live,
        None => return,
    };
    if last_live + 1 < items.len() {
        edits.push(Edit::delete(
            items[last_live].end as usize,
            items[items.len() - 1].end as usize,
        ));
    }
    if trailing_only {
        return;
    }
    let mut run_start = None;
    for (i, item) in items[..=last_live].iter().enumerate() {
        match (dead[i], run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                edits.push(Edit::delete(
                    items[start].start as usize,
                    item.start as usize,
                ));
                run_start = None;
            }
            _ => {}
        }
    }
}
