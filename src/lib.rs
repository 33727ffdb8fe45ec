//! Scan JavaScript and TypeScript sources for dead code (unused bindings).

mod binding;
mod dead_code;
mod dead_code_tests;
mod edit;
mod error;
pub mod report;
mod scope;
mod span;
mod usage;

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use tracing::debug;

pub use binding::{Binding, BindingId, BindingKind, Item, Pattern, Site, SiteId, Slot};
pub use dead_code::{Finding, Retention, Round, Settings};
pub use edit::{apply_edits, edit_dead_code, Edit, EditConflict, Suggestion};
pub use error::{Error, Result};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use span::{LineCol, LineIndex, LineSpan};
pub use usage::{Access, Reference, Resolution, Tally, Usage};

/// Findings and edits for one unit.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub findings: Vec<Finding>,
    /// Empty in report-only mode, and when edits conflict
    pub edits: Vec<Edit>,
    /// Set when the unit must be left unmodified; never in report-only mode
    pub conflict: Option<EditConflict>,
}

impl Analysis {
    pub fn rewrite(&self, src: &str) -> String {
        apply_edits(src, self.edits.iter())
    }

    /// The findings stand, but no edit is applied.
    pub(crate) fn conflicted(
        findings: Vec<Finding>,
        conflict: EditConflict,
        report_only: bool,
    ) -> Self {
        debug!(%conflict, report_only, "edits conflict");
        Analysis {
            findings,
            edits: Vec::new(),
            conflict: if report_only { None } else { Some(conflict) },
        }
    }
}

impl Settings {
    /// Run the whole pipeline on one TypeScript unit.
    pub fn analyze(&self, src: &str) -> Result<Analysis> {
        self.analyze_as(src, SourceType::ts())
    }

    /// Run the whole pipeline on the unit stored at `path`; the dialect
    /// (JavaScript, TypeScript, JSX) follows the extension.
    pub fn analyze_path(&self, src: &str, path: &Path) -> Result<Analysis> {
        let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::ts());
        self.analyze_as(src, source_type)
    }

    /// Run the whole pipeline on one unit.
    ///
    /// Classification repeats with the previous round's removals
    /// discounted until nothing changes.
    pub fn analyze_as(&self, src: &str, source_type: SourceType) -> Result<Analysis> {
        let allocator = Allocator::default();
        let ParserReturn {
            program,
            errors,
            panicked,
            ..
        } = Parser::new(&allocator, src, source_type).parse();
        if let Some(error) = errors.first() {
            return Err(Error::Parse {
                message: error.to_string(),
            });
        }
        if panicked {
            return Err(Error::Parse {
                message: "unrecoverable syntax".to_string(),
            });
        }
        let semantic = SemanticBuilder::new().build(&program).semantic;
        let tree = ScopeTree::build(&program, semantic.scoping(), src)?;
        let usage = Usage::collect(&semantic, &tree, &self.globals);
        debug!(
            bindings = tree.binding_count(),
            references = usage.references.len(),
            "collected usage"
        );
        let lines = LineIndex::new(src);

        let mut round = Round::default();
        let mut iteration = 0;
        loop {
            iteration += 1;
            let mut findings = self.classify(&tree, &usage, &round, &lines);
            let edits = match edit_dead_code(src, &tree, &mut findings) {
                Ok(edits) => edits,
                Err(conflict) => {
                    return Ok(Analysis::conflicted(findings, conflict, self.report_only))
                }
            };
            let next = Round {
                removed: edits.iter().map(Edit::range).collect(),
                bindings: findings
                    .iter()
                    .filter(|finding| finding.is_removable())
                    .map(|finding| finding.binding)
                    .collect(),
            };
            if next == round {
                debug!(iteration, findings = findings.len(), "classification stable");
                let edits = if self.report_only { Vec::new() } else { edits };
                return Ok(Analysis {
                    findings,
                    edits,
                    conflict: None,
                });
            }
            round = next;
        }
    }
}

/// Analyze `src` with `settings`.
pub fn analyze(src: &str, settings: &Settings) -> Result<Analysis> {
    settings.analyze(src)
}

/// Read `Settings` from a JSON file with camelCase keys.
#[cfg(feature = "json-out")]
pub fn load_config(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|error| Error::Config {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}
