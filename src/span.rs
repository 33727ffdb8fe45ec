use oxc_span::Span;

/// 1-based line and column (in characters)
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json-out", derive(serde::Serialize))]
pub struct LineSpan {
    pub start: LineCol,
    pub end: LineCol,
}

/// Byte offset to line/column conversion for one unit.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    src: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(src: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { src, line_starts }
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self.src[start..offset.min(self.src.len())].chars().count() + 1;
        LineCol {
            line: line + 1,
            column,
        }
    }

    pub fn span(&self, span: Span) -> LineSpan {
        LineSpan {
            start: self.line_col(span.start as usize),
            end: self.line_col(span.end as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line() {
        let index = LineIndex::new("const a = 1;\nconst b = 2;\n");
        assert_eq!(index.line_col(6), LineCol { line: 1, column: 7 });
    }

    #[test]
    fn later_lines() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_col(2), LineCol { line: 2, column: 1 });
        assert_eq!(index.line_col(3), LineCol { line: 2, column: 2 });
        assert_eq!(index.line_col(6), LineCol { line: 4, column: 1 });
    }

    #[test]
    fn span_counts_characters() {
        let index = LineIndex::new("// é\nlet x;");
        assert_eq!(
            index.span(Span::new(10, 11)),
            LineSpan {
                start: LineCol { line: 2, column: 5 },
                end: LineCol { line: 2, column: 6 },
            }
        );
    }
}
