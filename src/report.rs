use std::io;

use ariadne::{sources, Color, Config, Label, Report, ReportKind};

use crate::dead_code::{Finding, Retention};

fn color(finding: &Finding) -> Color {
    match finding.retention {
        None => Color::Magenta,
        Some(Retention::Positional | Retention::RestSibling) => Color::Cyan,
        Some(Retention::Exported) => Color::Green,
        Some(_) => Color::Yellow,
    }
}

// assumes findings to be sorted by occurrence in file
pub fn print(file: String, content: &str, findings: &[Finding]) -> io::Result<()> {
    let first = match findings.first() {
        Some(first) => first,
        None => return Ok(()),
    };
    let mut builder = Report::build(
        ReportKind::Warning,
        file.clone(),
        first.range.start as usize,
    )
    .with_config(Config::default().with_compact(true))
    .with_message("Unused declarations were found.");

    // advance into content to convert byte offsets into char offsets
    let mut chars = content.char_indices().map(|(i, _)| i).enumerate().peekable();
    let mut char_offset = |byte: usize| {
        while let Some(&(_, offset)) = chars.peek() {
            if offset >= byte {
                break;
            }
            chars.next();
        }
        chars.peek().map_or(content.chars().count(), |&(index, _)| index)
    };
    // reverse order to avoid overlapping lanes
    let mut order = findings.len();
    for finding in findings {
        order -= 1;
        let start = char_offset(finding.range.start as usize);
        let end = char_offset(finding.range.end as usize);
        builder = builder.with_label(
            Label::new((file.clone(), start..end))
                .with_message(format!("{}", finding))
                .with_color(color(finding))
                .with_order(order as i32),
        );
    }

    builder.finish().print(sources(vec![(file, content)]))
}

#[cfg(feature = "json-out")]
#[derive(serde::Serialize)]
struct FileReport<'a> {
    file: &'a str,
    results: &'a [Finding],
}

#[cfg(feature = "json-out")]
pub fn print_json(file: &str, findings: &[Finding]) -> serde_json::Result<()> {
    let line = serde_json::to_string(&FileReport {
        file,
        results: findings,
    })?;
    println!("{}", line);
    Ok(())
}
