use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use deadjs::{report, Error, Finding, Settings};

const EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    HumanReadable,
    #[cfg(feature = "json-out")]
    Json,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find unused bindings in JavaScript and TypeScript sources",
    disable_help_flag = true
)]
struct Cli {
    /// Remove unused declarations in place
    #[arg(short, long)]
    edit: bool,

    /// Don't print dead code report
    #[arg(short, long)]
    quiet: bool,

    /// Exit with 1 if unused code has been found
    #[arg(short, long)]
    fail: bool,

    /// Output format to use
    #[arg(short, long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    output_format: OutputFormat,

    /// Check exported bindings too
    #[arg(long)]
    report_exports: bool,

    /// Don't check function parameters
    #[arg(long)]
    no_trailing_params: bool,

    /// Don't check `...rest` captures
    #[arg(long)]
    ignore_rest_captures: bool,

    /// Don't check any bindings that start with a _
    #[arg(short = '_', long)]
    no_underscore: bool,

    /// Additional known global name
    #[arg(long = "global", value_name = "NAME")]
    globals: Vec<String>,

    /// JSON settings file
    #[cfg(feature = "json-out")]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Recurse into hidden subdirectories and process hidden files
    #[arg(short = 'h', long)]
    hidden: bool,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Files or directories to check
    #[arg(default_value = ".")]
    file_paths: Vec<PathBuf>,
}

impl Cli {
    fn settings(&self) -> Result<Settings, Error> {
        #[cfg(feature = "json-out")]
        let mut settings = match &self.config {
            Some(path) => deadjs::load_config(path)?,
            None => Settings::default(),
        };
        #[cfg(not(feature = "json-out"))]
        let mut settings = Settings::default();

        settings.treat_exports_as_used &= !self.report_exports;
        settings.allow_unused_trailing_params &= !self.no_trailing_params;
        settings.ignore_rest_captures |= self.ignore_rest_captures;
        settings.ignore_underscore |= self.no_underscore;
        settings.report_only |= !self.edit;
        settings.globals.extend(self.globals.iter().cloned());
        Ok(settings)
    }
}

/// Result of processing one file
struct Outcome {
    path: PathBuf,
    content: String,
    findings: Vec<Finding>,
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| EXTENSIONS.contains(&extension))
}

fn gather_files(paths: &[PathBuf], hidden: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        let walker = WalkDir::new(path).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !(name == "node_modules" || (!hidden && name.starts_with('.')))
        });
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if entry.depth() == 0 || is_source(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Ok(_) => {}
                Err(err) => warn!("Error walking {}: {}", path.display(), err),
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn process(path: &Path, settings: &Settings) -> Result<Outcome, Error> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let analysis = settings.analyze_path(&content, path)?;
    if let Some(conflict) = &analysis.conflict {
        warn!("Leaving {} unmodified: {}", path.display(), conflict);
    }
    debug!(
        file = %path.display(),
        findings = analysis.findings.len(),
        edits = analysis.edits.len(),
        "analyzed"
    );
    if !analysis.edits.is_empty() {
        let rewritten = analysis.rewrite(&content);
        fs::write(path, rewritten).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(Outcome {
        path: path.to_path_buf(),
        content,
        findings: analysis.findings,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };

    let files = gather_files(&cli.file_paths, cli.hidden);
    debug!(files = files.len(), "gathered files");
    let outcomes = files
        .par_iter()
        .map(|path| (path, process(path, &settings)))
        .collect::<Vec<_>>();

    let mut found = false;
    for (path, outcome) in outcomes {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                eprintln!("Error processing file {}: {}", path.display(), err);
                continue;
            }
        };
        found |= !outcome.findings.is_empty();
        if cli.quiet {
            continue;
        }
        let file = outcome.path.to_string_lossy().into_owned();
        match cli.output_format {
            OutputFormat::HumanReadable => {
                if let Err(err) = report::print(file, &outcome.content, &outcome.findings) {
                    eprintln!("Error printing report: {}", err);
                }
            }
            #[cfg(feature = "json-out")]
            OutputFormat::Json => {
                if let Err(err) = report::print_json(&file, &outcome.findings) {
                    eprintln!("Error printing report: {}", err);
                }
            }
        }
    }

    if cli.fail && found {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
