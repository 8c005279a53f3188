//! Command line front end: universe documents → (diagnostics | plan)
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use regex::Regex;
use tracing::{info, warn};

use crate::analysis::{AnalyzerOptions, CancellationToken, Plan, Session};
use crate::diagnostics::Diagnostic;
use crate::symbols::universe::UniverseDoc;
use crate::symbols::{SymbolProvider, Universe};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate MessagePack-annotated type declarations and plan their formatters
#[derive(Parser, Debug)]
#[command(name = "msgpack-plan")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// analyse every attributed declaration and print diagnostics
    Check(CheckOut),
    /// analyse and write the resolver plan as JSON
    Plan(PlanOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JQ pre-process filter for each document; every output is one universe document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more universe documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// only analyse roots whose full name matches this regex
    #[arg(long)]
    roots: Option<String>,

    /// force map encoding for every generated object
    #[arg(long, default_value_t = false)]
    map_mode: bool,

    /// type formatted by some other resolver (full name, repeatable)
    #[arg(long = "assume-formattable", value_name = "TYPE")]
    assume_formattable: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_universe(&self) -> Result<Universe> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut docs = Vec::new();
        for source_path in source_paths {
            self.load_documents(&source_path, &mut docs)?;
        }
        let universe = Universe::from_docs(docs)?;
        info!(declarations = universe.declarations().count(), "universe loaded");
        Ok(universe)
    }

    fn load_documents(&self, source_path: &Path, docs: &mut Vec<UniverseDoc>) -> Result<()> {
        let display = source_path.display();
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read source file {display}"))?;
        let json_value = serde_json::from_str::<serde_json::Value>(&source)
            .with_context(|| format!("failed to parse JSON source file {display}"))?;
        let values = match self.jq_expr.as_ref() {
            None => vec![json_value],
            Some(jq_expr) => crate::jq_exec::run_jaq(jq_expr, &json_value)
                .with_context(|| format!("failed to apply jq expression to {display}"))?,
        };
        for value in values {
            let doc = crate::path_de::from_value_with_path::<UniverseDoc>(value)
                .with_context(|| format!("invalid universe document {display}"))?;
            docs.push(doc);
        }
        Ok(())
    }

    fn options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            uses_map_mode: self.map_mode,
            assumed_formattable_types: self.assume_formattable.iter().cloned().collect(),
        }
    }

    fn analyse(&self) -> Result<Plan> {
        let universe = self.load_universe()?;
        let options = self.options();
        let filter = self.roots.as_deref().map(Regex::new).transpose().context("invalid --roots regex")?;
        let Some(session) = Session::new(&universe, &options) else {
            warn!("MessagePackObjectAttribute is not declared; nothing to analyse");
            return Ok(Plan::default());
        };
        let roots: Vec<_> = universe
            .declarations()
            .filter(|s| session.is_root_candidate(*s))
            .filter(|s| filter.as_ref().is_none_or(|re| re.is_match(&universe.info_of(*s).name)))
            .collect();
        Ok(session.analyze_all(&roots, &CancellationToken::new())?)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        let plan = match &self.cmd {
            Command::Check(target) => {
                let plan = target.input_settings.analyse()?;
                report(&plan.diagnostics);
                plan
            }
            Command::Plan(target) => {
                let plan = target.input_settings.analyse()?;
                report(&plan.diagnostics);
                let plan_src = serde_json::to_string_pretty(&plan)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &plan_src).with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{plan_src}");
                }
                plan
            }
        };
        Ok(if plan.diagnostics.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let head = format!("error[{}]", diagnostic.kind.id());
        eprintln!("{}: {}", head.red().bold(), diagnostic.message());
        let location = match &diagnostic.member {
            Some(member) => format!("{}.{member}", diagnostic.subject),
            None => diagnostic.subject.to_string(),
        };
        eprintln!("  {} {}", "-->".blue(), location);
    }
    if diagnostics.is_empty() {
        eprintln!("{}", "✅ no diagnostics".green());
    } else {
        eprintln!("{}", format!("❌ {} diagnostic(s)", diagnostics.len()).red());
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matched nothing is almost always a typo
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plan_command() {
        let cli = CommandLineInterface::try_parse_from([
            "msgpack-plan",
            "plan",
            "-i",
            "a.json",
            "types/*.json",
            "--map-mode",
            "--assume-formattable",
            "App.Money",
            "-o",
            "plan.json",
        ])
        .unwrap();
        let Command::Plan(target) = cli.cmd else { panic!("expected plan") };
        assert_eq!(target.input_settings.input, vec!["a.json", "types/*.json"]);
        let options = target.input_settings.options();
        assert!(options.uses_map_mode);
        assert!(options.assumed_formattable_types.contains("App.Money"));
        assert_eq!(target.out, Some(PathBuf::from("plan.json")));
    }

    #[test]
    fn unmatched_glob_is_an_error() {
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
        assert_eq!(resolve_file_path_patterns(["plain.json"]).unwrap(), vec![PathBuf::from("plain.json")]);
    }
}
