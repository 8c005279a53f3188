//! Runs `fixtures/*.json` through the full multi-root plan and compares
//! diagnostic ids and resolver entries with the expected ones.
//!
//! Usage: `dev-test-runner [NAME_REGEX]`
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use msgpack_plan::path_de;
use msgpack_plan::symbols::universe::UniverseDoc;
use msgpack_plan::{AnalyzerOptions, CancellationToken, Session, Universe};
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    description: String,
    #[serde(default)]
    options: AnalyzerOptions,
    universe: UniverseDoc,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Expect {
    #[serde(default)]
    diagnostics: Vec<String>,
    #[serde(default)]
    resolver: Vec<String>,
}

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|p| Regex::new(&p)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid filter: {error}");
            return ExitCode::from(2);
        }
    };
    let dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures"));
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect(),
        Err(error) => {
            eprintln!("cannot read {}: {error}", dir.display());
            return ExitCode::from(2);
        }
    };
    paths.sort();

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in paths {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        match run(&path) {
            Ok(description) => {
                passed += 1;
                eprintln!("✅ {} {}", name.green(), description.dimmed());
            }
            Err(message) => {
                failed += 1;
                eprintln!("❌ {}\n{}", name.red().bold(), message);
            }
        }
    }
    eprintln!("{passed} passed, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn run(path: &Path) -> Result<String, String> {
    let source = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let fixture: Fixture = path_de::from_str_with_path(&source).map_err(|e| e.to_string())?;

    let universe = Universe::from_docs([fixture.universe]).map_err(|e| e.to_string())?;
    let session = Session::new(&universe, &fixture.options).ok_or("MessagePackObjectAttribute is not declared")?;
    let roots: Vec<_> = universe.declarations().filter(|s| session.is_root_candidate(*s)).collect();
    let plan = session.analyze_all(&roots, &CancellationToken::new()).map_err(|e| e.to_string())?;

    let diagnostics: Vec<String> = plan.diagnostics.iter().map(|d| d.kind.id().to_string()).collect();
    let resolver: Vec<String> = plan.table.entries().iter().map(|e| e.identity.to_string()).collect();

    let mut problems = Vec::new();
    if diagnostics != fixture.expect.diagnostics {
        problems.push(format!(
            "  diagnostics: expected {:?}, found {:?}\n{}",
            fixture.expect.diagnostics,
            diagnostics,
            plan.diagnostics.iter().map(|d| format!("    {d}")).collect::<Vec<_>>().join("\n")
        ));
    }
    if resolver != fixture.expect.resolver {
        problems.push(format!("  resolver: expected {:?}, found {:?}", fixture.expect.resolver, resolver));
    }
    if problems.is_empty() { Ok(fixture.description) } else { Err(problems.join("\n")) }
}
