//! Parse a file and report diagnostics.

use anyhow::{bail, Result};
use efus_core::{parse_file, Instr};
use efus_types::LineCol;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Diagnostic {
    #[serde(flatten)]
    position: LineCol,
    message: String,
    source_line: String,
}

#[derive(Serialize)]
struct CheckReport {
    file: String,
    ok: bool,
    statements: usize,
    diagnostics: Vec<Diagnostic>,
}

fn count_statements(instr: &Instr) -> usize {
    instr
        .children()
        .iter()
        .map(|child| 1 + count_statements(child))
        .sum()
}

/// Parse `path` and print either a summary or the syntax error.
///
/// A syntax error makes the command fail after the report is printed.
pub fn check_file(path: &Path, json: bool) -> Result<()> {
    let file = path.display().to_string();
    let parsed = parse_file(path);

    let err = match parsed {
        Ok(program) => {
            let statements = count_statements(&program.root);
            if json {
                let report = CheckReport {
                    file,
                    ok: true,
                    statements,
                    diagnostics: Vec::new(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{file}: ok ({statements} statements)");
            }
            return Ok(());
        }
        Err(err) => err,
    };

    let Some(location) = err.location().cloned() else {
        return Err(err.into());
    };
    if json {
        let report = CheckReport {
            file: file.clone(),
            ok: false,
            statements: 0,
            diagnostics: vec![Diagnostic {
                position: location.line_col(),
                message: err.summary(),
                source_line: location.source_line,
            }],
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{err}");
    }
    bail!("{file} has syntax errors")
}
