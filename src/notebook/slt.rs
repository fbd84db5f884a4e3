//! sqllogictest cell translation.
//!
//! Turns the records of one sqllogictest cell into the SQL text that is sent
//! to the database. Only `statement` and `query` records produce SQL; harness
//! directives are recognized and skipped.

use tracing::{error, warn};

/// Separates a query's SQL from its expected output.
const RESULTS_SEPARATOR: &str = "----";

/// Harness directives that have no meaning when running a single cell.
const IGNORED_COMMANDS: &[&str] = &[
    "include",
    "halt",
    "subtest",
    "sleep",
    "skipif",
    "onlyif",
    "connection",
    "system",
    "control",
    "hash-threshold",
];

/// Something the translator skipped. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationWarning {
    /// A known harness directive was skipped.
    Ignored { line: usize, record: String },
    /// The first token is not a sqllogictest command.
    Unrecognized { line: usize, record: String },
}

/// The statements extracted from one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub statements: Vec<String>,
    pub warnings: Vec<TranslationWarning>,
}

impl Translation {
    /// The statement text handed to a connection.
    pub fn sql(&self) -> String {
        self.statements.join("\n")
    }
}

/// Translates a cell and returns the SQL text to execute.
pub fn translate(cell_text: &str) -> String {
    translate_cell(cell_text).sql()
}

/// Translates a cell, keeping track of every skipped record.
pub fn translate_cell(cell_text: &str) -> Translation {
    let lines: Vec<&str> = cell_text.lines().collect();
    let mut translation = Translation::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;
        i += 1;

        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let record = tokens.join(" ");

        match tokens[0] {
            command @ ("statement" | "query") => {
                let is_query = command == "query";
                let mut sql = String::new();

                while i < lines.len() && !lines[i].is_empty() {
                    if is_query && lines[i] == RESULTS_SEPARATOR {
                        break;
                    }
                    sql.push_str(lines[i]);
                    i += 1;
                }

                if !sql.trim_end().ends_with(';') {
                    sql.push(';');
                }
                translation.statements.push(sql);

                // Expected results are the harness's business.
                if i < lines.len() && lines[i] == RESULTS_SEPARATOR {
                    while i < lines.len() && !lines[i].is_empty() {
                        i += 1;
                    }
                }
            }
            command if IGNORED_COMMANDS.contains(&command) => {
                warn!("ignored sqllogictest command `{record}`");
                translation.warnings.push(TranslationWarning::Ignored {
                    line: line_no,
                    record,
                });
            }
            _ => {
                error!("unrecognized sqllogictest command `{record}`");
                translation.warnings.push(TranslationWarning::Unrecognized {
                    line: line_no,
                    record,
                });
            }
        }
    }

    translation
}
