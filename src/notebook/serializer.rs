//! Document parsing and serialization.

use super::{Cell, CellKind, Dialect, LANGUAGE_PLAINTEXT, LANGUAGE_SQL};

/// Separates cell blocks on disk.
const DELIMITER: &str = "\n\n";

const MARKDOWN_OPEN: &str = "/*markdown";
const MARKDOWN_CLOSE: &str = "*/";

/// Splits raw document bytes into cells.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn parse(raw: &[u8], dialect: Dialect) -> Vec<Cell> {
    let text = String::from_utf8_lossy(raw);
    let blocks = split_blocks(&text);

    match dialect {
        Dialect::PlainSql => blocks.into_iter().map(sql_cell).collect(),
        Dialect::RegressionTest => blocks.into_iter().map(slt_cell).collect(),
    }
}

/// Reconstructs document bytes from cells.
pub fn serialize(cells: &[Cell], dialect: Dialect) -> Vec<u8> {
    match dialect {
        Dialect::PlainSql => cells
            .iter()
            .map(|cell| match cell.kind {
                CellKind::Code => cell.content.clone(),
                CellKind::Markup => format!("{MARKDOWN_OPEN}\n{}\n{MARKDOWN_CLOSE}", cell.content),
            })
            .collect::<Vec<_>>()
            .join(DELIMITER)
            .into_bytes(),
        Dialect::RegressionTest => {
            let mut text = cells
                .iter()
                .map(|cell| cell.content.as_str())
                .collect::<Vec<_>>()
                .join(DELIMITER);
            text.push('\n');
            text.into_bytes()
        }
    }
}

fn split_blocks(text: &str) -> Vec<&str> {
    text.split(DELIMITER)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect()
}

fn sql_cell(block: &str) -> Cell {
    if block.starts_with(MARKDOWN_OPEN) && block.ends_with(MARKDOWN_CLOSE) {
        let lines: Vec<&str> = block.split('\n').collect();
        let inner = if lines.len() > 2 {
            lines[1..lines.len() - 1].join("\n")
        } else {
            String::new()
        };
        return Cell::markup(inner);
    }

    Cell::code(block)
}

/// Blocks made only of `# ` comment lines are shown as plain text.
fn slt_cell(block: &str) -> Cell {
    let pure_comment = block.split('\n').all(|line| line.starts_with("# "));
    let language = if pure_comment {
        LANGUAGE_PLAINTEXT
    } else {
        LANGUAGE_SQL
    };
    Cell::new(CellKind::Code, block, language)
}
