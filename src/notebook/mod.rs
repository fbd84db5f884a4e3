//! Notebook documents.
//!
//! A document is an ordered list of cells separated by blank lines on disk.
//! Two dialects exist: plain SQL with `/*markdown ... */` commentary blocks,
//! and a subset of sqllogictest.

mod serializer;
pub mod slt;

pub use serializer::{parse, serialize};

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Notebook type tag of plain SQL documents.
pub const NOTEBOOK_TYPE_SQL: &str = "sql-notebook";

/// Notebook type tag of sqllogictest documents.
pub const NOTEBOOK_TYPE_SLT: &str = "slt-notebook";

/// Which document grammar applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// `.sql` notebooks.
    PlainSql,
    /// `.slt` notebooks.
    RegressionTest,
}

impl Dialect {
    /// The notebook type tag hosts use for this dialect.
    pub fn notebook_type(&self) -> &'static str {
        match self {
            Self::PlainSql => NOTEBOOK_TYPE_SQL,
            Self::RegressionTest => NOTEBOOK_TYPE_SLT,
        }
    }

    /// Resolves a host's notebook type tag.
    pub fn from_notebook_type(tag: &str) -> Option<Self> {
        match tag {
            NOTEBOOK_TYPE_SQL => Some(Self::PlainSql),
            NOTEBOOK_TYPE_SLT => Some(Self::RegressionTest),
            _ => None,
        }
    }

    /// Picks the dialect from a file extension; anything but `slt` is SQL.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(ext) if ext.eq_ignore_ascii_case("slt") => Self::RegressionTest,
            _ => Self::PlainSql,
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" | "plain-sql" => Ok(Self::PlainSql),
            "slt" | "regression-test" | "sqllogictest" => Ok(Self::RegressionTest),
            _ => Err(format!("Invalid dialect: {s}. Expected: sql or slt")),
        }
    }
}

/// Whether a cell runs or only describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Markup,
}

/// Language tag of SQL code cells.
pub const LANGUAGE_SQL: &str = "sql";

/// Language tag of markup cells.
pub const LANGUAGE_MARKDOWN: &str = "markdown";

/// Language tag of sqllogictest cells holding only comments.
pub const LANGUAGE_PLAINTEXT: &str = "plaintext";

/// One block of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub kind: CellKind,
    pub content: String,
    pub language: String,
}

impl Cell {
    /// Creates an executable SQL cell.
    pub fn code(content: impl Into<String>) -> Self {
        Self::new(CellKind::Code, content, LANGUAGE_SQL)
    }

    /// Creates a markdown cell.
    pub fn markup(content: impl Into<String>) -> Self {
        Self::new(CellKind::Markup, content, LANGUAGE_MARKDOWN)
    }

    pub fn new(kind: CellKind, content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            language: language.into(),
        }
    }

    /// True for code cells.
    pub fn is_code(&self) -> bool {
        self.kind == CellKind::Code
    }

    /// True for code cells tagged as SQL.
    pub fn is_executable(&self) -> bool {
        self.is_code() && self.language == LANGUAGE_SQL
    }
}

/// Stable identity of a cell within the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellId(u64);

impl CellId {
    /// Generates a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell placed in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCell {
    pub id: CellId,
    pub cell: Cell,
}

/// An ordered sequence of cells in one dialect.
#[derive(Debug, Clone)]
pub struct Document {
    dialect: Dialect,
    cells: Vec<DocumentCell>,
}

impl Document {
    /// Builds a document, giving every cell a fresh identity.
    pub fn new(dialect: Dialect, cells: Vec<Cell>) -> Self {
        let cells = cells
            .into_iter()
            .map(|cell| DocumentCell {
                id: CellId::new(),
                cell,
            })
            .collect();
        Self { dialect, cells }
    }

    /// Parses raw document bytes.
    pub fn parse(raw: &[u8], dialect: Dialect) -> Self {
        Self::new(dialect, parse(raw, dialect))
    }

    /// Serializes the document back to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let cells: Vec<Cell> = self.cells.iter().map(|c| c.cell.clone()).collect();
        serialize(&cells, self.dialect)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The host notebook type of this document.
    pub fn notebook_type(&self) -> &'static str {
        self.dialect.notebook_type()
    }

    pub fn cells(&self) -> &[DocumentCell] {
        &self.cells
    }

    /// Looks a cell up by identity.
    pub fn cell(&self, id: CellId) -> Option<&DocumentCell> {
        self.cells.iter().find(|c| c.id == id)
    }

    /// The cells that run as SQL, in document order. Markup and plaintext
    /// comment cells are left out.
    pub fn executable_cells(&self) -> impl Iterator<Item = &DocumentCell> {
        self.cells.iter().filter(|c| c.cell.is_executable())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
