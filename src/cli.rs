//! Command-line argument parsing for `sqlnb`.

use crate::config::{Config, ConnectionConfig, OutputSettings};
use crate::error::{NotebookError, Result};
use crate::notebook::Dialect;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// How `sqlnb run` prints cell results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable outputs per cell.
    #[default]
    Text,
    /// One JSON object per execution event.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Run SQL and sqllogictest notebooks from the command line.
#[derive(Parser, Debug)]
#[command(name = "sqlnb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute every code cell of a notebook in order
    Run(RunArgs),
    /// Print the cells of a notebook
    Cells(DocumentArgs),
    /// Re-serialize a notebook
    Fmt(FmtArgs),
}

/// The notebook file a subcommand works on.
#[derive(Args, Debug)]
pub struct DocumentArgs {
    /// Notebook file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Document dialect: sql or slt (defaults from the file extension)
    #[arg(long, value_name = "DIALECT")]
    pub dialect: Option<Dialect>,
}

impl DocumentArgs {
    pub fn dialect(&self) -> Dialect {
        self.dialect.unwrap_or_else(|| {
            Dialect::from_extension(self.file.extension().and_then(|ext| ext.to_str()))
        })
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Connection string (postgres://... or sqlite:...)
    #[arg(long, value_name = "URL", conflicts_with = "connection")]
    pub url: Option<String>,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Add a JSON rendering next to every table
    #[arg(long)]
    pub json: bool,

    /// Rows shown per table
    #[arg(long, value_name = "N")]
    pub max_rows: Option<usize>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: OutputFormat,

    /// Cancel any cell still running after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub cancel_after_ms: Option<u64>,
}

impl RunArgs {
    /// Applies command-line overrides to the configured output settings.
    pub fn output_settings(&self, configured: &OutputSettings) -> OutputSettings {
        let mut settings = configured.clone();
        if self.json {
            settings.json = true;
        }
        if let Some(max_rows) = self.max_rows {
            settings.max_result_rows = max_rows;
        }
        settings
    }

    /// Resolves the connection to use.
    ///
    /// Precedence: `--url`, then `-c NAME`, then the config's `default`
    /// connection. Environment defaults are applied last.
    pub fn resolve_connection(&self, config: &Config) -> Result<Option<ConnectionConfig>> {
        let mut connection = match (&self.url, &self.connection) {
            (Some(url), _) => Some(ConnectionConfig::from_connection_string(url)?),
            (None, Some(name)) => Some(config.get_connection(Some(name)).cloned().ok_or_else(
                || NotebookError::config(format!("Connection '{name}' not found in config file")),
            )?),
            (None, None) => config.get_connection(None).cloned(),
        };

        if let Some(ref mut conn) = connection {
            conn.apply_env_defaults();
        }

        Ok(connection)
    }
}

#[derive(Args, Debug)]
pub struct FmtArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Overwrite the file instead of printing to stdout
    #[arg(long)]
    pub write: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
