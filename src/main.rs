//! sqlnb - run SQL and sqllogictest notebooks from the command line.

use anyhow::{bail, Context};
use sql_notebook::cli::{Cli, Command, DocumentArgs, FmtArgs, OutputFormat, RunArgs};
use sql_notebook::config::Config;
use sql_notebook::db;
use sql_notebook::error::NotebookError;
use sql_notebook::execution::{CellReport, CellTask, ExecutionController, ExecutionEvent, OutputItem};
use sql_notebook::logging;
use sql_notebook::notebook::{slt, Dialect, Document};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<NotebookError>() {
            Some(notebook_error) => error!("{}: {:#}", notebook_error.category(), e),
            None => error!("{e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Run(args) => run_notebook(&cli, args).await,
        Command::Cells(args) => print_cells(args),
        Command::Fmt(args) => format_document(args),
    }
}

fn load_document(args: &DocumentArgs) -> anyhow::Result<Document> {
    let raw = std::fs::read(&args.file)
        .map_err(NotebookError::from)
        .with_context(|| format!("Could not read {}", args.file.display()))?;
    Ok(Document::parse(&raw, args.dialect()))
}

async fn run_notebook(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let document = load_document(&args.document)?;
    let settings = args.output_settings(&config.output);

    let pool = match args.resolve_connection(&config)? {
        Some(conn) => {
            info!("Connecting to {}", conn.display_string());
            Some(db::connect(&conn).await?)
        }
        None => {
            warn!("No database connection configured");
            None
        }
    };

    let controller = Arc::new(ExecutionController::new(settings, pool));
    let tasks: Vec<CellTask> = document.executable_cells().map(CellTask::from).collect();
    let total = tasks.len();
    let tokens: HashMap<_, _> = tasks
        .iter()
        .map(|task| (task.id, task.cancel.clone()))
        .collect();

    let (tx, mut rx) = mpsc::channel(32);
    let runner = {
        let controller = Arc::clone(&controller);
        let notebook_type = document.notebook_type();
        tokio::spawn(async move {
            controller.execute(notebook_type, tasks, &tx).await;
        })
    };

    let mut failures = 0;
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        if args.format == OutputFormat::Json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        }

        match event {
            ExecutionEvent::Started { cell, .. } => {
                if let (Some(ms), Some(token)) = (args.cancel_after_ms, tokens.get(&cell)) {
                    let token = token.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        token.cancel();
                    });
                }
            }
            ExecutionEvent::Finished(report) => {
                if !report.success {
                    failures += 1;
                }
                if args.format == OutputFormat::Text {
                    print_report(&mut stdout, &report)?;
                }
            }
        }
    }
    runner.await.context("Execution task failed")?;
    controller.dispose().await;

    if failures > 0 {
        bail!("{failures} of {total} cells failed");
    }
    Ok(())
}

fn print_report(out: &mut impl Write, report: &CellReport) -> std::io::Result<()> {
    let order = report
        .execution_order
        .map(|n| format!("[{n}]"))
        .unwrap_or_else(|| "[ ]".to_string());
    let status = if report.success { "ok" } else { "failed" };
    writeln!(out, "-- cell {} {order} {status}", report.cell)?;

    for output in &report.outputs {
        for item in &output.items {
            match item {
                OutputItem::Text(text) | OutputItem::Markdown(text) => writeln!(out, "{text}")?,
                OutputItem::Json(value) => writeln!(
                    out,
                    "{}",
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                )?,
            }
        }
    }
    writeln!(out)
}

fn print_cells(args: &DocumentArgs) -> anyhow::Result<()> {
    let document = load_document(args)?;
    let mut stdout = std::io::stdout().lock();

    for entry in document.cells() {
        let cell = &entry.cell;
        writeln!(
            stdout,
            "-- cell {} {:?} ({})",
            entry.id, cell.kind, cell.language
        )?;
        writeln!(stdout, "{}", cell.content)?;

        if document.dialect() == Dialect::RegressionTest && cell.is_executable() {
            for statement in slt::translate_cell(&cell.content).statements {
                writeln!(stdout, "=> {statement}")?;
            }
        }
        writeln!(stdout)?;
    }
    Ok(())
}

fn format_document(args: &FmtArgs) -> anyhow::Result<()> {
    let document = load_document(&args.document)?;
    let bytes = document.serialize();

    if args.write {
        std::fs::write(&args.document.file, &bytes)
            .map_err(NotebookError::from)
            .with_context(|| format!("Could not write {}", args.document.file.display()))?;
        info!("Formatted {}", args.document.file.display());
    } else {
        std::io::stdout().write_all(&bytes)?;
    }
    Ok(())
}
