//! Execution against a live PostgreSQL server.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

use super::{reports, run_batch};
use sql_notebook::config::{ConnectionConfig, OutputSettings};
use sql_notebook::db::{self, Pool};
use sql_notebook::execution::{CellOutput, CellTask, ExecutionController, OutputItem};
use sql_notebook::notebook::{Cell, CellId};
use std::sync::Arc;
use std::time::Duration;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a pool for the test database.
async fn get_test_pool() -> Option<Arc<dyn Pool>> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    db::connect(&config).await.ok()
}

fn task(sql: &str) -> CellTask {
    CellTask::new(CellId::new(), Cell::code(sql))
}

#[tokio::test]
async fn test_select_renders_table() {
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = OutputSettings {
        json: true,
        ..Default::default()
    };
    let controller = ExecutionController::new(settings, Some(pool));

    let reports = reports(
        run_batch(
            &controller,
            "sql-notebook",
            vec![task(
                "select 1 as num, 'hello world' as greeting, '{\"a\": 1}'::jsonb as doc, '\\x0aff'::bytea as raw",
            )],
        )
        .await,
    );

    assert!(reports[0].success);
    let items = &reports[0].outputs[0].items;
    let OutputItem::Markdown(html) = &items[0] else {
        panic!("expected markdown");
    };
    assert!(html.contains("<th>num</th><th>greeting</th><th>doc</th><th>raw</th>"));
    assert!(html.contains("<td>1</td><td>hello&nbsp;world</td><td>{&quot;a&quot;:1}</td><td>0x0aff</td>"));
    assert!(matches!(items[1], OutputItem::Json(_)));

    controller.dispose().await;
}

#[tokio::test]
async fn test_error_message_is_reported() {
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let controller = ExecutionController::new(OutputSettings::default(), Some(pool));

    let reports = reports(
        run_batch(
            &controller,
            "sql-notebook",
            vec![task("select * from table_that_does_not_exist")],
        )
        .await,
    );

    assert!(!reports[0].success);
    let message = reports[0].outputs[0].as_text().unwrap();
    assert!(message.contains("does not exist"), "got: {message}");

    controller.dispose().await;
}

#[tokio::test]
async fn test_cancel_long_running_query() {
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let controller = ExecutionController::new(OutputSettings::default(), Some(pool));
    let sleeper = task("select pg_sleep(30)");
    let cancel = sleeper.cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });
    let started = std::time::Instant::now();
    let reports = reports(
        run_batch(&controller, "sql-notebook", vec![sleeper, task("select 1")]).await,
    );

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(reports[0].outputs, vec![CellOutput::text("Query cancelled")]);
    assert!(reports[1].success);

    controller.dispose().await;
}

#[tokio::test]
async fn test_float4_renders_without_widening_noise() {
    let Some(pool) = get_test_pool().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let controller = ExecutionController::new(OutputSettings::default(), Some(pool));

    let reports = reports(
        run_batch(&controller, "sql-notebook", vec![task("select 1.1::float4 as f")]).await,
    );

    let OutputItem::Markdown(html) = &reports[0].outputs[0].items[0] else {
        panic!("expected markdown");
    };
    assert!(html.contains("<td>1.1</td>"), "got: {html}");

    controller.dispose().await;
}
