//! End-to-end execution against an in-memory SQLite database.

use super::{reports, run_batch};
use sql_notebook::config::OutputSettings;
use sql_notebook::db::SqlitePool;
use sql_notebook::execution::{
    CellOutput, CellReport, CellTask, ExecutionController, OutputItem, SUCCESS_MESSAGE,
};
use sql_notebook::notebook::{Dialect, Document};
use sql_notebook::render::EMPTY_RESULTS_TABLE;
use std::sync::Arc;

async fn controller(settings: OutputSettings) -> ExecutionController {
    let pool = SqlitePool::in_memory().await.unwrap();
    ExecutionController::new(settings, Some(Arc::new(pool)))
}

async fn run_document(
    controller: &ExecutionController,
    text: &str,
    dialect: Dialect,
) -> Vec<CellReport> {
    let document = Document::parse(text.as_bytes(), dialect);
    let batch: Vec<CellTask> = document.executable_cells().map(CellTask::from).collect();
    reports(run_batch(controller, document.notebook_type(), batch).await)
}

fn markdown(output: &CellOutput) -> &str {
    match &output.items[0] {
        OutputItem::Markdown(html) => html,
        other => panic!("expected markdown, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_sql_notebook() {
    let controller = controller(OutputSettings::default()).await;
    let reports = run_document(
        &controller,
        "create table users (id integer, name text);

select * from users;

insert into users values (1, 'Ada Lovelace'), (2, '<script>');

select id, name from users order by id;",
        Dialect::PlainSql,
    )
    .await;

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.success));
    assert_eq!(reports[0].outputs, vec![CellOutput::text(SUCCESS_MESSAGE)]);
    assert_eq!(reports[1].outputs, vec![CellOutput::text(SUCCESS_MESSAGE)]);
    assert_eq!(reports[2].outputs, vec![CellOutput::text("2 rows affected")]);

    let html = markdown(&reports[3].outputs[0]);
    assert!(html.contains("<tr><th>id</th><th>name</th></tr>"));
    assert!(html.contains("<tr><td>1</td><td>Ada&nbsp;Lovelace</td></tr>"));
    assert!(html.contains("<tr><td>2</td><td>&lt;script&gt;</td></tr>"));
}

#[tokio::test]
async fn test_multi_statement_cell_renders_each_statement() {
    let controller = controller(OutputSettings::default()).await;
    let reports = run_document(
        &controller,
        "create table t (a integer);
insert into t values (1);
select a from t;",
        Dialect::PlainSql,
    )
    .await;

    let outputs = &reports[0].outputs;
    assert_eq!(outputs.len(), 3);
    assert_eq!(markdown(&outputs[0]), EMPTY_RESULTS_TABLE);
    assert_eq!(markdown(&outputs[1]), EMPTY_RESULTS_TABLE);
    assert!(markdown(&outputs[2]).contains("<td>1</td>"));
}

#[tokio::test]
async fn test_truncation_and_json_companion() {
    let settings = OutputSettings {
        json: true,
        max_result_rows: 2,
        ..Default::default()
    };
    let controller = controller(settings).await;
    let reports = run_document(
        &controller,
        "create table n (v integer, blob blob);

insert into n values (1, x'cafe'), (2, null), (3, null);

select v, blob from n order by v;",
        Dialect::PlainSql,
    )
    .await;

    let output = &reports[2].outputs[0];
    let html = markdown(output);
    assert!(html.contains("<tr><td>1</td><td>0xcafe</td></tr>"));
    assert!(html.contains("<tr><td>2</td><td>null</td></tr>"));
    assert!(!html.contains("<td>3</td>"));
    assert!(html.contains("<tr><td>...</td><td>...</td></tr>"));

    let OutputItem::Json(json) = &output.items[1] else {
        panic!("expected json companion");
    };
    assert_eq!(json.as_array().map(Vec::len), Some(3));
    assert_eq!(json[0]["v"], 1);
    assert_eq!(json[0]["blob"], serde_json::json!([0xca, 0xfe]));
}

#[tokio::test]
async fn test_query_error_reported_and_batch_continues() {
    let controller = controller(OutputSettings::default()).await;
    let reports = run_document(
        &controller,
        "select * from missing;\n\nselect 1 as one;",
        Dialect::PlainSql,
    )
    .await;

    assert!(!reports[0].success);
    let message = reports[0].outputs[0].as_text().unwrap();
    assert!(message.contains("no such table"), "got: {message}");
    assert!(reports[1].success);
}

#[tokio::test]
async fn test_slt_notebook() {
    let controller = controller(OutputSettings::default()).await;
    let reports = run_document(
        &controller,
        "# setup

statement ok
CREATE TABLE t(a INTEGER, b TEXT)

statement ok
INSERT INTO t VALUES (1, 'one'), (2, 'two')

hash-threshold 8
query IT rowsort
SELECT a, b FROM t ORDER BY a
----
1 one
2 two
",
        Dialect::RegressionTest,
    )
    .await;

    // The leading comment block is plaintext and never runs.
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.success));
    assert_eq!(
        reports
            .iter()
            .map(|r| r.execution_order)
            .collect::<Vec<_>>(),
        vec![Some(1), Some(2), Some(3)]
    );

    let html = markdown(&reports[2].outputs[0]);
    assert!(html.contains("<tr><td>1</td><td>one</td></tr>"));
    assert!(html.contains("<tr><td>2</td><td>two</td></tr>"));
}

#[tokio::test]
async fn test_no_rows_affected_after_earlier_insert() {
    let controller = controller(OutputSettings::default()).await;
    let reports = run_document(
        &controller,
        "create table t (a integer);

insert into t values (1);

select a from t where a > 5;

create table u (b integer);",
        Dialect::PlainSql,
    )
    .await;

    assert_eq!(
        reports
            .iter()
            .map(|r| r.outputs.clone())
            .collect::<Vec<_>>(),
        vec![
            vec![CellOutput::text(SUCCESS_MESSAGE)],
            vec![CellOutput::text("1 row affected")],
            vec![CellOutput::text(SUCCESS_MESSAGE)],
            vec![CellOutput::text(SUCCESS_MESSAGE)],
        ]
    );
}
