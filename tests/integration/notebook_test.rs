//! Document parsing, serialization, and sqllogictest translation tests.

use pretty_assertions::assert_eq;
use sql_notebook::notebook::{
    slt, Cell, CellKind, Dialect, Document, LANGUAGE_PLAINTEXT, LANGUAGE_SQL,
};
use std::io::Write;

const REPORT_SQL: &str = "/*markdown
# Monthly report
Numbers come from the orders table.
*/

create table orders (id int, total numeric);

insert into orders values (1, 9.5), (2, 20);
select sum(total) from orders;
";

const SELECT_SLT: &str = "# basic select behaviour
# against a single table

statement ok
CREATE TABLE t(a INTEGER, b TEXT)

statement ok
INSERT INTO t VALUES (1, 'one'), (2, 'two')

query IT rowsort
SELECT a, b FROM t
----
1 one
2 two
";

#[test]
fn test_plain_sql_document_from_file() {
    let mut file = tempfile::Builder::new().suffix(".sql").tempfile().unwrap();
    file.write_all(REPORT_SQL.as_bytes()).unwrap();

    let raw = std::fs::read(file.path()).unwrap();
    let dialect = Dialect::from_extension(file.path().extension().and_then(|e| e.to_str()));
    let document = Document::parse(&raw, dialect);

    assert_eq!(document.notebook_type(), "sql-notebook");
    assert_eq!(document.len(), 3);
    assert_eq!(
        document.cells()[0].cell,
        Cell::markup("# Monthly report\nNumbers come from the orders table.")
    );
    assert_eq!(document.executable_cells().count(), 2);
    assert_eq!(
        document.cells()[2].cell.content,
        "insert into orders values (1, 9.5), (2, 20);\nselect sum(total) from orders;"
    );
}

#[test]
fn test_plain_sql_reserialization_is_stable() {
    let document = Document::parse(REPORT_SQL.as_bytes(), Dialect::PlainSql);
    let once = document.serialize();
    let twice = Document::parse(&once, Dialect::PlainSql).serialize();

    assert_eq!(once, twice);
    assert!(String::from_utf8(once)
        .unwrap()
        .starts_with("/*markdown\n# Monthly report\n"));
}

#[test]
fn test_cell_ids_are_unique_and_stable() {
    let document = Document::parse(REPORT_SQL.as_bytes(), Dialect::PlainSql);
    let other = Document::parse(REPORT_SQL.as_bytes(), Dialect::PlainSql);

    let ids: Vec<_> = document.cells().iter().map(|c| c.id).collect();
    for id in &ids {
        assert!(document.cell(*id).is_some());
        assert!(other.cell(*id).is_none());
    }
    assert_eq!(document.cells().iter().map(|c| c.id).collect::<Vec<_>>(), ids);
}

#[test]
fn test_slt_document_cells_and_translation() {
    let document = Document::parse(SELECT_SLT.as_bytes(), Dialect::RegressionTest);

    assert_eq!(document.notebook_type(), "slt-notebook");
    assert_eq!(document.len(), 4);
    assert_eq!(document.cells()[0].cell.language, LANGUAGE_PLAINTEXT);
    assert!(document.cells()[1..]
        .iter()
        .all(|c| c.cell.kind == CellKind::Code && c.cell.language == LANGUAGE_SQL));

    assert_eq!(document.executable_cells().count(), 3);

    let translated: Vec<String> = document
        .cells()
        .iter()
        .map(|c| slt::translate(&c.cell.content))
        .collect();
    assert_eq!(
        translated,
        vec![
            "".to_string(),
            "CREATE TABLE t(a INTEGER, b TEXT);".to_string(),
            "INSERT INTO t VALUES (1, 'one'), (2, 'two');".to_string(),
            "SELECT a, b FROM t;".to_string(),
        ]
    );
}

#[test]
fn test_slt_serialization_ends_with_newline() {
    let document = Document::parse(SELECT_SLT.as_bytes(), Dialect::RegressionTest);
    let text = String::from_utf8(document.serialize()).unwrap();

    assert!(text.ends_with("2 two\n"));
    assert_eq!(
        Document::parse(text.as_bytes(), Dialect::RegressionTest)
            .cells()
            .iter()
            .map(|c| c.cell.clone())
            .collect::<Vec<_>>(),
        document.cells().iter().map(|c| c.cell.clone()).collect::<Vec<_>>()
    );
}

#[test]
fn test_slt_crlf_input_translates() {
    let translation = slt::translate_cell("statement ok\r\nSELECT 1\r\n\r\nhalt\r\n");

    assert_eq!(translation.statements, vec!["SELECT 1;"]);
    assert_eq!(translation.warnings.len(), 1);
}
