//! End-to-end tests: manifest + CSV files on disk, SQL in, row batches out.

use std::io::Write;
use std::path::{Path, PathBuf};
use toydb::data::Value;
use toydb::exec::concat_batches;
use toydb::{Database, RowVector, ToyDbError};

const MANIFEST: &str = r#"{
    "tables": [
        {
            "name": "users",
            "id": 11699830787864871553,
            "id_name": "users",
            "format": "csv",
            "schema": [
                { "name": "id", "type": "INT64", "nullable": false },
                { "name": "name", "type": "STRING", "nullable": false },
                { "name": "age", "type": "INT32", "nullable": false },
                { "name": "city", "type": "STRING", "nullable": true },
                { "name": "created_at", "type": "STRING", "nullable": false }
            ],
            "files": [ { "path": "users.csv", "row_count": 10 } ]
        },
        {
            "name": "orders",
            "id": 14579454068846827673,
            "format": "csv",
            "schema": [
                { "name": "id", "type": "INT64", "nullable": false },
                { "name": "user_id", "type": "INT64", "nullable": false },
                { "name": "total_amount", "type": "DOUBLE", "nullable": false }
            ],
            "files": [ { "path": "orders.csv" } ]
        }
    ]
}"#;

const USERS_CSV: &str = "\
id,name,age,city,created_at
1,Alice Johnson,28,New York,2023-01-15
2,Bob Smith,35,Los Angeles,2023-02-20
3,Carol Williams,42,Chicago,2023-03-10
4,David Brown,24,Houston,2023-04-05
5,Edward Norton,31,Boston,2023-05-12
6,Fiona Apple,26,San Francisco,2023-06-18
7,George Miller,39,Seattle,2023-07-22
8,Hannah Montana,29,NULL,2023-08-30
9,Ian McKellen,45,Denver,2023-09-14
10,Jane Doe,33,Portland,2023-10-08
";

const ORDERS_CSV: &str = "\
id,user_id,total_amount
1,1,99.5
2,1,12.0
3,4,250.25
";

struct Fixture {
    _dir: tempfile::TempDir,
    manifest: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "users.csv", USERS_CSV);
    write_file(dir.path(), "orders.csv", ORDERS_CSV);
    let manifest = write_file(dir.path(), "tdb_manifest.json", MANIFEST);
    Fixture { _dir: dir, manifest }
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn merged(batches: &[RowVector]) -> RowVector {
    concat_batches(batches).unwrap()
}

#[test]
fn select_star_returns_all_rows() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let batches = db.execute("SELECT * FROM users").unwrap();
    let result = merged(&batches);
    assert_eq!(result.row_count(), 10);
    assert_eq!(result.column_count(), 5);
    assert_eq!(result.column(1).value_at(0), Value::String("Alice Johnson".into()));
    // Hannah Montana's city is NULL.
    assert!(result.column(3).is_null(7));
    assert!(!result.column(3).is_null(6));
}

#[test]
fn select_with_where_filters_and_projects() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let batches = db.execute("SELECT id FROM users WHERE id = 1").unwrap();
    let result = merged(&batches);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.column_count(), 1);
    assert_eq!(result.column(0).i64_at(0), 1);
}

#[test]
fn select_with_and_condition() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let batches = db
        .execute("SELECT name FROM users WHERE age > 30 AND age < 40")
        .unwrap();
    let result = merged(&batches);
    // Bob 35, Edward 31, George 39, Jane 33.
    assert_eq!(result.row_count(), 4);
    assert_eq!(result.column(0).value_at(0), Value::String("Bob Smith".into()));
}

#[test]
fn string_comparison_in_where() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let batches = db
        .execute("SELECT id FROM users WHERE city = 'New York'")
        .unwrap();
    let result = merged(&batches);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.column(0).i64_at(0), 1);
}

#[test]
fn null_rows_never_match_comparisons() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    // Hannah's NULL city matches neither a positive nor a negated
    // comparison.
    let eq = merged(&db.execute("SELECT id FROM users WHERE city = 'Chicago'").unwrap());
    assert_eq!(eq.row_count(), 1);
    let neq = merged(&db.execute("SELECT id FROM users WHERE city != 'Chicago'").unwrap());
    assert_eq!(neq.row_count(), 8);
}

#[test]
fn small_batch_size_yields_multiple_batches() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap().with_batch_size(4);

    let batches = db.execute("SELECT * FROM users").unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.row_count()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn empty_result_is_no_batches() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let batches = db.execute("SELECT id FROM users WHERE id = 999").unwrap();
    assert!(batches.is_empty());
}

#[test]
fn double_comparison() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let batches = db
        .execute("SELECT id FROM orders WHERE total_amount > 50.0")
        .unwrap();
    let result = merged(&batches);
    assert_eq!(result.row_count(), 2);
}

#[test]
fn int_literal_widens_against_int64_column() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    // user_id is INT64, the literal is INT32; the planner's cast makes
    // this compare in INT64.
    let batches = db
        .execute("SELECT id FROM orders WHERE user_id = 1")
        .unwrap();
    assert_eq!(merged(&batches).row_count(), 2);
}

#[test]
fn ambiguous_column_is_rejected_qualified_resolves() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let err = db.execute("SELECT id FROM users, orders").unwrap_err();
    assert!(matches!(err, ToyDbError::AmbiguousColumn(_)), "{}", err);

    // Qualification resolves the name; execution then stops at the
    // multi-table gap rather than a resolution error.
    let err = db.execute("SELECT users.id FROM users, orders").unwrap_err();
    assert!(matches!(err, ToyDbError::NotImplemented(_)), "{}", err);
}

#[test]
fn resolution_errors() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    assert!(matches!(
        db.execute("SELECT id FROM missing_table"),
        Err(ToyDbError::UnresolvedTable(_))
    ));
    assert!(matches!(
        db.execute("SELECT missing_column FROM users"),
        Err(ToyDbError::UnresolvedColumn(_))
    ));
}

#[test]
fn dml_parses_but_does_not_execute() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    for sql in [
        "CREATE TABLE t (id INT64)",
        "INSERT INTO users (id) VALUES (11)",
        "UPDATE users SET age = 30 WHERE id = 1",
        "DELETE FROM users WHERE id = 1",
    ] {
        let err = db.execute(sql).unwrap_err();
        assert!(matches!(err, ToyDbError::NotImplemented(_)), "{}: {}", sql, err);
    }
}

#[test]
fn parse_errors_carry_positions() {
    let fx = fixture();
    let db = Database::open(&fx.manifest).unwrap();

    let err = db.execute("SELEC id FROM users").unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, ToyDbError::Parse(_)), "{}", msg);
    assert!(msg.contains("1:1"), "{}", msg);
}

#[test]
fn missing_database_file_exits_with_error() {
    let err = Database::open("/nonexistent/tdb_manifest.json").unwrap_err();
    assert!(matches!(err, ToyDbError::Catalog(_)));
}
