//! Integration tests against a seeded SQLite file

use parley_sql::{DatabaseError, DatabaseOptions, SqlDatabase, SqlValue};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

async fn seed_database(dir: &TempDir) -> String {
    let path = dir.path().join("street_tree_db.sqlite");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE street_trees (
            tree_id INTEGER PRIMARY KEY,
            species TEXT NOT NULL,
            address TEXT,
            dbh REAL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("CREATE TABLE neighborhoods (name TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    for (id, species, address, dbh) in [
        (1, "Quercus agrifolia :: Coast Live Oak", Some("100 Market St"), Some(12.5)),
        (2, "Pinus radiata :: Monterey Pine", None, Some(30.0)),
        (3, "Quercus agrifolia :: Coast Live Oak", Some("22 Fell St"), None),
        (4, "Platanus x hispanica :: Sycamore: London Plane", Some("9 Oak St"), Some(8.25)),
    ] {
        sqlx::query("INSERT INTO street_trees (tree_id, species, address, dbh) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(species)
            .bind(address)
            .bind(dbh)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    format!("sqlite:///{}", path.display())
}

#[tokio::test]
async fn test_usable_table_names_sorted() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    assert_eq!(db.dialect(), "sqlite");
    assert_eq!(
        db.usable_table_names().await.unwrap(),
        vec!["neighborhoods".to_string(), "street_trees".to_string()]
    );
}

#[tokio::test]
async fn test_include_tables_filter() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::connect(
        &uri,
        DatabaseOptions {
            include_tables: Some(vec!["street_trees".to_string()]),
            ..DatabaseOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        db.usable_table_names().await.unwrap(),
        vec!["street_trees".to_string()]
    );
    let info = db.table_info(None).await.unwrap();
    assert!(!info.contains("neighborhoods"));
}

#[tokio::test]
async fn test_table_info_has_ddl_and_samples() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    let info = db
        .table_info(Some(&["street_trees".to_string()]))
        .await
        .unwrap();
    assert!(info.starts_with("CREATE TABLE street_trees"));
    assert!(info.contains("/*\n3 rows from street_trees table:\ntree_id\tspecies\taddress\tdbh\n"));
    assert!(info.contains("1\tQuercus agrifolia :: Coast Live Oak\t100 Market St\t12.5"));
    assert!(info.contains("2\tPinus radiata :: Monterey Pine\tNone\t30.0"));
    assert!(!info.contains("London Plane"));
    assert!(info.ends_with("*/"));
}

#[tokio::test]
async fn test_table_info_unknown_table() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    let err = db
        .table_info(Some(&["parks".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::TableNotFound(name) if name == "parks"));
}

#[tokio::test]
async fn test_run_select() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    let result = db
        .run("SELECT DISTINCT \"species\" FROM street_trees ORDER BY \"species\" LIMIT 5;")
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["species".to_string()]);
    assert_eq!(result.rows.len(), 3);
    assert_eq!(
        result.to_string(),
        "[('Pinus radiata :: Monterey Pine',), \
         ('Platanus x hispanica :: Sycamore: London Plane',), \
         ('Quercus agrifolia :: Coast Live Oak',)]"
    );
}

#[tokio::test]
async fn test_run_mixed_types() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    let result = db
        .run("SELECT tree_id, dbh, address FROM street_trees WHERE tree_id IN (2, 3) ORDER BY tree_id")
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![SqlValue::Integer(2), SqlValue::Real(30.0), SqlValue::Null],
            vec![
                SqlValue::Integer(3),
                SqlValue::Null,
                SqlValue::Text("22 Fell St".to_string())
            ],
        ]
    );
    assert_eq!(result.to_string(), "[(2, 30.0, None), (3, None, '22 Fell St')]");
}

#[tokio::test]
async fn test_run_no_rows_is_empty_string() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    assert_eq!(
        db.run_no_throw("SELECT species FROM street_trees WHERE tree_id = 99")
            .await,
        ""
    );
}

#[tokio::test]
async fn test_writes_rejected_by_default() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    let err = db.run("DELETE FROM street_trees").await.unwrap_err();
    assert!(matches!(err, DatabaseError::ReadOnlyViolation(_)));

    let text = db.run_no_throw("DROP TABLE street_trees").await;
    assert!(text.starts_with("Error: only read statements are allowed"));

    let count = db.run("SELECT COUNT(*) FROM street_trees").await.unwrap();
    assert_eq!(count.rows[0][0], SqlValue::Integer(4));
}

#[tokio::test]
async fn test_writes_allowed_when_enabled() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::connect(
        &uri,
        DatabaseOptions {
            allow_writes: true,
            ..DatabaseOptions::default()
        },
    )
    .await
    .unwrap();

    db.run("DELETE FROM street_trees WHERE tree_id = 4").await.unwrap();
    let count = db.run("SELECT COUNT(*) FROM street_trees").await.unwrap();
    assert_eq!(count.rows[0][0], SqlValue::Integer(3));
}

#[tokio::test]
async fn test_sample_values_cut_without_marker() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::connect(
        &uri,
        DatabaseOptions {
            allow_writes: true,
            max_string_length: 40,
            ..DatabaseOptions::default()
        },
    )
    .await
    .unwrap();

    let long = "word ".repeat(30);
    db.run(&format!(
        "UPDATE street_trees SET address = '{}' WHERE tree_id = 1",
        long
    ))
    .await
    .unwrap();

    let info = db.table_info(None).await.unwrap();
    assert!(info.contains(&format!("\t{}\t12.5", &long[..100])));

    let result = db
        .run("SELECT address FROM street_trees WHERE tree_id = 1")
        .await
        .unwrap();
    assert_eq!(result.to_string(), "[('word word word word word word word...',)]");
}

#[tokio::test]
async fn test_invalid_sql_reports_error_text() {
    let dir = TempDir::new().unwrap();
    let uri = seed_database(&dir).await;
    let db = SqlDatabase::from_uri(&uri).await.unwrap();

    let text = db.run_no_throw("SELECT height FROM street_trees").await;
    assert!(text.starts_with("Error: query failed"));
    assert!(text.contains("height"));
}

#[tokio::test]
async fn test_missing_database_file() {
    let dir = TempDir::new().unwrap();
    let uri = format!("sqlite:///{}", dir.path().join("absent.sqlite").display());
    let err = SqlDatabase::from_uri(&uri).await.unwrap_err();
    assert!(matches!(err, DatabaseError::ConnectionFailed(_)));
}
