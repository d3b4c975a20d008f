//! End-to-end run over a scaffolded project.
//!
//! Builds a project with `init` and `new`, fills in the scripts, then drives
//! `up`, `status` and `down` through a SQLite connection.

use std::fs;
use std::path::Path;

use pgmigrate::prelude::*;
use pgmigrate::scaffold;
use tempfile::TempDir;

fn write_body(path: &Path, do_sql: &str, undo_sql: &str) {
    fs::write(
        path,
        format!("-- @DO sql script --\n{do_sql}\n-- @UNDO sql script --\n{undo_sql}\n"),
    )
    .unwrap();
}

fn sqlite_config(root: &Path) -> Config {
    Config {
        database_url: Some(format!(
            "sqlite://{}?mode=rwc",
            root.join("ledger.db").display()
        )),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let dir = TempDir::new().unwrap();
    let root = scaffold::init_project(dir.path()).unwrap();

    let users = scaffold::new_migration(&root, "add users table", 1_700_000_000).unwrap();
    write_body(
        &users,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
        "DROP TABLE users;",
    );
    let posts = scaffold::new_migration(&root, "add posts table", 1_700_000_100).unwrap();
    write_body(
        &posts,
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER);\nCREATE INDEX posts_user ON posts (user_id);",
        "DROP INDEX posts_user;\nDROP TABLE posts;",
    );
    let tags = scaffold::new_migration(&root, "add tags table", 1_700_000_200).unwrap();
    write_body(&tags, "CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;");

    let config = sqlite_config(&root);
    let mut executor = MigrationExecutor::connect(&config, ScriptStore::new(&root))
        .await
        .unwrap();

    let applied = executor.up(0).await.unwrap();
    let descriptions: Vec<&str> = applied.iter().map(|m| m.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec!["add users table", "add posts table", "add tags table"]
    );

    let status = executor.status().await.unwrap();
    assert!(status.iter().all(|s| s.state == MigrationState::Applied));
    assert_eq!(
        status[0].to_string(),
        "1700000000\tadd users table\tApplied"
    );

    let reverted = executor.down(2).await.unwrap();
    let timestamps: Vec<i64> = reverted.iter().map(|m| m.timestamp).collect();
    assert_eq!(timestamps, vec![1_700_000_200, 1_700_000_100]);

    let states: Vec<MigrationState> = executor
        .status()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.state)
        .collect();
    assert_eq!(
        states,
        vec![
            MigrationState::Applied,
            MigrationState::Pending,
            MigrationState::Pending
        ]
    );

    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_ledger_survives_reconnect() {
    let dir = TempDir::new().unwrap();
    let root = scaffold::init_project(dir.path()).unwrap();
    for (i, table) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        let path = scaffold::new_migration(&root, &format!("create {table}"), 100 + i as i64)
            .unwrap();
        write_body(
            &path,
            &format!("CREATE TABLE {table} (id INTEGER);"),
            &format!("DROP TABLE {table};"),
        );
    }
    let config = sqlite_config(&root);

    let mut first = MigrationExecutor::connect(&config, ScriptStore::new(&root))
        .await
        .unwrap();
    assert_eq!(first.up(2).await.unwrap().len(), 2);
    first.close().await.unwrap();

    let mut second = MigrationExecutor::connect(&config, ScriptStore::new(&root))
        .await
        .unwrap();
    let applied = second.up(0).await.unwrap();
    let timestamps: Vec<i64> = applied.iter().map(|m| m.timestamp).collect();
    assert_eq!(timestamps, vec![102, 103, 104]);
    second.close().await.unwrap();
}
