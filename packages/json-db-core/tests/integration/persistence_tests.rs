//! Persistence across close and reopen.

use std::fs;

use ntest::timeout;
use serde_json::json;
use tempfile::tempdir;

use json_db_core::{Database, DbConfig, DeleteRequest, Query, Row, UpdateRequest};

use super::helpers::{init_tracing, manual_config, row, users_and_profile};

#[timeout(2000)]
#[test]
fn test_reopen_restores_rows_and_indexes() {
    init_tracing();
    let temp_dir = tempdir().unwrap();
    let config = manual_config(&temp_dir);

    let expected: Vec<Row> = {
        let mut db = Database::create(config.clone(), users_and_profile()).unwrap();
        for id in 1..=4 {
            db.insert(
                "Users",
                &row(json!({"ID": id, "Email": format!("u{id}@x.io"), "Password": "pw"})),
            )
            .unwrap();
        }
        db.update(
            "Users",
            &UpdateRequest::new(row(json!({"Password": "rotated"}))).filter("ID", json!(2)),
        )
        .unwrap();
        db.delete("Users", &DeleteRequest::new().filter("ID", json!(3)))
            .unwrap();
        let rows = db.get("Users", &Query::new()).unwrap();
        db.close().unwrap();
        rows
    };

    let db = Database::open(config).unwrap();
    assert_eq!(db.table_names(), vec!["Profile", "Users"]);
    assert_eq!(db.get("Users", &Query::new()).unwrap(), expected);

    let users = db.table("Users").unwrap();
    assert!(!users.is_dirty());
    assert_eq!(users.get_by_index("Password", &json!("rotated")).len(), 1);
    assert!(users.relationships().contains_key("Profile"));
}

#[timeout(2000)]
#[test]
fn test_table_file_is_json_array() {
    let temp_dir = tempdir().unwrap();
    let config = manual_config(&temp_dir);
    let mut db = Database::create(config.clone(), users_and_profile()).unwrap();
    db.insert("Users", &row(json!({"ID": 7, "Password": "pw"})))
        .unwrap();
    db.flush_all().unwrap();

    let contents = fs::read_to_string(config.table_dir().join("Users.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        stored,
        json!([{"ID": 7, "Email": null, "Password": "pw"}])
    );
    // untouched tables are never written
    assert!(!config.table_dir().join("Profile.json").exists());
}

#[timeout(3000)]
#[test]
fn test_tick_flushes_deferred_changes() {
    init_tracing();
    let temp_dir = tempdir().unwrap();
    let config = DbConfig {
        time_threshold_ms: 50,
        ..manual_config(&temp_dir)
    };
    let mut db = Database::create(config.clone(), users_and_profile()).unwrap();
    for table in ["Users", "Profile"] {
        db.table_mut(table).unwrap().flush().unwrap();
    }

    db.insert("Users", &row(json!({"ID": 1, "Password": "pw"})))
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(80));
    db.tick().unwrap();
    assert!(!db.table("Users").unwrap().is_dirty());

    let reopened = Database::open(config).unwrap();
    assert_eq!(reopened.table("Users").unwrap().len(), 1);
}

#[timeout(2000)]
#[test]
fn test_open_without_schema_is_empty() {
    let temp_dir = tempdir().unwrap();
    let db = Database::open(DbConfig::with_data_dir(temp_dir.path())).unwrap();
    assert_eq!(db.table_count(), 0);
}

#[timeout(2000)]
#[test]
fn test_open_rejects_corrupt_table_file() {
    let temp_dir = tempdir().unwrap();
    let config = manual_config(&temp_dir);
    Database::create(config.clone(), users_and_profile())
        .unwrap()
        .close()
        .unwrap();

    fs::create_dir_all(config.table_dir()).unwrap();
    fs::write(
        config.table_dir().join("Users.json"),
        r#"[{"ID": 1, "Password": "pw", "Nickname": "x"}]"#,
    )
    .unwrap();
    assert!(Database::open(config).is_err());
}
