//! End-to-end scenarios through the database handle.

use ntest::timeout;
use serde_json::{json, Value};
use tempfile::tempdir;

use json_db_core::{Database, DbError, DeleteRequest, Query, SortDirection, UpdateRequest};

use super::helpers::{manual_config, row, users_and_profile};

#[timeout(2000)]
#[test]
fn test_users_crud_scenario() {
    let temp_dir = tempdir().unwrap();
    let mut db = Database::create(manual_config(&temp_dir), users_and_profile()).unwrap();

    let inserted = db
        .insert(
            "Users",
            &row(json!({"ID": 1, "Email": "a@b.com", "Password": "secret"})),
        )
        .unwrap();
    assert_eq!(
        Value::Object(inserted),
        json!({"ID": 1, "Email": "a@b.com", "Password": "secret"})
    );

    let rows = db
        .get("Users", &Query::new().filter("ID", json!(1)))
        .unwrap();
    assert_eq!(
        rows,
        vec![row(json!({"ID": 1, "Email": "a@b.com", "Password": "secret"}))]
    );

    let updated = db
        .update(
            "Users",
            &UpdateRequest::new(row(json!({"Email": "new@b.com"}))).filter("ID", json!(1)),
        )
        .unwrap();
    assert_eq!(updated, 1);

    let rows = db
        .get("Users", &Query::new().filter("ID", json!(1)))
        .unwrap();
    assert_eq!(rows[0]["Email"], json!("new@b.com"));
    assert_eq!(rows[0]["Password"], json!("secret"));

    let deleted = db
        .delete("Users", &DeleteRequest::new().filter("ID", json!(1)))
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(db.get("Users", &Query::new()).unwrap().is_empty());
}

#[timeout(2000)]
#[test]
fn test_join_scenario() {
    let temp_dir = tempdir().unwrap();
    let mut db = Database::create(manual_config(&temp_dir), users_and_profile()).unwrap();

    for id in [1, 2] {
        db.insert("Users", &row(json!({"ID": id, "Password": "pw"})))
            .unwrap();
    }
    db.insert("Profile", &row(json!({"UserID": 1, "Data": {"theme": "dark"}})))
        .unwrap();

    let rows = db
        .get(
            "Users",
            &Query::new()
                .extend("Profile")
                .order_by("ID", SortDirection::Asc),
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0]["$Profile"],
        json!({"UserID": 1, "Data": {"theme": "dark"}})
    );
    assert_eq!(rows[1]["$Profile"], Value::Null);

    let err = db
        .get("Profile", &Query::new().extend("Users"))
        .unwrap_err();
    assert!(matches!(err, DbError::RelationUndefined { .. }));
}

#[timeout(2000)]
#[test]
fn test_rejection_scenario() {
    let temp_dir = tempdir().unwrap();
    let mut db = Database::create(manual_config(&temp_dir), users_and_profile()).unwrap();

    let err = db
        .insert(
            "Users",
            &row(json!({"ID": "x", "Email": "a@b.com", "Password": "s"})),
        )
        .unwrap_err();
    assert!(matches!(err, DbError::Validation { .. }));
    assert_eq!(db.table("Users").unwrap().len(), 0);

    assert!(matches!(
        db.get("Nope", &Query::new()),
        Err(DbError::TableNotFound { .. })
    ));
}

#[timeout(2000)]
#[test]
fn test_pagination_matches_slice_of_full_result() {
    let temp_dir = tempdir().unwrap();
    let mut db = Database::create(manual_config(&temp_dir), users_and_profile()).unwrap();
    for id in 0..10 {
        db.insert("Users", &row(json!({"ID": id, "Password": "pw"})))
            .unwrap();
    }

    let base = Query::new().order_by("ID", SortDirection::Desc);
    let full = db.get("Users", &base).unwrap();
    for offset in -2i64..12 {
        for limit in -1i64..12 {
            let page = db
                .get("Users", &base.clone().offset(offset).limit(limit))
                .unwrap();
            let start = (offset.max(0) as usize).min(full.len());
            let end = if limit > 0 {
                (start + limit as usize).min(full.len())
            } else {
                full.len()
            };
            assert_eq!(page, full[start..end].to_vec(), "offset={offset} limit={limit}");
        }
    }
}

#[timeout(2000)]
#[test]
fn test_query_from_json_contract() {
    let temp_dir = tempdir().unwrap();
    let mut db = Database::create(manual_config(&temp_dir), users_and_profile()).unwrap();
    for (id, email) in [(1, "a@b.com"), (2, "a@b.com"), (3, "c@d.com")] {
        db.insert(
            "Users",
            &row(json!({"ID": id, "Email": email, "Password": "pw"})),
        )
        .unwrap();
    }

    let query: Query = serde_json::from_value(json!({
        "Columns": ["Email"],
        "Unique": true,
        "OrderBy": { "Column": "Email", "Direction": "DESC" }
    }))
    .unwrap();
    let rows = db.get("Users", &query).unwrap();
    assert_eq!(
        rows,
        vec![row(json!({"Email": "c@d.com"})), row(json!({"Email": "a@b.com"}))]
    );
}
