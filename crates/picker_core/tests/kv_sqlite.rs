use picker_core::db::migrations::latest_version;
use picker_core::db::{open_db, open_db_in_memory, DbError};
use picker_core::{
    KvRepository, LoadOutcome, RepoError, SqliteKvRepository, Store, StoreConfig,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(SqliteKvRepository::try_new(&conn).is_ok());
}

#[test]
fn repository_requires_bootstrapped_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteKvRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingTable("kv_entries")));
}

#[test]
fn sqlite_repository_upserts_and_removes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKvRepository::try_new(&conn).unwrap();

    assert_eq!(repo.get_item("k").unwrap(), None);
    repo.set_item("k", "one").unwrap();
    repo.set_item("k", "two").unwrap();
    assert_eq!(repo.get_item("k").unwrap().as_deref(), Some("two"));

    repo.remove_item("k").unwrap();
    assert_eq!(repo.get_item("k").unwrap(), None);
}

#[test]
fn store_state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("picker.sqlite3");

    let student_id = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteKvRepository::try_new(&conn).unwrap();
        let store = Store::new(repo, StoreConfig::default());
        store.add_student("Ada").unwrap().unwrap().id
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let repo = SqliteKvRepository::try_new(&conn).unwrap();
    let store = Store::new(repo, StoreConfig::default());

    let (_, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Current);
    let students = store.students().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, student_id);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
