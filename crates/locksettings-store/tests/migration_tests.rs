//! Migration tests
//!
//! Schema migrations of the settings database and the one-time import of
//! legacy global settings.

use locksettings_store::{
    migrations, CallerContext, Database, InMemoryLegacySettings, JsonLegacySettings,
    LockSettingsService, MigrationOutcome, MockRecognizer, SettingsTable, StoreConfig,
    LEGACY_SETTINGS, MIGRATED_KEY,
};
use rusqlite::Connection;
use std::sync::Arc;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_fresh_migration() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    verify_schema_v1(&conn);
}

#[test]
fn test_migration_idempotency() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();
    migrations::run_migrations(&conn).unwrap();

    verify_schema_v1(&conn);
}

#[test]
fn test_schema_version_tracking() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    assert_eq!(migrations::schema_version(&conn).unwrap(), 0);
    migrations::run_migrations(&conn).unwrap();
    assert!(migrations::schema_version(&conn).unwrap() > 0);
}

#[test]
fn test_database_reports_creation_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("system").join("locksettings.db");

    let db = Database::open(&path).unwrap();
    assert!(db.was_created());
    drop(db);

    let db = Database::open(&path).unwrap();
    assert!(!db.was_created());
}

fn verify_schema_v1(conn: &Connection) {
    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(tables.contains(&"locksettings".to_string()));
    assert!(tables.contains(&"schema_version".to_string()));

    let index: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND tbl_name='locksettings'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(index >= 1, "lookup index on (user, name) should exist");
}

// ============================================================================
// Legacy settings import
// ============================================================================

fn open_service(dir: &std::path::Path) -> LockSettingsService {
    LockSettingsService::open(&StoreConfig::with_data_dir(dir), Arc::new(MockRecognizer)).unwrap()
}

#[test]
fn test_system_ready_imports_legacy_settings() {
    let dir = tempdir().unwrap();
    let service = open_service(dir.path());
    let legacy = InMemoryLegacySettings::new()
        .with("lockscreen.password_type", "65536")
        .with("lock_pattern_visible_pattern", "0");

    let outcome = service
        .system_ready(&CallerContext::system(), &legacy)
        .unwrap();
    assert_eq!(outcome, MigrationOutcome::Migrated { copied: 2 });

    let sys = CallerContext::system();
    assert_eq!(service.get_long(&sys, "lockscreen.password_type", 0, 0).unwrap(), 65536);
    assert!(!service.get_boolean(&sys, "lock_pattern_visible_pattern", true, 0).unwrap());
    assert_eq!(
        service.get_string(&sys, MIGRATED_KEY, None, 0).unwrap().as_deref(),
        Some("true")
    );
}

#[test]
fn test_migration_twice_matches_once() {
    let dir = tempdir().unwrap();
    let service = open_service(dir.path());
    let mut legacy = InMemoryLegacySettings::new();
    for (i, key) in LEGACY_SETTINGS.iter().enumerate() {
        legacy = legacy.with(key, &i.to_string());
    }

    let sys = CallerContext::system();
    service.system_ready(&sys, &legacy).unwrap();
    drop(service);

    let db = Database::open(dir.path().join("system").join("locksettings.db")).unwrap();
    let once = SettingsTable::new(&db).entries(0).unwrap();
    drop(db);

    let service = open_service(dir.path());
    assert_eq!(
        service.system_ready(&sys, &legacy).unwrap(),
        MigrationOutcome::AlreadyMigrated
    );
    drop(service);

    let db = Database::open(dir.path().join("system").join("locksettings.db")).unwrap();
    assert_eq!(SettingsTable::new(&db).entries(0).unwrap(), once);
    assert_eq!(once.len(), LEGACY_SETTINGS.len() + 1);
}

#[test]
fn test_system_ready_requires_system_caller() {
    let dir = tempdir().unwrap();
    let service = open_service(dir.path());

    let err = service
        .system_ready(&CallerContext::user(0), &InMemoryLegacySettings::new())
        .unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(
        service
            .get_string(&CallerContext::system(), MIGRATED_KEY, None, 0)
            .unwrap(),
        None
    );
}

#[test]
fn test_json_export_import() {
    let dir = tempdir().unwrap();
    let export = dir.path().join("secure_settings.json");
    std::fs::write(
        &export,
        r#"{"lockscreen.disabled": true, "lock_pattern_autolock": "1", "unrelated": 5}"#,
    )
    .unwrap();

    let service = open_service(dir.path());
    let legacy = JsonLegacySettings::load(&export).unwrap();
    let outcome = service.system_ready(&CallerContext::system(), &legacy).unwrap();
    assert_eq!(outcome, MigrationOutcome::Migrated { copied: 2 });

    let sys = CallerContext::system();
    assert!(service.get_boolean(&sys, "lockscreen.disabled", false, 0).unwrap());
    assert_eq!(service.get_long(&sys, "unrelated", -1, 0).unwrap(), -1);
}

#[test]
fn test_json_export_must_be_object() {
    let dir = tempdir().unwrap();
    let export = dir.path().join("bad.json");
    std::fs::write(&export, "[1, 2, 3]").unwrap();

    assert!(JsonLegacySettings::load(&export).is_err());
}
