use crate::infra::db::Database;
use crate::infra::db::repository::*;
use crate::infra::storage::KeyValueStore;

#[test]
fn test_kv_set_get_overwrite() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let store = SqliteKeyValueStore::new(db.connection());

    assert_eq!(store.get("gate.resolved")?, None);
    store.set("gate.resolved", "true")?;
    assert_eq!(store.get("gate.resolved")?.as_deref(), Some("true"));

    store.set("gate.resolved", "false")?;
    assert_eq!(store.get("gate.resolved")?.as_deref(), Some("false"));
    assert_eq!(store.keys()?, vec!["gate.resolved".to_string()]);
    Ok(())
}

#[test]
fn test_kv_remove_all_leaves_other_keys() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let store = db.kv_store();
    store.set("a", "1")?;
    store.set("b", "2")?;
    store.set("c", "3")?;

    store.remove_all(&["a", "c", "missing"])?;
    assert_eq!(store.keys()?, vec!["b".to_string()]);

    store.remove("b")?;
    assert!(store.keys()?.is_empty());
    Ok(())
}

#[test]
fn test_kv_set_many_commits_together() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let store = db.kv_store();
    store.set("gate.saved_destination", "https://example.com/x")?;

    store.set_many(
        &[("gate.use_web_session", "false"), ("gate.resolved", "true")],
        &["gate.saved_destination"],
    )?;
    assert_eq!(
        store.keys()?,
        vec!["gate.resolved".to_string(), "gate.use_web_session".to_string()]
    );
    assert!(store.get_bool("gate.resolved")?);
    Ok(())
}

#[test]
fn test_kv_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("state.sqlite");

    {
        let db = Database::open_at(path.clone())?;
        db.kv_store()
            .set("gate.saved_destination", "https://example.com/x")?;
    }

    let db = Database::open_at(path)?;
    assert_eq!(
        db.kv_store().get("gate.saved_destination")?.as_deref(),
        Some("https://example.com/x")
    );
    Ok(())
}
