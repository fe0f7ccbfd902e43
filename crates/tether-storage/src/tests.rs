#[cfg(test)]
mod tests {
    use std::fs;
    use std::rc::Rc;

    use tempfile::TempDir;

    use crate::*;

    fn file_config(dir: &TempDir) -> StorageConfig {
        StorageConfig::default().dir(dir.path()).quota_bytes(None)
    }

    #[test]
    fn test_memory_set_get_remove() {
        let store = MemoryStorage::new();
        assert_eq!(store.get_item("k").unwrap(), None);

        store.set_item("k", "v1").unwrap();
        store.set_item("k", "v2").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 2);

        store.remove_item("k").unwrap();
        store.remove_item("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_quota_counts_keys_and_values() {
        let store = MemoryStorage::with_quota(10);
        store.set_item("ab", "cdef").unwrap(); // 6 bytes
        // replacing the same key only counts the new value
        store.set_item("ab", "cdefghij").unwrap(); // 10 bytes

        let err = store.set_item("x", "y").unwrap_err();
        match err {
            StorageError::QuotaExceeded { key, needed, quota } => {
                assert_eq!(key, "x");
                assert_eq!(needed, 12);
                assert_eq!(quota, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.keys(), vec!["ab".to_string()]);
    }

    #[test]
    fn test_memory_disabled() {
        let store = MemoryStorage::new();
        store.set_item("k", "v").unwrap();
        store.disable();
        assert!(matches!(store.get_item("k"), Err(StorageError::Unavailable)));
        assert!(matches!(store.set_item("k", "w"), Err(StorageError::Unavailable)));
        assert!(matches!(store.remove_item("k"), Err(StorageError::Unavailable)));
        store.enable();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_shared_storage_delegates() {
        let inner = Rc::new(MemoryStorage::new());
        let shared: SharedStorage = inner.clone();
        shared.set_item("k", "v").unwrap();
        assert!(shared.contains_key("k").unwrap());
        assert_eq!(inner.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir);

        {
            let store = FileStorage::open(&config).unwrap();
            assert_eq!(store.get_item("name").unwrap(), None);
            store.set_item("name", "\"Ada\"").unwrap();
            store.set_item("other", "1").unwrap();
            store.remove_item("other").unwrap();
        }

        let reopened = FileStorage::open(&config).unwrap();
        assert_eq!(reopened.get_item("name").unwrap().as_deref(), Some("\"Ada\""));
        assert_eq!(reopened.get_item("other").unwrap(), None);
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_file_document_is_plain_json_object() {
        let dir = TempDir::new().unwrap();
        let store = FileStorage::open(&file_config(&dir)).unwrap();
        store.set_item("count", "3").unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc, serde_json::json!({ "count": "3" }));
    }

    #[test]
    fn test_file_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir);
        fs::write(config.path(), "[1, 2, 3]").unwrap();

        let store = FileStorage::open(&config).unwrap();
        assert!(matches!(store.get_item("k"), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_file_quota_failure_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir).quota_bytes(Some(8));
        let store = FileStorage::open(&config).unwrap();

        store.set_item("a", "1234").unwrap();
        assert!(matches!(
            store.set_item("b", "12345"),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(store.get_item("b").unwrap(), None);

        store.reload();
        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1234"));
        assert_eq!(store.get_item("b").unwrap(), None);
    }

    #[test]
    fn test_file_reload_sees_external_writes() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir);
        let first = FileStorage::open(&config).unwrap();
        let second = FileStorage::open(&config).unwrap();

        assert_eq!(second.get_item("k").unwrap(), None);
        first.set_item("k", "v").unwrap();
        assert_eq!(second.get_item("k").unwrap(), None);
        second.reload();
        assert_eq!(second.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
