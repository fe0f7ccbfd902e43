#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;
    use tether_core::Session;
    use tether_storage::{
        FileStorage, MemoryStorage, SharedStorage, Storage, StorageConfig, StorageError,
    };

    use crate::*;

    /// Memory storage that also logs every operation in order.
    #[derive(Default)]
    struct RecordingStorage {
        inner: MemoryStorage,
        ops: RefCell<Vec<String>>,
    }

    impl Storage for RecordingStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.ops.borrow_mut().push(format!("get {key}"));
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.ops.borrow_mut().push(format!("set {key}={value}"));
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.ops.borrow_mut().push(format!("remove {key}"));
            self.inner.remove_item(key)
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
        tags: Vec<String>,
    }

    fn memory() -> (Rc<MemoryStorage>, SharedStorage) {
        let inner = Rc::new(MemoryStorage::new());
        let shared: SharedStorage = inner.clone();
        (inner, shared)
    }

    fn name_state(storage: &SharedStorage) -> PersistentState<String> {
        PersistentState::new(storage.clone(), "name", "", PersistOptions::json()).unwrap()
    }

    #[test]
    fn test_json_codec_round_trip() {
        let profile = Profile {
            name: "Ada".into(),
            visits: 3,
            tags: vec!["math".into(), "engines".into()],
        };
        let encoded = JsonCodec.encode(&profile).unwrap();
        let decoded: Profile = JsonCodec.decode(&encoded).unwrap();
        assert_eq!(decoded, profile);
    }

    #[test]
    fn test_lazy_default_runs_once_when_slot_empty() {
        let (_, storage) = memory();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let state = PersistentState::<String>::new(
            storage.clone(),
            "greeting",
            DefaultValue::lazy(move || {
                c.set(c.get() + 1);
                "hello".to_string()
            }),
            PersistOptions::json(),
        )
        .unwrap();

        assert_eq!(state.value(), "hello");
        assert_eq!(calls.get(), 1);
        // the resolved default is written back on mount
        assert_eq!(storage.get_item("greeting").unwrap().as_deref(), Some("\"hello\""));
    }

    #[test]
    fn test_lazy_default_skipped_when_slot_present() {
        let (inner, storage) = memory();
        inner.set_item("greeting", "\"stored\"").unwrap();

        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let state = PersistentState::<String>::new(
            storage,
            "greeting",
            DefaultValue::lazy(move || {
                c.set(c.get() + 1);
                String::new()
            }),
            PersistOptions::json(),
        )
        .unwrap();

        assert_eq!(state.value(), "stored");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_empty_raw_value_counts_as_absent() {
        let (inner, storage) = memory();
        inner.set_item("name", "").unwrap();

        let state =
            PersistentState::<String>::new(storage, "name", "anon", PersistOptions::json())
                .unwrap();
        assert_eq!(state.value(), "anon");
        assert_eq!(inner.get_item("name").unwrap().as_deref(), Some("\"anon\""));
    }

    #[test]
    fn test_set_persists_value() {
        let (inner, storage) = memory();
        let mut state = name_state(&storage);

        state.set("Grace".into()).unwrap();
        let raw = inner.get_item("name").unwrap().unwrap();
        let decoded: String = JsonCodec.decode(&raw).unwrap();
        assert_eq!(decoded, "Grace");

        state.update(|prev| format!("{prev} Hopper")).unwrap();
        assert_eq!(
            inner.get_item("name").unwrap().as_deref(),
            Some("\"Grace Hopper\"")
        );
    }

    #[test]
    fn test_key_migration_removes_old_slot_first() {
        let recording = Rc::new(RecordingStorage::default());
        let storage: SharedStorage = recording.clone();

        let mut state =
            PersistentState::new(storage, "k1", 7u32, PersistOptions::json()).unwrap();
        state.set(8).unwrap();
        recording.ops.borrow_mut().clear();

        state.set_key("k2").unwrap();

        assert_eq!(*recording.ops.borrow(), vec!["remove k1", "set k2=8"]);
        assert_eq!(recording.inner.get_item("k1").unwrap(), None);
        assert_eq!(recording.inner.get_item("k2").unwrap().as_deref(), Some("8"));
        assert_eq!(state.key(), "k2");
    }

    #[test]
    fn test_failed_migration_is_retried() {
        let (inner, storage) = memory();
        let mut state =
            PersistentState::new(storage, "k1", 7u32, PersistOptions::json()).unwrap();

        inner.disable();
        assert!(matches!(
            state.set_key("k2"),
            Err(PersistError::Storage(StorageError::Unavailable))
        ));
        assert!(state.is_stale());

        inner.enable();
        state.set_key("k2").unwrap();

        assert!(!state.is_stale());
        assert_eq!(inner.get_item("k1").unwrap(), None);
        assert_eq!(inner.get_item("k2").unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn test_failed_codec_change_is_retried() {
        let (inner, storage) = memory();
        let mut state = name_state(&storage);
        state.set("ada".into()).unwrap();
        let upper: Rc<dyn Codec<String>> = Rc::new(FnCodec::new(
            |v: &String| Ok(v.to_uppercase()),
            |raw| Ok(raw.to_lowercase()),
        ));

        inner.disable();
        assert!(
            state
                .set_options(PersistOptions::with_shared_codec(upper.clone()))
                .is_err()
        );

        inner.enable();
        state
            .set_options(PersistOptions::with_shared_codec(upper))
            .unwrap();
        assert_eq!(inner.get_item("name").unwrap().as_deref(), Some("ADA"));
    }

    #[test]
    fn test_set_same_key_is_noop() {
        let (inner, storage) = memory();
        let mut state = name_state(&storage);
        let writes = inner.write_count();

        state.set_key("name").unwrap();
        assert_eq!(inner.write_count(), writes);
    }

    #[test]
    fn test_resync_is_idempotent() {
        let (inner, storage) = memory();
        let mut state = name_state(&storage);
        state.set("Ada".into()).unwrap();

        let before = inner.get_item("name").unwrap();
        let writes = inner.write_count();
        state.sync().unwrap();
        state.sync().unwrap();

        assert_eq!(inner.get_item("name").unwrap(), before);
        // the write still happens every time
        assert_eq!(inner.write_count(), writes + 2);
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_corrupt_slot_propagates_by_default() {
        let (inner, storage) = memory();
        inner.set_item("count", "{not json").unwrap();

        let err = PersistentState::<u32>::new(storage, "count", 0u32, PersistOptions::json())
            .unwrap_err();
        match err {
            PersistError::Decode { key, .. } => assert_eq!(key, "count"),
            other => panic!("unexpected error: {other}"),
        }
        // nothing was overwritten
        assert_eq!(inner.get_item("count").unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_corrupt_slot_use_default_overwrites() {
        let (inner, storage) = memory();
        inner.set_item("count", "{not json").unwrap();

        let state = PersistentState::new(
            storage,
            "count",
            5u32,
            PersistOptions::json().on_corrupt(CorruptPolicy::UseDefault),
        )
        .unwrap();

        assert_eq!(*state.value(), 5);
        assert_eq!(inner.get_item("count").unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn test_storage_failure_propagates_after_commit() {
        let inner = Rc::new(MemoryStorage::with_quota(16));
        let storage: SharedStorage = inner.clone();
        let mut state = name_state(&storage);

        let err = state.set("a name far too long for the quota".into()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::Storage(StorageError::QuotaExceeded { .. })
        ));
        // the in-memory value was committed before the write failed
        assert_eq!(state.value(), "a name far too long for the quota");
        assert_eq!(inner.get_item("name").unwrap().as_deref(), Some("\"\""));
    }

    #[test]
    fn test_unavailable_storage_fails_initialization() {
        let inner = Rc::new(MemoryStorage::new());
        inner.disable();
        let storage: SharedStorage = inner;

        let err = PersistentState::new(storage, "name", "", PersistOptions::<String>::json())
            .unwrap_err();
        assert!(matches!(err, PersistError::Storage(StorageError::Unavailable)));
    }

    #[test]
    fn test_custom_codec_and_codec_change() {
        let (inner, storage) = memory();
        let upper: Rc<dyn Codec<String>> = Rc::new(FnCodec::new(
            |v: &String| Ok(v.to_uppercase()),
            |raw| Ok(raw.to_lowercase()),
        ));

        let mut state = PersistentState::new(
            storage,
            "shout",
            "hey",
            PersistOptions::with_shared_codec(upper.clone()),
        )
        .unwrap();
        assert_eq!(inner.get_item("shout").unwrap().as_deref(), Some("HEY"));

        let writes = inner.write_count();
        state
            .set_options(PersistOptions::with_shared_codec(upper))
            .unwrap();
        assert_eq!(inner.write_count(), writes, "same codec must not resync");

        state.set_options(PersistOptions::json()).unwrap();
        assert_eq!(inner.get_item("shout").unwrap().as_deref(), Some("\"hey\""));
    }

    #[test]
    fn test_encode_failure_reports_key() {
        let (_, storage) = memory();
        let picky = PersistOptions::with_codec(FnCodec::new(
            |v: &i32| {
                if *v < 0 {
                    Err(CodecError::new("negative values are not storable"))
                } else {
                    Ok(v.to_string())
                }
            },
            |raw| raw.parse().map_err(|e| CodecError::with_source("bad int", e)),
        ));
        let mut state = PersistentState::new(storage, "n", 1, picky).unwrap();

        match state.set(-1).unwrap_err() {
            PersistError::Encode { key, source } => {
                assert_eq!(key, "n");
                assert_eq!(source.to_string(), "negative values are not storable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hook_end_to_end_across_sessions() {
        let (inner, storage) = memory();

        let mut first = Session::new();
        let (name, set_name) = with_storage(storage.clone(), || {
            first.compose(|| {
                remember_persistent_state::<String>("name", "", PersistOptions::json())
            })
        })
        .unwrap();
        assert_eq!(name, "");

        set_name.set("Ada".into()).unwrap();
        assert_eq!(inner.get_item("name").unwrap().as_deref(), Some("\"Ada\""));
        first.end();

        let mut second = Session::new();
        let (name, _) = with_storage(storage, || {
            second.compose(|| {
                remember_persistent_state::<String>("name", "", PersistOptions::json())
            })
        })
        .unwrap();
        assert_eq!(name, "Ada");
    }

    #[test]
    fn test_hook_reuses_handle_and_migrates_on_key_change() {
        let (inner, storage) = memory();
        let mut session = Session::new();
        let defaults_built = Rc::new(Cell::new(0));

        let mut pass = |key: &'static str| {
            let built = defaults_built.clone();
            with_storage(storage.clone(), || {
                session.compose(move || {
                    remember_persistent_state::<Vec<u8>>(
                        key,
                        DefaultValue::lazy(move || {
                            built.set(built.get() + 1);
                            vec![1u8, 2]
                        }),
                        PersistOptions::json(),
                    )
                })
            })
            .unwrap()
        };

        let (v, set) = pass("list");
        assert_eq!(v, vec![1, 2]);
        set.update(|prev| {
            let mut next = prev.clone();
            next.push(3);
            next
        })
        .unwrap();

        let (v, _) = pass("list");
        assert_eq!(v, vec![1, 2, 3]);

        let (v, _) = pass("list-v2");
        assert_eq!(v, vec![1, 2, 3]);
        assert_eq!(defaults_built.get(), 1);
        assert_eq!(inner.keys(), vec!["list-v2".to_string()]);
        assert_eq!(inner.get_item("list-v2").unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_hook_rewrites_slot_on_codec_change() {
        let (inner, storage) = memory();
        let mut session = Session::new();
        let upper: Rc<dyn Codec<String>> = Rc::new(FnCodec::new(
            |v: &String| Ok(v.to_uppercase()),
            |raw| Ok(raw.to_lowercase()),
        ));

        let mut pass = |options: PersistOptions<String>| {
            session
                .compose(|| {
                    remember_persistent_state_in::<String>(storage.clone(), "word", "hi", options)
                })
                .unwrap()
        };

        pass(PersistOptions::with_shared_codec(upper.clone()));
        assert_eq!(inner.get_item("word").unwrap().as_deref(), Some("HI"));

        let writes = inner.write_count();
        pass(PersistOptions::with_shared_codec(upper));
        assert_eq!(inner.write_count(), writes);

        let (v, _) = pass(PersistOptions::json());
        assert_eq!(v, "hi");
        assert_eq!(inner.write_count(), writes + 1);
        assert_eq!(inner.get_item("word").unwrap().as_deref(), Some("\"hi\""));
    }

    #[test]
    fn test_hook_without_storage() {
        let mut session = Session::new();
        let result = session
            .compose(|| remember_persistent_state::<u8>("x", 0u8, PersistOptions::json()));
        assert!(matches!(result, Err(PersistError::NoStorage)));
    }

    #[test]
    fn test_hook_retries_after_failed_mount() {
        let inner = Rc::new(MemoryStorage::new());
        let storage: SharedStorage = inner.clone();
        inner.set_item("n", "oops").unwrap();
        let mut session = Session::new();

        let first = session.compose(|| {
            remember_persistent_state_in::<u32>(storage.clone(), "n", 0u32, PersistOptions::json())
        });
        assert!(matches!(first, Err(PersistError::Decode { .. })));

        inner.remove_item("n").unwrap();
        let (v, _) = session
            .compose(|| {
                remember_persistent_state_in::<u32>(
                    storage.clone(),
                    "n",
                    4u32,
                    PersistOptions::json(),
                )
            })
            .unwrap();
        assert_eq!(v, 4);
    }

    #[test]
    fn test_setter_after_session_end_is_ignored() {
        let (inner, storage) = memory();
        let mut session = Session::new();
        let (_, set_count) = session
            .compose(|| {
                remember_persistent_state_in::<u32>(
                    storage.clone(),
                    "count",
                    1u32,
                    PersistOptions::json(),
                )
            })
            .unwrap();
        assert!(set_count.is_live());

        drop(session);
        assert!(!set_count.is_live());
        set_count.set(99).unwrap();
        // last written value stays durable
        assert_eq!(inner.get_item("count").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_file_storage_survives_restart() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig::default().dir(dir.path());

        {
            let storage: SharedStorage = Rc::new(FileStorage::open(&config).unwrap());
            let mut profile = PersistentState::<Profile>::new(
                storage,
                "profile",
                DefaultValue::lazy(|| Profile {
                    name: "Ada".into(),
                    visits: 0,
                    tags: Vec::new(),
                }),
                PersistOptions::json(),
            )
            .unwrap();
            profile
                .update(|p| Profile {
                    visits: p.visits + 1,
                    ..p.clone()
                })
                .unwrap();
        }

        let storage: SharedStorage = Rc::new(FileStorage::open(&config).unwrap());
        let profile = PersistentState::<Profile>::new(
            storage,
            "profile",
            DefaultValue::lazy(|| panic!("default must not be built")),
            PersistOptions::json(),
        )
        .unwrap();
        assert_eq!(profile.value().visits, 1);
        assert_eq!(profile.value().name, "Ada");
    }
}
