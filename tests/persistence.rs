use std::thread;

use chrono::{NaiveTime, TimeDelta};
use spicy_todo::{open_store, utils, NewTodo, Priority, SqliteStore, TodoPatch, TodoStore};

#[test]
fn sqlite_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("todos.db");

    let due = utils::today() + TimeDelta::days(3);
    let created = {
        let store = SqliteStore::open(&path).unwrap();
        let todo = store
            .create(
                NewTodo::new("Persist me")
                    .with_priority(Priority::High)
                    .with_due_date(due)
                    .with_reminder_time(NaiveTime::from_hms_opt(8, 30, 0).unwrap()),
            )
            .unwrap();
        store.update(&todo.id, TodoPatch::completed(true)).unwrap()
    };

    assert!(path.exists());

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.get(&created.id).unwrap(), Some(created.clone()));

    // The table was not empty, so no samples were added
    assert_eq!(reopened.count().unwrap(), 1);
    assert_eq!(reopened.list().unwrap(), vec![created]);
}

#[test]
fn seeding_happens_once_per_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.db");

    let first = SqliteStore::open(&path).unwrap();
    let second = SqliteStore::open(&path).unwrap();

    assert_eq!(first.count().unwrap(), 8);
    assert_eq!(second.count().unwrap(), 8);
    assert_eq!(first.list().unwrap(), second.list().unwrap());
}

#[test]
fn stores_sharing_a_file_seed_it_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.db");
    let stores: Vec<SqliteStore> = (0..4).map(|_| SqliteStore::open(&path).unwrap()).collect();

    thread::scope(|s| {
        for store in &stores {
            s.spawn(move || store.list().unwrap());
        }
    });

    for store in &stores {
        assert_eq!(store.count().unwrap(), 8);
    }
}

#[test]
fn memory_store_does_not_outlive_its_instance() {
    let first = open_store(None).unwrap();
    let todo = first.create(NewTodo::new("Ephemeral")).unwrap();
    drop(first);

    let second = open_store(None).unwrap();
    assert_eq!(second.get(&todo.id).unwrap(), None);
}

#[test]
fn open_store_uses_sqlite_url() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("todos.db").display());

    let id = {
        let store = open_store(Some(url.as_str())).unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        store.create(NewTodo::new("Via URL")).unwrap().id
    };

    let store = open_store(Some(url.as_str())).unwrap();
    assert_eq!(store.get(&id).unwrap().unwrap().text, "Via URL");
}
