//! Integration tests for the ambient database scope.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use tessera_core::Error;
use tessera_database::{is_entered, Database, Schema};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Note {
    text: String,
}

fn notes() -> Arc<Database> {
    Arc::new(
        Schema::builder()
            .table::<Note>("notes")
            .unwrap()
            .build()
            .unwrap(),
    )
}

fn add_note(text: &str) -> tessera_core::Result<i32> {
    let db = Database::current()?;
    let row = db.table::<Note>()?.add(Note {
        text: text.to_owned(),
    })?;
    Ok(row.id())
}

#[test]
fn test_no_scope_means_no_database() {
    assert!(!is_entered());
    assert!(matches!(Database::current(), Err(Error::NoAmbientDatabase)));
    assert!(matches!(add_note("lost"), Err(Error::NoAmbientDatabase)));
}

#[test]
fn test_scopes_nest() {
    let outer = notes();
    let inner = notes();
    {
        let scope = Database::enter(&outer);
        assert_eq!(scope.depth(), 1);
        assert_eq!(add_note("a").unwrap(), 1);
        {
            let scope = Database::enter(&inner);
            assert_eq!(scope.depth(), 2);
            assert!(Arc::ptr_eq(&Database::current().unwrap(), &inner));
            add_note("b").unwrap();
        }
        assert!(Arc::ptr_eq(&Database::current().unwrap(), &outer));
        add_note("c").unwrap();
    }
    assert!(!is_entered());
    assert_eq!(outer.table::<Note>().unwrap().len(), 2);
    assert_eq!(inner.table::<Note>().unwrap().len(), 1);
}

#[test]
fn test_scopes_are_per_thread() {
    let db = notes();
    let _scope = Database::enter(&db);
    let shared = Arc::clone(&db);
    let seen_elsewhere = thread::spawn(move || {
        let before = is_entered();
        let _scope = Database::enter(&shared);
        add_note("worker").unwrap();
        before
    })
    .join()
    .unwrap();

    assert!(!seen_elsewhere);
    assert!(is_entered());
    assert_eq!(db.table::<Note>().unwrap().len(), 1);
}
