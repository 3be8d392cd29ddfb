//! Persistence facade behavior over the in-memory backend.

use std::sync::Arc;

use serde_json::{Value, json};
use wimo_core::{Document, Entity, Token, User};
use wimo_db_memory::{InMemoryStore, create_store};
use wimo_storage::{CallPolicy, Persistence};

fn persistence() -> Persistence {
    Persistence::with_policy(create_store(), CallPolicy::default())
}

fn doc(value: Value) -> Document {
    value.as_object().unwrap().clone()
}

fn sample_user() -> Document {
    doc(json!({
        "fname": "a",
        "pname": "b",
        "age": 4,
        "username": "user",
        "password": "",
        "role_group": "aa"
    }))
}

#[tokio::test]
async fn save_load_delete_scenario() {
    let persistence = persistence();
    let user = User::adopt(&sample_user()).unwrap();

    let id = persistence
        .save(User::COLLECTION, User::NATURAL_KEY, &user.to_document())
        .await
        .unwrap()
        .expect("save returns an identifier");

    let loaded = persistence
        .load(User::COLLECTION, Some("username"), Some(&json!("user")))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0]["id"], id.as_str());
    let reloaded = User::adopt(&loaded[0]).unwrap();
    assert_eq!(reloaded.id.as_deref(), Some(id.as_str()));
    assert_eq!(reloaded.fname, user.fname);
    assert_eq!(reloaded.role_group, "aa");

    assert!(persistence.delete(User::COLLECTION, "id", &json!(id)).await.unwrap());
    assert!(!persistence.delete(User::COLLECTION, "id", &json!(id)).await.unwrap());
}

#[tokio::test]
async fn load_round_trips_every_field() {
    let persistence = persistence();
    let token = Token::new("4c078c9db4a85c59f1fd1544122586", "readonly");

    let id = persistence
        .save(Token::COLLECTION, None, &token.to_document())
        .await
        .unwrap()
        .unwrap();

    let loaded = persistence
        .load(Token::COLLECTION, Some("id"), Some(&json!(id)))
        .await
        .unwrap();
    let mut expected = token.to_document();
    expected.insert("id".to_string(), json!(id));
    assert_eq!(loaded, vec![expected]);
}

#[tokio::test]
async fn upsert_by_natural_key_keeps_one_record() {
    let persistence = persistence();

    persistence
        .save("user", Some("username"), &doc(json!({"username": "alice", "password": "x"})))
        .await
        .unwrap();
    persistence
        .save("user", Some("username"), &doc(json!({"username": "alice", "password": "y"})))
        .await
        .unwrap();

    let loaded = persistence
        .load("user", Some("username"), Some(&json!("alice")))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0]["password"], "y");
}

#[tokio::test]
async fn update_with_unknown_id_returns_none() {
    let persistence = persistence();

    let result = persistence
        .save(
            "user",
            Some("username"),
            &doc(json!({"id": "does-not-exist", "username": "ghost"})),
        )
        .await
        .unwrap();
    assert_eq!(result, None);
    assert!(persistence.load("user", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_by_id_merges_fields() {
    let persistence = persistence();
    let id = persistence
        .save("user", None, &doc(json!({"username": "bob", "age": 1})))
        .await
        .unwrap()
        .unwrap();

    let updated = persistence
        .save("user", None, &doc(json!({"id": id, "age": 2})))
        .await
        .unwrap();
    assert_eq!(updated.as_deref(), Some(id.as_str()));

    let loaded = persistence.load("user", None, None).await.unwrap();
    assert_eq!(loaded[0]["username"], "bob");
    assert_eq!(loaded[0]["age"], 2);
}

#[tokio::test]
async fn update_cannot_take_another_users_username() {
    let persistence = persistence();
    let save = |body: Value| {
        let persistence = persistence.clone();
        async move {
            persistence
                .save(User::COLLECTION, User::NATURAL_KEY, &doc(body))
                .await
        }
    };

    save(json!({"username": "alice", "password": "a"})).await.unwrap();
    let bob = save(json!({"username": "bob", "password": "b"}))
        .await
        .unwrap()
        .unwrap();

    let err = save(json!({"id": bob.clone(), "username": "alice"})).await.unwrap_err();
    assert!(err.is_invalid_arguments());

    let alices = persistence
        .load(User::COLLECTION, Some("username"), Some(&json!("alice")))
        .await
        .unwrap();
    assert_eq!(alices.len(), 1);

    let renamed = save(json!({"id": bob.clone(), "username": "bobby"})).await.unwrap();
    assert_eq!(renamed.as_deref(), Some(bob.as_str()));
}

#[tokio::test]
async fn key_without_value_is_rejected() {
    let persistence = persistence();
    let err = persistence
        .load(Token::COLLECTION, Some("username"), None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_arguments());
}

#[tokio::test]
async fn load_without_match_is_empty() {
    let persistence = persistence();
    let loaded = persistence
        .load("token", Some("token"), Some(&json!("unknown")))
        .await
        .unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_do_not_duplicate() {
    let store = Arc::new(InMemoryStore::new());
    let persistence = Persistence::new(store.clone());

    let mut handles = Vec::new();
    for i in 0..16 {
        let persistence = persistence.clone();
        handles.push(tokio::spawn(async move {
            persistence
                .save(
                    "token",
                    Some("username"),
                    &doc(json!({"username": "shared", "token": format!("t{i}")})),
                )
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.count("token"), 1);
}

#[tokio::test]
async fn ping_succeeds() {
    let persistence = persistence();
    persistence.ping().await.unwrap();
    assert_eq!(persistence.backend_name(), "memory");
}
