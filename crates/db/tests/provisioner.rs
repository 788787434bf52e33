use chillpanda_db::{DbError, Ensured, MemoryStore, MongoStore, Provisioner, SchemaStore};
use chillpanda_kernel::settings::DatabaseSettings;
use chillpanda_kernel::{CollectionSpec, IndexSpec, SchemaPlan};
use mongodb::bson::doc;

fn chat_plan(database: &str) -> SchemaPlan {
    let mut plan = SchemaPlan::new(database);
    plan.collections.push(
        CollectionSpec::new("chat_history")
            .index(IndexSpec::new().asc("session_id").desc("timestamp"))
            .index(IndexSpec::new().asc("user_id")),
    );
    plan.collections.push(
        CollectionSpec::new("user_sessions")
            .index(IndexSpec::new().asc("session_id").unique())
            .index(IndexSpec::new().asc("user_id"))
            .index(IndexSpec::new().desc("last_activity")),
    );
    plan
}

async fn declared_indexes(store: &MemoryStore, collection: &str) -> Vec<IndexSpec> {
    store
        .list_indexes(collection)
        .await
        .unwrap()
        .into_iter()
        .filter(|index| !index.is_id_index())
        .filter_map(|index| index.spec)
        .collect()
}

#[tokio::test]
async fn fresh_database_gets_two_collections_and_five_indexes() {
    let handle = MemoryStore::new();
    let mut provisioner = Provisioner::new(handle.clone());
    let plan = chat_plan("chillpanda_db");

    let report = provisioner.provision(&plan).await.unwrap();
    assert_eq!(report.created_count(), 7);

    let store = provisioner.into_store();
    let mut collections = store.collection_names().await.unwrap();
    collections.sort();
    assert_eq!(collections, ["chat_history", "user_sessions"]);

    let chat = declared_indexes(&store, "chat_history").await;
    let sessions = declared_indexes(&store, "user_sessions").await;
    assert_eq!(chat.len() + sessions.len(), 5);

    assert_eq!(
        chat,
        vec![
            IndexSpec::new().asc("session_id").desc("timestamp"),
            IndexSpec::new().asc("user_id"),
        ]
    );
    assert_eq!(
        sessions,
        vec![
            IndexSpec::new().asc("session_id").unique(),
            IndexSpec::new().asc("user_id"),
            IndexSpec::new().desc("last_activity"),
        ]
    );
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let mut provisioner = Provisioner::new(MemoryStore::new());
    let plan = chat_plan("chillpanda_db");

    provisioner.provision(&plan).await.unwrap();
    let second = provisioner.provision(&plan).await.unwrap();

    assert!(second.is_noop());
    assert!(second
        .collections
        .iter()
        .all(|c| c.outcome == Ensured::AlreadyPresent));
    assert_eq!(second.indexes.len(), 5);

    let store = provisioner.into_store();
    assert_eq!(declared_indexes(&store, "user_sessions").await.len(), 3);
}

#[tokio::test]
async fn sessions_reject_duplicate_session_id() {
    let mut provisioner = Provisioner::new(MemoryStore::new());
    provisioner.provision(&chat_plan("chillpanda_db")).await.unwrap();
    let store = provisioner.into_store();

    store
        .insert_one("user_sessions", doc! { "session_id": "abc", "user_id": "u1" })
        .unwrap();
    let err = store
        .insert_one("user_sessions", doc! { "session_id": "abc", "user_id": "u2" })
        .unwrap_err();
    assert!(matches!(err, DbError::DuplicateKey { .. }));

    // chat history is keyed by session but not unique
    store
        .insert_one("chat_history", doc! { "session_id": "abc", "role": "user" })
        .unwrap();
    store
        .insert_one("chat_history", doc! { "session_id": "abc", "role": "assistant" })
        .unwrap();
    assert_eq!(store.document_count("chat_history").unwrap(), 2);
}

#[tokio::test]
async fn existing_data_survives_provisioning() {
    let mut seeded = MemoryStore::new();
    seeded.select_database("chillpanda_db");
    seeded
        .insert_one("chat_history", doc! { "session_id": "s", "content": "hi" })
        .unwrap();

    let mut provisioner = Provisioner::new(seeded.clone());
    let report = provisioner.provision(&chat_plan("chillpanda_db")).await.unwrap();

    assert_eq!(report.collections[0].outcome, Ensured::AlreadyPresent);
    assert_eq!(seeded.document_count("chat_history").unwrap(), 1);
}

#[tokio::test]
async fn conflicting_index_aborts_remaining_steps() {
    let mut seeded = MemoryStore::new();
    seeded.select_database("chillpanda_db");
    seeded.create_collection("user_sessions").await.unwrap();
    // same key pattern as the declared index, but without uniqueness
    seeded
        .create_index("user_sessions", &IndexSpec::new().asc("session_id"))
        .await
        .unwrap();

    let mut provisioner = Provisioner::new(seeded.clone());
    let err = provisioner
        .provision(&chat_plan("chillpanda_db"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::IndexConflict { ref collection, .. } if collection == "user_sessions"
    ));

    // chat history was fully provisioned before the failure, later steps never ran
    assert_eq!(declared_indexes(&seeded, "chat_history").await.len(), 2);
    assert_eq!(
        declared_indexes(&seeded, "user_sessions").await,
        vec![IndexSpec::new().asc("session_id")]
    );
}

#[tokio::test]
async fn verify_reports_drift() {
    let mut seeded = MemoryStore::new();
    seeded.select_database("chillpanda_db");
    seeded
        .create_index("chat_history", &IndexSpec::new().asc("session_id").desc("timestamp"))
        .await
        .unwrap();

    let mut provisioner = Provisioner::new(seeded);
    let report = provisioner.verify(&chat_plan("chillpanda_db")).await.unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.missing_collections, ["user_sessions"]);
    // one missing on chat_history, three on the absent collection
    assert_eq!(report.missing_indexes.len(), 4);
    assert!(report.mismatched_indexes.is_empty());
}

#[tokio::test]
async fn verify_is_clean_after_provision() {
    let mut provisioner = Provisioner::new(MemoryStore::new());
    let plan = chat_plan("chillpanda_db");

    assert!(!provisioner.verify(&plan).await.unwrap().is_clean());
    provisioner.provision(&plan).await.unwrap();
    assert!(provisioner.verify(&plan).await.unwrap().is_clean());
}

#[tokio::test]
async fn verify_flags_mismatched_options() {
    let mut seeded = MemoryStore::new();
    seeded.select_database("chillpanda_db");
    seeded
        .create_index("user_sessions", &IndexSpec::new().asc("session_id"))
        .await
        .unwrap();

    let mut provisioner = Provisioner::new(seeded);
    let report = provisioner.verify(&chat_plan("chillpanda_db")).await.unwrap();

    assert_eq!(report.mismatched_indexes.len(), 1);
    let mismatch = &report.mismatched_indexes[0];
    assert_eq!(mismatch.index, "session_id_1");
    assert!(mismatch.expected.unique);
    assert_eq!(mismatch.found, Some(IndexSpec::new().asc("session_id")));
}

#[tokio::test]
#[ignore = "needs a MongoDB server at MONGODB_URI"]
async fn live_server_provisioning_is_idempotent() {
    let settings = DatabaseSettings {
        uri: std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into()),
        ..DatabaseSettings::default()
    };
    let store = MongoStore::connect(&settings).await.unwrap();
    store.ping().await.unwrap();

    let mut provisioner = Provisioner::new(store);
    let plan = chat_plan("chillpanda_provision_it");
    provisioner.provision(&plan).await.unwrap();
    let second = provisioner.provision(&plan).await.unwrap();

    assert!(second.is_noop());
    assert!(provisioner.verify(&plan).await.unwrap().is_clean());
}
