use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use remote_store::{to_document, Collection, MemoryStore, Store};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::models::Profile;
use crate::session::Session;

pub(crate) fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Config with a throwaway cache directory so tests never share sqlite
/// files.
pub(crate) fn test_config() -> ClientConfig {
    ClientConfig {
        cache_dir: std::env::temp_dir().join(format!("social-core-test-{}", Uuid::new_v4())),
        ..ClientConfig::default()
    }
}

pub(crate) fn temp_db_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}.sqlite", prefix, Uuid::new_v4()))
}

/// Session with a seeded profile, as after sign-in plus profile
/// completion.
pub(crate) async fn signed_in(store: &Arc<MemoryStore>, username: &str) -> Arc<Session> {
    let user_id = Uuid::new_v4();
    let profile = Profile {
        id: user_id,
        username: username.to_string(),
        city: "Berlin".to_string(),
        bio: String::new(),
        interests: Vec::new(),
        photo_url: None,
        created_at: Utc::now(),
    };
    store
        .insert(
            Collection::Profiles,
            to_document(&profile).expect("profile document"),
        )
        .await
        .expect("seed profile");

    let store: Arc<dyn Store> = store.clone();
    Session::new(user_id, username, store, test_config())
}

/// Session for a user who has signed in but not completed a profile yet.
pub(crate) fn session_without_profile(store: &Arc<MemoryStore>, username: &str) -> Arc<Session> {
    let store: Arc<dyn Store> = store.clone();
    Session::new(Uuid::new_v4(), username, store, test_config())
}
