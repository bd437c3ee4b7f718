use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use remote_store::{to_document, Collection, Filter, Order};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::error::{SocialError, SocialResult};
use crate::models::Profile;
use crate::session::Session;
use crate::validation::{validate_interests, validate_username};

/// Owner-submitted profile contents; the id and creation time are managed
/// by the directory.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileDraft {
    #[validate(length(min = 3, max = 32), custom(function = "validate_username"))]
    pub username: String,
    #[validate(length(max = 100))]
    pub city: String,
    #[validate(length(max = 500))]
    pub bio: String,
    #[validate(custom(function = "validate_interests"))]
    pub interests: Vec<String>,
    pub photo_url: Option<String>,
}

/// Read-mostly view over the remote profile collection. Profiles are
/// mutated only by their owning user and never hard-deleted.
pub struct ProfileDirectory {
    session: Arc<Session>,
}

impl ProfileDirectory {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// All discoverable profiles except the session user's own, newest
    /// first.
    pub async fn discover(&self) -> SocialResult<Vec<Profile>> {
        let me = self.session.user_id();
        let records = self
            .session
            .store()
            .query(
                Collection::Profiles,
                Filter::all(Vec::new()),
                Some(Order::Desc("created_at".to_string())),
            )
            .await?;

        let mut profiles = Vec::with_capacity(records.len());
        for record in &records {
            let profile: Profile = record.decode()?;
            if profile.id != me {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    pub async fn get(&self, user_id: uuid::Uuid) -> SocialResult<Option<Profile>> {
        let records = self
            .session
            .store()
            .query(
                Collection::Profiles,
                Filter::eq("id", user_id.to_string()),
                None,
            )
            .await?;
        match records.first() {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    /// Create or update the session user's own profile.
    pub async fn save(&self, draft: ProfileDraft) -> SocialResult<Profile> {
        draft
            .validate()
            .map_err(|e| SocialError::Validation(e.to_string()))?;

        let me = self.session.user_id();
        let store = self.session.store();
        let username = draft.username.trim().to_string();

        let holders = store
            .query(
                Collection::Profiles,
                Filter::eq("username", username.clone()),
                None,
            )
            .await?;
        if holders.iter().any(|record| record.id != me.to_string()) {
            return Err(SocialError::UsernameTaken);
        }

        let mut interests = draft.interests.clone();
        let mut seen = HashSet::new();
        interests.retain(|tag| seen.insert(tag.trim().to_string()));

        match self.get(me).await? {
            Some(current) => {
                let patch = match json!({
                    "username": username,
                    "city": draft.city,
                    "bio": draft.bio,
                    "interests": interests,
                    "photo_url": draft.photo_url,
                }) {
                    Value::Object(map) => map,
                    _ => unreachable!("patch literal is an object"),
                };

                store
                    .update(Collection::Profiles, Filter::eq("id", me.to_string()), patch)
                    .await?;

                Ok(Profile {
                    id: me,
                    username,
                    city: draft.city,
                    bio: draft.bio,
                    interests,
                    photo_url: draft.photo_url,
                    created_at: current.created_at,
                })
            }
            None => {
                let profile = Profile {
                    id: me,
                    username,
                    city: draft.city,
                    bio: draft.bio,
                    interests,
                    photo_url: draft.photo_url,
                    created_at: Utc::now(),
                };
                store
                    .insert(Collection::Profiles, to_document(&profile)?)
                    .await?;
                tracing::info!(
                    component = "profiles",
                    user_id = %me,
                    "profile created"
                );
                Ok(profile)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{memory_store, session_without_profile, signed_in};

    fn draft(username: &str) -> ProfileDraft {
        ProfileDraft {
            username: username.to_string(),
            city: "Lisbon".to_string(),
            bio: "hello".to_string(),
            interests: vec!["climbing".to_string(), "jazz".to_string()],
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn save_creates_then_updates_own_profile() {
        let store = memory_store();
        let session = session_without_profile(&store, "carol");
        let directory = ProfileDirectory::new(Arc::clone(&session));

        let created = directory.save(draft("carol")).await.expect("create");
        assert_eq!(created.id, session.user_id());

        let mut updated_draft = draft("carol");
        updated_draft.bio = "new bio".to_string();
        let updated = directory.save(updated_draft).await.expect("update");

        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.bio, "new bio");

        let fetched = directory
            .get(session.user_id())
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.bio, "new bio");
    }

    #[tokio::test]
    async fn save_rejects_taken_username() {
        let store = memory_store();
        let _alice = signed_in(&store, "alice").await;
        let session = session_without_profile(&store, "carol");

        let err = ProfileDirectory::new(session)
            .save(draft("alice"))
            .await
            .expect_err("username held by alice");
        assert!(matches!(err, SocialError::UsernameTaken));
    }

    #[tokio::test]
    async fn save_rejects_invalid_username() {
        let store = memory_store();
        let session = session_without_profile(&store, "carol");

        let err = ProfileDirectory::new(session)
            .save(draft("no spaces allowed"))
            .await
            .expect_err("invalid username");
        assert!(matches!(err, SocialError::Validation(_)));
    }

    #[tokio::test]
    async fn discover_excludes_self() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let _bob = signed_in(&store, "bob").await;

        let listed = ProfileDirectory::new(Arc::clone(&alice))
            .discover()
            .await
            .expect("discover");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "bob");
    }

    #[tokio::test]
    async fn save_deduplicates_interest_tags() {
        let store = memory_store();
        let session = session_without_profile(&store, "carol");

        let mut dupes = draft("carol");
        dupes.interests = vec![
            "jazz".to_string(),
            "jazz".to_string(),
            "hiking".to_string(),
        ];
        let saved = ProfileDirectory::new(session)
            .save(dupes)
            .await
            .expect("save");
        assert_eq!(saved.interests, vec!["jazz", "hiking"]);
    }
}
