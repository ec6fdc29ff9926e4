use super::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dorm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dorm_name: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            avatar_url: None,
            dorm_id: None,
            dorm_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    NotFound(String),
    Store(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::NotFound(id) => write!(f, "no profile for user {id}"),
            ProfileError::Store(msg) => write!(f, "profile store error: {msg}"),
        }
    }
}

impl std::error::Error for ProfileError {}

pub fn profile_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Key-value persistence for profiles. Values are stored as JSON.
pub trait ProfileStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, ProfileError>>;
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), ProfileError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, ProfileError>> {
        Box::pin(async move { Ok(self.entries.read().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), ProfileError>> {
        Box::pin(async move {
            self.entries.write().await.insert(key.to_string(), value);
            Ok(())
        })
    }
}

pub async fn load_profile(store: &dyn ProfileStore, user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
    let Some(raw) = store.get(&profile_key(user_id)).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|err| ProfileError::Store(err.to_string()))
}

pub async fn save_profile(store: &dyn ProfileStore, profile: &UserProfile) -> Result<(), ProfileError> {
    let raw = serde_json::to_string(profile).map_err(|err| ProfileError::Store(err.to_string()))?;
    store.set(&profile_key(&profile.id), raw).await
}

async fn update<F>(store: &dyn ProfileStore, user_id: &str, apply: F) -> Result<UserProfile, ProfileError>
where
    F: FnOnce(&mut UserProfile),
{
    let mut profile =
        load_profile(store, user_id).await?.ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
    apply(&mut profile);
    save_profile(store, &profile).await?;
    Ok(profile)
}

pub async fn update_avatar(store: &dyn ProfileStore, user_id: &str, avatar_url: &str) -> Result<UserProfile, ProfileError> {
    let profile = update(store, user_id, |p| p.avatar_url = Some(avatar_url.to_string())).await?;
    info!(user_id, "avatar updated");
    Ok(profile)
}

pub async fn update_dorm(
    store: &dyn ProfileStore,
    user_id: &str,
    dorm_id: &str,
    dorm_name: &str,
) -> Result<UserProfile, ProfileError> {
    let profile = update(store, user_id, |p| {
        p.dorm_id = Some(dorm_id.to_string());
        p.dorm_name = Some(dorm_name.to_string());
    })
    .await?;
    info!(user_id, dorm_id, "dorm updated");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn profiles_live_under_user_key() {
        let store = InMemoryProfileStore::new();
        save_profile(&store, &UserProfile::new("u1", "a@b.edu", "Ada")).await.unwrap();
        let raw = store.get("user:u1").await.unwrap().unwrap();
        assert!(raw.contains("\"email\":\"a@b.edu\""));
        assert!(!raw.contains("avatarUrl"));
    }

    #[tokio::test]
    async fn updates_modify_stored_profile() {
        let store = InMemoryProfileStore::new();
        save_profile(&store, &UserProfile::new("u1", "a@b.edu", "Ada")).await.unwrap();
        update_avatar(&store, "u1", "https://models/ada.glb").await.unwrap();
        update_dorm(&store, "u1", "butler", "Butler College").await.unwrap();
        let profile = load_profile(&store, "u1").await.unwrap().unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some("https://models/ada.glb"));
        assert_eq!(profile.dorm_name.as_deref(), Some("Butler College"));
        let raw = store.get("user:u1").await.unwrap().unwrap();
        assert!(raw.contains("\"dormId\":\"butler\""));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = InMemoryProfileStore::new();
        let err = update_dorm(&store, "ghost", "forbes", "Forbes College").await.unwrap_err();
        assert_eq!(err, ProfileError::NotFound("ghost".into()));
    }
}
