//! Persisted allow-set and invite tokens.
//!
//! The store owns the authorization state entirely; the rest of the core
//! only issues atomic add/remove/check/consume operations against it.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{errors::Error, Result};

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn add_chat(&self, chat_id: i64) -> Result<()>;
    async fn remove_chat(&self, chat_id: i64) -> Result<()>;
    async fn is_chat_allowed(&self, chat_id: i64) -> Result<bool>;
    async fn list_chats(&self) -> Result<Vec<i64>>;

    /// Register a freshly minted single-use token.
    async fn create_invite(&self, token: &str) -> Result<()>;

    /// Check-and-consume: returns true exactly once per valid token.
    async fn consume_invite(&self, token: &str) -> Result<bool>;
}

/// Mint a random invite token (16 bytes, hex-encoded).
pub fn mint_invite_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    allowed_chats: BTreeSet<i64>,
    /// token -> expiry, unix seconds
    invites: BTreeMap<String, i64>,
}

/// JSON-file-backed [`AuthStore`].
///
/// All operations take the store mutex, mutate in memory, and write the
/// whole file back, which is plenty for an allow-set this size.
pub struct FileStore {
    path: PathBuf,
    invite_ttl: Duration,
    data: Mutex<StoreData>,
}

impl FileStore {
    pub fn open(path: PathBuf, invite_ttl: Duration) -> Result<Self> {
        let data = load_store_file(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            invite_ttl,
            data: Mutex::new(data),
        })
    }

    async fn persist(&self, data: &StoreData) -> Result<()> {
        let txt = serde_json::to_string(data)?;
        tokio::fs::write(&self.path, txt).await.map_err(Error::Io)
    }
}

fn load_store_file(path: &PathBuf) -> Result<Option<StoreData>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = std::fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(None);
    }
    let data: StoreData = serde_json::from_str(&txt)?;
    Ok(Some(data))
}

#[async_trait]
impl AuthStore for FileStore {
    async fn add_chat(&self, chat_id: i64) -> Result<()> {
        let mut data = self.data.lock().await;
        data.allowed_chats.insert(chat_id);
        self.persist(&data).await
    }

    async fn remove_chat(&self, chat_id: i64) -> Result<()> {
        let mut data = self.data.lock().await;
        data.allowed_chats.remove(&chat_id);
        self.persist(&data).await
    }

    async fn is_chat_allowed(&self, chat_id: i64) -> Result<bool> {
        let data = self.data.lock().await;
        Ok(data.allowed_chats.contains(&chat_id))
    }

    async fn list_chats(&self) -> Result<Vec<i64>> {
        let data = self.data.lock().await;
        Ok(data.allowed_chats.iter().copied().collect())
    }

    async fn create_invite(&self, token: &str) -> Result<()> {
        let expires = Utc::now().timestamp() + self.invite_ttl.as_secs() as i64;
        let mut data = self.data.lock().await;
        data.invites.insert(token.to_string(), expires);
        self.persist(&data).await
    }

    async fn consume_invite(&self, token: &str) -> Result<bool> {
        let now = Utc::now().timestamp();
        let mut data = self.data.lock().await;

        // Expired tokens are garbage-collected on the way through.
        data.invites.retain(|_, expires| *expires > now);

        let valid = data.invites.remove(token).is_some();
        self.persist(&data).await?;
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!("/tmp/fambot-store-{}-{tag}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("store.json")
    }

    #[tokio::test]
    async fn add_check_remove_round_trip() {
        let store = FileStore::open(temp_store_path("crud"), Duration::from_secs(60)).unwrap();

        assert!(!store.is_chat_allowed(42).await.unwrap());
        store.add_chat(42).await.unwrap();
        assert!(store.is_chat_allowed(42).await.unwrap());
        assert_eq!(store.list_chats().await.unwrap(), vec![42]);

        store.remove_chat(42).await.unwrap();
        assert!(!store.is_chat_allowed(42).await.unwrap());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let path = temp_store_path("reopen");
        {
            let store = FileStore::open(path.clone(), Duration::from_secs(60)).unwrap();
            store.add_chat(7).await.unwrap();
        }
        let store = FileStore::open(path, Duration::from_secs(60)).unwrap();
        assert!(store.is_chat_allowed(7).await.unwrap());
    }

    #[tokio::test]
    async fn invite_is_single_use() {
        let store = FileStore::open(temp_store_path("invite"), Duration::from_secs(60)).unwrap();

        let token = mint_invite_token();
        store.create_invite(&token).await.unwrap();
        assert!(store.consume_invite(&token).await.unwrap());
        assert!(!store.consume_invite(&token).await.unwrap());
    }

    #[tokio::test]
    async fn expired_invite_is_rejected() {
        let store =
            FileStore::open(temp_store_path("expired"), Duration::from_secs(0)).unwrap();

        let token = mint_invite_token();
        store.create_invite(&token).await.unwrap();
        assert!(!store.consume_invite(&token).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_invite_is_rejected() {
        let store = FileStore::open(temp_store_path("unknown"), Duration::from_secs(60)).unwrap();
        assert!(!store.consume_invite("nope").await.unwrap());
    }

    #[test]
    fn minted_tokens_are_hex_and_unique() {
        let a = mint_invite_token();
        let b = mint_invite_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
