//! Card persistence behind an opaque id.
//!
//! [`CardStore`] is the contract the share flow relies on: `save` snapshots a
//! whole card and returns an id, `get` returns the snapshot or `None`. A
//! missing card is a normal answer, not an error, so a dead link and a
//! network failure reach the user as different messages.
//!
//! ## Record shape
//!
//! ```json
//! { "config": { ... }, "photos": [ ... 7 ... ], "createdAt": "2026-02-14T09:30:00.000Z" }
//! ```
//!
//! [`FsStore`] keeps one such document per card in a directory. Ids are the
//! first 20 hex characters of a SHA-256 over the payload, the timestamp, and
//! a per-process counter, so two saves of the same card get distinct ids.

use crate::types::{CardConfig, CardState, PhotoSlots};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// Length of generated card ids.
const ID_LEN: usize = 20;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("card store unavailable: {0}")]
    Unavailable(String),
    #[error("stored card {id} is corrupt: {source}")]
    Corrupt {
        id: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Text shown to the person sharing or opening the card.
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => {
                "Failed to generate link. Check your connection and try again."
            }
            StoreError::Corrupt { .. } => "This link is no longer valid.",
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// A stored card: the full snapshot plus its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub config: CardConfig,
    pub photos: PhotoSlots,
    /// RFC 3339 UTC timestamp with millisecond precision.
    #[serde(default)]
    pub created_at: String,
}

impl CardRecord {
    /// Snapshot `state` with the current time.
    pub fn new(state: &CardState) -> Self {
        Self {
            config: state.config.clone(),
            photos: state.photos.clone(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// The card without the store's bookkeeping.
    pub fn into_state(self) -> CardState {
        CardState {
            config: self.config,
            photos: self.photos,
        }
    }
}

/// Persistence contract for shared cards.
pub trait CardStore {
    /// Persist a snapshot of `state` and return its id.
    fn save(&self, state: &CardState) -> Result<String, StoreError>;

    /// Fetch the card saved under `id`, or `None` if there is none.
    fn get(&self, id: &str) -> Result<Option<CardRecord>, StoreError>;
}

/// Ids are opaque, but only this alphabet can ever be issued.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Derive a fresh id for a record about to be written.
fn generate_id(payload: &str, created_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(created_at.as_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(ID_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let digest = hasher.finalize();
    let mut id: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    id.truncate(ID_LEN);
    id
}

/// Directory-backed store: `<dir>/<id>.json` per card.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl CardStore for FsStore {
    fn save(&self, state: &CardState) -> Result<String, StoreError> {
        fs::create_dir_all(&self.dir)?;
        let record = CardRecord::new(state);
        let payload = serde_json::to_string(&record)
            .map_err(|e| StoreError::Unavailable(format!("could not serialize card: {e}")))?;

        loop {
            let id = generate_id(&payload, &record.created_at);
            let path = self.record_path(&id);
            // create_new: never overwrite an existing card on an id collision
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    io::Write::write_all(&mut file, payload.as_bytes())?;
                    info!(%id, bytes = payload.len(), "saved card");
                    return Ok(id);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(%id, "id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn get(&self, id: &str) -> Result<Option<CardRecord>, StoreError> {
        if !is_valid_id(id) {
            debug!(%id, "rejecting malformed card id");
            return Ok(None);
        }
        let content = match fs::read_to_string(self.record_path(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        })?;
        Ok(Some(record))
    }
}
