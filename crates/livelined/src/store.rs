use std::path::Path;

use liveline_core::catalog::MANDATORY_PAIRS;
use liveline_core::PatternFrame;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio_rusqlite::Connection;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("pattern encryption failed")]
    EncryptionFailed,
    #[error("pattern decryption failed — key mismatch or corrupted data")]
    DecryptionFailed,
    #[error("pattern digest mismatch for {0}")]
    DigestMismatch(String),
    #[error("invalid pattern blob size: {0} bytes")]
    InvalidBlob(usize),
    #[error("empty pattern collection")]
    EmptyPattern,
    #[error("invalid pattern frame width: {0} (expected {expected})", expected = MANDATORY_PAIRS.len())]
    InvalidFrameWidth(usize),
    #[error("invalid pattern value (NaN/Inf)")]
    InvalidPatternValue,
    #[error("encryption key I/O error: {0}")]
    KeyIo(#[source] std::io::Error),
}

/// SQLite-backed enrollment pattern storage with AES-256-GCM encryption.
///
/// One row per finished enrollment session. The plaintext is the row-major
/// distance matrix (frames × pairs, little-endian f32); its SHA-256 digest is
/// stored alongside and checked after decryption.
///
/// A per-installation 32-byte key is generated at first use and stored at
/// `{db_dir}/.key` (mode 0600).
#[derive(Clone)]
pub struct PatternStore {
    conn: Connection,
    enc_key: [u8; 32],
}

/// A stored enrollment pattern, decrypted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredPattern {
    pub id: String,
    pub user: String,
    pub label: String,
    pub frames: Vec<PatternFrame>,
    pub created_at: String,
}

/// Metadata about a stored pattern (no distance data).
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatternInfo {
    pub id: String,
    pub label: String,
    pub frame_count: u32,
    pub pair_count: u32,
    pub digest: String,
    pub created_at: String,
}

impl PatternStore {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let enc_key = if db_path == Path::new(":memory:") {
            [0u8; 32]
        } else {
            let key_path = db_path
                .parent()
                .unwrap_or(Path::new("/var/lib/liveline"))
                .join(".key");
            load_or_generate_key(&key_path)?
        };

        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 CREATE TABLE IF NOT EXISTS patterns (
                     id TEXT PRIMARY KEY,
                     user TEXT NOT NULL,
                     label TEXT NOT NULL,
                     frame_count INTEGER NOT NULL,
                     pair_count INTEGER NOT NULL,
                     pattern BLOB NOT NULL,
                     digest TEXT NOT NULL,
                     created_at TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_patterns_user ON patterns(user);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, enc_key })
    }

    /// Insert a finished enrollment pattern. Returns the generated UUID.
    pub async fn insert(
        &self,
        user: &str,
        label: &str,
        frames: &[PatternFrame],
    ) -> Result<String, StoreError> {
        validate_frames(frames)?;
        let plaintext = frames_to_bytes(frames);
        let digest = sha256_hex(&plaintext);
        let blob = self.encrypt(&plaintext)?;

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let frame_count = frames.len() as u32;
        let pair_count = MANDATORY_PAIRS.len() as u32;

        let id_clone = id.clone();
        let user = user.to_string();
        let label = label.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO patterns (id, user, label, frame_count, pair_count, pattern, digest, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![id_clone, user, label, frame_count, pair_count, blob, digest, created_at],
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(id = %id, frames = frame_count, "enrollment pattern stored");
        Ok(id)
    }

    /// Load and decrypt every pattern stored for a user.
    pub async fn get_patterns_for_user(&self, user: &str) -> Result<Vec<StoredPattern>, StoreError> {
        let user = user.to_string();

        let rows: Vec<(String, String, String, u32, Vec<u8>, String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user, label, pair_count, pattern, digest, created_at
                     FROM patterns WHERE user = ?1 ORDER BY created_at",
                )?;
                let rows = stmt.query_map([&user], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        let mut patterns = Vec::with_capacity(rows.len());
        for (id, user, label, pair_count, blob, digest, created_at) in rows {
            let plaintext = self.decrypt(&blob)?;
            if sha256_hex(&plaintext) != digest {
                return Err(StoreError::DigestMismatch(id));
            }
            let frames = bytes_to_frames(&plaintext, pair_count as usize)?;
            patterns.push(StoredPattern {
                id,
                user,
                label,
                frames,
                created_at,
            });
        }
        Ok(patterns)
    }

    /// List stored patterns for a user (metadata only).
    pub async fn list_by_user(&self, user: &str) -> Result<Vec<PatternInfo>, StoreError> {
        let user = user.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, label, frame_count, pair_count, digest, created_at
                     FROM patterns WHERE user = ?1 ORDER BY created_at",
                )?;
                let rows = stmt.query_map([&user], |row| {
                    Ok(PatternInfo {
                        id: row.get(0)?,
                        label: row.get(1)?,
                        frame_count: row.get(2)?,
                        pair_count: row.get(3)?,
                        digest: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Remove a pattern by ID, scoped to a user for cross-user protection.
    pub async fn remove(&self, user: &str, pattern_id: &str) -> Result<bool, StoreError> {
        let user = user.to_string();
        let pattern_id = pattern_id.to_string();
        self.conn
            .call(move |conn| {
                let affected = conn.execute(
                    "DELETE FROM patterns WHERE id = ?1 AND user = ?2",
                    [&pattern_id, &user],
                )?;
                Ok(affected > 0)
            })
            .await
            .map_err(StoreError::from)
    }

    // ── Encryption helpers ────────────────────────────────────────────────────

    /// Output: 12-byte random nonce || ciphertext || 16-byte GCM tag.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let key = Key::<Aes256Gcm>::from_slice(&self.enc_key);
        let cipher = Aes256Gcm::new(key);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| StoreError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, StoreError> {
        if blob.len() <= NONCE_LEN {
            return Err(StoreError::InvalidBlob(blob.len()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let key = Key::<Aes256Gcm>::from_slice(&self.enc_key);
        let cipher = Aes256Gcm::new(key);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| StoreError::DecryptionFailed)
    }
}

// ── Key management ────────────────────────────────────────────────────────────

/// Load the encryption key from disk, or generate and persist a new one
/// with mode 0600.
fn load_or_generate_key(key_path: &Path) -> Result<[u8; 32], StoreError> {
    if key_path.exists() {
        let bytes = std::fs::read(key_path).map_err(StoreError::KeyIo)?;
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            StoreError::KeyIo(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "encryption key file has wrong length ({} bytes, expected 32)",
                    bytes.len()
                ),
            ))
        })?;
        tracing::debug!(path = %key_path.display(), "loaded encryption key");
        Ok(key)
    } else {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);

        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(key_path)
            .map_err(StoreError::KeyIo)?;
        f.write_all(&key).map_err(StoreError::KeyIo)?;

        tracing::info!(path = %key_path.display(), "generated new AES-256 encryption key");
        Ok(key)
    }
}

// ── Serialization helpers ─────────────────────────────────────────────────────

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn frames_to_bytes(frames: &[PatternFrame]) -> Vec<u8> {
    let width = frames.first().map_or(0, PatternFrame::len);
    let mut bytes = Vec::with_capacity(frames.len() * width * 4);
    for frame in frames {
        for &v in frame.distances() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    bytes
}

fn bytes_to_frames(bytes: &[u8], pair_count: usize) -> Result<Vec<PatternFrame>, StoreError> {
    let row_len = pair_count * 4;
    if row_len == 0 || bytes.is_empty() || bytes.len() % row_len != 0 {
        return Err(StoreError::InvalidBlob(bytes.len()));
    }

    let mut frames = Vec::with_capacity(bytes.len() / row_len);
    for row in bytes.chunks_exact(row_len) {
        let mut distances = Vec::with_capacity(pair_count);
        for chunk in row.chunks_exact(4) {
            let arr: [u8; 4] = chunk
                .try_into()
                .map_err(|_| StoreError::InvalidBlob(bytes.len()))?;
            let v = f32::from_le_bytes(arr);
            if !v.is_finite() {
                return Err(StoreError::InvalidPatternValue);
            }
            distances.push(v);
        }
        frames.push(PatternFrame::from_distances(distances));
    }
    validate_frames(&frames)?;
    Ok(frames)
}

fn validate_frames(frames: &[PatternFrame]) -> Result<(), StoreError> {
    if frames.is_empty() {
        return Err(StoreError::EmptyPattern);
    }
    for frame in frames {
        if frame.len() != MANDATORY_PAIRS.len() {
            return Err(StoreError::InvalidFrameWidth(frame.len()));
        }
        if frame.distances().iter().any(|v| !v.is_finite()) {
            return Err(StoreError::InvalidPatternValue);
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
