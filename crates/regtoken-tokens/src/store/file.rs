//! File-based token storage.
//!
//! Tokens are kept in a JSON Lines file: every write appends the full token
//! as one line, and loading folds the lines for each name together with
//! [`Token::merged_with`]. Opening the store compacts the file down to one
//! line per token.
//!
//! Several processes (a running server and the CLI) may share one file.
//! Appends and compaction hold an exclusive lock on a sidecar `<file>.lock`,
//! so no append is lost to a concurrent compaction. Each process still only
//! sees other processes' writes the next time it loads the file.

use super::TokenStore;
use crate::error::StoreError;
use crate::token::Token;
use async_trait::async_trait;
use fs2::FileExt;
use indexmap::IndexMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// JSON Lines token store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    /// Serializes appends from this process.
    write_lock: Mutex<()>,
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl FileStore {
    /// Open (or create) the store at `path`.
    ///
    /// Creates the parent directory if needed and compacts an existing file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            lock_path: lock_path_for(&path),
            path,
            write_lock: Mutex::new(()),
        };
        store.compact()?;
        Ok(store)
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the cross-process lock. Released when the returned file is dropped.
    fn lock_file(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Read the file, folding every record for a name into one token.
    fn read_tokens(&self) -> Result<IndexMap<String, Token>, StoreError> {
        let mut tokens: IndexMap<String, Token> = IndexMap::new();
        if !self.path.exists() {
            return Ok(tokens);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        for (line_num, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<Token>(&line) {
                Ok(token) => {
                    let merged = match tokens.get(token.name()) {
                        Some(stored) => stored.merged_with(&token),
                        None => token,
                    };
                    tokens.insert(merged.name().to_string(), merged);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse token record on line {} of {}: {}",
                        line_num + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }

        Ok(tokens)
    }

    /// Rewrite the file with one line per token.
    fn compact(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockError)?;
        let _lock = self.lock_file()?;
        let tokens = self.read_tokens()?;

        let tmp_path = self.path.with_extension("compact");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            for token in tokens.values() {
                writeln!(file, "{}", serde_json::to_string(token)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            count = tokens.len(),
            "Compacted token file"
        );
        Ok(())
    }
}

/// Whether the file is empty or its last byte ends a line.
fn ends_with_newline(file: &mut File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Append `line` as one record, dropping any bytes written if it fails.
fn append_record(file: &mut File, line: &[u8]) -> Result<(), StoreError> {
    let len = file.metadata()?.len();

    // A torn earlier write must not swallow this record
    let mut record = Vec::with_capacity(line.len() + 2);
    if !ends_with_newline(file, len)? {
        record.push(b'\n');
    }
    record.extend_from_slice(line);
    record.push(b'\n');

    let written = file.write_all(&record).and_then(|()| file.sync_data());
    if let Err(e) = written {
        if let Err(truncate_err) = file.set_len(len) {
            tracing::error!(error = %truncate_err, "Failed to roll back partial token record");
        }
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl TokenStore for FileStore {
    async fn load_all(&self) -> Result<Vec<Token>, StoreError> {
        Ok(self.read_tokens()?.into_values().collect())
    }

    async fn upsert(&self, token: &Token) -> Result<(), StoreError> {
        let json = serde_json::to_vec(token)?;

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockError)?;
        let _lock = self.lock_file()?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        append_record(&mut file, &json)?;

        tracing::debug!(token = %token.name(), "Stored token record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn token(name: &str, max_usage: u32) -> Token {
        Token::issue(name.to_string(), Utc::now(), None, max_usage)
    }

    fn append_raw(path: &Path, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[tokio::test]
    async fn test_upsert_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("tokens.jsonl")).unwrap();

        let a = token("a", 0);
        let b = token("b", 2);
        store.upsert(&a).await.unwrap();
        store.upsert(&b).await.unwrap();

        assert_eq!(store.load_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_later_record_wins_and_order_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("tokens.jsonl")).unwrap();

        let a = token("a", 2);
        let b = token("b", 0);
        store.upsert(&a).await.unwrap();
        store.upsert(&b).await.unwrap();
        let a_used = a.with_use();
        store.upsert(&a_used).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, vec![a_used, b]);
    }

    #[tokio::test]
    async fn test_stale_record_cannot_undo_disable() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("tokens.jsonl")).unwrap();

        let fresh = token("t", 3);
        store.upsert(&fresh.with_use().with_disabled()).await.unwrap();
        store.upsert(&fresh).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert!(loaded[0].is_disabled());
        assert_eq!(loaded[0].usage_count(), 1);
    }

    #[tokio::test]
    async fn test_persistence_across_restarts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.jsonl");
        let disabled = token("gone", 0).with_disabled();

        {
            let store = FileStore::open(&path).unwrap();
            store.upsert(&token("gone", 0)).await.unwrap();
            store.upsert(&disabled).await.unwrap();
        }

        // "Restart" by opening the file again, which compacts it
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.load_all().await.unwrap(), vec![disabled]);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.jsonl");
        let good = token("good", 0);
        fs::write(
            &path,
            format!(
                "{}\n{{\"name\":\"trunc\n{}\n",
                serde_json::to_string(&good).unwrap(),
                r#"{"name":"over","created_at":"2024-01-01T00:00:00Z","max_usage":1,"usage_count":5}"#
            ),
        )
        .unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.load_all().await.unwrap(), vec![good]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.jsonl");
        let good = token("good", 0);
        {
            let store = FileStore::open(&path).unwrap();
            store.upsert(&good).await.unwrap();
        }
        append_raw(&path, b"{\"name\":\"\xe2\x82\n");

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.load_all().await.unwrap(), vec![good]);
    }

    #[tokio::test]
    async fn test_record_after_torn_write_survives() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.jsonl");
        let single_use = token("once", 1);

        let store = FileStore::open(&path).unwrap();
        store.upsert(&single_use).await.unwrap();
        append_raw(&path, br#"{"name":"once","created_at":"20"#);
        store.upsert(&single_use.with_use()).await.unwrap();
        drop(store);

        let store = FileStore::open(&path).unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].usage_count(), 1);
    }

    #[tokio::test]
    async fn test_compaction_waits_for_other_writers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.jsonl");
        let first = token("first", 0);
        let late = token("late", 0);
        FileStore::open(&path)
            .unwrap()
            .upsert(&first)
            .await
            .unwrap();

        // Another process holds the lock while it appends
        let held = File::create(lock_path_for(&path)).unwrap();
        held.lock_exclusive().unwrap();

        let opener_path = path.clone();
        let opener = thread::spawn(move || FileStore::open(opener_path).map(|_| ()));
        thread::sleep(Duration::from_millis(200));
        assert!(!opener.is_finished());

        append_raw(&path, format!("{}\n", serde_json::to_string(&late).unwrap()).as_bytes());
        drop(held);
        opener.join().unwrap().unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.load_all().await.unwrap(), vec![first, late]);
    }
}
