//! Chunk Storage - 文件系统分片存储实现
//!
//! 实现 ChunkStorePort trait
//!
//! 目录布局:
//! parts/part_001.wav, parts/part_002.wav, ...
//! parts.lock  (租约文件，与临时目录同级，避免影响空目录检查)

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{ChunkStoreError, ChunkStorePort, ScratchLease, StoredChunk};

/// 默认文件名前缀
pub const DEFAULT_CHUNK_PREFIX: &str = "part_";
/// 默认序号位数
pub const DEFAULT_INDEX_WIDTH: usize = 3;

const CHUNK_EXTENSION: &str = "wav";
const PARTIAL_SUFFIX: &str = ".partial";

/// 文件系统分片存储
pub struct FileChunkStore {
    /// 临时目录
    dir: PathBuf,
    /// 文件名前缀
    prefix: String,
    /// 序号零填充位数
    index_width: usize,
}

impl FileChunkStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: DEFAULT_CHUNK_PREFIX.to_string(),
            index_width: DEFAULT_INDEX_WIDTH,
        }
    }

    pub fn with_naming(mut self, prefix: impl Into<String>, index_width: usize) -> Self {
        self.prefix = prefix.into();
        self.index_width = index_width.max(1);
        self
    }

    /// 租约文件路径：临时目录同级的 `<目录名>.lock`
    ///
    /// `.`、`..`、`/` 这类没有目录名的路径无法放置同级租约
    pub fn lock_path(&self) -> Result<PathBuf, ChunkStoreError> {
        let name = self.dir.file_name().ok_or_else(|| {
            ChunkStoreError::IoError(format!(
                "Scratch directory {} has no name to derive a lock file from",
                self.dir.display()
            ))
        })?;

        let mut lock_name = name.to_os_string();
        lock_name.push(".lock");
        Ok(match self.dir.parent() {
            Some(parent) => parent.join(lock_name),
            None => PathBuf::from(lock_name),
        })
    }

    fn chunk_file_name(&self, index: usize) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            CHUNK_EXTENSION,
            width = self.index_width
        )
    }

    /// 从文件名解析序号，不匹配命名规则时返回 None
    fn parse_index(&self, file_name: &str) -> Option<usize> {
        let digits = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(CHUNK_EXTENSION)?
            .strip_suffix('.')?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    async fn count_entries(&self) -> Result<usize, ChunkStoreError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?;

        let mut count = 0;
        while entries
            .next_entry()
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?
            .is_some()
        {
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl ChunkStorePort for FileChunkStore {
    fn scratch_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir.join(self.chunk_file_name(index))
    }

    async fn acquire_lease(&self, run_id: Uuid) -> Result<ScratchLease, ChunkStoreError> {
        let lock_path = self.lock_path()?;
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ChunkStoreError::IoError(e.to_string()))?;
        }

        // create_new 保证同一时刻只有一个持有者
        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await;

        match created {
            Ok(file) => drop(file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&lock_path)
                    .await
                    .ok()
                    .and_then(|content| content.lines().next().map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(ChunkStoreError::Locked { lock_path, holder });
            }
            Err(e) => return Err(ChunkStoreError::IoError(e.to_string())),
        }

        let content = format!(
            "{}\npid={}\nacquired_at={}\n",
            run_id,
            std::process::id(),
            Utc::now().to_rfc3339()
        );
        if let Err(e) = fs::write(&lock_path, content).await {
            let _ = fs::remove_file(&lock_path).await;
            return Err(ChunkStoreError::IoError(e.to_string()));
        }

        tracing::debug!(run_id = %run_id, lock = %lock_path.display(), "Scratch lease acquired");

        let release_path = lock_path.clone();
        Ok(ScratchLease::new(run_id, move || {
            match std::fs::remove_file(&release_path) {
                Ok(()) => {
                    tracing::debug!(run_id = %run_id, "Scratch lease released");
                }
                Err(e) => {
                    tracing::warn!(
                        run_id = %run_id,
                        lock = %release_path.display(),
                        error = %e,
                        "Failed to release scratch lease"
                    );
                }
            }
        }))
    }

    async fn prepare_for_run(&self) -> Result<(), ChunkStoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?;

        let entries = self.count_entries().await?;
        if entries > 0 {
            return Err(ChunkStoreError::NotEmpty {
                dir: self.dir.clone(),
                entries,
            });
        }

        Ok(())
    }

    async fn save_chunk(&self, index: usize, data: &[u8]) -> Result<PathBuf, ChunkStoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?;

        let chunk_path = self.chunk_path(index);
        let partial_path = self
            .dir
            .join(format!("{}{}", self.chunk_file_name(index), PARTIAL_SUFFIX));

        // 先写临时文件再改名，崩溃时不会留下截断的分片
        fs::write(&partial_path, data)
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?;
        fs::rename(&partial_path, &chunk_path)
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?;

        tracing::debug!(
            "Saved chunk: index={}, path={}, size={} bytes",
            index,
            chunk_path.display(),
            data.len()
        );

        Ok(chunk_path)
    }

    async fn list_chunks(&self) -> Result<Vec<StoredChunk>, ChunkStoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ChunkStoreError::IoError(e.to_string())),
        };

        let mut chunks = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ChunkStoreError::IoError(e.to_string()))?
        {
            let file_name = entry.file_name();
            let Some(index) = file_name.to_str().and_then(|name| self.parse_index(name)) else {
                continue;
            };
            chunks.push(StoredChunk {
                index,
                path: entry.path(),
            });
        }

        chunks.sort_by_key(|chunk| chunk.index);
        Ok(chunks)
    }

    async fn read_chunk(&self, chunk: &StoredChunk) -> Result<Vec<u8>, ChunkStoreError> {
        fs::read(&chunk.path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ChunkStoreError::FileNotFound(chunk.path.display().to_string())
            } else {
                ChunkStoreError::IoError(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_prepare_creates_missing_dir() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path().join("parts"));

        store.prepare_for_run().await.unwrap();
        assert!(store.scratch_dir().is_dir());
    }

    #[tokio::test]
    async fn test_prepare_rejects_non_empty_dir() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path().join("parts"));
        fs::create_dir_all(store.scratch_dir()).await.unwrap();
        fs::write(store.scratch_dir().join("notes.txt"), b"x").await.unwrap();

        let err = store.prepare_for_run().await.unwrap_err();
        assert!(matches!(err, ChunkStoreError::NotEmpty { entries: 1, .. }));
    }

    #[tokio::test]
    async fn test_save_uses_zero_padded_names() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path().join("parts"));

        let path = store.save_chunk(7, b"data").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "part_007.wav");
        assert_eq!(fs::read(&path).await.unwrap(), b"data");
        // 不残留临时文件
        assert_eq!(store.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_sorts_by_index_and_ignores_foreign_files() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path().join("parts"));

        for index in [12, 3, 1000, 1] {
            store.save_chunk(index, b"x").await.unwrap();
        }
        for foreign in ["part_abc.wav", "part_.wav", "readme.txt", "part_002.wav.partial", "part_002.mp3"] {
            fs::write(store.scratch_dir().join(foreign), b"x").await.unwrap();
        }

        let indices: Vec<usize> = store
            .list_chunks()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(indices, vec![1, 3, 12, 1000]);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path().join("absent"));
        assert!(store.list_chunks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_naming() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path()).with_naming("chunk-", 5);
        assert_eq!(
            store.chunk_path(42).file_name().unwrap(),
            "chunk-00042.wav"
        );
        assert_eq!(store.parse_index("chunk-00042.wav"), Some(42));
        assert_eq!(store.parse_index("part_001.wav"), None);
    }

    #[tokio::test]
    async fn test_lease_is_exclusive_and_released_on_drop() {
        let temp_dir = tempdir().unwrap();
        let store = FileChunkStore::new(temp_dir.path().join("parts"));

        let first_run = Uuid::new_v4();
        let lease = store.acquire_lease(first_run).await.unwrap();
        assert_eq!(store.lock_path().unwrap(), temp_dir.path().join("parts.lock"));
        assert!(store.lock_path().unwrap().exists());
        // 租约文件不在临时目录内
        assert!(!store.scratch_dir().exists());

        let err = store.acquire_lease(Uuid::new_v4()).await.unwrap_err();
        match err {
            ChunkStoreError::Locked { holder, .. } => assert_eq!(holder, first_run.to_string()),
            other => panic!("unexpected error: {:?}", other),
        }

        drop(lease);
        assert!(!store.lock_path().unwrap().exists());
        store.acquire_lease(Uuid::new_v4()).await.unwrap();
    }

    #[test]
    fn test_lock_path_keeps_full_directory_name() {
        let store = FileChunkStore::new("out/parts.v2");
        assert_eq!(store.lock_path().unwrap(), PathBuf::from("out/parts.v2.lock"));

        let store = FileChunkStore::new("parts");
        assert_eq!(store.lock_path().unwrap(), PathBuf::from("parts.lock"));
    }

    #[tokio::test]
    async fn test_dotted_siblings_do_not_share_a_lease() {
        let temp_dir = tempdir().unwrap();
        let first = FileChunkStore::new(temp_dir.path().join("parts.a"));
        let second = FileChunkStore::new(temp_dir.path().join("parts.b"));

        let _first_lease = first.acquire_lease(Uuid::new_v4()).await.unwrap();
        let _second_lease = second.acquire_lease(Uuid::new_v4()).await.unwrap();
        assert!(temp_dir.path().join("parts.a.lock").exists());
        assert!(temp_dir.path().join("parts.b.lock").exists());
    }

    #[tokio::test]
    async fn test_lease_on_unnamed_dir_is_io_error() {
        for dir in [".", "..", "/"] {
            let store = FileChunkStore::new(dir);
            let err = store.acquire_lease(Uuid::new_v4()).await.unwrap_err();
            assert!(
                matches!(err, ChunkStoreError::IoError(ref msg) if msg.contains("no name")),
                "{}: {:?}",
                dir,
                err
            );
        }
    }
}
