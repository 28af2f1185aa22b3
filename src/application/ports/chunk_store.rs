//! Chunk Store Port - 出站端口
//!
//! 管理临时目录中的分片音频：运行前的空目录检查、按序号保存与读取、
//! 以及整次运行期间的咨询式租约

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// 分片存储错误
#[derive(Debug, Error)]
pub enum ChunkStoreError {
    /// 目录中残留了上一次运行的文件
    #[error("Scratch directory {dir} is not empty ({entries} entries)")]
    NotEmpty { dir: PathBuf, entries: usize },

    /// 另一次运行持有租约
    #[error("Scratch directory is locked by run {holder} ({lock_path})")]
    Locked { lock_path: PathBuf, holder: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 已保存的分片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    /// 文件名中编码的序号
    pub index: usize,
    pub path: PathBuf,
}

/// 临时目录租约
///
/// 持有期间其他运行无法获取租约；drop 时释放
pub struct ScratchLease {
    run_id: Uuid,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ScratchLease {
    pub fn new(run_id: Uuid, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            run_id,
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for ScratchLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for ScratchLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchLease")
            .field("run_id", &self.run_id)
            .finish()
    }
}

/// Chunk Store Port - 出站端口
#[async_trait]
pub trait ChunkStorePort: Send + Sync {
    /// 临时目录路径
    fn scratch_dir(&self) -> PathBuf;

    /// 分片文件路径
    fn chunk_path(&self, index: usize) -> PathBuf;

    /// 获取租约
    async fn acquire_lease(&self, run_id: Uuid) -> Result<ScratchLease, ChunkStoreError>;

    /// 合成前准备：目录不存在则创建，非空则拒绝
    async fn prepare_for_run(&self) -> Result<(), ChunkStoreError>;

    /// 保存分片音频
    async fn save_chunk(&self, index: usize, data: &[u8]) -> Result<PathBuf, ChunkStoreError>;

    /// 按序号升序列出分片
    async fn list_chunks(&self) -> Result<Vec<StoredChunk>, ChunkStoreError>;

    /// 读取分片音频
    async fn read_chunk(&self, chunk: &StoredChunk) -> Result<Vec<u8>, ChunkStoreError>;
}
