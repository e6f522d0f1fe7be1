//! 同步状态存储 - next_batch / filter_id 的持久化
//!
//! Key 规范：next_batch:{user_id} 与 filter_id:{user_id}

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{FedchatSDKError, Result};

const NEXT_BATCH_PREFIX: &str = "next_batch";
const FILTER_ID_PREFIX: &str = "filter_id";

/// 每账号同步状态的加载/保存能力
///
/// 实现方需要保证并发访问安全；SDK 依靠"同一时刻只有一个活跃 sync 循环"
/// 的不变量避免同账号并发写入，不在外面再加锁。
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// 加载续传 token，空字符串表示从头开始
    async fn load_next_batch(&self, user_id: &str) -> Result<String>;

    /// 保存续传 token
    async fn save_next_batch(&self, user_id: &str, token: &str) -> Result<()>;

    /// 加载缓存的 filter_id（None 表示还没创建过）
    async fn load_filter_id(&self, user_id: &str) -> Result<Option<String>>;

    /// 保存 filter_id
    async fn save_filter_id(&self, user_id: &str, filter_id: &str) -> Result<()>;
}

fn next_batch_key(user_id: &str) -> String {
    format!("{}:{}", NEXT_BATCH_PREFIX, user_id)
}

fn filter_id_key(user_id: &str) -> String {
    format!("{}:{}", FILTER_ID_PREFIX, user_id)
}

/// 内存实现：不跨进程重启保留状态
///
/// 默认用它 SDK 也能工作，只是重启后会从头同步；生产环境应使用
/// SledStateStore 或嵌入方自己的持久化实现。
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStateStore for MemoryStateStore {
    async fn load_next_batch(&self, user_id: &str) -> Result<String> {
        Ok(self
            .entries
            .lock()
            .get(&next_batch_key(user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_next_batch(&self, user_id: &str, token: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(next_batch_key(user_id), token.to_string());
        Ok(())
    }

    async fn load_filter_id(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(&filter_id_key(user_id)).cloned())
    }

    async fn save_filter_id(&self, user_id: &str, filter_id: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(filter_id_key(user_id), filter_id.to_string());
        Ok(())
    }
}

/// sled 实现：状态落盘，重启后从上次位置继续同步
#[derive(Debug)]
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    /// 在 base_path/kv 下打开 sled 数据库
    pub fn open(base_path: &Path) -> Result<Self> {
        let kv_path = base_path.join("kv");
        std::fs::create_dir_all(&kv_path)
            .map_err(|e| FedchatSDKError::IO(format!("创建 KV 存储目录失败: {}", e)))?;
        let db = sled::open(&kv_path)
            .map_err(|e| FedchatSDKError::KvStore(format!("打开 sled 数据库失败: {}", e)))?;
        Ok(Self { db })
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .get(key)
            .map_err(|e| FedchatSDKError::KvStore(format!("读取键值对失败: {}", e)))?;
        match value {
            Some(bytes) => {
                let s = serde_json::from_slice(&bytes)
                    .map_err(|e| FedchatSDKError::Serialization(format!("反序列化值失败: {}", e)))?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| FedchatSDKError::Serialization(format!("序列化值失败: {}", e)))?;
        self.db
            .insert(key, bytes)
            .map_err(|e| FedchatSDKError::KvStore(format!("写入键值对失败: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl SyncStateStore for SledStateStore {
    async fn load_next_batch(&self, user_id: &str) -> Result<String> {
        Ok(self.get_string(&next_batch_key(user_id))?.unwrap_or_default())
    }

    async fn save_next_batch(&self, user_id: &str, token: &str) -> Result<()> {
        self.set_string(&next_batch_key(user_id), token)
    }

    async fn load_filter_id(&self, user_id: &str) -> Result<Option<String>> {
        self.get_string(&filter_id_key(user_id))
    }

    async fn save_filter_id(&self, user_id: &str, filter_id: &str) -> Result<()> {
        self.set_string(&filter_id_key(user_id), filter_id)
    }
}
