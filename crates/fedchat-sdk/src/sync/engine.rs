//! 同步循环引擎
//!
//! 每次 start() 开启一个新的 cycle，并把 generation 自增一次；
//! stop() 只自增 generation，不打断在途请求——被取代的 cycle 在
//! 下一次拉取返回后通过 generation 比对自行退出（协作式取消）。
//!
//! token 落盘时机：拉取成功后、交给 processor 之前。这样即使
//! processor 被某个坏 payload 打挂，重启后也不会反复重放同一批
//! （at-most-once-per-token，代价是最多丢一批）。

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{FedchatSDKError, Result};
use crate::storage::SyncStateStore;
use crate::sync::processor::{SyncProcessor, SyncTransport};

/// 单次长轮询的服务端等待预算（毫秒）
pub const SYNC_TIMEOUT_MS: u64 = 30_000;

/// 同步循环引擎
pub struct SyncEngine {
    transport: Arc<dyn SyncTransport>,
    store: Arc<dyn SyncStateStore>,
    processor: Arc<dyn SyncProcessor>,
    user_id: String,
    set_presence: Option<String>,
    /// 当前 generation，唯一需要互斥保护的数据；
    /// 临界区只做读或自增，绝不跨 I/O 持锁
    generation: Mutex<u64>,
}

impl SyncEngine {
    pub fn new(
        transport: Arc<dyn SyncTransport>,
        store: Arc<dyn SyncStateStore>,
        processor: Arc<dyn SyncProcessor>,
        user_id: impl Into<String>,
        set_presence: Option<String>,
    ) -> Self {
        Self {
            transport,
            store,
            processor,
            user_id: user_id.into(),
            set_presence,
            generation: Mutex::new(0),
        }
    }

    /// 启动同步循环，阻塞当前任务直到出现致命错误
    ///
    /// 致命条件：
    /// - filter 创建失败
    /// - processor.on_sync_failure 返回 Err
    /// - processor.process 返回 Err
    ///
    /// 被 stop() 或新的 start() 取代时静默返回 Ok(())。
    /// 调用方可以再次调用 start() 从上次落盘的 token 继续。
    pub async fn start(&self) -> Result<()> {
        let generation = self.bump_generation();
        let mut next_batch = self.store.load_next_batch(&self.user_id).await?;
        let filter_id = self.resolve_filter_id().await?;
        info!(generation, user_id = %self.user_id, "sync 循环启动");

        loop {
            let response = match self
                .transport
                .sync(
                    SYNC_TIMEOUT_MS,
                    &next_batch,
                    &filter_id,
                    false,
                    self.set_presence.as_deref(),
                )
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    // 退避策略完全由 processor 决定；Err 即致命
                    let backoff = self.processor.on_sync_failure(None, &error).await?;
                    debug!(
                        error = %error,
                        backoff_ms = backoff.as_millis() as u64,
                        "sync 拉取失败，退避后用同一 token 重试"
                    );
                    sleep(backoff).await;
                    continue;
                }
            };

            // generation 变了说明本 cycle 已被取代，丢弃响应静默退出
            if self.current_generation() != generation {
                debug!(generation, "sync 循环已被取代，退出");
                return Ok(());
            }

            // 先落盘再 process：坏 payload 最多丢一批，不会卡死在同一批上
            self.store
                .save_next_batch(&self.user_id, &response.next_batch)
                .await?;
            self.processor.process(&response, &next_batch).await?;

            next_batch = response.next_batch;
        }
    }

    /// 停止当前同步循环
    ///
    /// 非阻塞：只推进 generation，在途的长轮询不会被打断，
    /// 对应 cycle 在其请求返回后自行退出。
    pub fn stop(&self) {
        let generation = self.bump_generation();
        debug!(generation, "sync 循环停止请求已记录");
    }

    /// 解析 filter_id：优先用缓存，没有则在服务端创建并落盘
    async fn resolve_filter_id(&self) -> Result<String> {
        if let Some(filter_id) = self.store.load_filter_id(&self.user_id).await? {
            return Ok(filter_id);
        }
        let definition = self.processor.filter_definition(&self.user_id);
        let filter_id = self
            .transport
            .create_filter(&definition)
            .await
            .map_err(|e| FedchatSDKError::Filter(e.to_string()))?;
        self.store.save_filter_id(&self.user_id, &filter_id).await?;
        info!(filter_id = %filter_id, "filter 已创建并缓存");
        Ok(filter_id)
    }

    fn bump_generation(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }

    fn current_generation(&self) -> u64 {
        *self.generation.lock()
    }
}
