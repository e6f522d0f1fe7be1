//! 引擎的两个外部协作者 trait
//!
//! - SyncTransport：长轮询拉取 + filter 创建（FedchatClient 实现；测试用 mock）
//! - SyncProcessor：增量应用 + 失败策略（由嵌入方的状态机实现）

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FedchatSDKError, Result};
use crate::sync::response::SyncResponse;

/// 长轮询拉取能力
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// 发起一次 /sync 长轮询
    ///
    /// * `timeout_ms` - 服务端等待预算（毫秒）
    /// * `since` - 续传 token，空串表示从头
    /// * `filter_id` - filter 标识，空串表示不传
    async fn sync(
        &self,
        timeout_ms: u64,
        since: &str,
        filter_id: &str,
        full_state: bool,
        set_presence: Option<&str>,
    ) -> Result<SyncResponse>;

    /// 在服务端创建 filter，返回 filter_id
    async fn create_filter(&self, definition: &Value) -> Result<String>;
}

/// 增量应用与失败策略
///
/// ## NOTE: 引擎不自带重试曲线
///
/// 退避时长 / 重试上限 / 放弃条件全部由 `on_sync_failure` 的返回值决定，
/// 引擎本身没有硬编码的退避策略。
#[async_trait]
pub trait SyncProcessor: Send + Sync {
    /// 本账号的 filter 定义（首次启动时用来在服务端创建 filter）
    fn filter_definition(&self, user_id: &str) -> Value {
        let _ = user_id;
        Value::Object(Default::default())
    }

    /// 应用一次增量
    ///
    /// * `since` - 本次增量之前的 token（引擎保证按序、每批恰好一次）
    ///
    /// 返回 Err 对当前循环是致命的：start() 会带着该错误返回。
    async fn process(&self, response: &SyncResponse, since: &str) -> Result<()>;

    /// 拉取失败时的策略
    ///
    /// 返回 Ok(backoff)：引擎睡眠后用同一个 token 重试；
    /// 返回 Err：致命，终止当前循环。
    async fn on_sync_failure(
        &self,
        response: Option<&SyncResponse>,
        error: &FedchatSDKError,
    ) -> std::result::Result<Duration, FedchatSDKError>;
}
