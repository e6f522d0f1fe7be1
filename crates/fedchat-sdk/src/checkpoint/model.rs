//! checkpoint 数据模型
//!
//! 线上字段名与枚举字符串是收集端兼容性的一部分，不能改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{ChatMessageType, EventKind, EventRef};

/// 投递管线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckpointStep {
    /// 客户端已接收
    #[serde(rename = "CLIENT")]
    Client,
    /// homeserver 已受理
    #[serde(rename = "HOMESERVER")]
    Homeserver,
    /// bridge 已接收
    #[serde(rename = "BRIDGE")]
    Bridge,
    /// 已解密
    #[serde(rename = "DECRYPTED")]
    Decrypted,
    /// 已投递到远端网络
    #[serde(rename = "REMOTE")]
    Remote,
    /// 已作为命令处理
    #[serde(rename = "COMMAND")]
    Command,
}

/// 单步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckpointStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    /// 失败但会重试
    #[serde(rename = "WILL_RETRY")]
    WillRetry,
    /// 永久失败
    #[serde(rename = "PERM_FAILURE")]
    PermFailure,
}

/// checkpoint 来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckpointReportedBy {
    /// bridge 进程自己上报（本地构造的 checkpoint 一律是它）
    #[serde(rename = "BRIDGE")]
    Bridge,
    /// 上游多路复用器上报（保留值，只用于解码上游来的 checkpoint）
    #[serde(rename = "MULTIPLEXER")]
    Multiplexer,
}

/// 一条投递 checkpoint：一个 (事件, 管线阶段) 观测
///
/// 构造后不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub event_id: String,
    pub room_id: String,
    pub step: CheckpointStep,
    pub timestamp: DateTime<Utc>,
    pub status: CheckpointStatus,
    pub event_type: EventKind,
    pub reported_by: CheckpointReportedBy,
    pub retry_num: u32,
    /// 消息子类型，仅用户消息填写
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<ChatMessageType>,
    /// 诊断信息，仅非成功状态填写
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl Checkpoint {
    fn new(event: &EventRef, step: CheckpointStep, status: CheckpointStatus) -> Self {
        Self {
            event_id: event.event_id.clone(),
            room_id: event.room_id.clone(),
            step,
            timestamp: Utc::now(),
            status,
            event_type: event.kind.clone(),
            reported_by: CheckpointReportedBy::Bridge,
            retry_num: 0,
            // 只有用户消息才带子类型
            message_type: if event.kind.is_message() {
                event.message_type.clone()
            } else {
                None
            },
            info: None,
        }
    }

    /// 成功 checkpoint：不带诊断信息
    pub fn success(event: &EventRef, step: CheckpointStep) -> Self {
        Self::new(event, step, CheckpointStatus::Success)
    }

    /// 失败 checkpoint：默认 WillRetry，permanent 标记后为 PermFailure；
    /// 诊断信息是底层错误的字符串化
    pub fn failure(
        event: &EventRef,
        step: CheckpointStep,
        error: &dyn std::fmt::Display,
        permanent: bool,
    ) -> Self {
        let status = if permanent {
            CheckpointStatus::PermFailure
        } else {
            CheckpointStatus::WillRetry
        };
        let mut checkpoint = Self::new(event, step, status);
        checkpoint.info = Some(error.to_string());
        checkpoint
    }

    /// 标注该 (事件, 阶段) 此前已经尝试过的次数
    pub fn with_retry_num(mut self, retry_num: u32) -> Self {
        self.retry_num = retry_num;
        self
    }
}

/// 批量上报信封
///
/// 单条也走同一个信封，收集端按批原子处理部分失败。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointBatch {
    pub checkpoints: Vec<Checkpoint>,
}

impl CheckpointBatch {
    pub fn new(checkpoints: Vec<Checkpoint>) -> Self {
        Self { checkpoints }
    }
}

impl From<Checkpoint> for CheckpointBatch {
    fn from(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoints: vec![checkpoint],
        }
    }
}
