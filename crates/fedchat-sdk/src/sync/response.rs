//! /sync 响应模型
//!
//! 引擎只关心 next_batch；各分区内容对引擎是不透明的，
//! 由 processor 自己解析（所以用 serde_json::Value 承载）。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 一次增量同步的响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    /// 下一次请求的续传 token
    pub next_batch: String,
    /// 房间维度的增量（join/invite/leave）
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub rooms: Value,
    /// 在线状态事件
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub presence: Value,
    /// 账号数据事件
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub account_data: Value,
    /// 设备直达消息
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub to_device: Value,
}
