//! 事件类型定义
//!
//! 事件种类（EventKind）是开放集合：服务端/上游随时可能出现新类型，
//! 所以未知类型一律落到 `Other(String)`，而不是反序列化失败。
//! checkpoint 允许上报的类型是一个集合成员判断，不是类型约束。

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 消息子类型就是字符串，支持无限扩展
pub type ChatMessageType = String;

/// 已知消息子类型常量
///
/// 这些常量提供 IDE 自动补全，但业务系统可以定义任意其他类型
pub mod message_types {
    /// 文本消息
    pub const TEXT: &str = "m.text";
    /// 通知消息
    pub const NOTICE: &str = "m.notice";
    /// 图片消息
    pub const IMAGE: &str = "m.image";
    /// 语音消息
    pub const AUDIO: &str = "m.audio";
    /// 视频消息
    pub const VIDEO: &str = "m.video";
    /// 文件消息
    pub const FILE: &str = "m.file";
    /// 位置消息
    pub const LOCATION: &str = "m.location";
    /// 表情包消息
    pub const EMOTE: &str = "m.emote";
}

/// 事件种类（开放集合）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 用户消息
    Message,
    /// 撤回
    Redaction,
    /// 表情回应
    Reaction,
    /// 贴纸
    Sticker,
    /// 加密消息
    Encrypted,
    /// 通话信令
    CallInvite,
    CallCandidates,
    CallAnswer,
    CallSelectAnswer,
    CallHangup,
    CallReject,
    CallNegotiate,
    /// 未知类型，保留原始字符串
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Message => "m.room.message",
            EventKind::Redaction => "m.room.redaction",
            EventKind::Reaction => "m.reaction",
            EventKind::Sticker => "m.sticker",
            EventKind::Encrypted => "m.room.encrypted",
            EventKind::CallInvite => "m.call.invite",
            EventKind::CallCandidates => "m.call.candidates",
            EventKind::CallAnswer => "m.call.answer",
            EventKind::CallSelectAnswer => "m.call.select_answer",
            EventKind::CallHangup => "m.call.hangup",
            EventKind::CallReject => "m.call.reject",
            EventKind::CallNegotiate => "m.call.negotiate",
            EventKind::Other(s) => s,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, EventKind::Message)
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "m.room.message" => EventKind::Message,
            "m.room.redaction" => EventKind::Redaction,
            "m.reaction" => EventKind::Reaction,
            "m.sticker" => EventKind::Sticker,
            "m.room.encrypted" => EventKind::Encrypted,
            "m.call.invite" => EventKind::CallInvite,
            "m.call.candidates" => EventKind::CallCandidates,
            "m.call.answer" => EventKind::CallAnswer,
            "m.call.select_answer" => EventKind::CallSelectAnswer,
            "m.call.hangup" => EventKind::CallHangup,
            "m.call.reject" => EventKind::CallReject,
            "m.call.negotiate" => EventKind::CallNegotiate,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventKind::from(s.as_str()))
    }
}

/// 判断事件种类是否允许上报 checkpoint
///
/// 允许列表之外的事件由调用方静默跳过（dispatcher 不做这个判断）。
pub fn is_checkpoint_event_kind(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Other(_))
}

/// checkpoint 构造所需的最小事件视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRef {
    /// 事件 ID
    pub event_id: String,
    /// 房间/会话 ID
    pub room_id: String,
    /// 事件种类
    pub kind: EventKind,
    /// 消息子类型（仅用户消息有）
    pub message_type: Option<ChatMessageType>,
}

impl EventRef {
    pub fn new(event_id: impl Into<String>, room_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event_id: event_id.into(),
            room_id: room_id.into(),
            kind,
            message_type: None,
        }
    }

    pub fn with_message_type(mut self, message_type: impl Into<ChatMessageType>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }
}
