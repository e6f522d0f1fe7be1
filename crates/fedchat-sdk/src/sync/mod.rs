//! 同步模块
//!
//! 职责：
//! - 持续长轮询拉取服务端增量（/sync）
//! - 按序把增量交给 processor 应用
//! - generation 机制做协作式取消（stop 不打断在途请求）
//! - token 在 process 之前落盘，保证坏 payload 不会把账号卡死

pub mod engine;
pub mod processor;
pub mod response;

pub use engine::SyncEngine;
pub use processor::{SyncProcessor, SyncTransport};
pub use response::SyncResponse;
