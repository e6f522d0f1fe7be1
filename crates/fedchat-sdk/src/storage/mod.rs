//! 存储模块
//!
//! SDK 只持久化两样每账号状态：
//! - next_batch（同步续传 token）
//! - filter_id（服务端 filter 标识）
//!
//! 存储实现由嵌入方提供（trait），SDK 自带内存版与 sled 版。

pub mod state_store;

pub use state_store::{MemoryStateStore, SledStateStore, SyncStateStore};
