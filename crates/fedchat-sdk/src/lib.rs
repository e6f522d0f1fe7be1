//! Fedchat SDK - 联邦实时消息协议客户端引擎
//!
//! 核心能力：
//! - 🔄 同步循环引擎：长轮询持续拉取服务端增量，按序交给 processor 应用
//! - 🧭 generation 协作式取消：stop/start 不打断在途请求，旧循环自行退出
//! - 💾 同步状态持久化：next_batch / filter_id（内存版与 sled 版）
//! - 📬 投递 checkpoint：每跳投递结果的结构化遥测，尽力而为、绝不阻塞发送方
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fedchat_sdk::{FedchatClient, FedchatConfig, MemoryStateStore, SyncEngine};
//!
//! # use fedchat_sdk::{Result, SyncProcessor, SyncResponse, FedchatSDKError};
//! # use std::time::Duration;
//! # struct MyProcessor;
//! # #[async_trait::async_trait]
//! # impl SyncProcessor for MyProcessor {
//! #     async fn process(&self, _r: &SyncResponse, _s: &str) -> Result<()> { Ok(()) }
//! #     async fn on_sync_failure(
//! #         &self,
//! #         _r: Option<&SyncResponse>,
//! #         _e: &FedchatSDKError,
//! #     ) -> std::result::Result<Duration, FedchatSDKError> {
//! #         Ok(Duration::from_secs(2))
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = FedchatConfig::builder()
//!         .homeserver_url("https://chat.example.com")
//!         .user_id("@alice:example.com")
//!         .access_token("secret")
//!         .build();
//!
//!     let client = Arc::new(FedchatClient::new(&config)?);
//!     let store = Arc::new(MemoryStateStore::new());
//!     let processor = Arc::new(MyProcessor);
//!
//!     let engine = SyncEngine::new(client, store, processor, config.user_id.clone(), None);
//!     // 阻塞直到致命错误；stop() 可协作式终止
//!     engine.start().await
//! }
//! ```

pub mod checkpoint;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod storage;
pub mod sync;
pub mod version;

// 重新导出核心类型，方便使用
pub use checkpoint::{
    Checkpoint, CheckpointBatch, CheckpointChannel, CheckpointDispatcher, CheckpointReportedBy,
    CheckpointStatus, CheckpointStep,
};
pub use client::FedchatClient;
pub use config::{CheckpointConfig, FedchatConfig, HttpClientConfig};
pub use error::{FedchatSDKError, Result};
pub use event::{is_checkpoint_event_kind, message_types, ChatMessageType, EventKind, EventRef};
pub use storage::{MemoryStateStore, SledStateStore, SyncStateStore};
pub use sync::{SyncEngine, SyncProcessor, SyncResponse, SyncTransport};
pub use version::SDK_VERSION;
