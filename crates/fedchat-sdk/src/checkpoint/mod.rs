//! 投递 checkpoint 模块
//!
//! 出站消息在投递管线每一跳（client → homeserver → bridge → 远端网络）
//! 产生一条结构化的 checkpoint，用于跨跳排查投递失败。
//!
//! 定位是尽力而为的遥测：
//! - 构造后不可变，打包后交给 dispatcher
//! - 发送在独立任务上进行，绝不阻塞触发方
//! - 发送失败不重试（checkpoint 本身是关于别的重试的信号，
//!   再给它加重试会在故障时放大流量）

pub mod dispatcher;
pub mod model;

pub use dispatcher::{CheckpointChannel, CheckpointDispatcher};
pub use model::{
    Checkpoint, CheckpointBatch, CheckpointReportedBy, CheckpointStatus, CheckpointStep,
};
