//! checkpoint 投递器
//!
//! 发送路径（按序尝试，命中即止）：
//! 1. 常驻双向通道可用 → 整批打成一条 message_checkpoint 命令发出
//! 2. 没配置 HTTP 端点 → 静默丢弃（checkpoint 是 opt-in 的）
//! 3. HTTP POST，固定 5 秒期限
//!
//! 任何一条路径失败都不重试：丢一条 checkpoint 可以接受，
//! 在收集端故障时把上报流量放大不可接受。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::checkpoint::model::{Checkpoint, CheckpointBatch, CheckpointStep};
use crate::config::CheckpointConfig;
use crate::error::{FedchatSDKError, Result};
use crate::event::EventRef;

/// 通道上的命令名（收集端兼容性的一部分）
pub const CHECKPOINT_COMMAND: &str = "message_checkpoint";

/// HTTP 上报的固定期限
const CHECKPOINT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// 常驻双向通道能力（由嵌入方提供，例如到收集端的 websocket）
#[async_trait]
pub trait CheckpointChannel: Send + Sync {
    /// 通道当前是否建立
    fn is_connected(&self) -> bool;

    /// 发送一条带命令名的帧
    async fn send_command(&self, command: &str, data: Value) -> Result<()>;
}

/// checkpoint 投递器
///
/// Clone 成本低（内部都是 Arc/小字段），dispatch 时 clone 一份丢进
/// 独立任务，触发方立刻返回。
#[derive(Clone)]
pub struct CheckpointDispatcher {
    channel: Option<Arc<dyn CheckpointChannel>>,
    endpoint: Option<String>,
    token: String,
    user_agent: String,
    http: reqwest::Client,
}

impl CheckpointDispatcher {
    pub fn new(config: &CheckpointConfig, user_agent: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(CHECKPOINT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| FedchatSDKError::Other(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self {
            channel: None,
            endpoint: config.endpoint.clone(),
            token: config.token.clone().unwrap_or_default(),
            user_agent: user_agent.into(),
            http,
        })
    }

    /// 挂载常驻通道；挂载后优先走通道
    pub fn with_channel(mut self, channel: Arc<dyn CheckpointChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// 上报一次成功观测（fire-and-forget）
    pub fn report_success(&self, event: &EventRef, step: CheckpointStep) {
        self.dispatch(Checkpoint::success(event, step));
    }

    /// 上报一次失败观测（fire-and-forget）
    pub fn report_failure(
        &self,
        event: &EventRef,
        step: CheckpointStep,
        error: &dyn std::fmt::Display,
        permanent: bool,
    ) {
        self.dispatch(Checkpoint::failure(event, step, error, permanent));
    }

    /// 投递单条 checkpoint：发送在独立任务上进行，本调用立刻返回
    pub fn dispatch(&self, checkpoint: Checkpoint) {
        self.dispatch_batch(vec![checkpoint]);
    }

    /// 投递一批 checkpoint：发送在独立任务上进行，本调用立刻返回
    ///
    /// 发送结果只记日志，不回传给触发方。
    pub fn dispatch_batch(&self, checkpoints: Vec<Checkpoint>) {
        if checkpoints.is_empty() {
            return;
        }
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(error) = dispatcher.send_batch(&checkpoints).await {
                warn!(error = %error, count = checkpoints.len(), "checkpoint 上报失败（不重试）");
            }
        });
    }

    /// 实际发送一批 checkpoint（同步调用方可用它拿到结果；不重试）
    pub async fn send_batch(&self, checkpoints: &[Checkpoint]) -> Result<()> {
        let batch = CheckpointBatch::new(checkpoints.to_vec());

        // 1. 常驻通道优先
        if let Some(channel) = &self.channel {
            if channel.is_connected() {
                let data = serde_json::to_value(&batch)
                    .map_err(|e| FedchatSDKError::Serialization(format!("序列化 checkpoint 失败: {}", e)))?;
                return channel.send_command(CHECKPOINT_COMMAND, data).await;
            }
        }

        // 2. 未配置端点：静默丢弃
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint,
            None => return Ok(()),
        };

        // 3. 一次性 HTTP 上报，固定 5 秒期限
        debug!(endpoint = %endpoint, count = checkpoints.len(), "HTTP 上报 checkpoint");
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.token)
            // 收集端按 User-Agent 区分请求来源，checkpoint 请求带固定后缀
            .header(
                reqwest::header::USER_AGENT,
                format!("{} checkpoint sender", self.user_agent),
            )
            .json(&batch)
            .send()
            .await
            .map_err(|e| FedchatSDKError::Transport(format!("checkpoint 上报请求失败: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(FedchatSDKError::Http { code: status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{message_types, EventKind};
    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 初始化日志（重复调用安全）
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn message_event() -> EventRef {
        EventRef::new("$evt1", "!room:hs", EventKind::Message)
            .with_message_type(message_types::TEXT)
    }

    /// 记录型通道
    struct RecordingChannel {
        connected: bool,
        sent: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingChannel {
        fn new(connected: bool) -> Self {
            Self {
                connected,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CheckpointChannel for RecordingChannel {
        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn send_command(&self, command: &str, data: Value) -> Result<()> {
            self.sent.lock().push((command.to_string(), data));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unconfigured_dispatch_is_silent_noop() {
        // 无通道、无端点：任意数量的 checkpoint 都不产生网络活动、不报错
        let dispatcher =
            CheckpointDispatcher::new(&CheckpointConfig::default(), "test-agent").unwrap();
        let checkpoints: Vec<Checkpoint> = (0..10)
            .map(|_| Checkpoint::success(&message_event(), CheckpointStep::Homeserver))
            .collect();
        dispatcher.send_batch(&checkpoints).await.unwrap();
    }

    #[tokio::test]
    async fn test_connected_channel_gets_one_framed_command() {
        let channel = Arc::new(RecordingChannel::new(true));
        let dispatcher = CheckpointDispatcher::new(&CheckpointConfig::default(), "test-agent")
            .unwrap()
            .with_channel(channel.clone());

        let error = std::io::Error::other("remote unreachable");
        let batch = vec![
            Checkpoint::success(&message_event(), CheckpointStep::Homeserver),
            Checkpoint::failure(&message_event(), CheckpointStep::Remote, &error, false),
        ];
        dispatcher.send_batch(&batch).await.unwrap();

        let sent = channel.sent.lock();
        assert_eq!(sent.len(), 1);
        let (command, data) = &sent[0];
        assert_eq!(command, CHECKPOINT_COMMAND);
        assert_eq!(data["checkpoints"].as_array().unwrap().len(), 2);
        assert_eq!(data["checkpoints"][1]["status"], "WILL_RETRY");
    }

    #[tokio::test]
    async fn test_disconnected_channel_falls_through() {
        // 通道存在但未建立，且没配置端点：静默丢弃，不走通道
        let channel = Arc::new(RecordingChannel::new(false));
        let dispatcher = CheckpointDispatcher::new(&CheckpointConfig::default(), "test-agent")
            .unwrap()
            .with_channel(channel.clone());

        let checkpoint = Checkpoint::success(&message_event(), CheckpointStep::Client);
        dispatcher.send_batch(&[checkpoint]).await.unwrap();
        assert!(channel.sent.lock().is_empty());
    }

    /// 接收一个 HTTP 请求并回放固定响应，返回收到的请求原文
    async fn serve_once(listener: TcpListener, response: String) -> Vec<u8> {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            // 头部收完后按 content-length 读满请求体
            if let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                let header = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
                let content_length = header
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        request
    }

    fn http_dispatcher(addr: std::net::SocketAddr) -> CheckpointDispatcher {
        let config = CheckpointConfig {
            endpoint: Some(format!("http://{}/checkpoints", addr)),
            token: Some("cp_secret".to_string()),
        };
        CheckpointDispatcher::new(&config, "fedchat-sdk v0.1.0").unwrap()
    }

    #[tokio::test]
    async fn test_http_dispatch_posts_batch_with_auth() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string(),
        ));

        let dispatcher = http_dispatcher(addr);
        let checkpoint = Checkpoint::success(&message_event(), CheckpointStep::Homeserver);
        dispatcher.send_batch(&[checkpoint]).await.unwrap();

        let request = String::from_utf8_lossy(&server.await.unwrap()).to_lowercase();
        assert!(request.starts_with("post /checkpoints"));
        assert!(request.contains("authorization: bearer cp_secret"));
        // User-Agent 带 checkpoint 请求的固定后缀
        assert!(request.contains("user-agent: fedchat-sdk v0.1.0 checkpoint sender"));
        assert!(request.contains("\"checkpoints\""));
        assert!(request.contains("\"status\":\"success\""));
    }

    #[tokio::test]
    async fn test_http_dispatch_non_2xx_preserves_body() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = "<html>bad gateway</html>";
        let server = tokio::spawn(serve_once(
            listener,
            format!(
                "HTTP/1.1 502 Bad Gateway\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            ),
        ));

        let dispatcher = http_dispatcher(addr);
        let checkpoint = Checkpoint::success(&message_event(), CheckpointStep::Homeserver);
        let error = dispatcher.send_batch(&[checkpoint]).await.unwrap_err();
        server.await.unwrap();

        // 非 2xx：响应体原文保留在错误里，且不重试
        match &error {
            FedchatSDKError::Http { code, body: got } => {
                assert_eq!(*code, 502);
                assert_eq!(got, body);
            }
            other => panic!("期望 Http 错误，得到 {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fire_and_forget_does_not_block_caller() {
        let channel = Arc::new(RecordingChannel::new(true));
        let dispatcher = CheckpointDispatcher::new(&CheckpointConfig::default(), "test-agent")
            .unwrap()
            .with_channel(channel.clone());

        // dispatch 立刻返回；发送发生在独立任务上
        dispatcher.report_success(&message_event(), CheckpointStep::Homeserver);

        // 等独立任务跑完
        for _ in 0..50 {
            if !channel.sent.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(channel.sent.lock().len(), 1);
    }
}
