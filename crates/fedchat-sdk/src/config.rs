//! SDK 配置
//!
//! 分为三块：
//! - 基础连接配置（homeserver 地址、账号、凭证）
//! - HTTP 客户端配置（超时）
//! - Checkpoint 上报配置（HTTP 端点，可选）

use serde::{Deserialize, Serialize};

use crate::version::default_user_agent;

/// HTTP 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// 连接超时（秒）
    pub connect_timeout_secs: Option<u64>,
    /// 请求超时（秒）
    ///
    /// 注意：/sync 是长轮询，等待时间由服务端 timeout 参数控制（30s），
    /// 所以这里默认不设整体请求超时，避免把正常的长轮询掐断。
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: Some(30),
            request_timeout_secs: None,
        }
    }
}

/// Checkpoint 上报配置
///
/// endpoint 为 None 时表示未开启 HTTP 上报（checkpoint 是 opt-in 的）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// 上报端点 URL
    pub endpoint: Option<String>,
    /// 上报用的 Bearer 凭证
    pub token: Option<String>,
}

/// Fedchat SDK 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FedchatConfig {
    /// Homeserver 基础 URL，例如 https://chat.example.com
    pub homeserver_url: String,
    /// 当前账号的用户 ID
    pub user_id: String,
    /// 访问凭证
    pub access_token: String,
    /// User-Agent
    pub user_agent: String,
    /// /sync 的 set_presence 参数（None 表示不传）
    pub set_presence: Option<String>,
    /// 应用服务身份断言的 user_id 查询参数（None 表示不传）
    pub as_user_id: Option<String>,
    /// HTTP 客户端配置
    pub http: HttpClientConfig,
    /// Checkpoint 上报配置
    pub checkpoint: CheckpointConfig,
}

impl Default for FedchatConfig {
    fn default() -> Self {
        Self {
            homeserver_url: "http://localhost:8008".to_string(),
            user_id: String::new(),
            access_token: String::new(),
            user_agent: default_user_agent(),
            set_presence: None,
            as_user_id: None,
            http: HttpClientConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl FedchatConfig {
    pub fn builder() -> FedchatConfigBuilder {
        FedchatConfigBuilder::default()
    }
}

/// FedchatConfig 构建器
#[derive(Debug, Default)]
pub struct FedchatConfigBuilder {
    config: FedchatConfig,
}

impl FedchatConfigBuilder {
    pub fn homeserver_url(mut self, url: impl Into<String>) -> Self {
        self.config.homeserver_url = url.into();
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.user_id = user_id.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = token.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn set_presence(mut self, presence: impl Into<String>) -> Self {
        self.config.set_presence = Some(presence.into());
        self
    }

    pub fn as_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.as_user_id = Some(user_id.into());
        self
    }

    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.config.http = http;
        self
    }

    pub fn checkpoint_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.checkpoint.endpoint = Some(endpoint.into());
        self
    }

    pub fn checkpoint_token(mut self, token: impl Into<String>) -> Self {
        self.config.checkpoint.token = Some(token.into());
        self
    }

    pub fn build(self) -> FedchatConfig {
        self.config
    }
}
