//! HTTP 客户端 - homeserver 请求封装
//!
//! 职责：
//! - URL 构建（路径转义 + 应用服务 user_id 身份断言参数）
//! - 带鉴权的 JSON 请求，非 2xx 响应分类为结构化/非结构化协议错误
//! - filter 创建与 /sync 长轮询（供同步引擎使用）
//!
//! 错误分类原则：响应体能解析出 errcode 就保留结构化错误；
//! 解析不了就把响应体原文塞进错误里（反向代理的 HTML 错误页
//! 只有靠原文才能排查）。

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::FedchatConfig;
use crate::error::{FedchatSDKError, Result};
use crate::sync::processor::SyncTransport;
use crate::sync::response::SyncResponse;

/// 客户端 API 路径前缀
const API_PREFIX: [&str; 3] = ["_fedchat", "client", "v1"];

/// 非 2xx 响应的结构化错误体
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errcode: String,
    #[serde(default, rename = "error")]
    message: String,
}

/// filter 创建响应
#[derive(Debug, Deserialize)]
struct CreateFilterResponse {
    filter_id: String,
}

/// Fedchat HTTP 客户端
pub struct FedchatClient {
    homeserver_url: Url,
    user_id: String,
    access_token: String,
    user_agent: String,
    /// 应用服务身份断言：设置后每个请求都带 user_id 查询参数
    as_user_id: Option<String>,
    http: reqwest::Client,
}

impl FedchatClient {
    /// 根据配置创建客户端
    pub fn new(config: &FedchatConfig) -> Result<Self> {
        let homeserver_url = Url::parse(&config.homeserver_url)
            .map_err(|e| FedchatSDKError::Config(format!("homeserver URL 无效: {}", e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(timeout));
        }
        if let Some(timeout) = config.http.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let http = builder
            .build()
            .map_err(|e| FedchatSDKError::Other(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            homeserver_url,
            user_id: config.user_id.clone(),
            access_token: config.access_token.clone(),
            user_agent: config.user_agent.clone(),
            as_user_id: config.as_user_id.clone(),
            http,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// 设置账号凭证
    pub fn set_credentials(&mut self, user_id: impl Into<String>, access_token: impl Into<String>) {
        self.user_id = user_id.into();
        self.access_token = access_token.into();
    }

    /// 清除账号凭证
    pub fn clear_credentials(&mut self) {
        self.user_id.clear();
        self.access_token.clear();
    }

    /// 构建 API URL（自动转义路径段）
    pub fn build_url(&self, segments: &[&str]) -> Result<Url> {
        self.build_url_with_query(segments, &[])
    }

    /// 构建带查询参数的 API URL
    pub fn build_url_with_query(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.homeserver_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| FedchatSDKError::Config("homeserver URL 不支持路径".to_string()))?;
            for segment in API_PREFIX.iter().copied().chain(segments.iter().copied()) {
                path.push(segment);
            }
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(as_user_id) = &self.as_user_id {
                pairs.append_pair("user_id", as_user_id);
            }
        }
        // 没有任何参数时去掉空的 "?"
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    /// 发起一次 JSON 请求，返回原始响应体
    ///
    /// 非 2xx 响应会被分类为 Api（结构化）或 Http（原文保留）错误，
    /// 绝不静默吞掉。
    pub async fn request<B: serde::Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Vec<u8>> {
        debug!(method = %method, url = %url, "发起请求");
        let mut builder = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(USER_AGENT, self.user_agent.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FedchatSDKError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FedchatSDKError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(classify_error_response(status, &bytes));
        }
        Ok(bytes.to_vec())
    }

    /// 发起请求并把响应体反序列化为指定类型
    pub async fn request_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let bytes = self.request(method, url, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FedchatSDKError::Serialization(format!("解析响应失败: {}", e)))
    }

    /// 在服务端创建 filter，返回 filter_id
    pub async fn create_filter_request(&self, definition: &Value) -> Result<String> {
        let url = self.build_url(&["user", &self.user_id, "filter"])?;
        let response: CreateFilterResponse =
            self.request_json(Method::POST, url, Some(definition)).await?;
        Ok(response.filter_id)
    }

    /// 发起一次 /sync 长轮询
    pub async fn sync_request(
        &self,
        timeout_ms: u64,
        since: &str,
        filter_id: &str,
        full_state: bool,
        set_presence: Option<&str>,
    ) -> Result<SyncResponse> {
        let timeout = timeout_ms.to_string();
        let query = sync_query(&timeout, since, filter_id, full_state, set_presence);
        let query: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = self.build_url_with_query(&["sync"], &query)?;
        self.request_json::<Value, SyncResponse>(Method::GET, url, None)
            .await
    }
}

/// 组装 /sync 查询参数（空参数不传）
fn sync_query<'a>(
    timeout: &'a str,
    since: &'a str,
    filter_id: &'a str,
    full_state: bool,
    set_presence: Option<&'a str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![("timeout", timeout.to_string())];
    if !since.is_empty() {
        query.push(("since", since.to_string()));
    }
    if !filter_id.is_empty() {
        query.push(("filter", filter_id.to_string()));
    }
    if let Some(presence) = set_presence {
        if !presence.is_empty() {
            query.push(("set_presence", presence.to_string()));
        }
    }
    if full_state {
        query.push(("full_state", "true".to_string()));
    }
    query
}

/// 把非 2xx 响应分类为结构化/非结构化协议错误
fn classify_error_response(code: u16, body: &[u8]) -> FedchatSDKError {
    if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
        if !parsed.errcode.is_empty() {
            return FedchatSDKError::Api {
                code,
                errcode: parsed.errcode,
                message: parsed.message,
            };
        }
    }
    // 解析不出结构化错误：响应体原文保留，便于排查中间层故障
    FedchatSDKError::Http {
        code,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

#[async_trait]
impl SyncTransport for FedchatClient {
    async fn sync(
        &self,
        timeout_ms: u64,
        since: &str,
        filter_id: &str,
        full_state: bool,
        set_presence: Option<&str>,
    ) -> Result<SyncResponse> {
        self.sync_request(timeout_ms, since, filter_id, full_state, set_presence)
            .await
    }

    async fn create_filter(&self, definition: &Value) -> Result<String> {
        self.create_filter_request(definition).await
    }
}
