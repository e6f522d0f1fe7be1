use std::fmt;

#[derive(Debug)]
pub enum FedchatSDKError {
    /// 网络/传输层失败，没有拿到结构化的服务端响应
    Transport(String),
    /// 结构化协议错误：非 2xx 且响应体可解析出 errcode
    Api {
        code: u16,
        errcode: String,
        message: String,
    },
    /// 非结构化协议错误：非 2xx 且响应体无法解析，原文保留在 body 里
    /// （例如反向代理返回的 HTML 错误页，丢掉原文会没法排查）
    Http {
        code: u16,
        body: String,
    },
    Serialization(String),
    KvStore(String),
    IO(String),
    Config(String),
    /// filter 创建失败：对当前 sync 循环是致命错误
    Filter(String),
    /// processor 处理响应失败：对当前 sync 循环是致命错误
    Sync(String),
    Other(String),
}

impl fmt::Display for FedchatSDKError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FedchatSDKError::Transport(e) => write!(f, "Transport error: {}", e),
            FedchatSDKError::Api { code, errcode, message } => {
                write!(f, "API error [{}] {}: {}", code, errcode, message)
            }
            FedchatSDKError::Http { code, body } => {
                write!(f, "HTTP error [{}]: {}", code, body)
            }
            FedchatSDKError::Serialization(e) => write!(f, "Serialization error: {}", e),
            FedchatSDKError::KvStore(e) => write!(f, "KV store error: {}", e),
            FedchatSDKError::IO(e) => write!(f, "IO error: {}", e),
            FedchatSDKError::Config(e) => write!(f, "Config error: {}", e),
            FedchatSDKError::Filter(e) => write!(f, "Filter error: {}", e),
            FedchatSDKError::Sync(e) => write!(f, "Sync error: {}", e),
            FedchatSDKError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl std::error::Error for FedchatSDKError {}

impl From<serde_json::Error> for FedchatSDKError {
    fn from(error: serde_json::Error) -> Self {
        FedchatSDKError::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for FedchatSDKError {
    fn from(error: std::io::Error) -> Self {
        FedchatSDKError::IO(error.to_string())
    }
}

impl From<reqwest::Error> for FedchatSDKError {
    fn from(error: reqwest::Error) -> Self {
        FedchatSDKError::Transport(error.to_string())
    }
}

impl FedchatSDKError {
    /// 获取结构化协议错误的 errcode（如果有）
    pub fn errcode(&self) -> Option<&str> {
        match self {
            FedchatSDKError::Api { errcode, .. } => Some(errcode),
            _ => None,
        }
    }

    /// 获取 HTTP 状态码（结构化与非结构化协议错误都有）
    pub fn http_code(&self) -> Option<u16> {
        match self {
            FedchatSDKError::Api { code, .. } => Some(*code),
            FedchatSDKError::Http { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FedchatSDKError>;
