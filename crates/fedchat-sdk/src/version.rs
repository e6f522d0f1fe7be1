//! SDK 版本信息
//!
//! Cargo.toml 是唯一权威源，禁止手写版本号。

/// SDK semver，来自 Cargo.toml
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 默认 User-Agent
pub fn default_user_agent() -> String {
    format!("fedchat-sdk v{}", SDK_VERSION)
}
