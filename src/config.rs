//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，并允许环境变量覆盖

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::models::Source;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
    /// 上游请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 上游连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 默认数据源：TCBS / VCI
    #[serde(default = "default_source")]
    pub source: String,
    /// TCBS 接口根地址
    #[serde(default = "default_tcbs_base_url")]
    pub tcbs_base_url: String,
    /// VCI 接口根地址
    #[serde(default = "default_vci_base_url")]
    pub vci_base_url: String,
    /// 请求头 User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 是否启用缓存（关闭时既不读写内存缓存也不落盘）
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 缓存文件路径
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// API 配置
    #[serde(default)]
    pub api: ApiConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
    /// 数据源配置
    #[serde(default)]
    pub provider: ProviderConfig,
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_source() -> String { "TCBS".to_string() }
fn default_tcbs_base_url() -> String { "https://apipubaws.tcbs.com.vn".to_string() }
fn default_vci_base_url() -> String { "https://trading.vietcap.com.vn".to_string() }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_true() -> bool { true }
fn default_cache_path() -> PathBuf { PathBuf::from(".cache/financial_data_cache.json") }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            tcbs_base_url: default_tcbs_base_url(),
            vci_base_url: default_vci_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值，最后应用环境变量
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];
        let mut config = None;

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(loaded) => {
                        log::info!("从 {} 加载配置成功", path);
                        config = Some(loaded);
                        break;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            log::info!("使用默认配置");
            Self::default()
        });
        config.apply_env();
        config
    }

    /// 用环境变量覆盖配置
    ///
    /// - API_KEY: 认证密钥
    /// - VNSTOCK_SOURCE: 默认数据源
    /// - FINANCIAL_CACHE_PATH: 缓存文件路径
    /// - USE_CACHE: 是否启用缓存
    /// - LOG_LEVEL: 日志级别
    pub fn apply_env(&mut self) {
        if let Ok(key) = env::var("API_KEY") {
            self.api.api_key = key;
        }
        if let Ok(source) = env::var("VNSTOCK_SOURCE") {
            self.provider.source = source;
        }
        if let Ok(path) = env::var("FINANCIAL_CACHE_PATH") {
            if !path.trim().is_empty() {
                self.cache.path = PathBuf::from(path);
            }
        }
        self.cache.enabled = env_bool("USE_CACHE", self.cache.enabled);
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.log.level = level;
        }
    }

    /// 校验配置：数据源名称和接口地址
    pub fn validate(&self) -> anyhow::Result<()> {
        self.default_source()?;
        for (name, raw) in [
            ("tcbs_base_url", &self.provider.tcbs_base_url),
            ("vci_base_url", &self.provider.vci_base_url),
        ] {
            let url = Url::parse(raw).with_context(|| format!("{} 不是有效的 URL: {}", name, raw))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(anyhow!("{} 必须使用 http(s) 协议: {}", name, raw));
            }
        }
        Ok(())
    }

    /// 解析默认数据源
    pub fn default_source(&self) -> anyhow::Result<Source> {
        self.provider.source.parse()
    }

    /// 缓存文件路径（未启用缓存时为 None）
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache.enabled.then(|| self.cache.path.clone())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 读取布尔型环境变量，true/1/t/y/yes（不区分大小写）为真
pub fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => parse_bool(&value),
        Err(_) => default,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "t" | "y" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.default_source().unwrap(), Source::Tcbs);
        assert!(config.api.api_key.is_empty());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.cache_path(),
            Some(PathBuf::from(".cache/financial_data_cache.json"))
        );
    }

    #[test]
    fn test_from_file_partial() {
        println!("\n========== 测试加载部分配置 ==========");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 9090}}, "provider": {{"source": "VCI"}}, "cache": {{"enabled": false}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.default_source().unwrap(), Source::Vci);
        assert_eq!(config.provider.tcbs_base_url, "https://apipubaws.tcbs.com.vn");
        assert!(config.cache_path().is_none());
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.provider.source = "SSI".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.provider.vci_base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.provider.tcbs_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        for v in ["true", "TRUE", "1", "t", "Y", "yes"] {
            assert!(parse_bool(v), "{} 应该为真", v);
        }
        for v in ["false", "0", "no", ""] {
            assert!(!parse_bool(v), "{} 应该为假", v);
        }
    }
}
