use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 受限流保护的创建链接端点
pub const CREATE_LINK_ENDPOINT: &str = "/api/v1/links";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - database: 持久化存储连接
/// - cache: 缓存存储连接与各 key 族的 TTL
/// - rate_limit: 每端点的固定窗口限流规则
/// - click_recorder: 后台点击记录队列
/// - links: 短码生成与请求超时
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub click_recorder: ClickRecorderConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：LP，分隔符：__
    /// 示例：LP__CACHE__REDIS_URL=redis://cache:6379/
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 LP，分隔符 __
            .add_source(
                Environment::with_prefix("LP")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
}

/// 缓存存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `redis` 或 `memory`
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// `link:<code>:destination` 的 TTL（秒）
    #[serde(default = "default_destination_ttl")]
    pub destination_ttl: u64,
    /// `analytics:*:7d` 的 TTL（秒）
    #[serde(default = "default_stats_ttl")]
    pub stats_ttl: u64,
    /// `user:<id>:profile` 的 TTL（秒）
    #[serde(default = "default_profile_ttl")]
    pub profile_ttl: u64,
}

impl CacheConfig {
    pub fn destination_ttl(&self) -> Duration {
        Duration::from_secs(self.destination_ttl)
    }

    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_ttl)
    }

    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl)
    }
}

/// 单条固定窗口规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl RateLimitRule {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            max_requests,
            window_secs: window.as_secs().max(1),
        }
    }

    /// 配置文件中的 0 同样按 1 秒处理
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 未单独配置的端点使用此规则
    #[serde(default = "default_rate_limit_rule")]
    pub default: RateLimitRule,
    /// 端点 -> 规则
    #[serde(default = "default_rate_limit_endpoints")]
    pub endpoints: HashMap<String, RateLimitRule>,
}

impl RateLimitConfig {
    pub fn rule_for(&self, endpoint: &str) -> RateLimitRule {
        self.endpoints
            .get(endpoint)
            .copied()
            .unwrap_or(self.default)
    }
}

/// 后台点击记录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickRecorderConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// 每个点击任务自己的超时（毫秒），与入站请求无关
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
}

impl ClickRecorderConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

/// 短码相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,
    /// 入站请求默认截止时间（毫秒）
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl LinksConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_database_url() -> String {
    "sqlite://linkpulse.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_cache_backend() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_destination_ttl() -> u64 {
    24 * 60 * 60
}

fn default_stats_ttl() -> u64 {
    60 * 60
}

fn default_profile_ttl() -> u64 {
    60 * 60
}

fn default_rate_limit_rule() -> RateLimitRule {
    RateLimitRule {
        max_requests: 5,
        window_secs: 5 * 60,
    }
}

fn default_rate_limit_endpoints() -> HashMap<String, RateLimitRule> {
    let mut endpoints = HashMap::new();
    endpoints.insert(CREATE_LINK_ENDPOINT.to_string(), default_rate_limit_rule());
    endpoints
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_in_flight() -> usize {
    16
}

fn default_task_timeout_ms() -> u64 {
    5000
}

fn default_code_length() -> usize {
    6
}

fn default_max_code_length() -> usize {
    32
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            destination_ttl: default_destination_ttl(),
            stats_ttl: default_stats_ttl(),
            profile_ttl: default_profile_ttl(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default: default_rate_limit_rule(),
            endpoints: default_rate_limit_endpoints(),
        }
    }
}

impl Default for ClickRecorderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_in_flight: default_max_in_flight(),
            task_timeout_ms: default_task_timeout_ms(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            max_code_length: default_max_code_length(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
