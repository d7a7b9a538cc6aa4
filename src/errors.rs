use std::fmt;

/// 核心错误类型
///
/// `NotFound` / `Inactive` / `RateLimited` / `Forbidden` / `Validation` / `Conflict`
/// 是面向调用方的确定性结果；其余变体代表存储或缓存故障。
/// `BestEffortFailure` 只在后台路径上构造并记录日志，从不返回给客户端。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkPulseError {
    NotFound(String),
    Inactive(String),
    RateLimited(String),
    Forbidden(String),
    Validation(String),
    Conflict(String),
    Internal(String),
    BestEffortFailure(String),
    CacheOperation(String),
    DatabaseOperation(String),
    Serialization(String),
    Config(String),
}

impl LinkPulseError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkPulseError::NotFound(_) => "E001",
            LinkPulseError::Inactive(_) => "E002",
            LinkPulseError::RateLimited(_) => "E003",
            LinkPulseError::Forbidden(_) => "E004",
            LinkPulseError::Validation(_) => "E005",
            LinkPulseError::Conflict(_) => "E006",
            LinkPulseError::Internal(_) => "E007",
            LinkPulseError::BestEffortFailure(_) => "E008",
            LinkPulseError::CacheOperation(_) => "E009",
            LinkPulseError::DatabaseOperation(_) => "E010",
            LinkPulseError::Serialization(_) => "E011",
            LinkPulseError::Config(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkPulseError::NotFound(_) => "Resource Not Found",
            LinkPulseError::Inactive(_) => "Link Inactive",
            LinkPulseError::RateLimited(_) => "Rate Limit Exceeded",
            LinkPulseError::Forbidden(_) => "Permission Denied",
            LinkPulseError::Validation(_) => "Validation Error",
            LinkPulseError::Conflict(_) => "Conflict",
            LinkPulseError::Internal(_) => "Internal Error",
            LinkPulseError::BestEffortFailure(_) => "Best-Effort Failure",
            LinkPulseError::CacheOperation(_) => "Cache Operation Error",
            LinkPulseError::DatabaseOperation(_) => "Database Operation Error",
            LinkPulseError::Serialization(_) => "Serialization Error",
            LinkPulseError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkPulseError::NotFound(msg)
            | LinkPulseError::Inactive(msg)
            | LinkPulseError::RateLimited(msg)
            | LinkPulseError::Forbidden(msg)
            | LinkPulseError::Validation(msg)
            | LinkPulseError::Conflict(msg)
            | LinkPulseError::Internal(msg)
            | LinkPulseError::BestEffortFailure(msg)
            | LinkPulseError::CacheOperation(msg)
            | LinkPulseError::DatabaseOperation(msg)
            | LinkPulseError::Serialization(msg)
            | LinkPulseError::Config(msg) => msg,
        }
    }

    /// HTTP 等价状态码，供外部 HTTP 层映射响应
    pub fn http_status(&self) -> u16 {
        match self {
            LinkPulseError::NotFound(_) => 404,
            LinkPulseError::Inactive(_) | LinkPulseError::Forbidden(_) => 403,
            LinkPulseError::RateLimited(_) => 429,
            LinkPulseError::Validation(_) => 400,
            LinkPulseError::Conflict(_) => 409,
            _ => 500,
        }
    }

    /// 客户端是否可以自行重试
    pub fn is_retriable(&self) -> bool {
        self.http_status() == 500
    }

    /// 存储/缓存故障统一折叠为 `Internal`，确定性结果原样保留
    pub fn or_internal(self, context: &str) -> Self {
        if self.is_retriable() && !matches!(self, LinkPulseError::Internal(_)) {
            LinkPulseError::Internal(format!("{}: {}", context, self.message()))
        } else {
            self
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkPulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkPulseError {}

// 便捷的构造函数
impl LinkPulseError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::NotFound(msg.into())
    }

    pub fn inactive<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Inactive(msg.into())
    }

    pub fn rate_limited<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::RateLimited(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Forbidden(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Validation(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Conflict(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Internal(msg.into())
    }

    pub fn best_effort<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::BestEffortFailure(msg.into())
    }

    pub fn cache_operation<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::CacheOperation(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::DatabaseOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Serialization(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        LinkPulseError::Config(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LinkPulseError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkPulseError::DatabaseOperation(err.to_string())
    }
}

impl From<redis::RedisError> for LinkPulseError {
    fn from(err: redis::RedisError) -> Self {
        LinkPulseError::CacheOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkPulseError {
    fn from(err: serde_json::Error) -> Self {
        LinkPulseError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for LinkPulseError {
    fn from(err: std::io::Error) -> Self {
        LinkPulseError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkPulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(LinkPulseError::not_found("x").http_status(), 404);
        assert_eq!(LinkPulseError::inactive("x").http_status(), 403);
        assert_eq!(LinkPulseError::rate_limited("x").http_status(), 429);
        assert_eq!(LinkPulseError::internal("x").http_status(), 500);
        assert_eq!(LinkPulseError::cache_operation("x").http_status(), 500);
    }

    #[test]
    fn test_only_server_errors_are_retriable() {
        assert!(LinkPulseError::internal("boom").is_retriable());
        assert!(LinkPulseError::database_operation("boom").is_retriable());
        assert!(!LinkPulseError::not_found("gone").is_retriable());
        assert!(!LinkPulseError::inactive("off").is_retriable());
        assert!(!LinkPulseError::rate_limited("slow down").is_retriable());
    }

    #[test]
    fn test_or_internal_keeps_client_errors() {
        let err = LinkPulseError::database_operation("disk full").or_internal("insert link");
        assert_eq!(err, LinkPulseError::internal("insert link: disk full"));

        let conflict = LinkPulseError::conflict("taken").or_internal("insert link");
        assert_eq!(conflict, LinkPulseError::conflict("taken"));

        let internal = LinkPulseError::internal("deadline").or_internal("resolve");
        assert_eq!(internal, LinkPulseError::internal("deadline"));
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = LinkPulseError::not_found("abc123");
        assert_eq!(err.to_string(), "Resource Not Found: abc123");
        assert_eq!(err.code(), "E001");
    }
}
