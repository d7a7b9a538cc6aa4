//! 目标 URL 校验
//!
//! 只接受带主机名的绝对 http/https URL

use std::fmt;

use url::Url;

use crate::errors::LinkPulseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    Empty,
    Unparseable(String),
    UnsupportedScheme(String),
    MissingHost,
}

impl fmt::Display for DestinationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "URL cannot be empty"),
            Self::Unparseable(msg) => write!(f, "Invalid URL format: {}", msg),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "Unsupported scheme '{}'. Only http and https are allowed",
                scheme
            ),
            Self::MissingHost => write!(f, "URL must include a host"),
        }
    }
}

impl std::error::Error for DestinationError {}

impl From<DestinationError> for LinkPulseError {
    fn from(e: DestinationError) -> Self {
        LinkPulseError::validation(e.to_string())
    }
}

/// 校验并规范化目标 URL（去除首尾空白）
pub fn validate_destination(raw: &str) -> Result<String, DestinationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DestinationError::Empty);
    }

    // 相对路径在这里解析失败
    let parsed = Url::parse(trimmed).map_err(|e| DestinationError::Unparseable(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(DestinationError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(DestinationError::MissingHost);
    }

    Ok(trimmed.to_string())
}
