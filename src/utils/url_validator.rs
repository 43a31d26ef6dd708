//! 目标 URL 验证
//!
//! 阻止危险协议，并拒绝指向本服务自身的目标（避免重定向回环）

use url::Url;

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
    SelfReferential(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => {
                write!(f, "Dangerous protocol blocked: {}", proto)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
            Self::SelfReferential(host) => {
                write!(f, "Destination points back at this service: {}", host)
            }
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// 验证目标 URL
///
/// 检查项目：
/// 1. URL 不为空
/// 2. 不是危险协议（javascript:, data:, file: 等）
/// 3. 必须是 http:// 或 https:// 的绝对 URL
/// 4. 不指向本服务自身的主机
pub fn validate_destination(
    destination: &str,
    own_base: &Url,
) -> Result<(), UrlValidationError> {
    let destination = destination.trim();

    if destination.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let lower = destination.to_lowercase();

    for proto in DANGEROUS_PROTOCOLS {
        if lower.starts_with(proto) {
            return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
        }
    }

    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        let proto = lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    let parsed =
        Url::parse(destination).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    // 主机一致即判定回环，不看端口：同机不同端口的链式跳转同样不想要
    if let (Some(dest_host), Some(own_host)) = (parsed.host_str(), own_base.host_str()) {
        if dest_host.eq_ignore_ascii_case(own_host) {
            return Err(UrlValidationError::SelfReferential(dest_host.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://sl.example.net").unwrap()
    }

    #[test]
    fn test_valid_destinations() {
        assert!(validate_destination("http://example.com", &base()).is_ok());
        assert!(validate_destination("https://example.com/path?query=1", &base()).is_ok());
        assert!(validate_destination("http://localhost:8080", &base()).is_ok());
    }

    #[test]
    fn test_dangerous_protocols() {
        assert!(matches!(
            validate_destination("javascript:alert(1)", &base()),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_destination("data:text/html,<script>alert(1)</script>", &base()),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_destination("file:///etc/passwd", &base()),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
    }

    #[test]
    fn test_invalid_protocols() {
        assert!(matches!(
            validate_destination("ftp://example.com", &base()),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            validate_destination("mailto:test@example.com", &base()),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            validate_destination("example.com/no-scheme", &base()),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_empty_url() {
        assert_eq!(
            validate_destination("", &base()),
            Err(UrlValidationError::EmptyUrl)
        );
        assert_eq!(
            validate_destination("   ", &base()),
            Err(UrlValidationError::EmptyUrl)
        );
    }

    #[test]
    fn test_self_referential_rejected() {
        assert!(matches!(
            validate_destination("https://sl.example.net/abc", &base()),
            Err(UrlValidationError::SelfReferential(_))
        ));
        // 大小写不敏感
        assert!(matches!(
            validate_destination("https://SL.EXAMPLE.NET/abc", &base()),
            Err(UrlValidationError::SelfReferential(_))
        ));
        // 端口不同也拒绝
        assert!(matches!(
            validate_destination("https://sl.example.net:9443/abc", &base()),
            Err(UrlValidationError::SelfReferential(_))
        ));
    }

    #[test]
    fn test_case_insensitive_schemes() {
        assert!(matches!(
            validate_destination("JAVASCRIPT:alert(1)", &base()),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(validate_destination("HTTPS://example.com", &base()).is_ok());
    }
}
