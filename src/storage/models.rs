use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative short-link record.
///
/// `code` and `destination` are immutable once the record exists; the only
/// mutations the store accepts are the administrative `disabled` flag and
/// `expires_at`. Codes are never recycled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub code: String,
    pub destination: String,
    /// Opaque reference to an external user entity, never dereferenced here.
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
}

impl Link {
    pub fn new(
        code: String,
        destination: String,
        owner_id: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code,
            destination,
            owner_id,
            created_at: Utc::now(),
            expires_at,
            disabled: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// 是否可以对外解析：未禁用且未过期
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && !self.is_expired(now)
    }

    /// Positive-cache TTL in seconds, capped by the remaining lifetime.
    ///
    /// `None` means the link must not be cached as a positive entry
    /// (disabled or already expired).
    pub fn cache_ttl(&self, default_ttl_secs: u64) -> Option<u64> {
        if self.disabled {
            return None;
        }
        match self.expires_at {
            None => Some(default_ttl_secs),
            Some(expires_at) => {
                let remaining = (expires_at - Utc::now()).num_seconds();
                if remaining <= 0 {
                    None
                } else {
                    Some((remaining as u64).min(default_ttl_secs).max(1))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link() -> Link {
        Link::new(
            "abc1234".to_string(),
            "https://example.com/a".to_string(),
            "7".to_string(),
            None,
        )
    }

    #[test]
    fn test_fresh_link_is_resolvable() {
        assert!(link().is_resolvable(Utc::now()));
    }

    #[test]
    fn test_disabled_link_is_not_resolvable() {
        let mut l = link();
        l.disabled = true;
        assert!(!l.is_resolvable(Utc::now()));
        assert_eq!(l.cache_ttl(300), None);
    }

    #[test]
    fn test_expired_link_is_not_resolvable() {
        let mut l = link();
        l.expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(!l.is_resolvable(Utc::now()));
        assert_eq!(l.cache_ttl(300), None);
    }

    #[test]
    fn test_cache_ttl_capped_by_remaining_lifetime() {
        let mut l = link();
        l.expires_at = Some(Utc::now() + Duration::seconds(30));
        let ttl = l.cache_ttl(300).unwrap();
        assert!(ttl <= 30, "ttl {} should be capped at 30s", ttl);

        l.expires_at = Some(Utc::now() + Duration::hours(1));
        assert_eq!(l.cache_ttl(300), Some(300));
    }
}
