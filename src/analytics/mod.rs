//! Click analytics: event model, the non-blocking recorder sitting behind
//! the redirect path, durable sinks and the periodic export loop.

pub mod export;
pub mod recorder;
pub mod sink;

pub use export::ClickExporter;
pub use recorder::ClickRecorder;
pub use sink::ClickSink;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use woothee::parser::Parser;

// 解析器构建有开销，重定向热路径上共享一份
static UA_PARSER: Lazy<Parser> = Lazy::new(Parser::new);

/// 粗粒度 UA 分类，不保留原始 User-Agent
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UserAgentClass {
    Browser,
    Mobile,
    Bot,
    #[default]
    Other,
}

impl UserAgentClass {
    /// Classify a raw User-Agent header into a coarse bucket.
    pub fn classify(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent.filter(|ua| !ua.is_empty()) else {
            return UserAgentClass::Other;
        };

        match UA_PARSER.parse(ua) {
            Some(result) => match result.category {
                "crawler" => UserAgentClass::Bot,
                "smartphone" | "mobilephone" => UserAgentClass::Mobile,
                "pc" => UserAgentClass::Browser,
                _ => UserAgentClass::Other,
            },
            None => UserAgentClass::Other,
        }
    }
}

/// One successful resolution. Write-once; aggregated and discarded by the
/// export/retention loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub code: String,
    pub timestamp: DateTime<Utc>,
    pub referrer: Option<String>,
    pub user_agent_class: UserAgentClass,
}

impl ClickEvent {
    pub fn new(code: String, referrer: Option<String>, user_agent: Option<&str>) -> Self {
        Self {
            code,
            timestamp: Utc::now(),
            referrer,
            user_agent_class: UserAgentClass::classify(user_agent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_agents() {
        let chrome = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                      (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        assert_eq!(UserAgentClass::classify(Some(chrome)), UserAgentClass::Browser);

        let googlebot = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
        assert_eq!(UserAgentClass::classify(Some(googlebot)), UserAgentClass::Bot);

        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                      AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
        assert_eq!(UserAgentClass::classify(Some(iphone)), UserAgentClass::Mobile);
    }

    #[test]
    fn test_classify_missing_or_garbage() {
        assert_eq!(UserAgentClass::classify(None), UserAgentClass::Other);
        assert_eq!(UserAgentClass::classify(Some("")), UserAgentClass::Other);
    }

    #[test]
    fn test_class_round_trips_through_string() {
        for class in [
            UserAgentClass::Browser,
            UserAgentClass::Mobile,
            UserAgentClass::Bot,
            UserAgentClass::Other,
        ] {
            let s = class.as_ref().to_string();
            assert_eq!(s.parse::<UserAgentClass>().unwrap(), class);
        }
    }
}
