use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnaplinkError {
    /// 短码不存在（或已禁用/过期，对外不区分）
    NotFound(String),
    /// 短码已被占用，仅由生成器的重试循环消费
    AlreadyExists(String),
    /// 生成器在最大码长下耗尽重试次数
    CapacityExhausted(String),
    /// 目标 URL 非法或指向本服务自身
    InvalidDestination(String),
    /// 持久化后端不可达
    StoreUnavailable(String),
    DatabaseOperation(String),
    Validation(String),
    Configuration(String),
    Serialization(String),
}

impl SnaplinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SnaplinkError::NotFound(_) => "E001",
            SnaplinkError::AlreadyExists(_) => "E002",
            SnaplinkError::CapacityExhausted(_) => "E003",
            SnaplinkError::InvalidDestination(_) => "E004",
            SnaplinkError::StoreUnavailable(_) => "E005",
            SnaplinkError::DatabaseOperation(_) => "E006",
            SnaplinkError::Validation(_) => "E007",
            SnaplinkError::Configuration(_) => "E008",
            SnaplinkError::Serialization(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SnaplinkError::NotFound(_) => "Link Not Found",
            SnaplinkError::AlreadyExists(_) => "Code Already Exists",
            SnaplinkError::CapacityExhausted(_) => "Code Space Exhausted",
            SnaplinkError::InvalidDestination(_) => "Invalid Destination",
            SnaplinkError::StoreUnavailable(_) => "Store Unavailable",
            SnaplinkError::DatabaseOperation(_) => "Database Operation Error",
            SnaplinkError::Validation(_) => "Validation Error",
            SnaplinkError::Configuration(_) => "Configuration Error",
            SnaplinkError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SnaplinkError::NotFound(msg)
            | SnaplinkError::AlreadyExists(msg)
            | SnaplinkError::CapacityExhausted(msg)
            | SnaplinkError::InvalidDestination(msg)
            | SnaplinkError::StoreUnavailable(msg)
            | SnaplinkError::DatabaseOperation(msg)
            | SnaplinkError::Validation(msg)
            | SnaplinkError::Configuration(msg)
            | SnaplinkError::Serialization(msg) => msg,
        }
    }

    /// 调用方收到该错误后是否值得稍后重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SnaplinkError::CapacityExhausted(_) | SnaplinkError::StoreUnavailable(_)
        )
    }
}

impl fmt::Display for SnaplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for SnaplinkError {}

// 便捷的构造函数
impl SnaplinkError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::NotFound(msg.into())
    }

    pub fn already_exists<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::AlreadyExists(msg.into())
    }

    pub fn capacity_exhausted<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::CapacityExhausted(msg.into())
    }

    pub fn invalid_destination<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::InvalidDestination(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::StoreUnavailable(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::Validation(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::Configuration(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::Serialization(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for SnaplinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                SnaplinkError::StoreUnavailable(err.to_string())
            }
            _ => SnaplinkError::DatabaseOperation(err.to_string()),
        }
    }
}

impl From<std::io::Error> for SnaplinkError {
    fn from(err: std::io::Error) -> Self {
        SnaplinkError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SnaplinkError {
    fn from(err: serde_json::Error) -> Self {
        SnaplinkError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnaplinkError>;
