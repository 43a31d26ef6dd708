pub mod url_validator;

pub use url_validator::{validate_destination, UrlValidationError};

/// Quick syntactic gate for the redirect path: anything that cannot be a
/// generated code is rejected before touching cache or store.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 32 && code.chars().all(|c| c.is_ascii_alphanumeric())
}
