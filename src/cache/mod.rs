pub mod moka;
pub mod null;
pub mod traits;

pub use moka::MokaCache;
pub use null::NullCache;
pub use traits::{CacheResult, ResolutionCache};
