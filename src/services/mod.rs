pub mod link_service;
pub mod resolver;

pub use link_service::{CreatedLink, LinkService};
pub use resolver::{CachedResolver, DirectResolver, Resolution, Resolver};
