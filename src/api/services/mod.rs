pub mod admin;
pub mod health;
pub mod links;
pub mod redirect;

pub use admin::AdminService;
pub use health::{AppStartTime, HealthService};
pub use links::LinksService;
pub use redirect::{RedirectService, RedirectSettings};
