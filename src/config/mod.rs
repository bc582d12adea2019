//! Configuration module

mod site;

pub use site::ApiConfig;
pub use site::ContentConfig;
pub use site::PaginationConfig;
pub use site::PaginationMode;
pub use site::SiteConfig;
pub use site::ACCESS_TOKEN_ENV;
