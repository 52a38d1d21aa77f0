pub mod authority;
pub mod config;
pub mod db;
pub mod directory;
pub mod member;
pub mod project;
pub mod search;

pub use authority::SessionAuthority;
pub use config::AppConfig;
pub use db::Database;
