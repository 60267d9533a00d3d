//! CLI command handlers. Each command is in its own file.

mod article;
mod config;
mod list;
mod output;

pub use article::run_article;
pub use config::run_config;
pub use list::run_list;
