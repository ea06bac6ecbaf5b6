pub mod config;
pub mod error;
pub mod shutdown;
pub mod types;
pub mod url_util;

pub use config::AppConfig;
pub use error::NyxError;
pub use shutdown::Shutdown;
pub use types::*;
