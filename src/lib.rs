pub mod date_util;
pub mod error;
pub mod import;
pub mod model;
pub mod server;
pub mod session;
pub mod stats;
pub mod storage;

pub use error::{Error, Result};
pub use import::{ImportDocument, ImportReport};
pub use model::Role;
pub use server::{build_router, serve, AppState, ServerConfig};
pub use session::Session;
pub use stats::{compute_manager_stats, ManagerStats};
pub use storage::Database;
