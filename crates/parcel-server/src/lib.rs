//! Runtime of a parcel subscriber node.
//!
//! Two listeners share one store and one sync engine: the public notify
//! listener receives announcements from the tracker, the local admin
//! listener lets applications register for delivery.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{app_root, NodeConfig, APP_DIR, CONFIG_FILE};
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::NodeState;
pub use router::{admin_router, notify_router};
pub use server::{ctrl_c, NodeServer};
