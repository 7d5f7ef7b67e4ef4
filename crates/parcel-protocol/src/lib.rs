//! Wire protocol for parcel distribution.
//!
//! Defines the HTTP routes of the tracker and of a node, the JSON messages
//! exchanged on them, and the client a node uses to talk to its tracker.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod message;

pub use client::TrackerClient;
pub use endpoint::{node, tracker, HealthResponse, ADDRESS_HEADER};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    AppListResponse, ErrorResponse, GetObjectHeadersResponse, NotifyAppRequest,
    PublishDataRequest, RegisterAppRequest,
};
