/// Routes served by the tracker and consumed by [`TrackerClient`](crate::TrackerClient).
pub mod tracker {
    pub const OBJECT_HEADERS: &str = "/data/object/header";
    pub const OBJECT: &str = "/data/object";
    pub const SUBSCRIBE: &str = "/subscribe";
    pub const NEXT_SEQUENCE: &str = "/next-sequence";
    pub const PUBLISH: &str = "/data";
}

/// Routes served by a node.
pub mod node {
    pub const NOTIFY: &str = "/notify";
    pub const REGISTER_APP: &str = "/api/v1/registerApp";
    pub const APPS: &str = "/api/v1/apps";
    pub const HEALTH: &str = "/health";
}

/// Header carrying the subscriber's notification address.
pub const ADDRESS_HEADER: &str = "Address";

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
