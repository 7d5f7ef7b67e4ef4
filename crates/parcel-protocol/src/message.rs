use parcel_types::{ObjectHeader, Parcel, RootHash};
use serde::{Deserialize, Serialize};

/// Body of `POST /data`: a publisher hands a signed version to the tracker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishDataRequest {
    pub root_hash: RootHash,
    pub parcel: Parcel,
}

/// Tracker answer to a batched header lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectHeadersResponse {
    pub object_headers: Vec<ObjectHeader>,
}

/// What a node POSTs to each registered application after accepting a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyAppRequest {
    pub root_hash: RootHash,
    pub parcel: Parcel,
}

/// Body of `POST /api/v1/registerApp`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAppRequest {
    pub address: String,
    pub name: String,
}

/// Body of `GET /api/v1/apps`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppListResponse {
    pub addresses: Vec<String>,
}

/// Error body shared by every node endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
