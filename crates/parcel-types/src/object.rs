use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::header::ObjectHeader;

/// Immutable file payload.
///
/// `length` always equals `data.len()`; it is carried explicitly because it
/// is part of the wire form and therefore of the object's hash. `data` is
/// base64 on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub length: u64,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Object {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            length: data.len() as u64,
            data,
        }
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// The materialized tree of one publish.
///
/// Headers are in pre-order starting from the root at index 0; objects are in
/// the same pre-order of the files that own them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub object_headers: Vec<ObjectHeader>,
    pub objects: Vec<Object>,
}

impl Parcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root header, if the parcel is non-empty.
    pub fn root(&self) -> Option<&ObjectHeader> {
        self.object_headers.first()
    }

    /// Total bytes across all objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects.iter().map(|o| o.length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;

    #[test]
    fn object_length_tracks_data() {
        let obj = Object::new(b"0123456789".to_vec());
        assert_eq!(obj.len(), 10);
        assert!(!obj.is_empty());
        assert!(Object::new(Vec::new()).is_empty());
    }

    #[test]
    fn object_data_is_base64_on_the_wire() {
        let obj = Object::new(b"hello".to_vec());
        let json = serde_json::to_string(&obj).unwrap();
        assert_eq!(json, r#"{"length":5,"data":"aGVsbG8="}"#);
        let parsed: Object = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, obj);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let json = r#"{"length":1,"data":"!!!"}"#;
        assert!(serde_json::from_str::<Object>(json).is_err());
    }

    #[test]
    fn parcel_root_and_totals() {
        let mut parcel = Parcel::new();
        assert!(parcel.root().is_none());

        let obj = Object::new(b"abc".to_vec());
        parcel
            .object_headers
            .push(ObjectHeader::file("a", ContentHash::of(b"x"), 3));
        parcel.objects.push(obj);

        assert_eq!(parcel.root().unwrap().name(), "a");
        assert_eq!(parcel.total_bytes(), 3);
    }

    #[test]
    fn parcel_wire_field_names() {
        let value = serde_json::to_value(Parcel::new()).unwrap();
        assert!(value.get("objectHeaders").is_some());
        assert!(value.get("objects").is_some());
    }
}
