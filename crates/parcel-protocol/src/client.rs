use std::time::Duration;

use parcel_types::{ContentHash, Object, ObjectHeader, PublisherId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::endpoint::{tracker, ADDRESS_HEADER};
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{GetObjectHeadersResponse, PublishDataRequest};

/// HTTP client for the tracker.
///
/// Every call is a single request with the configured timeout. Non-2xx
/// answers become [`ProtocolError::Status`]; unparsable bodies become
/// [`ProtocolError::Decode`].
#[derive(Clone, Debug)]
pub struct TrackerClient {
    base_url: String,
    http: Client,
    address: Option<String>,
}

impl TrackerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProtocolResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            address: None,
        })
    }

    /// Address advertised to the tracker on subscribe, where it will POST
    /// announcements.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a batch of headers by hash.
    pub async fn get_object_headers(
        &self,
        hashes: &[ContentHash],
    ) -> ProtocolResult<Vec<ObjectHeader>> {
        let url = self.url(tracker::OBJECT_HEADERS);
        let query: Vec<(&str, String)> = hashes.iter().map(|h| ("hash", h.to_hex())).collect();
        debug!(count = hashes.len(), "fetching object headers");

        let resp = send(self.http.get(&url).query(&query), &url).await?;
        let body: GetObjectHeadersResponse = decode(resp).await?;
        Ok(body.object_headers)
    }

    pub async fn get_object(&self, hash: &ContentHash) -> ProtocolResult<Object> {
        let url = self.url(tracker::OBJECT);
        debug!(hash = %hash.short_hex(), "fetching object");
        let resp = send(self.http.get(&url).query(&[("hash", hash.to_hex())]), &url).await?;
        decode(resp).await
    }

    /// Ask the tracker to forward `publisher`'s announcements to this node.
    pub async fn subscribe(&self, publisher: &PublisherId) -> ProtocolResult<()> {
        let url = self.url(tracker::SUBSCRIBE);
        let mut req = self.http.get(&url).query(&[("pubKey", publisher.to_hex())]);
        if let Some(address) = &self.address {
            req = req.header(ADDRESS_HEADER, address);
        }
        send(req, &url).await?;
        Ok(())
    }

    /// Sequence number the next publish of `publisher` should use.
    ///
    /// A tracker that has never seen the publisher answers 404, which means 1.
    /// The body must be exactly 8 bytes holding a big-endian integer.
    pub async fn next_sequence(&self, publisher: &PublisherId) -> ProtocolResult<u64> {
        let url = self.url(tracker::NEXT_SEQUENCE);
        let mut req = self.http.get(&url).query(&[("pubKey", publisher.to_hex())]);
        if let Some(address) = &self.address {
            req = req.header(ADDRESS_HEADER, address);
        }

        let resp = req.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(publisher = %publisher.short_id(), "no sequence on tracker, starting at 1");
            return Ok(1);
        }
        let resp = check_status(resp, &url)?;
        let body = resp.bytes().await?;
        parse_sequence(&body)
    }

    pub async fn publish(&self, request: &PublishDataRequest) -> ProtocolResult<()> {
        let url = self.url(tracker::PUBLISH);
        send(self.http.post(&url).json(request), &url).await?;
        Ok(())
    }
}

async fn send(req: RequestBuilder, url: &str) -> ProtocolResult<Response> {
    check_status(req.send().await?, url)
}

fn check_status(resp: Response, url: &str) -> ProtocolResult<Response> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ProtocolError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ProtocolResult<T> {
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

fn parse_sequence(body: &[u8]) -> ProtocolResult<u64> {
    let bytes = <[u8; 8]>::try_from(body).map_err(|_| {
        ProtocolError::Decode(format!("sequence body must be 8 bytes, got {}", body.len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_types::ParcelSignature;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TrackerClient {
        TrackerClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn publisher() -> PublisherId {
        PublisherId::from_bytes([7; 32])
    }

    // -----------------------------------------------------------------------
    // Content fetches
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetches_header_batch() {
        let server = MockServer::start().await;
        let a = ContentHash::of(b"a");
        let b = ContentHash::of(b"b");
        let body = GetObjectHeadersResponse {
            object_headers: vec![ObjectHeader::directory("d"), ObjectHeader::directory("e")],
        };

        Mock::given(method("GET"))
            .and(path("/data/object/header"))
            .and(query_param("hash", a.to_hex()))
            .and(query_param("hash", b.to_hex()))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let headers = client(&server).get_object_headers(&[a, b]).await.unwrap();
        assert_eq!(headers, body.object_headers);
    }

    #[tokio::test]
    async fn fetches_object() {
        let server = MockServer::start().await;
        let hash = ContentHash::of(b"o");
        Mock::given(method("GET"))
            .and(path("/data/object"))
            .and(query_param("hash", hash.to_hex()))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"length":5,"data":"aGVsbG8="}"#),
            )
            .mount(&server)
            .await;

        let object = client(&server).get_object(&hash).await.unwrap();
        assert_eq!(object.data, b"hello");
    }

    #[tokio::test]
    async fn server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/object"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_object(&ContentHash::of(b"o"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/object/header"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_object_headers(&[ContentHash::of(b"x")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    // -----------------------------------------------------------------------
    // Publisher and subscriber calls
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn next_sequence_reads_big_endian_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/next-sequence"))
            .and(query_param("pubKey", publisher().to_hex()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(42u64.to_be_bytes().to_vec()))
            .mount(&server)
            .await;

        assert_eq!(client(&server).next_sequence(&publisher()).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn next_sequence_rejects_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/next-sequence"))
            .respond_with(ResponseTemplate::new(200).set_body_string("17\n"))
            .mount(&server)
            .await;

        let err = client(&server).next_sequence(&publisher()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[tokio::test]
    async fn next_sequence_not_found_means_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/next-sequence"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(client(&server).next_sequence(&publisher()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn subscribe_sends_address_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscribe"))
            .and(query_param("pubKey", publisher().to_hex()))
            .and(header("Address", "node.example:8083"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .with_address("node.example:8083")
            .subscribe(&publisher())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_posts_request_json() {
        let server = MockServer::start().await;
        let request = PublishDataRequest {
            root_hash: parcel_types::RootHash {
                publisher: publisher(),
                signature: ParcelSignature::from_bytes([1; 64]),
                sequence: 1,
                timestamp: chrono::Utc::now(),
                object_header_hash: ContentHash::of(b"root"),
            },
            parcel: parcel_types::Parcel::new(),
        };

        Mock::given(method("POST"))
            .and(path("/data"))
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).publish(&request).await.unwrap();
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = TrackerClient::new("http://tracker:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://tracker:8080");
    }

    #[test]
    fn parse_sequence_rejects_garbage() {
        assert!(parse_sequence(b"abc").is_err());
        assert!(parse_sequence(b"17").is_err());
        assert!(parse_sequence(&[0; 9]).is_err());
        assert_eq!(parse_sequence(&3u64.to_be_bytes()).unwrap(), 3);
    }

    #[test]
    fn eight_digit_text_is_read_as_binary() {
        let parsed = parse_sequence(b"10000000").unwrap();
        assert_eq!(parsed, u64::from_be_bytes(*b"10000000"));
        assert_ne!(parsed, 10_000_000);
    }
}
