//! Contract tests for TransportClient.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/v1/auth` | `authenticate_*` |
//! | POST   | `/v1/storeCar` | `upload_*` |
//! | GET    | `/v1/jobs` | `list_jobs_*` |
//! | GET    | `/v1/jobs/{cid}` | `get_job_*` |
//! | GET    | `/v1/jobs?from=` | `list_jobs_by_author_*` |
//! | GET    | `/ipfs/{cid}/metadata.json` (gateway) | `fetch_metadata_*` |

use carpost_car::{pack_block_set, CarReader};
use carpost_client::{ClientConfig, Credential, TransportClient, TransportError};
use carpost_core::{AccountAddress, Block, BlockSet, Codec, Identifier, ImageSource};
use chrono::Utc;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> TransportClient {
    TransportClient::new(&ClientConfig::local(&mock_server.uri()).unwrap()).unwrap()
}

fn author() -> AccountAddress {
    AccountAddress::from_bytes([0x11; 20])
}

fn credential() -> Credential {
    let now = Utc::now();
    Credential::new("jwt-test", author(), now, now + chrono::Duration::hours(1))
}

fn job_cid(n: u8) -> Identifier {
    Identifier::compute(Codec::DagCbor, &[n])
}

fn job_json(n: u8) -> serde_json::Value {
    serde_json::json!({
        "cid": job_cid(n).to_string(),
        "author": author().to_string(),
        "block": 1000 + u64::from(n),
    })
}

fn sample_set() -> BlockSet {
    let leaf = Block::raw(&b"image bytes"[..]);
    let mut set = BlockSet::new(vec![*leaf.cid()]);
    set.insert(leaf);
    set
}

// ── POST /v1/auth ───────────────────────────────────────────────────

#[tokio::test]
async fn authenticate_sends_web3_token_header_and_returns_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .and(header("authorization", "Web3-Token abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("jwt-issued\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = test_client(&mock_server).authenticate("abc123").await.unwrap();
    assert_eq!(token, "jwt-issued");
}

#[tokio::test]
async fn authenticate_non_2xx_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Failed to authenticate"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server).authenticate("abc").await.unwrap_err();
    assert!(matches!(err, TransportError::FetchError { status: 401, .. }));
}

// ── POST /v1/storeCar ───────────────────────────────────────────────

#[tokio::test]
async fn upload_streams_archive_with_bearer_and_car_content_type() {
    let mock_server = MockServer::start().await;
    let set = sample_set();
    let root = set.roots()[0];
    let expected_body = pack_block_set(&set).into_bytes().await.unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .and(header("authorization", "Bearer jwt-test"))
        .and(header("content-type", "application/vnd.ipld.car"))
        .and(body_bytes(expected_body.to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_string(root.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let confirmed = test_client(&mock_server)
        .upload(pack_block_set(&set), &credential())
        .await
        .unwrap();
    assert_eq!(confirmed, root);

    let requests = mock_server.received_requests().await.unwrap();
    let archive = CarReader::from_bytes(requests[0].body.clone()).unwrap();
    assert_eq!(archive.roots(), &[root]);
}

#[tokio::test]
async fn upload_non_2xx_is_upload_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Failed to store CAR"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .upload(pack_block_set(&sample_set()), &credential())
        .await
        .unwrap_err();
    match &err {
        TransportError::UploadFailed { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "Failed to store CAR");
        }
        other => panic!("expected UploadFailed, got {other:?}"),
    }
    assert!(!err.is_auth_failure());
}

#[tokio::test]
async fn upload_401_is_an_auth_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .upload(pack_block_set(&sample_set()), &credential())
        .await
        .unwrap_err();
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn upload_garbage_root_is_invalid_identifier() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .upload(pack_block_set(&sample_set()), &credential())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::InvalidIdentifier { .. }));
}

// ── GET /v1/jobs ────────────────────────────────────────────────────

#[tokio::test]
async fn list_jobs_decodes_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([job_json(2), job_json(1)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let jobs = test_client(&mock_server).list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].cid, job_cid(2));
    assert_eq!(jobs[1].block, 1001);
    assert_eq!(jobs[0].author, author());
}

#[tokio::test]
async fn list_jobs_rejects_bad_identifiers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"cid": "not-a-cid", "author": author().to_string(), "block": 1}
        ])))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server).list_jobs().await.unwrap_err();
    assert!(matches!(err, TransportError::Deserialization { .. }));
}

#[tokio::test]
async fn list_jobs_non_2xx_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server).list_jobs().await.unwrap_err();
    assert!(matches!(err, TransportError::FetchError { status: 503, .. }));
}

#[tokio::test]
async fn list_jobs_by_author_sends_from_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs"))
        .and(query_param("from", author().to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([job_json(3)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let jobs = test_client(&mock_server).list_jobs_by_author(&author()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].cid, job_cid(3));
}

// ── GET /v1/jobs/{cid} ──────────────────────────────────────────────

#[tokio::test]
async fn get_job_returns_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/jobs/{}", job_cid(7))))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json(7)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let job = test_client(&mock_server).get_job(&job_cid(7)).await.unwrap().unwrap();
    assert_eq!(job.cid, job_cid(7));
    assert_eq!(job.block, 1007);
}

#[tokio::test]
async fn get_job_404_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/jobs/{}", job_cid(8))))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    assert!(test_client(&mock_server).get_job(&job_cid(8)).await.unwrap().is_none());
}

#[tokio::test]
async fn get_job_500_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/jobs/{}", job_cid(9))))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    assert!(matches!(
        test_client(&mock_server).get_job(&job_cid(9)).await,
        Err(TransportError::FetchError { status: 500, .. })
    ));
}

// ── Gateway ─────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_metadata_reads_from_gateway_path() {
    let mock_server = MockServer::start().await;
    let root = job_cid(4);
    let image = format!("ipfs://{}/cat.png", job_cid(5));

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{root}/metadata.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Rust engineer",
            "description": "Streaming uploads",
            "image": image,
            "properties": {
                "tags": ["rust"],
                "content": "Details",
                "payment": "100 DAI",
                "location": "Remote"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metadata = test_client(&mock_server).fetch_metadata(&root).await.unwrap();
    assert_eq!(metadata.name, "Rust engineer");
    assert_eq!(metadata.image, ImageSource::Resolved(image));
    assert_eq!(metadata.properties.tags, vec!["rust"]);
}

#[tokio::test]
async fn fetch_metadata_404_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    assert!(matches!(
        test_client(&mock_server).fetch_metadata(&job_cid(6)).await,
        Err(TransportError::FetchError { status: 404, .. })
    ));
}
