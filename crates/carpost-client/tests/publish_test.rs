//! End-to-end JobPublisher tests against a mocked store.

use std::sync::Arc;

use carpost_car::CarReader;
use carpost_client::{
    AuthState, AuthenticationBroker, ClientConfig, JobPublisher, LocalKeySigner, PublishError, Signer,
    TransportClient, TransportError,
};
use carpost_core::{Codec, Identifier, ImageSource, LocalFile, Metadata, Properties};
use carpost_dag::{BlockEncoder, EncodeError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job_metadata() -> Metadata {
    Metadata {
        name: "Senior Rust engineer".into(),
        description: "Own the upload pipeline".into(),
        image: ImageSource::Local(LocalFile::in_memory("cat.png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])),
        properties: Properties {
            tags: vec!["rust".into(), "ipfs".into()],
            content: "Full description".into(),
            payment: "120k".into(),
            location: "Remote".into(),
        },
    }
}

fn test_publisher(mock_server: &MockServer) -> JobPublisher {
    let config = ClientConfig::local(&mock_server.uri()).unwrap();
    let transport = TransportClient::new(&config).unwrap();
    let broker = AuthenticationBroker::from_config(&config, transport.clone());
    JobPublisher::new(BlockEncoder::default(), broker, transport)
}

async fn expected_root() -> Identifier {
    BlockEncoder::default().bundle(&job_metadata()).await.unwrap().root()
}

async fn mount_auth(mock_server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_string("jwt-publish"))
        .expect(times)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn publish_uploads_bundle_and_returns_resolved_metadata() {
    let mock_server = MockServer::start().await;
    let root = expected_root().await;
    mount_auth(&mock_server, 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(200).set_body_string(root.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let publisher = test_publisher(&mock_server);
    let signer: Arc<dyn Signer> = Arc::new(LocalKeySigner::random());
    let published = publisher.publish(&job_metadata(), signer.clone()).await.unwrap();

    assert_eq!(published.root, root);
    assert_eq!(published.json.image, ImageSource::Resolved(published.image.to_string()));
    assert!(published.image.to_string().ends_with("/cat.png"));
    assert_eq!(publisher.broker().state(&signer.address()), AuthState::Authenticated);

    let requests = mock_server.received_requests().await.unwrap();
    let upload = requests.iter().find(|r| r.url.path() == "/v1/storeCar").unwrap();
    let archive = CarReader::from_bytes(upload.body.clone()).unwrap();
    assert_eq!(archive.roots(), &[root]);
    assert!(archive.into_block_set().verify_closure().is_ok());
}

#[tokio::test]
async fn upload_failure_keeps_the_credential() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Failed to store CAR"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let publisher = test_publisher(&mock_server);
    let signer: Arc<dyn Signer> = Arc::new(LocalKeySigner::random());
    for _ in 0..2 {
        let err = publisher.publish(&job_metadata(), signer.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Transport(TransportError::UploadFailed { status: 500, .. })
        ));
        assert_eq!(publisher.broker().state(&signer.address()), AuthState::Authenticated);
    }
}

#[tokio::test]
async fn rejected_credential_is_invalidated() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 2).await;
    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let publisher = test_publisher(&mock_server);
    let signer: Arc<dyn Signer> = Arc::new(LocalKeySigner::random());
    for _ in 0..2 {
        let err = publisher.publish(&job_metadata(), signer.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Transport(TransportError::UploadFailed { status: 401, .. })
        ));
        assert_eq!(publisher.broker().state(&signer.address()), AuthState::Unauthenticated);
    }
}

#[tokio::test]
async fn mismatched_root_is_an_error() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;
    let other = Identifier::compute(Codec::DagCbor, b"someone else's job");
    Mock::given(method("POST"))
        .and(path("/v1/storeCar"))
        .respond_with(ResponseTemplate::new(200).set_body_string(other.to_string()))
        .mount(&mock_server)
        .await;

    let err = test_publisher(&mock_server)
        .publish(&job_metadata(), Arc::new(LocalKeySigner::random()))
        .await
        .unwrap_err();
    match err {
        PublishError::RootMismatch { expected, confirmed } => {
            assert_eq!(expected, expected_root().await);
            assert_eq!(confirmed, other);
        }
        other => panic!("expected RootMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn remote_image_fails_before_any_request() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 0).await;

    let mut metadata = job_metadata();
    metadata.image = ImageSource::Remote("https://cdn.example.org/cat.png".parse().unwrap());
    let err = test_publisher(&mock_server)
        .publish(&metadata, Arc::new(LocalKeySigner::random()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PublishError::Encode(EncodeError::InvalidImageSource { kind: "remote" })
    ));
}
