use release_updater::update::{DownloadError, Downloader, HttpTransport, ProgressSink};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<Option<f64>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: ProgressSink = Arc::new(move |fraction| sink_seen.lock().unwrap().push(fraction));
    (sink, seen)
}

#[tokio::test]
async fn test_downloads_to_private_file() {
    let server = MockServer::start().await;
    let payload = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/download/v1.0.0/desktop-macos.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = Downloader::new(Arc::new(HttpTransport::new().unwrap()));
    let (sink, seen) = recording_sink();
    let url = format!("{}/download/v1.0.0/desktop-macos.zip", server.uri());

    let file = downloader.download(&url, sink).await.unwrap();

    assert_eq!(file.extension().unwrap(), "zip");
    assert_eq!(std::fs::read(&file).unwrap(), payload);
    assert!(!downloader.is_in_flight());

    let seen = seen.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert_eq!(seen.last().copied().flatten(), Some(1.0));
    let fractions: Vec<f64> = seen.into_iter().flatten().collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));

    std::fs::remove_file(file).unwrap();
}

#[tokio::test]
async fn test_missing_asset_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let downloader = Downloader::new(Arc::new(HttpTransport::new().unwrap()));
    let (sink, _) = recording_sink();
    let url = format!("{}/download/v9.9.9/desktop-macos.zip", server.uri());

    let error = downloader.download(&url, sink).await.unwrap_err();
    assert!(matches!(error, DownloadError::Status { status: 404, .. }));
    assert!(!downloader.is_in_flight());
}

#[tokio::test]
async fn test_unreachable_host_is_http_error() {
    let downloader = Downloader::new(Arc::new(HttpTransport::new().unwrap()));
    let (sink, _) = recording_sink();

    let error = downloader.download("http://127.0.0.1:1/desktop.zip", sink).await.unwrap_err();
    assert!(matches!(error, DownloadError::Http { .. }));
}
