use std::net::SocketAddr;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use axum::{Router, http::header, routing::post};
use tokio::sync::Notify;

use bg_remover::client::{
    ClientError, HttpGateway, RemovalGateway, RemovalRequest, ResultSink, Stage, SubmitOutcome,
    UploadController, DOWNLOAD_FILE_NAME,
};
use bg_remover::config::RemovalConfig;
use bg_remover::features::removal::{RemovalResponse, RemovalResult, UploadedFile};
use bg_remover::{AppConfig, AppState, build_app};

/// 网关桩：统计调用次数，可选地在返回前等待放行。
struct StubGateway {
    calls: AtomicUsize,
    credentials: Mutex<Vec<Option<String>>>,
    gate: Option<Arc<Notify>>,
    reply: Result<RemovalResponse, (u16, &'static str)>,
}

impl StubGateway {
    fn ok(result: &RemovalResult) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            credentials: Mutex::new(Vec::new()),
            gate: None,
            reply: Ok(result.to_response()),
        }
    }

    fn failing(status: u16, message: &'static str) -> Self {
        Self {
            reply: Err((status, message)),
            ..Self::ok(&RemovalResult::new(Vec::new(), None))
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl RemovalGateway for StubGateway {
    async fn remove_background(
        &self,
        request: RemovalRequest,
    ) -> Result<RemovalResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().push(request.credential);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.reply {
            Ok(resp) => Ok(resp.clone()),
            Err((status, message)) => Err(ClientError::Gateway {
                status: *status,
                message: message.to_string(),
            }),
        }
    }
}

/// 内存中的下载目标
#[derive(Default)]
struct MemorySink {
    saved: Vec<(String, RemovalResult)>,
}

impl ResultSink for MemorySink {
    fn save(&mut self, file_name: &str, result: &RemovalResult) -> std::io::Result<()> {
        self.saved.push((file_name.to_string(), result.clone()));
        Ok(())
    }
}

fn cat_png() -> UploadedFile {
    UploadedFile::new(
        Some("cat.png".to_string()),
        Some("image/png".to_string()),
        vec![0x89u8; 2 * 1024 * 1024],
    )
}

/// 小文件：服务端可能在读完请求体前就回应（如 401）
fn small_png() -> UploadedFile {
    UploadedFile::new(Some("small.png".to_string()), Some("image/png".to_string()), vec![7u8; 64])
}

fn processed() -> RemovalResult {
    RemovalResult::new(b"\x89PNG-no-background".to_vec(), Some("image/png"))
}

#[tokio::test]
async fn submit_without_file_reports_error_and_skips_gateway() {
    let stub = Arc::new(StubGateway::ok(&processed()));
    let controller = UploadController::new(stub.clone(), None);

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::NoFileSelected));

    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Idle);
    assert_eq!(snap.error.as_deref(), Some("Choose an image before processing"));
    assert!(!snap.can_process);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_submit_reaches_done_with_data_uri_preview() {
    let result = processed();
    let stub = Arc::new(StubGateway::ok(&result));
    let controller = UploadController::new(stub.clone(), Some("svc-token".to_string()));

    let original = controller.select_file(cat_png());
    let snap = controller.snapshot();
    assert_eq!(snap.original_preview.as_deref(), Some(original.as_str()));
    assert_eq!(snap.message, "Ready to remove the background");
    assert!(snap.can_process);

    let outcome = controller.submit().await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Completed);

    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Done);
    assert_eq!(snap.error, None);
    assert_eq!(
        snap.result_preview,
        Some(result.to_response().data_uri())
    );
    assert_eq!(controller.result(), Some(result));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        stub.credentials.lock().unwrap().as_slice(),
        &[Some("svc-token".to_string())]
    );
}

#[tokio::test]
async fn empty_credential_is_not_sent() {
    let stub = Arc::new(StubGateway::ok(&processed()));
    let controller = UploadController::new(stub.clone(), Some(String::new()));
    controller.select_file(cat_png());
    controller.submit().await.expect("submit");
    assert_eq!(stub.credentials.lock().unwrap().as_slice(), &[None::<String>]);
}

#[tokio::test]
async fn gateway_failure_surfaces_message_and_allows_retry() {
    let stub = Arc::new(StubGateway::failing(401, "Unauthorized"));
    let controller = UploadController::new(stub.clone(), None);
    controller.select_file(cat_png());

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::Gateway { status: 401, .. }));

    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Idle);
    assert_eq!(snap.error.as_deref(), Some("Unauthorized"));
    assert_eq!(snap.message, "Retry when you are ready.");
    assert!(snap.can_process);

    controller.dismiss_error();
    assert_eq!(controller.snapshot().error, None);
}

#[tokio::test]
async fn download_saves_once_and_resets() {
    let result = processed();
    let controller = UploadController::new(StubGateway::ok(&result), None);
    controller.select_file(cat_png());
    controller.submit().await.expect("submit");

    let mut sink = MemorySink::default();
    assert!(controller.download(&mut sink).expect("download"));
    assert_eq!(sink.saved.len(), 1);
    assert_eq!(sink.saved[0].0, DOWNLOAD_FILE_NAME);
    assert_eq!(sink.saved[0].1, result);

    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Idle);
    assert_eq!(snap.file_name, None);
    assert_eq!(snap.original_preview, None);
    assert_eq!(snap.result_preview, None);
    assert_eq!(snap.message, "Upload an image to begin");

    // 第二次下载没有可保存的结果
    assert!(!controller.download(&mut sink).expect("download"));
    assert_eq!(sink.saved.len(), 1);
}

#[tokio::test]
async fn previews_are_released_when_replaced_or_downloaded() {
    let controller = UploadController::new(StubGateway::ok(&processed()), None);
    let previews = controller.previews().clone();

    let first = controller.select_file(cat_png());
    assert_eq!(previews.live_count(), 1);

    let second = controller.select_file(cat_png());
    assert_eq!(previews.live_count(), 1);
    assert!(!previews.is_live(&first));
    assert!(previews.is_live(&second));

    controller.submit().await.expect("submit");
    assert_eq!(previews.live_count(), 2);

    controller.select_file(cat_png());
    assert_eq!(previews.live_count(), 1);

    controller.submit().await.expect("submit");
    controller
        .download(&mut MemorySink::default())
        .expect("download");
    assert_eq!(previews.live_count(), 0);
}

#[tokio::test]
async fn stale_response_is_discarded_after_reselect() {
    let gate = Arc::new(Notify::new());
    let stub = Arc::new(StubGateway::ok(&processed()).gated(gate.clone()));
    let controller = UploadController::new(stub.clone(), None);
    controller.select_file(cat_png());

    let dog = UploadedFile::new(Some("dog.png".to_string()), None, vec![1u8; 16]);
    let (outcome, _) = tokio::join!(controller.submit(), async {
        // submit 已挂起在网关调用上
        assert_eq!(controller.snapshot().stage, Stage::Processing);
        controller.select_file(dog);
        gate.notify_one();
    });

    assert_eq!(outcome.expect("submit"), SubmitOutcome::Superseded);
    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Idle);
    assert_eq!(snap.file_name.as_deref(), Some("dog.png"));
    assert_eq!(snap.result_preview, None);
    assert_eq!(controller.previews().live_count(), 1);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_submit_while_processing_is_rejected() {
    let gate = Arc::new(Notify::new());
    let stub = Arc::new(StubGateway::ok(&processed()).gated(gate.clone()));
    let controller = UploadController::new(stub.clone(), None);
    controller.select_file(cat_png());

    let (first, second) = tokio::join!(controller.submit(), async {
        let second = controller.submit().await;
        gate.notify_one();
        second
    });

    assert_eq!(first.expect("first submit"), SubmitOutcome::Completed);
    assert!(matches!(second, Err(ClientError::AlreadyProcessing)));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// 真实网关 + 上游桩，经 HttpGateway 走完整条链路。
async fn spawn_stack(upstream_bytes: &'static [u8]) -> String {
    let upstream = Router::new().route(
        "/remove",
        post(move || async move { ([(header::CONTENT_TYPE, "image/png")], upstream_bytes) }),
    );
    let upstream_addr = serve(upstream).await;

    let removal = RemovalConfig {
        service_token: Some("svc-secret".to_string()),
        upstream_url: Some(format!("http://{upstream_addr}/remove")),
        ..RemovalConfig::default()
    };
    let config = AppConfig {
        removal: removal.clone(),
        ..AppConfig::default()
    };
    let app = build_app(&config, AppState::with_client(removal, reqwest::Client::new()));
    let gateway_addr = serve(app).await;
    format!("http://{gateway_addr}{}", config.removal_path())
}

#[tokio::test]
async fn http_gateway_round_trip_through_real_gateway() {
    let url = spawn_stack(b"\x89PNG-cutout").await;

    let controller = UploadController::new(
        HttpGateway::new(reqwest::Client::new(), url.clone()),
        Some("svc-secret".to_string()),
    );
    controller.select_file(cat_png());
    assert_eq!(controller.submit().await.expect("submit"), SubmitOutcome::Completed);

    let result = controller.result().expect("result");
    assert_eq!(result.data.as_ref(), b"\x89PNG-cutout");
    assert_eq!(result.content_type, "image/png");

    let dir = tempfile::tempdir().expect("tempdir");
    let mut sink = bg_remover::client::DirectorySink::new(dir.path());
    assert!(controller.download(&mut sink).expect("download"));
    let saved = std::fs::read(dir.path().join(DOWNLOAD_FILE_NAME)).expect("saved file");
    assert_eq!(saved, b"\x89PNG-cutout");
}

#[tokio::test]
async fn http_gateway_reports_gateway_error_message() {
    let url = spawn_stack(b"unused").await;

    let controller = UploadController::new(
        HttpGateway::new(reqwest::Client::new(), url),
        Some("wrong".to_string()),
    );
    controller.select_file(small_png());

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::Gateway { status: 401, .. }));
    assert_eq!(controller.snapshot().error.as_deref(), Some("Unauthorized"));
}

#[tokio::test]
async fn ok_response_without_image_data_is_reported() {
    let stub = Router::new().route(
        "/remove-background",
        post(|| async { axum::Json(serde_json::json!({})) }),
    );
    let addr = serve(stub).await;

    let controller = UploadController::new(
        HttpGateway::new(reqwest::Client::new(), format!("http://{addr}/remove-background")),
        None,
    );
    controller.select_file(small_png());

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::MissingImageData));

    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Idle);
    assert_eq!(snap.error.as_deref(), Some("gateway response missing image data"));
    assert_eq!(snap.message, "Retry when you are ready.");
    assert_eq!(snap.result_preview, None);
    assert!(snap.can_process);
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    // 占用端口后立即释放，得到一个无人监听的地址
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let controller = UploadController::new(
        HttpGateway::new(reqwest::Client::new(), format!("http://{addr}/api/remove-background")),
        Some("svc-secret".to_string()),
    );
    controller.select_file(cat_png());

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));

    let snap = controller.snapshot();
    assert_eq!(snap.stage, Stage::Idle);
    assert!(snap.error.is_some_and(|e| !e.is_empty()));
    assert_eq!(snap.message, "Retry when you are ready.");
    assert!(snap.can_process);
}
