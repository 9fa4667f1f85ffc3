#![forbid(unsafe_code)]

//! HTTP front door for the download queue.
//!
//! Clients open `/ws`, send `startDownload` messages, and receive the queue
//! acknowledgement plus every progress event for their jobs on the same
//! socket. Finished files are fetched from `/download/{filename}`; everything
//! else falls through to the static web root.

use std::{
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{
        Path as AxumPath, State,
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use mime_guess::{MimeGuess, mime::Mime};
use serde::Serialize;
use tokio::{fs::File, signal};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tube_fetcher::{
    channel::{ChannelRegistry, ConnectionId},
    config::{ConfigOverrides, resolve_config},
    error::DeliveryError,
    job::{DownloadRequest, Job, JobId, TargetFormat},
    locator,
    orchestrator::Orchestrator,
    progress::{ClientMessage, ServerMessage},
    queue::DownloadQueue,
    resolver::{MediaResolver, YtDlpResolver},
    store::{ArtifactStore, artifact_name},
    transcoder::FfmpegTranscoder,
};

#[derive(Debug, Parser)]
#[command(
    name = "tube-fetcher",
    about = "Queue YouTube downloads and stream their progress over WebSocket"
)]
struct ServerArgs {
    /// Directory finished files are written to (OUTPUT_ROOT).
    #[arg(long)]
    output_root: Option<PathBuf>,
    /// Scratch directory for raw downloads awaiting conversion (WORK_ROOT).
    #[arg(long)]
    work_root: Option<PathBuf>,
    /// Static web client (WWW_ROOT).
    #[arg(long)]
    www_root: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Alternate .env file.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl ServerArgs {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            output_root: self.output_root,
            work_root: self.work_root,
            www_root: self.www_root,
            host: self.host,
            port: self.port,
            env_path: self.env_file,
        }
    }
}

fn parse_host_arg(value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .context("expected a valid IPv4 or IPv6 address for --host/FETCHER_HOST")
}

#[derive(Clone)]
struct AppState {
    queue: DownloadQueue,
    channels: ChannelRegistry,
    store: ArtifactStore,
    resolver: Arc<dyn MediaResolver>,
    www_root: Arc<PathBuf>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Creates a 404 error with the provided message.
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Creates a 500 error with the provided message.
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::NotFound(_) => Self::not_found("file not found"),
            DeliveryError::Io { .. } => {
                warn!("artifact delivery failed: {err}");
                Self::internal("could not read file")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, headers, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config =
        resolve_config(ServerArgs::parse().overrides()).context("loading configuration")?;
    let host = parse_host_arg(&config.host)?;

    let store = ArtifactStore::new(config.output_root.clone(), config.work_root.clone());
    store
        .prepare()
        .await
        .context("preparing output and work directories")?;

    let channels = ChannelRegistry::new();
    let resolver: Arc<dyn MediaResolver> = Arc::new(YtDlpResolver::new(
        config.yt_dlp.clone(),
        config.cookies_file.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        resolver.clone(),
        Arc::new(FfmpegTranscoder::new(
            config.ffmpeg.clone(),
            config.ffprobe.clone(),
        )),
        store.clone(),
        channels.clone(),
        config.audio_bitrate_kbps,
    ));

    let state = AppState {
        queue: DownloadQueue::new(orchestrator),
        channels,
        store,
        resolver,
        www_root: Arc::new(config.www_root.clone()),
    };

    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!(
        output = %config.output_root.display(),
        work = %config.work_root.display(),
        "server listening on http://{addr}"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tube_fetcher=info,server=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/download/{filename}", get(download_artifact))
        .route("/api/download", post(resolve_download))
        .fallback(static_fallback)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("failed to install Ctrl+C handler: {err}");
    }
    info!("shutting down");
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pumps one client socket: inbound text frames become queue submissions,
/// registry events go back out as JSON text frames.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (connection, mut events) = state.channels.register();
    info!(%connection, "client connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_text(&state, connection, text.as_str());
                }
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    debug!(%connection, "websocket error: {err}");
                    break;
                }
                Some(Ok(_)) => {}
            },
            Some(event) = events.recv() => {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(%connection, "could not encode event: {err}");
                        continue;
                    }
                };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.channels.unregister(connection);
    info!(%connection, "client disconnected");
}

fn handle_client_text(state: &AppState, connection: ConnectionId, text: &str) {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::StartDownload(request)) => request,
        Err(err) => {
            reject(state, connection, format!("malformed message: {err}"));
            return;
        }
    };
    let format = request.format.clone();
    match Job::from_request(request, connection) {
        Some(job) => {
            state.queue.submit(job);
        }
        None => reject(state, connection, format!("unsupported format: {format}")),
    }
}

fn reject(state: &AppState, connection: ConnectionId, error: String) {
    debug!(%connection, "rejecting request: {error}");
    state
        .channels
        .send(connection, ServerMessage::RequestRejected { error });
}

async fn download_artifact(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> ApiResult<Response> {
    let (file, size) = state.store.open(&filename).await?;
    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    let mime = MimeGuess::from_path(&filename).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_DISPOSITION, attachment_header(&filename));
    Ok(response)
}

fn attachment_header(filename: &str) -> HeaderValue {
    let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{quoted}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedDownload {
    id: JobId,
    filename: String,
    download_link: String,
    message: String,
}

/// Resolves metadata for a request without queueing it.
async fn resolve_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<ResolvedDownload>> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let video_url = request.video_url.trim();
    if video_url.is_empty() {
        return Err(ApiError::bad_request("video URL is required"));
    }
    if !locator::is_valid(video_url) {
        return Err(ApiError::bad_request("invalid YouTube URL"));
    }
    let format = TargetFormat::parse(&request.format).ok_or_else(|| {
        ApiError::bad_request(format!("unsupported format: {}", request.format))
    })?;

    let info = state.resolver.fetch_info(video_url).await.map_err(|err| {
        warn!("metadata lookup failed for {video_url}: {err}");
        ApiError::internal(err.to_string())
    })?;
    let filename = artifact_name(info.display_title(), &info.id, format);
    Ok(Json(ResolvedDownload {
        id: JobId::new(),
        download_link: format!("/download/{filename}"),
        filename,
        message: "Metadata resolved. Send startDownload over /ws to fetch the file.".into(),
    }))
}

async fn static_fallback(State(state): State<AppState>, req: Request<Body>) -> Response {
    let path = req.uri().path();
    if path == "/api" || path.starts_with("/api/") {
        return ApiError::not_found("endpoint not found").into_response();
    }

    match serve_www_path(&state.www_root, path).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn serve_www_path(root: &Path, request_path: &str) -> ApiResult<Response> {
    let target = resolve_www_path(root, request_path)?;
    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => stream_file(root.join("index.html"), None).await,
        Ok(_) => stream_file(target, None).await,
        Err(_) if should_fallback_to_index(request_path) => {
            stream_file(root.join("index.html"), None).await
        }
        Err(_) => Err(ApiError::not_found("file not found")),
    }
}

fn resolve_www_path(root: &Path, request_path: &str) -> ApiResult<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(root.join("index.html"));
    }
    let candidate = Path::new(trimmed);
    if candidate
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(ApiError::not_found("file not found"));
    }
    Ok(root.join(candidate))
}

fn should_fallback_to_index(request_path: &str) -> bool {
    let trimmed = request_path.trim_start_matches('/');
    trimmed.is_empty() || Path::new(trimmed).extension().is_none()
}

async fn stream_file(path: PathBuf, mime: Option<Mime>) -> ApiResult<Response> {
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let guessed = mime.or_else(|| MimeGuess::from_path(&path).first());
    if let Some(mime) = guessed
        && let Ok(value) = HeaderValue::from_str(mime.as_ref())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::extract::FromRequest;
    use serde_json::Value;
    use tempfile::{TempDir, tempdir};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tube_fetcher::error::ResolveError;
    use tube_fetcher::queue::JobProcessor;
    use tube_fetcher::resolver::{MediaInfo, Rendition, SourceStream};

    struct StaticResolver {
        fail: bool,
    }

    #[async_trait]
    impl MediaResolver for StaticResolver {
        async fn fetch_info(&self, _locator: &str) -> Result<MediaInfo, ResolveError> {
            if self.fail {
                return Err(ResolveError::Unavailable("Private video".into()));
            }
            Ok(MediaInfo {
                id: "dQw4w9WgXcQ".into(),
                title: Some("Never Gonna Give You Up!".into()),
                fulltitle: None,
                duration: Some(213.0),
                formats: Vec::new(),
            })
        }

        async fn open_stream(
            &self,
            _info: &MediaInfo,
            rendition: &Rendition,
        ) -> Result<SourceStream, ResolveError> {
            Err(ResolveError::NoRendition {
                rendition: format!("{rendition:?}"),
            })
        }
    }

    struct Parked;

    #[async_trait]
    impl JobProcessor for Parked {
        async fn process(&self, _job: Job) {}
    }

    struct ServerTestContext {
        _temp: TempDir,
        state: AppState,
    }

    impl ServerTestContext {
        fn new(resolver_fails: bool) -> Self {
            let temp = tempdir().unwrap();
            let store = ArtifactStore::new(temp.path().join("downloads"), temp.path().join("temp"));
            std::fs::create_dir_all(store.output_dir()).unwrap();
            let www_root = temp.path().join("www");
            std::fs::create_dir_all(&www_root).unwrap();
            std::fs::write(www_root.join("index.html"), "<html>app</html>").unwrap();
            std::fs::write(www_root.join("app.js"), "console.log(1)").unwrap();

            Self {
                state: AppState {
                    queue: DownloadQueue::new(Arc::new(Parked)),
                    channels: ChannelRegistry::new(),
                    store,
                    resolver: Arc::new(StaticResolver {
                        fail: resolver_fails,
                    }),
                    www_root: Arc::new(www_root),
                },
                _temp: temp,
            }
        }
    }

    fn request(video_url: &str, format: &str) -> Result<Json<DownloadRequest>, JsonRejection> {
        Ok(Json(DownloadRequest {
            video_url: video_url.into(),
            format: format.into(),
            quality: None,
        }))
    }

    async fn body_string(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn next_event(rx: &mut UnboundedReceiver<ServerMessage>) -> ServerMessage {
        rx.try_recv().expect("event delivered")
    }

    #[test]
    fn args_map_onto_overrides() {
        let args = ServerArgs::try_parse_from([
            "tube-fetcher",
            "--port",
            "8081",
            "--output-root",
            "/srv/out",
            "--env-file",
            "/etc/fetcher.env",
        ])
        .unwrap();
        let overrides = args.overrides();
        assert_eq!(overrides.port, Some(8081));
        assert_eq!(overrides.output_root, Some(PathBuf::from("/srv/out")));
        assert_eq!(overrides.env_path, Some(PathBuf::from("/etc/fetcher.env")));
        assert!(overrides.host.is_none());
    }

    #[test]
    fn parse_host_arg_requires_ip() {
        assert!(parse_host_arg("0.0.0.0").is_ok());
        assert!(parse_host_arg("::1").is_ok());
        assert!(parse_host_arg("localhost").is_err());
    }

    #[tokio::test]
    async fn api_error_serializes_json() {
        let response = ApiError::not_found("missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "missing");
    }

    #[tokio::test]
    async fn download_artifact_streams_attachment() {
        let ctx = ServerTestContext::new(false);
        std::fs::write(ctx.state.store.output_path("Song Live.mp3"), b"ID3data").unwrap();

        let response = download_artifact(
            State(ctx.state.clone()),
            AxumPath("Song Live.mp3".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"Song Live.mp3\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "audio/mpeg"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH).unwrap(),
            "7"
        );
        assert_eq!(body_string(response).await, "ID3data");
    }

    #[tokio::test]
    async fn download_artifact_missing_is_not_found() {
        let ctx = ServerTestContext::new(false);
        let err = download_artifact(State(ctx.state.clone()), AxumPath("nope.mp4".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn download_artifact_rejects_path_traversal() {
        let ctx = ServerTestContext::new(false);
        std::fs::write(ctx.state.www_root.join("secret.txt"), "x").unwrap();
        let err = download_artifact(
            State(ctx.state.clone()),
            AxumPath("../www/secret.txt".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn attachment_header_escapes_quotes() {
        assert_eq!(
            attachment_header("a\"b.mp3"),
            "attachment; filename=\"a\\\"b.mp3\""
        );
        assert_eq!(attachment_header("bad\nname"), "attachment");
    }

    #[tokio::test]
    async fn resolve_download_validates_url() {
        let ctx = ServerTestContext::new(false);
        let err = resolve_download(State(ctx.state.clone()), request("", "mp3"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "video URL is required");

        let err = resolve_download(
            State(ctx.state.clone()),
            request("https://example.com/watch?v=dQw4w9WgXcQ", "mp3"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "invalid YouTube URL");

        let err = resolve_download(
            State(ctx.state.clone()),
            request("https://youtu.be/dQw4w9WgXcQ", "flac"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resolve_download_answers_bad_bodies_with_json() {
        let ctx = ServerTestContext::new(false);
        let req = Request::builder()
            .method("POST")
            .uri("/api/download")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"videoUrl":"https://youtu.be/dQw4w9WgXcQ"}"#))
            .unwrap();
        let payload = Json::<DownloadRequest>::from_request(req, &()).await;
        assert!(payload.is_err());

        let err = resolve_download(State(ctx.state.clone()), payload)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let response = err.into_response();
        let parsed: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap())
                .unwrap();
        assert!(parsed["error"].as_str().unwrap().contains("format"));
    }

    #[tokio::test]
    async fn resolve_download_returns_local_link() {
        let ctx = ServerTestContext::new(false);
        let Json(resolved) = resolve_download(
            State(ctx.state.clone()),
            request("https://youtu.be/dQw4w9WgXcQ", "mp3"),
        )
        .await
        .unwrap();
        assert_eq!(resolved.filename, "Never Gonna Give You Up.mp3");
        assert_eq!(resolved.download_link, "/download/Never Gonna Give You Up.mp3");

        let json = serde_json::to_value(&resolved).unwrap();
        assert!(json.get("downloadLink").is_some());
        assert!(json.get("message").is_some());
        assert_eq!(ctx.state.queue.pending(), 0);
    }

    #[tokio::test]
    async fn resolve_download_surfaces_lookup_failure() {
        let ctx = ServerTestContext::new(true);
        let err = resolve_download(
            State(ctx.state.clone()),
            request("https://youtu.be/dQw4w9WgXcQ", "mp4"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Private video");
    }

    #[tokio::test]
    async fn client_text_submits_valid_requests() {
        let ctx = ServerTestContext::new(false);
        let (connection, _rx) = ctx.state.channels.register();
        handle_client_text(
            &ctx.state,
            connection,
            r#"{"event":"startDownload","data":{"videoUrl":"https://youtu.be/dQw4w9WgXcQ","format":"mp4","quality":"720p"}}"#,
        );
        assert_eq!(ctx.state.queue.pending(), 1);
    }

    #[tokio::test]
    async fn client_text_rejects_bad_input() {
        let ctx = ServerTestContext::new(false);
        let (connection, mut rx) = ctx.state.channels.register();

        handle_client_text(&ctx.state, connection, "not json");
        assert!(matches!(
            next_event(&mut rx),
            ServerMessage::RequestRejected { error } if error.starts_with("malformed message")
        ));

        handle_client_text(
            &ctx.state,
            connection,
            r#"{"event":"startDownload","data":{"videoUrl":"https://youtu.be/dQw4w9WgXcQ","format":"ogg"}}"#,
        );
        assert_eq!(
            next_event(&mut rx),
            ServerMessage::RequestRejected {
                error: "unsupported format: ogg".into()
            }
        );
        assert_eq!(ctx.state.queue.pending(), 0);
    }

    #[tokio::test]
    async fn static_fallback_serves_index_for_routes() {
        let ctx = ServerTestContext::new(false);
        let response = serve_www_path(&ctx.state.www_root, "/").await.unwrap();
        assert_eq!(body_string(response).await, "<html>app</html>");

        let response = serve_www_path(&ctx.state.www_root, "/history").await.unwrap();
        assert_eq!(body_string(response).await, "<html>app</html>");

        let response = serve_www_path(&ctx.state.www_root, "/app.js").await.unwrap();
        assert_eq!(body_string(response).await, "console.log(1)");

        let err = serve_www_path(&ctx.state.www_root, "/missing.css")
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn static_fallback_keeps_api_namespace() {
        let ctx = ServerTestContext::new(false);
        let req = Request::builder()
            .uri("/api/unknown")
            .body(Body::empty())
            .unwrap();
        let response = static_fallback(State(ctx.state.clone()), req).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn resolve_www_path_rejects_traversal() {
        let root = Path::new("/srv/www");
        assert!(resolve_www_path(root, "/../etc/passwd").is_err());
        assert_eq!(
            resolve_www_path(root, "/css/site.css").unwrap(),
            root.join("css/site.css")
        );
        assert_eq!(resolve_www_path(root, "/").unwrap(), root.join("index.html"));
    }
}
