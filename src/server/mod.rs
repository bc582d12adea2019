//! Development server with live reload
//!
//! Serves the generated site and adds what static files cannot do: posts
//! that were not generated are resolved on demand, and in live pagination
//! mode "load more" is answered from the backend.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path as RoutePath, Query, State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::client::{ClientError, ContentSource, Cursor, PrismicClient};
use crate::generator::Generator;
use crate::helpers::is_valid_slug;
use crate::templates::LoadMoreResponse;
use crate::Blog;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Progress of a post resolved on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Resolving,
    Missing,
}

/// Server state
pub(crate) struct ServerState<S> {
    generator: RwLock<Arc<Generator<S>>>,
    pending: Mutex<HashMap<String, Resolution>>,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl<S: ContentSource + 'static> ServerState<S> {
    pub(crate) fn new(generator: Generator<S>, live_reload: bool) -> Self {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        Self {
            generator: RwLock::new(Arc::new(generator)),
            pending: Mutex::new(HashMap::new()),
            reload_tx,
            live_reload,
        }
    }

    async fn generator(&self) -> Arc<Generator<S>> {
        self.generator.read().await.clone()
    }

    async fn public_dir(&self) -> PathBuf {
        self.generator().await.blog().public_dir.clone()
    }

    fn resolution(&self, slug: &str) -> Option<Resolution> {
        self.pending.lock().ok()?.get(slug).copied()
    }

    fn set_resolution(&self, slug: &str, resolution: Option<Resolution>) {
        if let Ok(mut pending) = self.pending.lock() {
            match resolution {
                Some(r) => pending.insert(slug.to_string(), r),
                None => pending.remove(slug),
            };
        }
    }

    /// Mark `slug` as resolving; false when it already is
    fn begin_resolution(&self, slug: &str) -> bool {
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        if pending.contains_key(slug) {
            return false;
        }
        pending.insert(slug.to_string(), Resolution::Resolving);
        true
    }
}

/// Build the router over a server state
pub(crate) fn router<S: ContentSource + 'static>(state: Arc<ServerState<S>>) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler::<S>))
        .route("/post/:slug", get(post_handler::<S>))
        .route("/post/:slug/", get(post_handler::<S>))
        .route("/api/posts", get(load_more_handler::<S>))
        .fallback(fallback_handler::<S>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the development server
pub async fn start(blog: &Blog, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let generator = Generator::new(blog, blog.client()?)?;
    let state = Arc::new(ServerState::new(generator, watch));
    let app = router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let base_dir = blog.base_dir.clone();
        let source_dir = blog.source_dir.clone();
        let config_path = blog.config_path();
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = watch_and_reload(base_dir, source_dir, config_path, state).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch the configuration and source assets, regenerate on change
async fn watch_and_reload(
    base_dir: PathBuf,
    source_dir: PathBuf,
    config_path: PathBuf,
    state: Arc<ServerState<PrismicClient>>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<DebounceEventResult>(16);

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            let _ = tx.blocking_send(res);
        },
    )?;

    if source_dir.exists() {
        debouncer
            .watcher()
            .watch(&source_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", source_dir);
    }

    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    while let Some(result) = rx.recv().await {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        let relevant: Vec<_> = events
            .iter()
            .filter(|e| {
                let path_str = e.path.to_string_lossy();
                !path_str.contains(".git")
                    && !path_str.contains(".DS_Store")
                    && !path_str.ends_with('~')
            })
            .collect();
        if relevant.is_empty() {
            continue;
        }

        for event in &relevant {
            tracing::info!("File changed: {}", event.path.display());
        }

        match regenerate(&base_dir).await {
            Ok(generator) => {
                *state.generator.write().await = Arc::new(generator);
                tracing::info!("Regenerated successfully");
                let _ = state.reload_tx.send(());
            }
            Err(e) => {
                tracing::error!("Generation failed: {:#}", e);
            }
        }
    }

    Ok(())
}

/// Reload the configuration and write the site again
async fn regenerate(base_dir: &Path) -> Result<Generator<PrismicClient>> {
    let blog = Blog::new(base_dir)?;
    let generator = Generator::new(&blog, blog.client()?)?;
    generator.generate().await?;
    Ok(generator)
}

/// WebSocket handler for live reload
async fn livereload_handler<S: ContentSource + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState<S>>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Post page, resolved on demand when it was not generated
async fn post_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    RoutePath(slug): RoutePath<String>,
) -> Response {
    let generator = state.generator().await;

    if !is_valid_slug(&slug) {
        return not_found(&generator);
    }

    let file_path = generator.post_output_path(&slug);
    if file_path.exists() {
        return serve_html(&state, &file_path).await;
    }

    match state.resolution(&slug) {
        Some(Resolution::Missing) => {
            // Answer once, then allow the slug to be tried again
            state.set_resolution(&slug, None);
            return not_found(&generator);
        }
        Some(Resolution::Resolving) => {}
        None => {
            if state.begin_resolution(&slug) {
                spawn_resolution(state.clone(), generator.clone(), slug);
            }
        }
    }

    match generator.renderer().render_loading() {
        Ok(html) => Html(inject_if(&state, html)).into_response(),
        Err(e) => server_error(e),
    }
}

fn spawn_resolution<S: ContentSource + 'static>(
    state: Arc<ServerState<S>>,
    generator: Arc<Generator<S>>,
    slug: String,
) {
    tokio::spawn(async move {
        match generator.generate_post(&slug).await {
            Ok(path) => {
                tracing::info!("Resolved post {} to {:?}", slug, path);
                state.set_resolution(&slug, None);
            }
            Err(e) => {
                let missing = e
                    .downcast_ref::<ClientError>()
                    .is_some_and(ClientError::is_not_found);
                if missing {
                    tracing::warn!("Post {} not found", slug);
                } else {
                    tracing::error!("Failed to resolve post {}: {:#}", slug, e);
                }
                state.set_resolution(&slug, Some(Resolution::Missing));
            }
        }
    });
}

#[derive(Debug, Deserialize)]
struct LoadMoreQuery {
    cursor: String,
}

/// Live "load more": the page after the given cursor
async fn load_more_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    Query(query): Query<LoadMoreQuery>,
) -> Response {
    let cursor = match Cursor::from_token(&query.cursor) {
        Ok(cursor) => cursor,
        Err(e) => {
            let response = LoadMoreResponse::Failed {
                error: e.to_string(),
                retry: String::new(),
            };
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let generator = state.generator().await;
    let response = generator.continuation(&cursor).await;
    let status = match response {
        LoadMoreResponse::Loaded { .. } => StatusCode::OK,
        LoadMoreResponse::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(response)).into_response()
}

/// Fallback handler that serves files and injects live reload script
async fn fallback_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    request: Request<Body>,
) -> Response {
    let public_dir = state.public_dir().await;
    let Some(file_path) = public_file(&public_dir, request.uri().path()) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        serve_html(&state, &file_path).await
    } else {
        let mut service = ServeDir::new(&public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// File under `public_dir` a request path refers to
///
/// Paths that would leave the public directory yield `None`.
fn public_file(public_dir: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let candidate = public_dir.join(relative);
    if candidate.is_dir() {
        Some(candidate.join("index.html"))
    } else {
        Some(candidate)
    }
}

async fn serve_html<S>(state: &ServerState<S>, file_path: &Path) -> Response {
    match tokio::fs::read_to_string(file_path).await {
        Ok(content) => Html(inject_if(state, content)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn not_found<S: ContentSource>(generator: &Generator<S>) -> Response {
    match generator.renderer().render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => server_error(e),
    }
}

fn server_error(e: anyhow::Error) -> Response {
    tracing::error!("Render error: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

fn inject_if<S>(state: &ServerState<S>, html: String) -> String {
    if state.live_reload {
        inject_live_reload(&html)
    } else {
        html
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
