use crate::service::Workspace;
use crate::state::SheetRegistry;
use crate::watcher::{changed_paths, SheetFilter, SheetWatcher, WatcherError};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Watch(#[from] WatcherError),
}

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory that sheet file names resolve against
    pub root_dir: PathBuf,
    pub sheet_filter: Option<String>,
    pub watch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3219,
            root_dir: PathBuf::from("."),
            sheet_filter: None,
            watch: true,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Websocket routes over a shared workspace
pub fn router(workspace: Workspace) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(workspace)
}

/// Run the synchronization server until the listener fails
pub async fn serve(config: ServerConfig) -> ServerResult<()> {
    let filter = SheetFilter::new(config.sheet_filter.as_deref())?;
    let root_dir = config
        .root_dir
        .canonicalize()
        .unwrap_or_else(|_| config.root_dir.clone());
    let workspace = Workspace::new(SheetRegistry::new(), root_dir.clone(), filter);

    if config.watch {
        let watcher = SheetWatcher::new(&root_dir)?;
        tokio::spawn(watch_sources(watcher, workspace.clone()));
        info!(root = %root_dir.display(), "Watching sheet sources");
    }

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!(%address, "Listening");

    axum::serve(listener, router(workspace)).await?;
    Ok(())
}

async fn watch_sources(mut watcher: SheetWatcher, workspace: Workspace) {
    while let Some(event) = watcher.next_event().await {
        for path in changed_paths(&event) {
            debug!(path = %path.display(), "Source changed");
            workspace.refresh_path(path).await;
        }
    }
    warn!("Sheet watcher stopped");
}

async fn ws_handler(ws: WebSocketUpgrade, State(workspace): State<Workspace>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, workspace))
}

async fn handle_socket(socket: WebSocket, workspace: Workspace) {
    let (id, mut outbox) = workspace.connect().await;
    let (mut sender, mut receiver) = socket.split();

    // Single writer per socket keeps the outbox order on the wire
    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            if let Err(error) = sender.send(Message::Text(message.to_text())).await {
                debug!(connection = id, %error, "Socket closed while sending");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => workspace.handle_text(id, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(connection = id, %error, "Socket error");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    workspace.disconnect(id).await;
    writer.abort();
}
