//! HTTP surface: shared state, routes, the live update socket, and server
//! start helpers.
//!
//! Handlers are thin: they decode the request, call [`TaskService`] or
//! [`UserService`], and encode the result. Task mutations publish their change
//! hint inside the service, so a handler never notifies directly.

use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{DefaultBodyLimit, FromRequest, Path, Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use futures_util::{SinkExt, StreamExt};
use taskboard_proto::ack::{DeleteResult, InsertOneResult, UpdateResult};
use taskboard_proto::event::{self, ServerEvent};
use taskboard_proto::message::{LIVENESS_TEXT, MessageResponse};
use taskboard_proto::reorder::{ReorderRequest, ReorderResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::notify::BroadcastHub;
use crate::store::{Document, DocumentStore, MemoryStore};
use crate::tasks::TaskService;
use crate::users::{Registration, UserService};

/// Default request body limit in bytes (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Boxed error returned by the start helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// State shared by every handler.
pub struct AppState {
    /// Task operations.
    pub tasks: TaskService,
    /// User operations.
    pub users: UserService,
    /// Connected live update observers.
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    /// Wires both services to `store` and publishes task changes on `hub`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            tasks: TaskService::new(Arc::clone(&store), hub.clone()),
            users: UserService::new(store),
            hub,
        }
    }

    /// State over a fresh [`MemoryStore`] and an empty hub.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(BroadcastHub::new()))
    }

    /// Enables or disables the creation timestamp on new tasks.
    #[must_use]
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.tasks = self.tasks.with_timestamps(enabled);
        self
    }
}

/// JSON body extractor whose rejections are `{"error": ...}` responses.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Builds the application router with CORS, request tracing, and a body
/// size limit.
#[must_use]
pub fn router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/Alltask", get(list_tasks))
        .route("/task", post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/delete/{id}", delete(delete_task))
        .route("/reorder", put(reorder_tasks))
        .route("/user", post(register_user))
        .route("/users", get(list_users))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.tasks.list().await?))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    state
        .tasks
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("task not found"))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    ApiJson(fields): ApiJson<Document>,
) -> ApiResult<Json<InsertOneResult>> {
    Ok(Json(state.tasks.create(fields).await?))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<Document>,
) -> ApiResult<Json<UpdateResult>> {
    Ok(Json(state.tasks.update(&id, fields).await?))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResult>> {
    Ok(Json(state.tasks.delete(&id).await?))
}

async fn reorder_tasks(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> Response {
    match state
        .tasks
        .reorder(request.category.as_deref(), request.tasks)
        .await
    {
        Ok(_) => Json(ReorderResponse::success()).into_response(),
        Err(e) => {
            let error = e.to_string();
            let applied = e.applied;
            let status = ApiError::from(e.source).status();
            let body = ReorderResponse::Failure { error, applied };
            (status, Json(body)).into_response()
        }
    }
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    ApiJson(fields): ApiJson<Document>,
) -> ApiResult<Response> {
    let response = match state.users.register(fields).await? {
        Registration::Created(result) => Json(result).into_response(),
        Registration::AlreadyExists => {
            Json(MessageResponse::user_already_exists()).into_response()
        }
    };
    Ok(response)
}

async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.users.list().await?))
}

/// axum handler that upgrades an HTTP request to a live update socket.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Serves one observer connection.
///
/// The connection lifecycle:
/// 1. Register the observer with the hub.
/// 2. Send a `connected` event carrying its subscriber id.
/// 3. Forward every broadcast frame until either side closes.
/// 4. Unregister the observer.
pub async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Subscribe before the greeting so no broadcast slips between the two;
    // anything published meanwhile waits in the outbound slot.
    let (subscriber, mut rx) = hub.subscribe();

    let hello = ServerEvent::Connected {
        subscriber_id: subscriber.to_string(),
    };
    if let Err(e) = send_event(&mut ws_sender, &hello).await {
        tracing::warn!(subscriber = %subscriber, error = %e, "failed to greet observer");
        hub.unsubscribe(subscriber);
        return;
    }
    tracing::info!(subscriber = %subscriber, "observer connected");

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(subscriber = %subscriber, "WebSocket write failed");
                return;
            }
        }
        // The hub dropped this observer.
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    // Observers are receive-only; inbound frames other than Close are ignored.
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                tracing::debug!(subscriber = %subscriber, "received close frame");
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    hub.unsubscribe(subscriber);
    tracing::info!(subscriber = %subscriber, "observer disconnected");
}

async fn send_event(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    event: &ServerEvent,
) -> Result<(), String> {
    let text = event::encode(event).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}

/// Starts the server on `addr` and returns the bound address and a join
/// handle. The server runs until the handle is aborted.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    state: Arc<AppState>,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), BoxError> {
    start_server_with_shutdown(
        addr,
        router(state, DEFAULT_MAX_BODY_SIZE),
        std::future::pending(),
    )
    .await
}

/// Starts serving `app` on `addr`, stopping gracefully once `shutdown`
/// resolves.
///
/// `shutdown` should close open observer sockets (see
/// [`BroadcastHub::close_all`]) before resolving.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_shutdown<F>(
    addr: &str,
    app: Router,
    shutdown: F,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), BoxError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
