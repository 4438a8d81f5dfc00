//! RelayQ Server - Message Broker HTTP Server
//!
//! This is the main entry point for the RelayQ message broker.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use clap::Parser;
use relayq_core::{sample, Broker};
use relayq_storage::{InMemoryExchangeRepository, InMemoryQueueRepository};
use relayq_types::{
    validation::Rules, Binding, Durability, Error, Exchange, FieldError, Message, Queue,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

// ==================== App State ====================

/// Shared application state
#[derive(Clone)]
struct AppState {
    broker: Arc<Broker>,
}

// ==================== Request/Response Types ====================

/// Create queue request
#[derive(Debug, Deserialize, ToSchema)]
struct CreateQueueRequest {
    /// Name of the queue to create
    #[serde(default)]
    name: String,
    /// Queue durability: "durable" or "transient" (informational only)
    #[serde(default)]
    durability: String,
}

impl CreateQueueRequest {
    fn validate(&self) -> Result<Durability, Error> {
        let mut rules = Rules::new();
        rules.required("name", &self.name);
        rules.required("durability", &self.durability);
        rules.one_of("durability", &self.durability, &Durability::VALUES);
        rules.finish()?;

        // one_of already rejected anything unparseable
        Ok(Durability::parse(&self.durability).unwrap_or(Durability::Transient))
    }
}

/// Queue details
#[derive(Debug, Serialize, ToSchema)]
struct QueueResponse {
    /// Queue name
    name: String,
    /// Durability marker (no persistence effect)
    durability: Durability,
    /// Reserved system queue, exempt from deletion
    system: bool,
    /// Number of messages currently held, in-flight ones included
    messages: usize,
}

impl From<&Queue> for QueueResponse {
    fn from(queue: &Queue) -> Self {
        Self {
            name: queue.name().to_string(),
            durability: queue.durability(),
            system: queue.is_system(),
            messages: queue.len(),
        }
    }
}

/// Create exchange request
#[derive(Debug, Deserialize, ToSchema)]
struct CreateExchangeRequest {
    /// Name of the exchange to create
    #[serde(default)]
    name: String,
}

impl CreateExchangeRequest {
    fn validate(&self) -> Result<(), Error> {
        let mut rules = Rules::new();
        rules.required("name", &self.name);
        rules.finish()
    }
}

/// Exchange details
#[derive(Debug, Serialize, ToSchema)]
struct ExchangeResponse {
    /// Exchange name
    name: String,
    /// Bindings in insertion order
    bindings: Vec<Binding>,
}

impl From<&Exchange> for ExchangeResponse {
    fn from(exchange: &Exchange) -> Self {
        Self {
            name: exchange.name().to_string(),
            bindings: exchange.bindings(),
        }
    }
}

/// Add binding request
#[derive(Debug, Deserialize, ToSchema)]
struct AddBindingRequest {
    /// Name of the target queue (must exist)
    #[serde(default)]
    queue: String,
    /// Routing key; stored and echoed back, never evaluated
    #[serde(default)]
    routing_key: String,
}

impl AddBindingRequest {
    fn validate(&self) -> Result<(), Error> {
        let mut rules = Rules::new();
        rules.required("queue", &self.queue);
        rules.finish()
    }
}

/// Publish message request
#[derive(Debug, Deserialize, ToSchema)]
struct PublishRequest {
    /// Message payload (opaque)
    #[serde(default)]
    payload: String,
}

impl PublishRequest {
    fn validate(&self) -> Result<(), Error> {
        let mut rules = Rules::new();
        rules.required("payload", &self.payload);
        rules.finish()
    }
}

/// Peek/consume query parameters
#[derive(Debug, Deserialize, ToSchema)]
struct LimitQuery {
    /// Maximum number of messages (default: 1)
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    1
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit.max(1) as usize
    }
}

/// API error response
#[derive(Debug, Serialize, ToSchema)]
struct ApiErrorBody {
    /// Stable machine-readable error code
    code: String,
    /// Human-readable error message
    message: String,
    /// Field-level failures, present for VALIDATION_ERROR only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    /// Health status
    status: String,
    /// Server version
    version: String,
}

// ==================== Error Handling ====================

/// Wrapper for broker errors to implement IntoResponse
struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            Error::QueueNotFound(_)
            | Error::ExchangeNotFound(_)
            | Error::BindingNotFound(_)
            | Error::MessageNotFound(_) => StatusCode::NOT_FOUND,
            Error::QueueAlreadyExists(_)
            | Error::QueueNonDeletable(_)
            | Error::ExchangeAlreadyExists(_)
            | Error::BindingAlreadyExists(_) => StatusCode::CONFLICT,
            Error::ParamInvalid { .. } | Error::Validation(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ApiErrorBody {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
            errors: self.0.field_errors().to_vec(),
        });

        (status, body).into_response()
    }
}

fn parse_uuid(param: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|e| {
        AppError(Error::ParamInvalid {
            param: param.to_string(),
            message: e.to_string(),
        })
    })
}

// ==================== OpenAPI Documentation ====================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RelayQ API",
        version = "0.1.0",
        description = "RelayQ - Lightweight Message Broker API",
        license(name = "MIT OR Apache-2.0"),
        contact(name = "RelayQ Team", url = "https://github.com/relayq/relayq")
    ),
    paths(
        health,
        list_queues,
        create_queue,
        get_queue,
        delete_queue,
        publish_to_queue,
        peek_messages,
        consume_messages,
        purge_queue,
        ack_message,
        nack_message,
        list_exchanges,
        create_exchange,
        get_exchange,
        delete_exchange,
        add_binding,
        delete_binding,
        publish_to_exchange,
    ),
    components(
        schemas(
            HealthResponse,
            CreateQueueRequest,
            QueueResponse,
            CreateExchangeRequest,
            ExchangeResponse,
            AddBindingRequest,
            Binding,
            PublishRequest,
            Message,
            ApiErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "queues", description = "Queue management and message operations"),
        (name = "exchanges", description = "Exchange and binding management")
    )
)]
struct ApiDoc;

// ==================== Queue Handlers ====================

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List all queues, sorted by name
#[utoipa::path(
    get,
    path = "/api/v1/queues",
    tag = "queues",
    responses(
        (status = 200, description = "List of all queues", body = Vec<QueueResponse>)
    )
)]
async fn list_queues(State(state): State<AppState>) -> Json<Vec<QueueResponse>> {
    let queues = state
        .broker
        .list_queues()
        .iter()
        .map(|queue| QueueResponse::from(queue.as_ref()))
        .collect();
    Json(queues)
}

/// Create a new queue
#[utoipa::path(
    post,
    path = "/api/v1/queues",
    tag = "queues",
    request_body = CreateQueueRequest,
    responses(
        (status = 201, description = "Queue created", body = QueueResponse),
        (status = 400, description = "Invalid request body", body = ApiErrorBody),
        (status = 409, description = "Queue already exists", body = ApiErrorBody)
    )
)]
async fn create_queue(
    State(state): State<AppState>,
    Json(req): Json<CreateQueueRequest>,
) -> Result<(StatusCode, Json<QueueResponse>), AppError> {
    let durability = req.validate()?;
    let queue = state.broker.create_queue(&req.name, durability)?;
    Ok((StatusCode::CREATED, Json(QueueResponse::from(queue.as_ref()))))
}

/// Get queue details
#[utoipa::path(
    get,
    path = "/api/v1/queues/{name}",
    tag = "queues",
    params(("name" = String, Path, description = "Queue name")),
    responses(
        (status = 200, description = "Queue details", body = QueueResponse),
        (status = 404, description = "Queue not found", body = ApiErrorBody)
    )
)]
async fn get_queue(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<QueueResponse>, AppError> {
    let queue = state.broker.get_queue(&name)?;
    Ok(Json(QueueResponse::from(queue.as_ref())))
}

/// Delete a queue
#[utoipa::path(
    delete,
    path = "/api/v1/queues/{name}",
    tag = "queues",
    params(("name" = String, Path, description = "Queue name")),
    responses(
        (status = 204, description = "Queue deleted"),
        (status = 404, description = "Queue not found", body = ApiErrorBody),
        (status = 409, description = "Queue is a system queue", body = ApiErrorBody)
    )
)]
async fn delete_queue(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.broker.delete_queue(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Publish a message directly to a queue
#[utoipa::path(
    post,
    path = "/api/v1/queues/{name}/messages/publish",
    tag = "queues",
    params(("name" = String, Path, description = "Queue name")),
    request_body = PublishRequest,
    responses(
        (status = 201, description = "Message published", body = Message),
        (status = 400, description = "Invalid request body", body = ApiErrorBody),
        (status = 404, description = "Queue not found", body = ApiErrorBody)
    )
)]
async fn publish_to_queue(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<PublishRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    req.validate()?;

    let message = Message::new(req.payload);
    state.broker.publish_to_queue(&name, message.clone())?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Peek at messages without consuming them
#[utoipa::path(
    get,
    path = "/api/v1/queues/{name}/messages/peek",
    tag = "queues",
    params(
        ("name" = String, Path, description = "Queue name"),
        ("limit" = Option<i64>, Query, description = "Maximum messages to return")
    ),
    responses(
        (status = 200, description = "Messages from the head of the queue", body = Vec<Message>),
        (status = 404, description = "Queue not found", body = ApiErrorBody)
    )
)]
async fn peek_messages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.broker.peek(&name, query.limit())?;
    Ok(Json(messages))
}

/// Consume messages (dequeue + immediate ack)
#[utoipa::path(
    post,
    path = "/api/v1/queues/{name}/messages/consume",
    tag = "queues",
    params(
        ("name" = String, Path, description = "Queue name"),
        ("limit" = Option<i64>, Query, description = "Maximum messages to consume")
    ),
    responses(
        (status = 200, description = "Consumed messages, possibly empty", body = Vec<Message>),
        (status = 404, description = "Queue not found", body = ApiErrorBody)
    )
)]
async fn consume_messages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.broker.consume(&name, query.limit())?;
    Ok(Json(messages))
}

/// Purge all messages from a queue
#[utoipa::path(
    post,
    path = "/api/v1/queues/{name}/messages/purge",
    tag = "queues",
    params(("name" = String, Path, description = "Queue name")),
    responses(
        (status = 204, description = "Queue purged"),
        (status = 404, description = "Queue not found", body = ApiErrorBody)
    )
)]
async fn purge_queue(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.broker.purge(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Acknowledge an in-flight message
#[utoipa::path(
    post,
    path = "/api/v1/queues/{name}/messages/{messageId}/ack",
    tag = "queues",
    params(
        ("name" = String, Path, description = "Queue name"),
        ("messageId" = String, Path, description = "Message id")
    ),
    responses(
        (status = 202, description = "Message acknowledged"),
        (status = 400, description = "Malformed message id", body = ApiErrorBody),
        (status = 404, description = "Queue or message not found", body = ApiErrorBody)
    )
)]
async fn ack_message(
    State(state): State<AppState>,
    Path((name, message_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let message_id = parse_uuid("messageId", &message_id)?;
    state.broker.ack(&name, message_id)?;
    Ok(StatusCode::ACCEPTED)
}

/// Negatively acknowledge an in-flight message, moving it to the
/// dead-letter queue
#[utoipa::path(
    post,
    path = "/api/v1/queues/{name}/messages/{messageId}/nack",
    tag = "queues",
    params(
        ("name" = String, Path, description = "Queue name"),
        ("messageId" = String, Path, description = "Message id")
    ),
    responses(
        (status = 204, description = "Message moved to the dead-letter queue"),
        (status = 400, description = "Malformed message id", body = ApiErrorBody),
        (status = 404, description = "Queue or message not found", body = ApiErrorBody)
    )
)]
async fn nack_message(
    State(state): State<AppState>,
    Path((name, message_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let message_id = parse_uuid("messageId", &message_id)?;
    state.broker.nack(&name, message_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Exchange Handlers ====================

/// List all exchanges, sorted by name
#[utoipa::path(
    get,
    path = "/api/v1/exchanges",
    tag = "exchanges",
    responses(
        (status = 200, description = "List of all exchanges", body = Vec<ExchangeResponse>)
    )
)]
async fn list_exchanges(State(state): State<AppState>) -> Json<Vec<ExchangeResponse>> {
    let exchanges = state
        .broker
        .list_exchanges()
        .iter()
        .map(|exchange| ExchangeResponse::from(exchange.as_ref()))
        .collect();
    Json(exchanges)
}

/// Create a new exchange
#[utoipa::path(
    post,
    path = "/api/v1/exchanges",
    tag = "exchanges",
    request_body = CreateExchangeRequest,
    responses(
        (status = 201, description = "Exchange created", body = ExchangeResponse),
        (status = 400, description = "Invalid request body", body = ApiErrorBody),
        (status = 409, description = "Exchange already exists", body = ApiErrorBody)
    )
)]
async fn create_exchange(
    State(state): State<AppState>,
    Json(req): Json<CreateExchangeRequest>,
) -> Result<(StatusCode, Json<ExchangeResponse>), AppError> {
    req.validate()?;
    let exchange = state.broker.create_exchange(&req.name)?;
    Ok((
        StatusCode::CREATED,
        Json(ExchangeResponse::from(exchange.as_ref())),
    ))
}

/// Get exchange details
#[utoipa::path(
    get,
    path = "/api/v1/exchanges/{name}",
    tag = "exchanges",
    params(("name" = String, Path, description = "Exchange name")),
    responses(
        (status = 200, description = "Exchange details", body = ExchangeResponse),
        (status = 404, description = "Exchange not found", body = ApiErrorBody)
    )
)]
async fn get_exchange(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let exchange = state.broker.get_exchange(&name)?;
    Ok(Json(ExchangeResponse::from(exchange.as_ref())))
}

/// Delete an exchange
#[utoipa::path(
    delete,
    path = "/api/v1/exchanges/{name}",
    tag = "exchanges",
    params(("name" = String, Path, description = "Exchange name")),
    responses(
        (status = 202, description = "Exchange deleted"),
        (status = 404, description = "Exchange not found", body = ApiErrorBody)
    )
)]
async fn delete_exchange(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.broker.delete_exchange(&name)?;
    Ok(StatusCode::ACCEPTED)
}

/// Bind a queue to an exchange
#[utoipa::path(
    post,
    path = "/api/v1/exchanges/{name}/bindings",
    tag = "exchanges",
    params(("name" = String, Path, description = "Exchange name")),
    request_body = AddBindingRequest,
    responses(
        (status = 201, description = "Binding created", body = Binding),
        (status = 400, description = "Invalid request body", body = ApiErrorBody),
        (status = 404, description = "Exchange or queue not found", body = ApiErrorBody),
        (status = 409, description = "Queue already bound", body = ApiErrorBody)
    )
)]
async fn add_binding(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<AddBindingRequest>,
) -> Result<(StatusCode, Json<Binding>), AppError> {
    req.validate()?;

    let binding = state
        .broker
        .add_binding(&name, Binding::new(req.queue, req.routing_key))?;
    Ok((StatusCode::CREATED, Json(binding)))
}

/// Remove a binding from an exchange
#[utoipa::path(
    delete,
    path = "/api/v1/exchanges/{name}/bindings/{bindingId}",
    tag = "exchanges",
    params(
        ("name" = String, Path, description = "Exchange name"),
        ("bindingId" = String, Path, description = "Binding id")
    ),
    responses(
        (status = 202, description = "Binding deleted"),
        (status = 400, description = "Malformed binding id", body = ApiErrorBody),
        (status = 404, description = "Exchange or binding not found", body = ApiErrorBody)
    )
)]
async fn delete_binding(
    State(state): State<AppState>,
    Path((name, binding_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let binding_id = parse_uuid("bindingId", &binding_id)?;
    state.broker.delete_binding(&name, binding_id)?;
    Ok(StatusCode::ACCEPTED)
}

/// Publish a message to an exchange (fanout to every bound queue)
#[utoipa::path(
    post,
    path = "/api/v1/exchanges/{name}/messages/publish",
    tag = "exchanges",
    params(("name" = String, Path, description = "Exchange name")),
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Message fanned out to all bound queues"),
        (status = 400, description = "Invalid request body", body = ApiErrorBody),
        (status = 404, description = "Exchange or bound queue not found", body = ApiErrorBody)
    )
)]
async fn publish_to_exchange(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<PublishRequest>,
) -> Result<StatusCode, AppError> {
    req.validate()?;

    state
        .broker
        .publish_to_exchange(&name, Message::new(req.payload))?;
    Ok(StatusCode::OK)
}

// ==================== Router ====================

fn create_router(state: AppState) -> Router {
    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Health
        .route("/health", get(health))
        // Queues
        .route("/api/v1/queues", get(list_queues).post(create_queue))
        .route("/api/v1/queues/:name", get(get_queue).delete(delete_queue))
        .route(
            "/api/v1/queues/:name/messages/publish",
            post(publish_to_queue),
        )
        .route("/api/v1/queues/:name/messages/peek", get(peek_messages))
        .route(
            "/api/v1/queues/:name/messages/consume",
            post(consume_messages),
        )
        .route("/api/v1/queues/:name/messages/purge", post(purge_queue))
        .route(
            "/api/v1/queues/:name/messages/:messageId/ack",
            post(ack_message),
        )
        .route(
            "/api/v1/queues/:name/messages/:messageId/nack",
            post(nack_message),
        )
        // Exchanges
        .route(
            "/api/v1/exchanges",
            get(list_exchanges).post(create_exchange),
        )
        .route(
            "/api/v1/exchanges/:name",
            get(get_exchange).delete(delete_exchange),
        )
        .route("/api/v1/exchanges/:name/bindings", post(add_binding))
        .route(
            "/api/v1/exchanges/:name/bindings/:bindingId",
            delete(delete_binding),
        )
        .route(
            "/api/v1/exchanges/:name/messages/publish",
            post(publish_to_exchange),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Main ====================

/// RelayQ message broker server
#[derive(Debug, Parser)]
#[command(name = "relayq", version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    listen: String,

    /// Seed the broker with sample queues and exchanges
    #[arg(long)]
    with_sample_data: bool,
}

fn build_broker() -> Broker {
    Broker::new(
        Arc::new(InMemoryQueueRepository::new()),
        Arc::new(InMemoryExchangeRepository::new()),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "relayq_server=debug,relayq_core=debug,relayq_storage=debug,tower_http=debug"
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = build_broker();
    if args.with_sample_data {
        sample::seed(&broker)?;
        info!("Sample data seeded");
    }

    let state = AppState {
        broker: Arc::new(broker),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("RelayQ server listening on {}", args.listen);
    info!("Swagger UI: http://{}/swagger-ui/", args.listen);

    axum::serve(listener, app).await?;

    Ok(())
}

// ==================== Tests ====================
