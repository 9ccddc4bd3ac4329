/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use taskboard_shared::{notify::NoopNotifier, repository::InMemoryStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let state = AppState::new(
///     Arc::new(InMemoryStore::new()),
///     Config::for_testing(),
///     Arc::new(NoopNotifier),
/// );
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use std::sync::Arc;
use taskboard_shared::{
    auth::{
        jwt::JwtIssuer,
        middleware::{extract_token, AuthContext},
        password::{Argon2Hasher, CredentialHasher},
    },
    notify::Notifier,
    repository::{StoreHealth, TaskRepository, UserRepository},
    services::{TaskService, UserService},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request by Axum's `State` extractor; everything inside is
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub tasks: TaskService,

    /// Backing store check for `/health`
    pub health: Arc<dyn StoreHealth>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services over a single store with the default Argon2 hasher
    pub fn new<S>(store: Arc<S>, config: Config, notifier: Arc<dyn Notifier>) -> Self
    where
        S: UserRepository + TaskRepository + StoreHealth + 'static,
    {
        Self::with_hasher(store, config, notifier, Arc::new(Argon2Hasher::new()))
    }

    pub fn with_hasher<S>(
        store: Arc<S>,
        config: Config,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self
    where
        S: UserRepository + TaskRepository + StoreHealth + 'static,
    {
        let tokens = Arc::new(JwtIssuer::with_ttl(
            config.jwt.secret.clone(),
            Duration::hours(config.jwt.expiration_hours),
        ));

        let users = UserService::new(store.clone(), hasher, tokens, notifier);
        let tasks = TaskService::new(store.clone(), store.clone());

        Self {
            users,
            tasks,
            health: store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── /auth/                         (public)
///     │   ├── POST /register
///     │   └── POST /login
///     ├── /users/                        (bearer token or cookie)
///     │   ├── GET   /
///     │   ├── GET   /me
///     │   ├── PATCH /me
///     │   └── GET   /:id
///     └── /tasks/                        (bearer token or cookie)
///         ├── GET    /
///         ├── POST   /
///         ├── GET    /created
///         ├── GET    /assigned
///         ├── GET    /:id
///         ├── PATCH  /:id
///         ├── DELETE /:id
///         ├── POST   /:id/complete
///         ├── POST   /:id/assign/:user_id
///         └── POST   /:id/primary/:user_id
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route(
            "/me",
            get(routes::users::current_user).patch(routes::users::update_current_user),
        )
        .route("/:id", get(routes::users::get_user));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/created", get(routes::tasks::list_created))
        .route("/assigned", get(routes::tasks::list_assigned))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/complete", post(routes::tasks::complete_task))
        .route("/:id/assign/:user_id", post(routes::tasks::assign_task))
        .route("/:id/primary/:user_id", post(routes::tasks::set_primary));

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Validates the bearer token (or session cookie) and injects
/// [`AuthContext`] into the request
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = req.headers();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());

    let token = extract_token(authorization, cookie)?;
    let user_id = state.users.verify_token(token)?;

    req.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(req).await)
}
