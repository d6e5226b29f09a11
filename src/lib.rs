pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod storage;
pub mod workflow;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::{EntityStore, Repository};
use crate::middleware::jwt_auth_middleware;
use crate::services::{CategoryService, PosterService, ProductService, UserService};
use crate::storage::{AssetUrlCodec, ObjectStore};
use crate::workflow::ImageWorkflow;

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn EntityStore>,
    pub categories: CategoryService,
    pub posters: PosterService,
    pub products: ProductService,
    pub users: UserService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn EntityStore>, objects: Arc<dyn ObjectStore>) -> Self {
        let images = ImageWorkflow::new(objects, AssetUrlCodec::from_config(&config.storage));

        Self {
            categories: CategoryService::new(
                Repository::new(store.clone()),
                Repository::new(store.clone()),
                Repository::new(store.clone()),
                images.clone(),
            ),
            posters: PosterService::new(Repository::new(store.clone()), images.clone()),
            products: ProductService::new(Repository::new(store.clone()), images),
            users: UserService::new(Repository::new(store.clone()), config.security.clone()),
            config: Arc::new(config),
            store,
        }
    }
}

/// The full application router.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(handlers::root_get))
        .route("/health", get(handlers::health_get))
        .merge(user_routes(&state))
        // Protected
        .merge(category_routes(&state))
        .merge(poster_routes(&state))
        .merge(product_routes(&state))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security.cors_origins));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn user_routes(state: &AppState) -> Router<AppState> {
    use handlers::users;
    let auth = from_fn_with_state(state.clone(), jwt_auth_middleware);

    Router::new()
        .route("/users", get(users::list))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        // Reads are public, writes need a token
        .route(
            "/users/:id",
            get(users::get).merge(put(users::put).delete(users::delete).route_layer(auth)),
        )
}

fn category_routes(state: &AppState) -> Router<AppState> {
    use handlers::categories;

    Router::new()
        .route("/categories", get(categories::list).post(categories::post))
        .route(
            "/categories/:id",
            get(categories::get)
                .put(categories::put)
                .delete(categories::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn poster_routes(state: &AppState) -> Router<AppState> {
    use handlers::posters;

    Router::new()
        .route("/posters", get(posters::list).post(posters::post))
        .route(
            "/posters/:id",
            get(posters::get).put(posters::put).delete(posters::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn product_routes(state: &AppState) -> Router<AppState> {
    use handlers::products;

    Router::new()
        .route("/products", get(products::list).post(products::post))
        .route(
            "/products/:id",
            get(products::get).put(products::put).delete(products::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
