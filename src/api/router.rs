use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use super::{
    handlers,
    middleware::{auth_middleware, optional_auth_middleware},
    realtime::handle_websocket,
};
use crate::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.upload.max_request_bytes;

    // Album routes readable without a token when the album allows it
    let album_read_routes = Router::new()
        .route("/:id", get(handlers::albums::get_album))
        .route("/:id/stickers", get(handlers::stickers::list_stickers))
        .route("/:id/messages", get(handlers::messages::get_messages))
        .route("/:id/messages/ws", get(handle_websocket))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let album_write_routes = Router::new()
        .route(
            "/",
            get(handlers::albums::list_albums).post(handlers::albums::create_album),
        )
        .route(
            "/:id",
            patch(handlers::albums::update_album).delete(handlers::albums::delete_album),
        )
        .route(
            "/:id/stickers",
            post(handlers::stickers::upload_stickers)
                .layer(DefaultBodyLimit::max(upload_limit))
                .patch(handlers::stickers::reorder_stickers)
                .delete(handlers::stickers::delete_stickers),
        )
        .route("/:id/messages", post(handlers::messages::send_message))
        .route(
            "/:id/collaborators",
            get(handlers::collaborators::list_collaborators)
                .post(handlers::collaborators::add_collaborator),
        )
        .route(
            "/:id/collaborators/:user_id",
            delete(handlers::collaborators::remove_collaborator),
        )
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let pack_read_routes = Router::new()
        .route("/:id", get(handlers::packs::get_pack))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let pack_write_routes = Router::new()
        .route("/", post(handlers::packs::create_pack))
        .route("/:id/publish", post(handlers::packs::publish_pack))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Sharing tools
    let share_routes = Router::new()
        .route("/share/whatsapp", post(handlers::share::share_whatsapp))
        .route("/zip", post(handlers::share::download_zip))
        .route("/qr", post(handlers::share::generate_qr))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Public album pages (no auth)
    let public_routes = Router::new().route(
        "/albums/:slug",
        get(handlers::public::get_public_album),
    );

    // Combine all routes
    Router::new()
        .nest("/albums", album_read_routes.merge(album_write_routes))
        .nest("/packs", pack_read_routes.merge(pack_write_routes))
        .nest("/public", public_routes)
        .merge(share_routes)
        .with_state(state)
}

/// Full application: API, health check and mock object downloads.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/storage/*key", get(handlers::public::get_object))
        .nest("/api", create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
