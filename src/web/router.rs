use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    modules::{coordinator, student, submission},
    web::{AppState, admin, auth, landing, storage},
};

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config().max_upload_bytes;

    Router::new()
        .route("/", get(landing::landing_page))
        .route(
            "/auth/login",
            get(auth::login_page).post(auth::process_login),
        )
        .route(
            "/auth/sign-up",
            get(auth::sign_up_page).post(auth::process_sign_up),
        )
        .route("/auth/logout", post(auth::logout))
        .route("/healthz", get(healthz))
        .route("/files/:key", get(storage::serve_object))
        .route("/dashboard/areas", post(admin::create_research_area))
        .route("/dashboard/areas/delete", post(admin::delete_research_area))
        .route("/dashboard/users/role", post(admin::update_user_role))
        .route("/dashboard/users/active", post(admin::update_user_active))
        .merge(submission::router(max_upload_bytes))
        .merge(student::router())
        .merge(coordinator::router())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
