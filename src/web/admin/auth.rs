use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;

use crate::web::{AppState, AuthUser, access::Area, auth};

pub async fn require_admin_user(state: &AppState, jar: &CookieJar) -> Result<AuthUser, Redirect> {
    auth::require_area(state, jar, Area::Coordinator).await
}
