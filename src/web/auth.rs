use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::web::{
    AppState,
    access::{self, AccessLevel, Area},
    flash::{FlashQuery, compose_flash_message},
    render_login_page, render_sign_up_page,
};

pub const SESSION_COOKIE: &str = "tfc_session";
pub const SESSION_TTL_DAYS: i64 = 7;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, sqlx::FromRow)]
pub struct DbUserAuth {
    pub id: Uuid,
    pub password_hash: String,
    pub access_level: String,
    pub active: bool,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub access_level: String,
}

impl AuthUser {
    pub fn level(&self) -> AccessLevel {
        AccessLevel::from_stored(&self.access_level)
    }

    pub fn is_admin(&self) -> bool {
        self.level() == AccessLevel::Admin
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub repeat_password: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NewAccount {
    pub display_name: String,
    pub email: String,
    pub password: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> Result<Html<String>, Redirect> {
    if let Some(redirect) = redirect_if_authenticated(&state, &jar).await {
        return Err(redirect);
    }

    let flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());
    Ok(Html(render_login_page(&flash, "")))
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let email = form.email.trim();
    let user = match fetch_user_by_email(state.pool_ref(), email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(invalid_credentials(email)),
        Err(err) => {
            error!(?err, "failed to fetch user during login");
            return Err(server_error(email));
        }
    };

    if !verify_password(&form.password, &user.password_hash) {
        return Err(invalid_credentials(email));
    }

    if !user.active {
        warn!(user_id = %user.id, "inactive account attempted to sign in");
        return Err((
            StatusCode::FORBIDDEN,
            Html(render_login_page(
                &compose_flash_message(None, Some("account_inactive")),
                email,
            )),
        ));
    }

    let session_token = Uuid::new_v4();
    let expires_at = Utc::now() + ChronoDuration::days(SESSION_TTL_DAYS);

    if let Err(err) =
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_token)
            .bind(user.id)
            .bind(expires_at)
            .execute(state.pool_ref())
            .await
    {
        error!(?err, "failed to create session");
        return Err(server_error(email));
    }

    let mut cookie = Cookie::new(SESSION_COOKIE, session_token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(SESSION_TTL_DAYS));

    let level = AccessLevel::from_stored(&user.access_level);
    info!(user_id = %user.id, level = level.as_str(), "user signed in");

    let jar = jar.add(cookie);
    Ok((jar, Redirect::to(level.home_path())))
}

pub async fn sign_up_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    if let Some(redirect) = redirect_if_authenticated(&state, &jar).await {
        return Err(redirect);
    }

    Ok(Html(render_sign_up_page("", "", "")))
}

pub async fn process_sign_up(
    State(state): State<AppState>,
    Form(form): Form<SignUpForm>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let account = validate_sign_up(&form).map_err(|code| sign_up_error(&form, code))?;

    let password_hash = hash_password(&account.password).map_err(|err| {
        error!(?err, "failed to hash password during sign-up");
        sign_up_error(&form, "unknown")
    })?;

    let result = sqlx::query(
        "INSERT INTO users (id, email, display_name, password_hash, access_level, active)
         VALUES ($1, $2, $3, $4, $5, TRUE)",
    )
    .bind(Uuid::new_v4())
    .bind(&account.email)
    .bind(&account.display_name)
    .bind(password_hash)
    .bind(AccessLevel::Student.as_str())
    .execute(state.pool_ref())
    .await;

    match result {
        Ok(_) => {
            info!(email = %account.email, "student account created");
            Ok(Redirect::to("/auth/login?status=registered"))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            Err(sign_up_error(&form, "email_taken"))
        }
        Err(err) => {
            error!(?err, "failed to create account");
            Err(sign_up_error(&form, "unknown"))
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut jar = jar;

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(token) = Uuid::parse_str(cookie.value()) {
            if let Err(err) = sqlx::query("DELETE FROM sessions WHERE id = $1")
                .bind(token)
                .execute(state.pool_ref())
                .await
            {
                error!(?err, "failed to remove session during logout");
            }
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar = jar.remove(removal);

    (jar, Redirect::to("/?status=logged_out"))
}

/// Checks name, e-mail and password rules before any database work.
pub fn validate_sign_up(form: &SignUpForm) -> Result<NewAccount, &'static str> {
    let email = form.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err("email_invalid");
    }

    if form.password != form.repeat_password {
        return Err("password_mismatch");
    }

    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err("password_too_short");
    }

    let display_name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

    Ok(NewAccount {
        display_name,
        email: email.to_string(),
        password: form.password.clone(),
    })
}

/// Resolves the session cookie to an active user, if any.
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Option<AuthUser> {
    let token_cookie = jar.get(SESSION_COOKIE)?;
    let token = Uuid::parse_str(token_cookie.value()).ok()?;

    match fetch_user_by_session(state.pool_ref(), token).await {
        Ok(user) => user,
        Err(err) => {
            error!(?err, "failed to resolve session");
            None
        }
    }
}

/// Loads the session user and applies the access rules for `area`.
pub async fn require_area(state: &AppState, jar: &CookieJar, area: Area) -> Result<AuthUser, Redirect> {
    let user = current_user(state, jar).await;
    match access::gate(area, user.as_ref().map(AuthUser::level)) {
        Ok(()) => user.ok_or_else(|| Redirect::to(access::LOGIN_PATH)),
        Err(target) => Err(Redirect::to(target)),
    }
}

pub async fn require_student(state: &AppState, jar: &CookieJar) -> Result<AuthUser, Redirect> {
    require_area(state, jar, Area::Student).await
}

pub async fn redirect_if_authenticated(state: &AppState, jar: &CookieJar) -> Option<Redirect> {
    let user = current_user(state, jar).await;
    access::gate(Area::AuthPages, user.as_ref().map(AuthUser::level))
        .err()
        .map(Redirect::to)
}

pub struct JsonAuthError {
    pub status: StatusCode,
    pub message: &'static str,
}

/// Variant of [`require_area`] for JSON endpoints.
pub async fn current_user_or_json_error(
    state: &AppState,
    jar: &CookieJar,
    area: Area,
) -> Result<AuthUser, JsonAuthError> {
    let Some(user) = current_user(state, jar).await else {
        return Err(JsonAuthError {
            status: StatusCode::UNAUTHORIZED,
            message: "Sessão inválida ou expirada.",
        });
    };

    if access::gate(area, Some(user.level())).is_err() {
        return Err(JsonAuthError {
            status: StatusCode::FORBIDDEN,
            message: "Sem permissão para aceder a este recurso.",
        });
    }

    Ok(user)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn fetch_user_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<DbUserAuth>> {
    sqlx::query_as::<_, DbUserAuth>(
        "SELECT id, password_hash, access_level, active FROM users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_user_by_session(pool: &PgPool, token: Uuid) -> sqlx::Result<Option<AuthUser>> {
    sqlx::query_as::<_, AuthUser>(
        "SELECT users.id, users.email, users.display_name, users.access_level FROM sessions JOIN users ON users.id = sessions.user_id WHERE sessions.id = $1 AND sessions.expires_at > NOW() AND users.active = TRUE",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

fn invalid_credentials(email: &str) -> (StatusCode, Html<String>) {
    (
        StatusCode::UNAUTHORIZED,
        Html(render_login_page(
            &compose_flash_message(None, Some("invalid_credentials")),
            email,
        )),
    )
}

fn server_error(email: &str) -> (StatusCode, Html<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render_login_page(
            &compose_flash_message(None, Some("unknown")),
            email,
        )),
    )
}

fn sign_up_error(form: &SignUpForm, code: &str) -> (StatusCode, Html<String>) {
    let status = match code {
        "unknown" => StatusCode::INTERNAL_SERVER_ERROR,
        "email_taken" => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (
        status,
        Html(render_sign_up_page(
            &compose_flash_message(None, Some(code)),
            form.name.as_deref().unwrap_or(""),
            form.email.trim(),
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: Option<&str>, email: &str, password: &str, repeat: &str) -> SignUpForm {
        SignUpForm {
            name: name.map(str::to_string),
            email: email.to_string(),
            password: password.to_string(),
            repeat_password: repeat.to_string(),
        }
    }

    #[test]
    fn sign_up_requires_matching_passwords() {
        let result = validate_sign_up(&form(None, "ana@uni.pt", "segredo1", "segredo2"));
        assert_eq!(result, Err("password_mismatch"));
    }

    #[test]
    fn sign_up_enforces_minimum_length() {
        let result = validate_sign_up(&form(None, "ana@uni.pt", "abc12", "abc12"));
        assert_eq!(result, Err("password_too_short"));
    }

    #[test]
    fn sign_up_defaults_name_to_email_local_part() {
        let account = validate_sign_up(&form(Some("  "), " ana@uni.pt ", "segredo", "segredo"))
            .expect("valid account");
        assert_eq!(account.display_name, "ana");
        assert_eq!(account.email, "ana@uni.pt");
    }

    #[test]
    fn sign_up_rejects_missing_email() {
        assert_eq!(
            validate_sign_up(&form(Some("Ana"), "   ", "segredo", "segredo")),
            Err("email_invalid")
        );
    }

    #[test]
    fn password_hash_verifies_only_original() {
        let hash = hash_password("segredo-forte").expect("hash");
        assert!(verify_password("segredo-forte", &hash));
        assert!(!verify_password("outro", &hash));
        assert!(!verify_password("segredo-forte", "not-a-hash"));
    }
}
