use axum::{
    extract::{Form, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::web::{AppState, access::AccessLevel};

use super::{auth::require_admin_user, types::settings_redirect};

#[derive(Deserialize)]
pub(crate) struct UserRoleForm {
    user_id: Uuid,
    access_level: String,
}

#[derive(Deserialize)]
pub(crate) struct UserActiveForm {
    user_id: Uuid,
    active: String,
}

pub(crate) fn parse_active_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

pub async fn update_user_role(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UserRoleForm>,
) -> Result<Redirect, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;

    if form.user_id == admin.id {
        return Ok(Redirect::to(&settings_redirect("error", "self_update")));
    }
    let Some(level) = AccessLevel::parse(form.access_level.trim()) else {
        return Ok(Redirect::to(&settings_redirect("error", "level_invalid")));
    };

    let result = sqlx::query("UPDATE users SET access_level = $2 WHERE id = $1")
        .bind(form.user_id)
        .bind(level.as_str())
        .execute(state.pool_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            info!(admin = %admin.id, user = %form.user_id, level = level.as_str(), "access level updated");
            Ok(Redirect::to(&settings_redirect("status", "role_updated")))
        }
        Ok(_) => Ok(Redirect::to(&settings_redirect("error", "user_missing"))),
        Err(err) => {
            error!(?err, "failed to update access level");
            Ok(Redirect::to(&settings_redirect("error", "unknown")))
        }
    }
}

pub async fn update_user_active(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UserActiveForm>,
) -> Result<Redirect, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;

    if form.user_id == admin.id {
        return Ok(Redirect::to(&settings_redirect("error", "self_update")));
    }
    let Some(active) = parse_active_flag(&form.active) else {
        return Ok(Redirect::to(&settings_redirect("error", "unknown")));
    };

    let mut tx = match state.pool_ref().begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!(?err, "failed to start account update");
            return Ok(Redirect::to(&settings_redirect("error", "unknown")));
        }
    };

    let updated = sqlx::query("UPDATE users SET active = $2 WHERE id = $1")
        .bind(form.user_id)
        .bind(active)
        .execute(&mut *tx)
        .await;

    let result = match updated {
        Ok(res) if res.rows_affected() == 0 => {
            return Ok(Redirect::to(&settings_redirect("error", "user_missing")));
        }
        Ok(_) if !active => sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(form.user_id)
            .execute(&mut *tx)
            .await
            .map(|_| ()),
        Ok(_) => Ok(()),
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => match tx.commit().await {
            Ok(()) => {
                info!(admin = %admin.id, user = %form.user_id, active, "account status updated");
                Ok(Redirect::to(&settings_redirect("status", "account_updated")))
            }
            Err(err) => {
                error!(?err, "failed to commit account update");
                Ok(Redirect::to(&settings_redirect("error", "unknown")))
            }
        },
        Err(err) => {
            error!(?err, "failed to update account status");
            Ok(Redirect::to(&settings_redirect("error", "unknown")))
        }
    }
}
