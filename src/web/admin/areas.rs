use axum::{
    extract::{Form, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::web::AppState;

use super::{auth::require_admin_user, types::settings_redirect};

#[derive(Deserialize)]
pub(crate) struct AreaCreateForm {
    name: String,
}

#[derive(Deserialize)]
pub(crate) struct AreaDeleteForm {
    id: Uuid,
}

pub(crate) fn clean_area_name(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() { None } else { Some(name) }
}

pub async fn create_research_area(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AreaCreateForm>,
) -> Result<Redirect, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;

    let Some(name) = clean_area_name(&form.name) else {
        return Ok(Redirect::to(&settings_redirect("error", "area_missing_name")));
    };

    let insert_result = sqlx::query("INSERT INTO research_areas (id, name) VALUES ($1, $2)")
        .bind(Uuid::new_v4())
        .bind(&name)
        .execute(state.pool_ref())
        .await;

    match insert_result {
        Ok(_) => {
            info!(admin = %admin.id, area = %name, "research area created");
            Ok(Redirect::to(&settings_redirect("status", "area_created")))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            Ok(Redirect::to(&settings_redirect("error", "area_duplicate")))
        }
        Err(err) => {
            error!(?err, "failed to insert research area");
            Ok(Redirect::to(&settings_redirect("error", "unknown")))
        }
    }
}

pub async fn delete_research_area(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AreaDeleteForm>,
) -> Result<Redirect, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;

    let delete_result = sqlx::query("DELETE FROM research_areas WHERE id = $1")
        .bind(form.id)
        .execute(state.pool_ref())
        .await;

    match delete_result {
        Ok(result) if result.rows_affected() > 0 => {
            info!(admin = %admin.id, area = %form.id, "research area deleted");
            Ok(Redirect::to(&settings_redirect("status", "area_deleted")))
        }
        Ok(_) => Ok(Redirect::to(&settings_redirect("error", "area_not_found"))),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23503") => {
            Ok(Redirect::to(&settings_redirect("error", "area_in_use")))
        }
        Err(err) => {
            error!(?err, "failed to delete research area");
            Ok(Redirect::to(&settings_redirect("error", "unknown")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_names_are_trimmed_and_collapsed() {
        assert_eq!(
            clean_area_name("  Visão   Computacional "),
            Some("Visão Computacional".to_string())
        );
        assert_eq!(clean_area_name("   "), None);
    }
}
