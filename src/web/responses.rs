use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// JSON body returned by the stats API and the file endpoints when a request fails.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ApiMessage {
    pub status: u16,
    pub message: String,
}

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiMessage>) {
    (
        status,
        Json(ApiMessage {
            status: status.as_u16(),
            message: message.into(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_repeats_the_status_code() {
        let (status, Json(body)) = json_error(StatusCode::FORBIDDEN, "Sem permissão.");
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            serde_json::to_value(&body).expect("serialise"),
            serde_json::json!({ "status": 403, "message": "Sem permissão." })
        );
    }
}
