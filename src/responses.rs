use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    fn build(status: StatusCode, success: bool, msg: &str) -> impl IntoResponse {
        (
            status,
            Json(JsonResponse {
                status: if success { "success" } else { "error" }.to_string(),
                success,
                message: msg.to_string(),
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::OK, true, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::BAD_REQUEST, false, msg)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::UNAUTHORIZED, false, msg)
    }

    pub fn forbidden(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::FORBIDDEN, false, msg)
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::NOT_FOUND, false, msg)
    }

    pub fn conflict(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::CONFLICT, false, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, false, msg)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::TOO_MANY_REQUESTS, false, msg)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use serde_json::from_slice;

    use crate::responses::JsonResponse;

    async fn body_of(resp: Response) -> JsonResponse {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_envelope_carries_the_message() {
        let resp = JsonResponse::success("ticket recorded").into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_of(resp).await;
        assert_eq!(json.status, "success");
        assert!(json.success);
        assert_eq!(json.message, "ticket recorded");
    }

    #[tokio::test]
    async fn error_constructors_map_to_their_status_codes() {
        let cases: Vec<(Response, StatusCode)> = vec![
            (
                JsonResponse::bad_request("bad").into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                JsonResponse::forbidden("no").into_response(),
                StatusCode::FORBIDDEN,
            ),
            (
                JsonResponse::conflict("dup").into_response(),
                StatusCode::CONFLICT,
            ),
            (
                JsonResponse::server_error("oops").into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (resp, expected) in cases {
            assert_eq!(resp.status(), expected);
            let json = body_of(resp).await;
            assert_eq!(json.status, "error");
            assert!(!json.success);
        }
    }
}
