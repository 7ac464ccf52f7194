//! Validated JSON extractor for Axum
//!
//! `ValidatedJson<T>` works like `axum::Json<T>`, but additionally runs
//! `validator::Validate::validate()` on the deserialized value.
//! Malformed JSON is a 400; a well-formed body that fails validation
//! is a 422 with field-level messages.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiResponse;

/// An extractor that deserializes JSON and validates it.
///
/// # Usage
///
/// ```ignore
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct BookVehicle {
///     #[validate(length(min = 1))]
///     vehicle_id: String,
/// }
///
/// async fn handler(ValidatedJson(body): ValidatedJson<BookVehicle>) {
///     // `body` is guaranteed to pass validation
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

/// Why a `ValidatedJson` extraction was rejected.
pub enum ValidatedJsonRejection {
    /// The body never deserialized.
    Malformed(JsonRejection),
    /// The body deserialized but failed field validation.
    Invalid(validator::ValidationErrors),
}

/// Flatten nested field errors into one "field: message" list.
fn describe_field_errors(errors: &validator::ValidationErrors) -> String {
    let lines: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| {
                match error.message.as_ref() {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {:?}", field, error.code),
                }
            })
        })
        .collect();

    if lines.is_empty() {
        "Validation failed".to_string()
    } else {
        lines.join("; ")
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Malformed(rejection) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {}", rejection),
            ),
            Self::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                describe_field_errors(&errors),
            ),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Malformed)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::Invalid)?;

        Ok(ValidatedJson(value))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct RateCard {
        #[validate(length(min = 1, max = 20))]
        plate: String,
        #[validate(range(min = 1))]
        hourly_rate: i64,
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<RateCard>) -> &'static str {
        "ok"
    }

    async fn send(req: Request<Body>) -> axum::http::Response<Body> {
        use tower::Service;
        let mut svc = Router::new()
            .route("/rates", post(handler))
            .into_service();
        svc.call(req).await.unwrap()
    }

    fn json_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/rates")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_passes_through() {
        let req = json_request(serde_json::json!({"plate": "51F-123.45", "hourly_rate": 50_000}));
        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_a_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/rates")
            .header("content-type", "application/json")
            .body(Body::from("{plate:"))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failing_validation_is_a_422() {
        let req = json_request(serde_json::json!({"plate": "", "hourly_rate": 0}));
        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
