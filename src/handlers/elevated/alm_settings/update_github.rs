// handlers/elevated/alm_settings/update_github.rs - POST /api/alm_settings/update_github handler

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Extension,
};
use std::collections::HashMap;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ActionParams;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// POST /api/alm_settings/update_github - Update a GitHub ALM instance setting
///
/// Parameters come form-encoded in the body and/or the query string; body values
/// win when both carry the same name. A non-empty body that is not form-encoded
/// is rejected rather than ignored.
///
/// | name       | required | max length |
/// |------------|----------|------------|
/// | key        | yes      | 40         |
/// | newKey     | no       | 40         |
/// | url        | yes      | 2000       |
/// | appId      | yes      | 80         |
/// | privateKey | yes      | 2000       |
///
/// Requires a root access token. Responds 204 No Content on success.
pub async fn update_github(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<()> {
    let body = form_body(&headers, &body);

    // A non-admin gets 403 whatever the body looks like
    state.alm_settings().authorize(&user)?;

    let params = ActionParams::merged(query, body?);
    state.alm_settings().update_github(&user, &params).await?;

    Ok(ApiResponse::no_content())
}

/// Decode the request body as form fields; an empty body carries none
fn form_body(headers: &HeaderMap, body: &[u8]) -> Result<Option<HashMap<String, String>>, ApiError> {
    if body.is_empty() {
        return Ok(None);
    }

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
    if !is_form {
        return Err(ApiError::bad_request(format!(
            "Request body must be {}",
            FORM_CONTENT_TYPE
        )));
    }

    Ok(Some(url::form_urlencoded::parse(body).into_owned().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers
    }

    #[test]
    fn empty_body_has_no_fields() {
        assert_eq!(form_body(&headers(None), b"").unwrap(), None);
    }

    #[test]
    fn form_body_is_decoded() {
        let fields = form_body(
            &headers(Some("application/x-www-form-urlencoded; charset=UTF-8")),
            b"key=gh1&url=https%3A%2F%2Fgithub.example.com",
        )
        .unwrap()
        .unwrap();
        assert_eq!(fields["key"], "gh1");
        assert_eq!(fields["url"], "https://github.example.com");
    }

    #[test]
    fn non_form_body_is_rejected() {
        let err = form_body(&headers(Some("application/json")), br#"{"key":"gh1"}"#).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "BAD_REQUEST");

        let err = form_body(&headers(None), b"key=gh1").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
