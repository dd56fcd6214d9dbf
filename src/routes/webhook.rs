use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    config::get_config,
    dto::webhook_dto::{InboundEmailPayload, InboundEmailResponse},
    error::{Error, Result},
    middleware::cors::WEBHOOK_SIGNATURE_HEADER,
    utils::crypto::verify_signature,
    AppState,
};

/// Inbound email relay. The signature covers the raw body, so it is checked before parsing.
pub async fn handle_inbound_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<InboundEmailResponse>)> {
    verify_request(&headers, &body, &get_config().webhook_secret)?;
    let payload: InboundEmailPayload = serde_json::from_slice(&body)?;
    let response = state.email_service.receive(payload).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn verify_request(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<()> {
    let Some(signature) = headers.get(WEBHOOK_SIGNATURE_HEADER) else {
        return Err(Error::Unauthorized("missing_webhook_signature".into()));
    };
    let provided = signature
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_signature_header".into()))?;
    if verify_signature(secret, body, provided) {
        Ok(())
    } else {
        tracing::warn!("inbound email webhook signature mismatch");
        Err(Error::Unauthorized("invalid_webhook_signature".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::sign_payload;
    use axum::http::HeaderValue;

    #[test]
    fn accepts_only_matching_signature() {
        let body = br#"{"from":"a@b.c"}"#;
        let mut headers = HeaderMap::new();
        assert!(matches!(
            verify_request(&headers, body, "s3cret"),
            Err(Error::Unauthorized(_))
        ));

        let good = sign_payload("s3cret", body);
        headers.insert(WEBHOOK_SIGNATURE_HEADER, HeaderValue::from_str(&good).unwrap());
        assert!(verify_request(&headers, body, "s3cret").is_ok());
        assert!(verify_request(&headers, b"tampered", "s3cret").is_err());
    }
}
