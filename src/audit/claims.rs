use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::auth::extract_token;

pub const USERNAME_CLAIM: &str = "tapis/username";

/// Claims of the caller's token, decoded with the same structural checks as
/// the resolver's pre-flight (three segments, `exp` present and in the
/// future) but without the signature. Observability only: nothing here may
/// feed an access decision.
///
/// Any failure, expiry included, yields an empty map.
pub fn decode_unverified_claims(headers: &HeaderMap) -> Map<String, Value> {
    extract_token(headers)
        .map(|token| decode_token_claims(&token))
        .unwrap_or_default()
}

pub fn decode_token_claims(token: &str) -> Map<String, Value> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = true;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    match decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!("Token claims not decodable for audit: {}", e);
            Map::new()
        }
    }
}

pub fn username_claim(claims: &Map<String, Value>) -> Option<String> {
    claims.get(USERNAME_CLAIM).and_then(Value::as_str).map(str::to_string)
}
