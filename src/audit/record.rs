use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle of one audit record. Only `Completed` and `Failed` records are
/// ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPhase {
    Pending,
    RequestCaptured,
    Completed,
    Failed,
}

impl AuditPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditPhase::Completed | AuditPhase::Failed)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditRequest {
    pub method: String,
    pub url: String,
    pub query_params: BTreeMap<String, String>,
    pub path_params: BTreeMap<String, String>,
    /// Unverified claims from the caller's token, empty when it could not be decoded.
    pub claims: Map<String, Value>,
    /// `None` for non-mutating methods and for bodies that are not JSON.
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// One structured audit line per request.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub phase: AuditPhase,
    pub route: Option<String>,
    pub caller_username: Option<String>,
    pub request: AuditRequest,
    pub response: Option<AuditResponse>,
    pub elapsed_ms: Option<u64>,
}

impl AuditRecord {
    pub fn pending(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            timestamp: Utc::now(),
            phase: AuditPhase::Pending,
            route: None,
            caller_username: None,
            request: AuditRequest::default(),
            response: None,
            elapsed_ms: None,
        }
    }

    pub fn capture_request(&mut self, route: Option<String>, request: AuditRequest) {
        debug_assert_eq!(self.phase, AuditPhase::Pending);
        self.route = route;
        self.request = request;
        self.phase = AuditPhase::RequestCaptured;
    }

    pub fn complete(&mut self, caller: Option<String>, response: AuditResponse, elapsed_ms: u64) {
        debug_assert_eq!(self.phase, AuditPhase::RequestCaptured);
        self.caller_username = caller;
        self.response = Some(response);
        self.elapsed_ms = Some(elapsed_ms);
        self.phase = AuditPhase::Completed;
    }

    /// The handler produced a status but its body could not be captured.
    pub fn fail(&mut self, caller: Option<String>, status: u16, headers: BTreeMap<String, String>, elapsed_ms: u64) {
        debug_assert_eq!(self.phase, AuditPhase::RequestCaptured);
        self.caller_username = caller;
        self.response = Some(AuditResponse {
            status,
            headers,
            body: Value::Null,
        });
        self.elapsed_ms = Some(elapsed_ms);
        self.phase = AuditPhase::Failed;
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Single-line JSON rendering written by the sinks.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body placeholder for methods whose bodies are not captured.
pub fn not_logged() -> Value {
    json!({"note": "not logged"})
}

const REDACTED_KEYS: [&str; 5] = ["password", "access_token", "refresh_token", "client_secret", "token"];

/// Replace the values of credential-bearing keys, at any depth.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                    *inner = Value::String("<redacted>".to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_through_phases() {
        let mut record = AuditRecord::pending(Uuid::new_v4());
        assert!(!record.phase.is_terminal());

        record.capture_request(
            Some("/containers".to_string()),
            AuditRequest {
                method: "GET".to_string(),
                url: "/containers?status=present".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(record.phase, AuditPhase::RequestCaptured);

        let response = AuditResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: not_logged(),
        };
        record.complete(Some("tacobot".to_string()), response, 3);
        assert_eq!(record.phase, AuditPhase::Completed);
        assert_eq!(record.status(), Some(200));
    }

    #[test]
    fn renders_single_line() {
        let mut record = AuditRecord::pending(Uuid::new_v4());
        record.capture_request(None, AuditRequest::default());
        record.fail(None, 500, BTreeMap::new(), 1);

        let line = record.to_line().unwrap();
        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["phase"], "failed");
        assert_eq!(parsed["response"]["status"], 500);
        assert_eq!(parsed["request"]["claims"], json!({}));
        assert_eq!(parsed["caller_username"], Value::Null);
    }

    #[test]
    fn redacts_nested_credentials() {
        let mut body = json!({
            "username": "tacobot",
            "password": "hunter2",
            "result": [{"access_token": "abc.def.ghi", "expires_in": 14400}]
        });
        redact(&mut body);
        assert_eq!(body["username"], "tacobot");
        assert_eq!(body["password"], "<redacted>");
        assert_eq!(body["result"][0]["access_token"], "<redacted>");
        assert_eq!(body["result"][0]["expires_in"], 14400);
    }
}
