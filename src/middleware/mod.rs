pub mod audit;
pub mod auth;
pub mod headers;
pub mod response;

pub use audit::audit_requests;
pub use auth::{require_capabilities, Caller, CallerToken, Guard};
pub use headers::{correlation_headers, CorrelationId, PROCESS_TIME_HEADER, REQUEST_ID_HEADER};
pub use response::{ApiResponse, ApiResult};
