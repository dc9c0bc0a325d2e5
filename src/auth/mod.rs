pub mod capability;
pub mod error;
pub mod identity;
pub mod role;
pub mod service;
pub mod token;

pub use capability::{Capability, CapabilityGate, CapabilityMap, GateDenial};
pub use error::AuthError;
pub use identity::{CallerIdentity, IdentityCache, TokenIdentityResolver};
pub use role::{Role, RoleHierarchy, RoleSet, ROLE_EDGES};
pub use service::ServiceAccount;
pub use token::{check_shape, extract_token};
