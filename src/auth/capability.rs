use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::error::AuthError;
use super::role::{Role, RoleHierarchy, RoleSet};

/// Named permission requirement attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    User,
    ReadPublic,
    ReadLimitedPhi,
    ReadAnyPhi,
    WritePublic,
    WriteAny,
    Admin,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::User,
        Capability::ReadPublic,
        Capability::ReadLimitedPhi,
        Capability::ReadAnyPhi,
        Capability::WritePublic,
        Capability::WriteAny,
        Capability::Admin,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::User => "user",
            Capability::ReadPublic => "read public",
            Capability::ReadLimitedPhi => "read limited PHI",
            Capability::ReadAnyPhi => "read any PHI",
            Capability::WritePublic => "write public",
            Capability::WriteAny => "write any",
            Capability::Admin => "admin",
        };
        f.write_str(name)
    }
}

pub const CAPABILITY_ROLES: &[(Capability, Role)] = &[
    (Capability::User, Role::User),
    (Capability::ReadPublic, Role::ReadPublic),
    (Capability::ReadLimitedPhi, Role::ReadLimitedPhi),
    (Capability::ReadAnyPhi, Role::ReadAnyPhi),
    (Capability::WritePublic, Role::WritePublic),
    (Capability::WriteAny, Role::WriteAny),
    (Capability::Admin, Role::Admin),
];

/// Capability -> required role lookup.
#[derive(Debug, Clone)]
pub struct CapabilityMap {
    roles: HashMap<Capability, Role>,
}

impl CapabilityMap {
    pub fn new(entries: &[(Capability, Role)]) -> Self {
        Self {
            roles: entries.iter().copied().collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(CAPABILITY_ROLES)
    }

    pub fn required_role(&self, capability: Capability) -> Option<Role> {
        self.roles.get(&capability).copied()
    }
}

impl Default for CapabilityMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// Outcome of a denied gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// Caller lacks the role behind this capability.
    Missing(Capability),
    /// Capability has no role mapped; always denies.
    Unmapped(Capability),
}

impl From<GateDenial> for AuthError {
    fn from(denial: GateDenial) -> Self {
        match denial {
            GateDenial::Missing(capability) => {
                AuthError::unauthorized(format!("missing capability: {}", capability))
            }
            GateDenial::Unmapped(capability) => {
                AuthError::configuration(format!("capability '{}' has no mapped role", capability))
            }
        }
    }
}

/// Approves or denies a resolved role set against route requirements.
#[derive(Debug, Clone, Default)]
pub struct CapabilityGate {
    hierarchy: RoleHierarchy,
    capabilities: CapabilityMap,
}

impl CapabilityGate {
    pub fn new(hierarchy: RoleHierarchy, capabilities: CapabilityMap) -> Self {
        Self {
            hierarchy,
            capabilities,
        }
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    /// Effective role set for a raw assignment.
    pub fn resolve(&self, raw: &RoleSet) -> RoleSet {
        self.hierarchy.resolve(raw)
    }

    pub fn satisfies(&self, effective: &RoleSet, required: Capability) -> Result<(), GateDenial> {
        let role = self
            .capabilities
            .required_role(required)
            .ok_or(GateDenial::Unmapped(required))?;
        if effective.contains(&role) {
            Ok(())
        } else {
            Err(GateDenial::Missing(required))
        }
    }

    /// All capabilities must hold; the first failure wins.
    pub fn check(&self, effective: &RoleSet, required: &[Capability]) -> Result<(), GateDenial> {
        required
            .iter()
            .try_for_each(|capability| self.satisfies(effective, *capability))
    }

    /// Startup validation: every capability a route declares must be mapped.
    pub fn validate(&self, declared: &[Capability]) -> Result<(), AuthError> {
        match declared
            .iter()
            .find(|c| self.capabilities.required_role(**c).is_none())
        {
            Some(capability) => Err(GateDenial::Unmapped(*capability).into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(gate: &CapabilityGate, roles: &[Role]) -> RoleSet {
        gate.resolve(&roles.iter().copied().collect())
    }

    #[test]
    fn write_public_satisfies_read_public_but_not_the_reverse() {
        let gate = CapabilityGate::default();
        assert!(gate
            .satisfies(&resolved(&gate, &[Role::WritePublic]), Capability::ReadPublic)
            .is_ok());
        assert_eq!(
            gate.satisfies(&resolved(&gate, &[Role::ReadPublic]), Capability::WritePublic),
            Err(GateDenial::Missing(Capability::WritePublic))
        );
    }

    #[test]
    fn admin_passes_every_mapped_capability() {
        let gate = CapabilityGate::default();
        let effective = resolved(&gate, &[Role::Admin]);
        assert!(gate.check(&effective, &Capability::ALL).is_ok());
    }

    #[test]
    fn first_failing_capability_is_reported() {
        let gate = CapabilityGate::default();
        let effective = resolved(&gate, &[Role::ReadLimitedPhi]);
        assert_eq!(
            gate.check(&effective, &[Capability::ReadPublic, Capability::ReadAnyPhi, Capability::Admin]),
            Err(GateDenial::Missing(Capability::ReadAnyPhi))
        );
    }

    #[test]
    fn unmapped_capability_fails_closed() {
        let gate = CapabilityGate::new(
            RoleHierarchy::standard(),
            CapabilityMap::new(&[(Capability::ReadPublic, Role::ReadPublic)]),
        );
        let effective = resolved(&gate, &[Role::Admin]);
        assert_eq!(
            gate.satisfies(&effective, Capability::Admin),
            Err(GateDenial::Unmapped(Capability::Admin))
        );
        assert!(matches!(
            gate.validate(&[Capability::ReadPublic, Capability::Admin]),
            Err(AuthError::Configuration(_))
        ));
        assert!(gate.validate(&[Capability::ReadPublic]).is_ok());
    }

    #[test]
    fn empty_requirement_list_passes() {
        let gate = CapabilityGate::default();
        assert!(gate.check(&RoleSet::new(), &[]).is_ok());
    }
}
