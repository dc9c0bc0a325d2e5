use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::error::AuthError;

/// VBR roles as stored by the identity provider. Names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "VBR_USER")]
    User,
    #[serde(rename = "VBR_ADMIN")]
    Admin,
    #[serde(rename = "VBR_READ_PUBLIC")]
    ReadPublic,
    #[serde(rename = "VBR_READ_LIMITED_PHI")]
    ReadLimitedPhi,
    #[serde(rename = "VBR_READ_ANY_PHI")]
    ReadAnyPhi,
    #[serde(rename = "VBR_WRITE_PUBLIC")]
    WritePublic,
    #[serde(rename = "VBR_WRITE_ANY")]
    WriteAny,
}

pub type RoleSet = BTreeSet<Role>;

impl Role {
    pub const ALL: [Role; 7] = [
        Role::User,
        Role::Admin,
        Role::ReadPublic,
        Role::ReadLimitedPhi,
        Role::ReadAnyPhi,
        Role::WritePublic,
        Role::WriteAny,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "VBR_USER",
            Role::Admin => "VBR_ADMIN",
            Role::ReadPublic => "VBR_READ_PUBLIC",
            Role::ReadLimitedPhi => "VBR_READ_LIMITED_PHI",
            Role::ReadAnyPhi => "VBR_READ_ANY_PHI",
            Role::WritePublic => "VBR_WRITE_PUBLIC",
            Role::WriteAny => "VBR_WRITE_ANY",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::User => "Default user role",
            Role::Admin => "VBR Administrator",
            Role::ReadPublic => "Can read only public data",
            Role::ReadLimitedPhi => "Can read limited PHI data",
            Role::ReadAnyPhi => "Can read any PHI data",
            Role::WritePublic => "Can write only public fields and endpoints",
            Role::WriteAny => "Can write admin privileged fields and endpoints",
        }
    }

    /// Every role except the baseline can be granted directly.
    pub fn is_grantable(&self) -> bool {
        !matches!(self, Role::User)
    }

    /// Parse provider role names, dropping anything that is not a VBR role.
    pub fn parse_set<I, S>(names: I) -> RoleSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// `(parent, child)`: holding `parent` implies holding `child`.
pub type RoleEdge = (Role, Role);

/// Deployment role graph. Every role additionally implies `VBR_USER`,
/// which `RoleHierarchy::new` adds on its own.
pub const ROLE_EDGES: &[RoleEdge] = &[
    (Role::Admin, Role::WriteAny),
    (Role::WriteAny, Role::WritePublic),
    (Role::Admin, Role::ReadAnyPhi),
    (Role::ReadAnyPhi, Role::ReadLimitedPhi),
    (Role::ReadLimitedPhi, Role::ReadPublic),
    (Role::WriteAny, Role::ReadAnyPhi),
    (Role::WritePublic, Role::ReadPublic),
];

/// Static implication graph over roles.
#[derive(Debug, Clone)]
pub struct RoleHierarchy {
    children: HashMap<Role, Vec<Role>>,
}

impl RoleHierarchy {
    /// Build a hierarchy from an edge table, adding the implicit
    /// `role -> VBR_USER` edges. Fails if the table contains a cycle.
    pub fn new(edges: &[RoleEdge]) -> Result<Self, AuthError> {
        let mut children: HashMap<Role, Vec<Role>> = HashMap::new();
        for &(parent, child) in edges {
            if parent == child {
                return Err(AuthError::configuration(format!("role {} implies itself", parent)));
            }
            let entry = children.entry(parent).or_default();
            if !entry.contains(&child) {
                entry.push(child);
            }
        }
        for role in Role::ALL.iter().copied().filter(|r| *r != Role::User) {
            let entry = children.entry(role).or_default();
            if !entry.contains(&Role::User) {
                entry.push(Role::User);
            }
        }

        let hierarchy = Self { children };
        hierarchy.check_acyclic()?;
        Ok(hierarchy)
    }

    /// The deployment graph.
    pub fn standard() -> Self {
        Self::new(ROLE_EDGES).expect("standard role graph is acyclic")
    }

    /// Transitive closure of `raw` under the implication edges.
    pub fn resolve(&self, raw: &RoleSet) -> RoleSet {
        let mut resolved = RoleSet::new();
        let mut queue: VecDeque<Role> = raw.iter().copied().collect();

        while let Some(role) = queue.pop_front() {
            if !resolved.insert(role) {
                continue;
            }
            if let Some(children) = self.children.get(&role) {
                queue.extend(children.iter().copied().filter(|c| !resolved.contains(c)));
            }
        }

        resolved
    }

    pub fn implies(&self, held: Role, required: Role) -> bool {
        self.resolve(&RoleSet::from([held])).contains(&required)
    }

    // Kahn's algorithm; any node left unvisited sits on a cycle.
    fn check_acyclic(&self) -> Result<(), AuthError> {
        let mut in_degree: HashMap<Role, usize> = Role::ALL.iter().map(|r| (*r, 0)).collect();
        for children in self.children.values() {
            for child in children {
                *in_degree.entry(*child).or_default() += 1;
            }
        }

        let mut ready: VecDeque<Role> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(role, _)| *role)
            .collect();
        let mut visited = 0;

        while let Some(role) = ready.pop_front() {
            visited += 1;
            for child in self.children.get(&role).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(*child);
                    }
                }
            }
        }

        if visited != in_degree.len() {
            return Err(AuthError::configuration("role implication graph contains a cycle"));
        }
        Ok(())
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::standard()
    }
}
