use crate::error::RegistryError;

/// Role whose holders may edit module definitions and seed the registry.
pub const ADMIN_ROLE: &str = "admin";

/// The caller of a registry operation. Passed explicitly into every service
/// call; there is no ambient identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub actor_id: String,
    /// Flat role string used for field gating.
    pub role: String,
}

impl Principal {
    /// Build from validated JWT claims at the server boundary.
    /// `role` wins over `roles`; with neither the caller has an empty role.
    pub fn from_jwt_claims(claims: &JwtClaims) -> Result<Self, RegistryError> {
        let actor_id = claims
            .sub
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RegistryError::Unauthorized("missing sub claim".into()))?;
        let role = claims
            .role
            .clone()
            .or_else(|| claims.roles.as_ref().and_then(|r| r.first().cloned()))
            .unwrap_or_default();
        Ok(Self { actor_id, role })
    }

    /// Construct explicitly for in-process callers (startup seeding, tests).
    pub fn in_process(actor_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            role: role.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn require_admin(&self) -> Result<(), RegistryError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized(format!(
                "{} is not an admin",
                self.actor_id
            )))
        }
    }
}

/// JWT claims shape expected from the identity provider.
/// Deserialised by the server JWT middleware.
#[derive(Debug, Default, serde::Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub role: Option<String>,
    pub roles: Option<Vec<String>>,
}
