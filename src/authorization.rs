//! Authorization metadata of custom fields.
//!
//! Fields that declare `authorizationGroupUuids` are sensitive. The engine
//! only exposes which fields these are and lets callers filter a
//! configuration through an [`AuthorizationPolicy`]; it never hides a field
//! on its own.

use std::collections::HashSet;

use crate::domain::{FieldConfig, FieldsConfig};

/// Decides whether the current actor may see a field.
pub trait AuthorizationPolicy {
    fn is_authorized(&self, field: &FieldConfig) -> bool;
}

/// The acting user: administrators see everything, everybody else needs to
/// share at least one authorization group with the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub admin: bool,
    pub authorization_groups: HashSet<String>,
}

impl Actor {
    pub fn admin() -> Self {
        Self {
            admin: true,
            authorization_groups: HashSet::new(),
        }
    }

    pub fn member_of<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admin: false,
            authorization_groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationPolicy for Actor {
    fn is_authorized(&self, field: &FieldConfig) -> bool {
        if self.admin {
            return true;
        }
        field
            .authorization_group_uuids
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|uuid| self.authorization_groups.contains(uuid))
    }
}

impl<F> AuthorizationPolicy for F
where
    F: Fn(&FieldConfig) -> bool,
{
    fn is_authorized(&self, field: &FieldConfig) -> bool {
        self(field)
    }
}

/// The top-level fields of `fields` that `policy` lets through.
pub fn authorized_fields(fields: &FieldsConfig, policy: &dyn AuthorizationPolicy) -> FieldsConfig {
    fields
        .iter()
        .filter(|(key, config)| {
            let allowed = policy.is_authorized(config);
            if !allowed {
                tracing::trace!(field = %key, "field withheld by authorization policy");
            }
            allowed
        })
        .map(|(key, config)| (key.clone(), config.clone()))
        .collect()
}

/// Keys of the top-level fields that carry authorization metadata.
pub fn sensitive_fields(fields: &FieldsConfig) -> Vec<String> {
    fields
        .iter()
        .filter(|(_, config)| config.is_sensitive())
        .map(|(key, _)| key.clone())
        .collect()
}
