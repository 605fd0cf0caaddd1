use crate::graph::GraphPermission;
use serde::{Deserialize, Serialize};

/// A single grant on a document, as published in the permissions sidecar.
///
/// Everything else Graph returns for a permission (sharing link details,
/// expiration, invitation state, inheritance) is dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub id: String,
    pub roles: Vec<String>,
    /// Principal the grant applies to. `None` for grants without one, such as
    /// anonymous sharing links.
    pub granted_to: Option<serde_json::Value>,
}

impl From<GraphPermission> for PermissionEntry {
    fn from(permission: GraphPermission) -> Self {
        PermissionEntry {
            id: permission.id,
            roles: permission.roles,
            granted_to: permission.granted_to_v2.or(permission.granted_to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_keeps_only_fixed_fields() {
        let raw = json!([
            {
                "id": "1",
                "roles": ["read"],
                "grantedToV2": {"user": {"displayName": "Ada", "email": "ada@contoso.com"}},
                "grantedTo": {"user": {"displayName": "Ada (legacy)"}},
                "link": {"type": "view", "scope": "organization"},
                "expirationDateTime": "2030-01-01T00:00:00Z",
                "hasPassword": false
            },
            {
                "id": "2",
                "roles": ["write", "read"],
                "grantedTo": {"user": {"displayName": "Bob"}},
                "invitation": {"signInRequired": true}
            },
            {
                "id": "3",
                "roles": ["read"],
                "link": {"type": "view", "scope": "anonymous"}
            }
        ]);
        let permissions: Vec<GraphPermission> = serde_json::from_value(raw).unwrap();

        let entries: Vec<PermissionEntry> = permissions.into_iter().map(Into::into).collect();
        let serialized = serde_json::to_value(&entries).unwrap();

        assert_eq!(
            serialized,
            json!([
                {
                    "id": "1",
                    "roles": ["read"],
                    "grantedTo": {"user": {"displayName": "Ada", "email": "ada@contoso.com"}}
                },
                {
                    "id": "2",
                    "roles": ["write", "read"],
                    "grantedTo": {"user": {"displayName": "Bob"}}
                },
                {
                    "id": "3",
                    "roles": ["read"],
                    "grantedTo": null
                }
            ])
        );
    }
}
