/*
 * Responsibility
 * - 認可 (Authorization): 認証済み Identity と HTTP method から許可/拒否を決める
 * - AllowedRoles は route ごとに付与できる role の allow-list
 * - 現在の運用ポリシーは「読み取りは誰でも / 変更は admin のみ」(resource 非依存)
 */
use std::collections::BTreeSet;

use axum::http::Method;

use crate::error::AppError;
use crate::services::auth::identity::Identity;

pub const ADMIN_ROLE: &str = "admin";

/// Set of roles permitted on a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles(BTreeSet<String>);

impl AllowedRoles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, identity: &Identity) -> bool {
        self.0.iter().any(|role| identity.has_role(role))
    }

    /// Human readable form used in 403 bodies, e.g. `admin` or `admin or owner`.
    pub fn describe(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(" or ")
    }
}

/// Per-route access rule.
///
/// - `read: None` means any authenticated role may read.
/// - Every non-read method is a mutation and is checked against `write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    pub read: Option<AllowedRoles>,
    pub write: AllowedRoles,
}

impl AccessPolicy {
    pub fn mutation_requires_admin() -> Self {
        Self {
            read: None,
            write: AllowedRoles::new([ADMIN_ROLE]),
        }
    }

    pub fn authorize(
        &self,
        method: &Method,
        path: &str,
        identity: &Identity,
    ) -> Result<(), AppError> {
        let required = if is_read(method) {
            match &self.read {
                Some(roles) => roles,
                None => return Ok(()),
            }
        } else {
            &self.write
        };

        if required.permits(identity) {
            return Ok(());
        }

        tracing::warn!(
            user_id = %identity.id,
            role = %identity.role,
            %method,
            path,
            "request rejected by role policy"
        );

        Err(AppError::Forbidden {
            operation: format!("{method} {path}"),
            role: identity.role.clone(),
            required: required.describe(),
        })
    }
}

pub fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::identity::UserId;

    fn identity(role: &str) -> Identity {
        Identity {
            id: UserId::Number(42),
            username: "tester".into(),
            role: role.into(),
        }
    }

    #[test]
    fn reads_are_open_to_any_role() {
        let policy = AccessPolicy::mutation_requires_admin();

        for role in ["customer", "driver", "admin"] {
            for method in [Method::GET, Method::HEAD] {
                assert!(
                    policy
                        .authorize(&method, "/api/order/orders/", &identity(role))
                        .is_ok()
                );
            }
        }
    }

    #[test]
    fn mutations_require_admin() {
        let policy = AccessPolicy::mutation_requires_admin();

        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(
                policy
                    .authorize(&method, "/api/payment/payments/", &identity("admin"))
                    .is_ok()
            );

            let err = policy
                .authorize(&method, "/api/payment/payments/", &identity("customer"))
                .unwrap_err();
            match err {
                AppError::Forbidden { operation, role, required } => {
                    assert_eq!(operation, format!("{method} /api/payment/payments/"));
                    assert_eq!(role, "customer");
                    assert_eq!(required, "admin");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn custom_role_sets_apply_to_reads_and_writes() {
        let policy = AccessPolicy {
            read: Some(AllowedRoles::new(["admin", "owner"])),
            write: AllowedRoles::new(["owner"]),
        };

        assert!(policy.authorize(&Method::GET, "/x", &identity("owner")).is_ok());
        assert!(policy.authorize(&Method::GET, "/x", &identity("customer")).is_err());
        assert!(policy.authorize(&Method::POST, "/x", &identity("admin")).is_err());
        assert!(policy.authorize(&Method::POST, "/x", &identity("owner")).is_ok());

        assert_eq!(AllowedRoles::new(["owner", "admin"]).describe(), "admin or owner");
    }
}
