// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access guard: bearer extraction, role checks, and ownership-scoped
//! store filters.
//!
//! Every handler that reads or mutates a user or product record goes
//! through [`authorize`] (via the auth middleware) and then builds its
//! store filter with [`scoped_filter`]. The filter always pins the record
//! id together with a role or ownership predicate, so an operation aimed at
//! one kind of account can never match another.

use super::claims::{Claims, Role};
use super::token::TokenCodec;
use crate::db::{collections::fields, Filter};
use crate::models::{RecordId, UserRole};
use axum::http::{header, HeaderMap};

/// Why the guard turned a request away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),
}

/// Role required to pass the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any valid token.
    Authenticated,
    /// `admin` role.
    Admin,
    /// `seller` or `customer+seller`.
    Seller,
}

impl Requirement {
    pub fn check(self, claims: &Claims) -> Result<(), AuthError> {
        let ok = match self {
            Requirement::Authenticated => true,
            Requirement::Admin => claims.role == Role::Admin,
            Requirement::Seller => claims.role.can_sell(),
        };
        if ok {
            Ok(())
        } else {
            Err(match self {
                Requirement::Admin => AuthError::Forbidden("admin role required"),
                _ => AuthError::Forbidden("seller role required"),
            })
        }
    }
}

/// Extract and verify the caller's token, then apply `requirement`.
///
/// A missing `Bearer ` prefix is tolerated; the whole header value is then
/// taken as the token.
pub fn authorize(
    headers: &HeaderMap,
    codec: &TokenCodec,
    requirement: Requirement,
) -> Result<Claims, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated("missing authorization header"))?
        .to_str()
        .map_err(|_| AuthError::Unauthenticated("authorization header is not ASCII"))?;

    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::Unauthenticated("empty bearer token"));
    }

    let claims = codec.verify(token).map_err(|err| {
        tracing::debug!(error = %err, "Rejected session token");
        AuthError::Unauthenticated("invalid or expired token")
    })?;

    requirement.check(&claims)?;
    Ok(claims)
}

/// Which user accounts an operation is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Customers,
    Sellers,
    CustomerSellers,
    AnyUser,
}

impl Audience {
    fn narrow(self, filter: Filter) -> Filter {
        match self {
            Audience::Customers => filter.contains(fields::ROLES, UserRole::Customer.as_str()),
            Audience::Sellers => filter.contains(fields::ROLES, UserRole::Seller.as_str()),
            Audience::CustomerSellers => filter.contains_all(
                fields::ROLES,
                [UserRole::Customer.as_str(), UserRole::Seller.as_str()],
            ),
            Audience::AnyUser => filter,
        }
    }

    /// Filter listing every account of this audience.
    pub fn filter(self) -> Filter {
        self.narrow(Filter::new())
    }
}

/// Who may touch a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Admin,
    AdminOrSelf,
}

/// The record a scoped operation targets.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    User {
        id: &'a RecordId,
        audience: Audience,
        access: Access,
    },
    /// A product that must belong to the caller.
    OwnedProduct { id: &'a RecordId },
}

/// Check the caller may act on `target` and build the store filter for it.
pub fn scoped_filter(claims: &Claims, target: Target<'_>) -> Result<Filter, AuthError> {
    match target {
        Target::User {
            id,
            audience,
            access,
        } => {
            let allowed = match access {
                Access::Admin => claims.is_admin(),
                Access::AdminOrSelf => claims.is_admin() || claims.user_id == id.as_str(),
            };
            if !allowed {
                return Err(AuthError::Forbidden("not permitted to act on this account"));
            }
            Ok(audience.narrow(Filter::new().eq(fields::ID, id.as_str())))
        }
        Target::OwnedProduct { id } => {
            Requirement::Seller.check(claims)?;
            Ok(Filter::new()
                .eq(fields::ID, id.as_str())
                .eq(fields::SELLER_ID, claims.user_id.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Predicate;
    use axum::http::HeaderValue;
    use serde_json::json;

    const SECRET: &[u8] = b"guard-test-secret";
    const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";

    fn claims(user_id: &str, role: Role) -> Claims {
        Claims {
            user_id: user_id.to_string(),
            role,
            seller_id: role.can_sell().then(|| user_id.to_string()),
            expires_at: i64::MAX,
        }
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        let codec = TokenCodec::new(SECRET);
        let result = authorize(&HeaderMap::new(), &codec, Requirement::Authenticated);
        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn test_bearer_prefix_is_optional() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.issue(ALICE, Role::Customer, None).unwrap();

        let with_prefix = authorize(
            &headers_with(&format!("Bearer {}", token)),
            &codec,
            Requirement::Authenticated,
        )
        .unwrap();
        let without_prefix =
            authorize(&headers_with(&token), &codec, Requirement::Authenticated).unwrap();

        assert_eq!(with_prefix, without_prefix);
        assert_eq!(with_prefix.user_id, ALICE);
    }

    #[test]
    fn test_bearer_prefix_is_case_sensitive() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.issue(ALICE, Role::Customer, None).unwrap();
        let result = authorize(
            &headers_with(&format!("bearer {}", token)),
            &codec,
            Requirement::Authenticated,
        );
        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn test_empty_bearer_is_unauthenticated() {
        let codec = TokenCodec::new(SECRET);
        let result = authorize(&headers_with("Bearer "), &codec, Requirement::Authenticated);
        assert_eq!(
            result,
            Err(AuthError::Unauthenticated("empty bearer token"))
        );
    }

    #[test]
    fn test_role_requirement_is_forbidden_not_unauthenticated() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.issue(ALICE, Role::Customer, None).unwrap();
        let headers = headers_with(&format!("Bearer {}", token));

        assert!(matches!(
            authorize(&headers, &codec, Requirement::Admin),
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            authorize(&headers, &codec, Requirement::Seller),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn test_user_scope_self_and_admin() {
        let target_id = RecordId::parse(ALICE).unwrap();
        let target = Target::User {
            id: &target_id,
            audience: Audience::Customers,
            access: Access::AdminOrSelf,
        };

        let filter = scoped_filter(&claims(ALICE, Role::Customer), target).unwrap();
        assert_eq!(
            filter.predicates(),
            &[
                Predicate::Eq("_id".into(), json!(ALICE)),
                Predicate::Contains("roles".into(), json!("customer")),
            ]
        );

        assert!(scoped_filter(&claims(BOB, Role::Admin), target).is_ok());
        assert!(matches!(
            scoped_filter(&claims(BOB, Role::Customer), target),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_only_scope_rejects_self() {
        let target_id = RecordId::parse(ALICE).unwrap();
        let target = Target::User {
            id: &target_id,
            audience: Audience::Sellers,
            access: Access::Admin,
        };
        assert!(scoped_filter(&claims(ALICE, Role::Seller), target).is_err());
    }

    #[test]
    fn test_product_scope_pins_verified_user() {
        let codec = TokenCodec::new(SECRET);
        let upper = ALICE.to_ascii_uppercase();
        let token = codec.issue(&upper, Role::Seller, Some(&upper)).unwrap();
        let claims = codec.verify(&token).unwrap();
        let product_id = RecordId::parse("cccccccccccccccccccccccc").unwrap();

        let filter = scoped_filter(&claims, Target::OwnedProduct { id: &product_id }).unwrap();
        assert_eq!(
            filter.predicates(),
            &[
                Predicate::Eq("_id".into(), json!("cccccccccccccccccccccccc")),
                Predicate::Eq("seller_id".into(), json!(ALICE)),
            ]
        );

        let own_record = RecordId::parse(ALICE).unwrap();
        assert!(scoped_filter(
            &claims,
            Target::User {
                id: &own_record,
                audience: Audience::Sellers,
                access: Access::AdminOrSelf,
            }
        )
        .is_ok());
    }

    #[test]
    fn test_product_scope_pins_owner() {
        let product_id = RecordId::parse("cccccccccccccccccccccccc").unwrap();
        let filter = scoped_filter(
            &claims(BOB, Role::CustomerSeller),
            Target::OwnedProduct { id: &product_id },
        )
        .unwrap();

        assert!(filter
            .predicates()
            .contains(&Predicate::Eq("seller_id".into(), json!(BOB))));

        assert!(matches!(
            scoped_filter(
                &claims(ALICE, Role::Customer),
                Target::OwnedProduct { id: &product_id }
            ),
            Err(AuthError::Forbidden(_))
        ));
    }
}
