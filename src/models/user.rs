// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// User profile stored in the `users` collection.
///
/// Accounts are created by the registration flow, which also stores a
/// password hash on the document. That field is never read here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    /// Document ID; the key every other collection refers to
    pub id: String,
    /// Unique
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub surname: String,
    #[serde(default)]
    pub role: Role,
    #[validate(length(max = 300))]
    pub bio: Option<String>,
    #[validate(url)]
    pub photo: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Copy the given fields over this profile. Returns whether anything
    /// actually changed.
    pub fn apply_profile(&mut self, patch: &ProfilePatch) -> bool {
        fn set(field: &mut String, value: &Option<String>) -> bool {
            match value {
                Some(v) if v != field => {
                    *field = v.clone();
                    true
                }
                _ => false,
            }
        }
        fn set_opt(field: &mut Option<String>, value: &Option<String>) -> bool {
            match value {
                Some(v) if field.as_ref() != Some(v) => {
                    *field = Some(v.clone());
                    true
                }
                _ => false,
            }
        }

        let mut changed = set(&mut self.name, &patch.name);
        changed |= set(&mut self.surname, &patch.surname);
        changed |= set(&mut self.email, &patch.email);
        changed |= set_opt(&mut self.bio, &patch.bio);
        changed |= set_opt(&mut self.photo, &patch.photo);
        changed |= set_opt(&mut self.city, &patch.city);
        changed |= set_opt(&mut self.phone, &patch.phone);
        changed
    }
}

/// Self-service profile edit. Absent fields are left as they are; the
/// password and role cannot be changed this way.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfilePatch {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub surname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 300))]
    pub bio: Option<String>,
    #[validate(url)]
    pub photo: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_password_field_is_ignored_on_read() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "ana@example.com",
            "name": "Ana",
            "surname": "García",
            "password": "$argon2id$v=19$...",
            "role": "admin"
        }))
        .unwrap();

        assert!(user.is_admin());
        let back = serde_json::to_value(&user).unwrap();
        assert!(back.get("password").is_none());
    }

    #[test]
    fn test_profile_validation() {
        let mut user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "ana@example.com",
            "name": "Ana",
            "surname": "García"
        }))
        .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.validate().is_ok());

        user.email = "not-an-email".to_string();
        assert!(user.validate().is_err());

        user.email = "ana@example.com".to_string();
        user.photo = Some("not a url".to_string());
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_apply_profile_reports_changes() {
        let mut user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "ana@example.com",
            "name": "Ana",
            "surname": "García",
            "city": "Madrid"
        }))
        .unwrap();

        let same = ProfilePatch {
            name: Some("Ana".to_string()),
            city: Some("Madrid".to_string()),
            ..ProfilePatch::default()
        };
        assert!(!user.apply_profile(&same));

        let moved = ProfilePatch {
            city: Some("Sevilla".to_string()),
            bio: Some("Runner".to_string()),
            ..ProfilePatch::default()
        };
        assert!(user.apply_profile(&moved));
        assert_eq!(user.city.as_deref(), Some("Sevilla"));
        assert_eq!(user.bio.as_deref(), Some("Runner"));
        assert_eq!(user.name, "Ana");
    }

    #[test]
    fn test_profile_patch_validation() {
        let patch = ProfilePatch {
            phone: Some("123".to_string()),
            ..ProfilePatch::default()
        };
        assert!(patch.validate().is_err());

        let patch = ProfilePatch {
            phone: Some("+34 600 000 000".to_string()),
            photo: Some("https://example.com/ana.png".to_string()),
            ..ProfilePatch::default()
        };
        assert!(patch.validate().is_ok());
    }
}
