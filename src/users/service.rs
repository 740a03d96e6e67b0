use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::warn;

use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;

use super::repo::User;

/// Lowercase the domain segment of an email, leaving the local part as
/// supplied.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_password(password: &str, min_len: usize) -> Result<(), ApiError> {
    if password.len() < min_len {
        return Err(ApiError::validation(format!(
            "Password must be at least {min_len} characters"
        )));
    }
    Ok(())
}

pub async fn create_user(
    db: &PgPool,
    min_password_len: usize,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, ApiError> {
    create_account(db, min_password_len, email, password, name, false, false).await
}

pub async fn create_superuser(
    db: &PgPool,
    min_password_len: usize,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    create_account(db, min_password_len, email, password, "", true, true).await
}

async fn create_account(
    db: &PgPool,
    min_password_len: usize,
    email: &str,
    password: &str,
    name: &str,
    is_staff: bool,
    is_superuser: bool,
) -> Result<User, ApiError> {
    let email = normalize_email(email.trim());
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "rejected invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    validate_password(password, min_password_len)?;

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::validation("Email already registered"));
    }

    let hash = hash_password(password)?;
    let user = User::insert(db, &email, &hash, name, is_staff, is_superuser).await?;
    Ok(user)
}

/// Credential check with a single indistinguishable failure mode: unknown
/// email and wrong password both come back as `None`.
pub async fn authenticate(
    db: &PgPool,
    email: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let email = normalize_email(email.trim());
    let Some(user) = User::find_by_email(db, &email).await? else {
        return Ok(None);
    };
    if verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_segment_is_lowercased() {
        assert_eq!(normalize_email("test@MKZND.com"), "test@mkznd.com");
    }

    #[test]
    fn local_part_casing_is_preserved() {
        assert_eq!(normalize_email("Tester@MKZND.COM"), "Tester@mkznd.com");
    }

    #[test]
    fn already_normalized_email_is_unchanged() {
        assert_eq!(normalize_email("test@mkznd.com"), "test@mkznd.com");
    }

    #[test]
    fn email_without_at_sign_is_invalid() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email(""));
        assert!(is_valid_email("test@mkznd.com"));
    }

    #[test]
    fn five_char_password_is_rejected() {
        assert!(validate_password("12345", 8).is_err());
    }

    #[test]
    fn eight_char_password_is_accepted() {
        assert!(validate_password("abc12345", 8).is_ok());
    }

    #[test]
    fn password_error_is_a_validation_failure() {
        let err = validate_password("pw", 8).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
