use serde::{Deserialize, Serialize};

/// Request body for user registration. String fields default to empty so an
/// absent field is rejected the same way as an empty one.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Public profile returned by the user endpoints. Never carries the password.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

/// Request body for the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// PATCH body for /user/me; omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_token_fields_default_to_empty() {
        let req: TokenRequest = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(req.email, "");
        assert_eq!(req.password, "");
    }

    #[test]
    fn user_response_contains_email_and_name_only() {
        let json = serde_json::to_value(UserResponse {
            email: "test@mkznd.com".into(),
            name: "Tester".into(),
        })
        .expect("serialize");
        let obj = json.as_object().expect("object");
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["email"], "test@mkznd.com");
        assert_eq!(obj["name"], "Tester");
    }

    #[test]
    fn token_response_has_token_field() {
        let json = serde_json::to_string(&TokenResponse {
            token: "abc123".into(),
        })
        .expect("serialize");
        assert!(json.contains("\"token\""));
    }

    #[test]
    fn update_me_leaves_omitted_fields_as_none() {
        let req: UpdateMeRequest =
            serde_json::from_str(r#"{"name":"New Name"}"#).expect("deserialize");
        assert_eq!(req.name.as_deref(), Some("New Name"));
        assert!(req.password.is_none());
    }
}
