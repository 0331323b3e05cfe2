use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::Status,
    request::{self, FromRequest},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{common::Role, db::User, mongodb::Id},
    Config,
};

/// Raw registration data, received from a client. The role arrives as a
/// plain string and is validated at the boundary rather than inside serde,
/// so bad values produce a 400 instead of Rocket's 422.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub location: String,
}

/// Raw login credentials. The password is plaintext here and is never
/// stored in this form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user as exposed over the API: everything except the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub location: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            location: user.location.clone(),
        }
    }
}

/// Successful register/login response: a bearer token plus the user it
/// belongs to.
#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

/// An authentication token representing a specific user with a specific role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "sub")]
    id: Id,
    #[serde(rename = "rol")]
    role: Role,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }

    /// The authenticated user's ID.
    pub fn id(&self) -> Id {
        self.id
    }

    /// The authenticated user's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Fail with `Forbidden` unless the caller has the given role.
    pub fn require(&self, role: Role) -> Result<(), Error> {
        self.require_any(&[role])
    }

    /// Fail with `Forbidden` unless the caller's role is in the given set.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), Error> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "User role '{}' is not authorized to access this route",
                self.role
            )))
        }
    }

    /// Serialize this token into a signed JWT.
    pub fn encode(self, config: &Config) -> String {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap() // Infallible.
    }

    /// Deserialize and verify a bearer JWT.
    pub fn decode(token: &str, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = ();

    /// Get an AuthToken from the `Authorization: Bearer` header.
    /// Missing, malformed, or expired credentials all fail with 401.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap(); // Valid as `Config` is always managed

        let bearer = match req
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
        {
            Some(bearer) => bearer,
            None => return request::Outcome::Failure((Status::Unauthorized, ())),
        };

        match Self::decode(bearer, config) {
            Ok(token) => request::Outcome::Success(token),
            Err(_) => request::Outcome::Failure((Status::Unauthorized, ())),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegisterRequest {
        pub fn example_citizen() -> Self {
            Self {
                name: "Asha Rao".into(),
                email: "asha@example.com".into(),
                password: "correct horse battery".into(),
                role: "citizen".into(),
                location: "Delhi".into(),
            }
        }

        pub fn example_citizen2() -> Self {
            Self {
                name: "Vikram Joshi".into(),
                email: "vikram@example.com".into(),
                password: "staple battery horse".into(),
                role: "citizen".into(),
                location: "Pune".into(),
            }
        }

        pub fn example_official() -> Self {
            Self {
                name: "Meera Iyer".into(),
                email: "meera@gov.example.com".into(),
                password: "seal of office".into(),
                role: "official".into(),
                location: "Delhi".into(),
            }
        }

        pub fn example_admin() -> Self {
            Self {
                name: "Admin".into(),
                email: "admin@example.com".into(),
                password: "root of all evil".into(),
                role: "admin".into(),
                location: "Delhi".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::db::UserCore;

    #[test]
    fn token_round_trip() {
        let config = Config::example();
        let user = User {
            id: mongodb::bson::oid::ObjectId::new().into(),
            user: UserCore::new(
                "Asha Rao".to_string(),
                "asha@example.com".to_string(),
                "correct horse battery",
                Role::Citizen,
                "Delhi".to_string(),
            ),
        };

        let token = AuthToken::new(&user);
        let decoded = AuthToken::decode(&token.encode(&config), &config).unwrap();
        assert_eq!(decoded.id(), user.id);
        assert_eq!(decoded.role(), Role::Citizen);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = Config::example();
        assert!(AuthToken::decode("not-a-jwt", &config).is_err());
    }

    #[test]
    fn role_requirements() {
        let config = Config::example();
        let user = User {
            id: mongodb::bson::oid::ObjectId::new().into(),
            user: UserCore::new(
                "Meera Iyer".to_string(),
                "meera@gov.example.com".to_string(),
                "seal of office",
                Role::Official,
                "Delhi".to_string(),
            ),
        };
        let token = AuthToken::decode(&AuthToken::new(&user).encode(&config), &config).unwrap();

        assert!(token.require(Role::Official).is_ok());
        assert!(token.require_any(&[Role::Official, Role::Admin]).is_ok());
        assert!(token.require(Role::Citizen).is_err());
    }
}
