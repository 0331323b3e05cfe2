use std::io::Cursor;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    serde::json::json,
    Request, Response,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Token error: {0}")]
    Jwt(#[from] JwtError),
    #[error("Password hashing error: {0}")]
    Argon2(#[from] Argon2Error),
    #[error("Malformed ID: {0}")]
    OidParse(#[from] mongodb::bson::oid::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    TooManyRequests(String),
}

impl Error {
    pub fn bad_request(what: impl Into<String>) -> Self {
        Self::BadRequest(what.into())
    }

    pub fn unauthorized(what: impl Into<String>) -> Self {
        Self::Unauthorized(what.into())
    }

    pub fn forbidden(what: impl Into<String>) -> Self {
        Self::Forbidden(what.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(format!("{} not found", what.into()))
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Errors surface synchronously as a status code plus a
    /// human-readable JSON `{"message": ...}` body.
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        let status = match &self {
            Self::BadRequest(_) | Self::OidParse(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
            Self::TooManyRequests(_) => Status::TooManyRequests,
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
        };
        if status.class().is_server_error() {
            error!("{:?}", self);
        }

        let body = json!({"message": self.to_string()}).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
