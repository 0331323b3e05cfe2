use mongodb::bson::doc;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthResponse, AuthToken, LoginRequest, RegisterRequest, UserView},
            petition::non_blank,
        },
        common::Role,
        db::{NewUser, User, UserCore},
        mongodb::{is_duplicate_key_error, Coll},
    },
    Config,
};

use super::common::user_by_token;

pub fn routes() -> Vec<Route> {
    routes![register, login, me]
}

#[post("/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegisterRequest>,
    users: Coll<NewUser>,
    config: &State<Config>,
) -> Result<(Status, Json<AuthResponse>)> {
    non_blank(&request.name, "name")?;
    non_blank(&request.email, "email")?;
    non_blank(&request.password, "password")?;
    non_blank(&request.location, "location")?;
    let role: Role = request.role.parse().map_err(Error::BadRequest)?;

    let user = UserCore::new(
        request.name.trim().to_string(),
        request.email.trim().to_lowercase(),
        &request.password,
        role,
        request.location.trim().to_string(),
    );

    // The unique index on email makes this race-free.
    let new_id = match users.insert_one(&user, None).await {
        Ok(inserted) => inserted
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::bad_request(format!(
                "Email already registered: {}",
                user.email
            )));
        }
        Err(err) => return Err(err.into()),
    };

    let user = User { id: new_id, user };
    let token = AuthToken::new(&user).encode(config);
    info!("Registered {} user {}", user.role, user.id);

    Ok((
        Status::Created,
        Json(AuthResponse {
            token,
            user: UserView::from(&user),
        }),
    ))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<LoginRequest>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let with_email = doc! {
        "email": credentials.email.trim().to_lowercase(),
    };

    let user = users
        .find_one(with_email, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid email or password"))?;

    let token = AuthToken::new(&user).encode(config);

    Ok(Json(AuthResponse {
        token,
        user: UserView::from(&user),
    }))
}

#[get("/auth/me")]
pub async fn me(token: AuthToken, users: Coll<User>) -> Result<Json<UserView>> {
    let user = user_by_token(&token, &users).await?;
    Ok(Json(UserView::from(&user)))
}
