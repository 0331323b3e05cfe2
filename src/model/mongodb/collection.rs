use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    AdminLog, NewAdminLog, NewPetition, NewPoll, NewSignature, NewUser, NewVote, Petition, Poll,
    Signature, User, Vote,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// User collections
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewUser {
    const NAME: &'static str = USERS;
}

// Petition collections
const PETITIONS: &str = "petitions";
impl MongoCollection for Petition {
    const NAME: &'static str = PETITIONS;
}
impl MongoCollection for NewPetition {
    const NAME: &'static str = PETITIONS;
}

// Signature collections
const SIGNATURES: &str = "signatures";
impl MongoCollection for Signature {
    const NAME: &'static str = SIGNATURES;
}
impl MongoCollection for NewSignature {
    const NAME: &'static str = SIGNATURES;
}

// Poll collections
const POLLS: &str = "polls";
impl MongoCollection for Poll {
    const NAME: &'static str = POLLS;
}
impl MongoCollection for NewPoll {
    const NAME: &'static str = POLLS;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Admin log collections
const ADMIN_LOGS: &str = "admin_logs";
impl MongoCollection for AdminLog {
    const NAME: &'static str = ADMIN_LOGS;
}
impl MongoCollection for NewAdminLog {
    const NAME: &'static str = ADMIN_LOGS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The compound indexes on signatures and votes are what make the
/// sign-once and vote-once rules safe under concurrent requests; the
/// handlers rely on the duplicate-key error instead of a pre-check.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db).create_index(user_index, None).await?;

    // Signature collection.
    let signature_index = IndexModel::builder()
        .keys(doc! {"petition": 1, "user": 1})
        .options(unique.clone())
        .build();
    Coll::<Signature>::from_db(db)
        .create_index(signature_index, None)
        .await?;

    // Vote collection.
    let vote_index = IndexModel::builder()
        .keys(doc! {"poll": 1, "user": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db).create_index(vote_index, None).await?;

    Ok(())
}
