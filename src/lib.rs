#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
mod config;
pub mod error;
mod logging;
pub mod model;
mod ratelimit;

pub use config::Config;

/// Construct the Rocket instance: all routes mounted, config loaded, the
/// database connected and indexed, and request logging attached.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(logging::LoggerFairing)
        .manage(ratelimit::VoteLimiter::new())
}

/// A Rocket instance against a specific test database, skipping the
/// `DatabaseFairing` so every test gets its own isolated database.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .manage(client)
        .manage(db)
        .manage(ratelimit::VoteLimiter::new())
}

#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::build()
        .figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to the database")
}

/// A fresh, unique database name, so concurrent tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    use rand::Rng;

    let suffix: u32 = rand::thread_rng().gen();
    format!("civix_test_{suffix:08x}")
}
