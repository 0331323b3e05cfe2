use rocket::Route;

pub mod auth;
mod common;
pub mod petition;
pub mod poll;
pub mod report;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(petition::routes());
    routes.extend(poll::routes());
    routes.extend(report::routes());
    routes
}
