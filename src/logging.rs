use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    Data, Orbit, Request, Response, Rocket,
};

/// Sequence number tying a response log line back to its request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct RequestId(usize);

impl RequestId {
    /// The next ID, unique within this process.
    fn next() -> RequestId {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fairing that logs every request and its response, at a severity
/// matching the response class: successful signs and votes at info,
/// client mistakes at warn, and anything 5xx at error alongside the
/// message from `Error`'s responder.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let address = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Civix backend listening on {protocol}://{address}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next);
        info!("{id} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let status = res.status();
        let route = match req.route() {
            Some(route) => route.uri.to_string(),
            None => "unmatched route".to_string(),
        };
        match status.class() {
            StatusClass::ServerError => error!("{id} {status} {route}"),
            StatusClass::ClientError => warn!("{id} {status} {route}"),
            _ => info!("{id} {status} {route}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, finishing in-flight requests");
    }
}
