use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::Serialize;

/// Pagination parameters, taken from the `page_num` and `page_size` query
/// parameters with sensible defaults.
///
/// `page_size` is bounded: 0 would mean "no limit" to MongoDB, and
/// anything huge is a denial-of-service lever.
pub struct Pagination {
    page_num: usize,
    page_size: usize,
}

/// The largest page a client may request.
pub const MAX_PAGE_SIZE: usize = 100;

impl Pagination {
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn skip(&self) -> u64 {
        (self.page_num as u64 - 1).saturating_mul(self.page_size as u64)
    }

    pub fn result(self, total: u64) -> PaginationResult {
        PaginationResult {
            page_num: self.page_num,
            page_size: self.page_size,
            total,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page_num = match req.query_value::<usize>("page_num").unwrap_or(Ok(1)) {
            Ok(page_num) if page_num > 0 => page_num,
            _ => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        let page_size = match req.query_value::<usize>("page_size").unwrap_or(Ok(50)) {
            Ok(page_size) if (1..=MAX_PAGE_SIZE).contains(&page_size) => page_size,
            _ => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        request::Outcome::Success(Self {
            page_num,
            page_size,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationResult {
    page_num: usize,
    page_size: usize,
    total: u64,
}
