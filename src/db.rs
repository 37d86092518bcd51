pub mod jobdb;
pub mod locationdb;
pub mod memory;
pub mod ratingdb;

#[cfg(test)]
mod pg_tests;

use sqlx::{Pool, Postgres};

use self::{jobdb::JobExt, locationdb::LocationExt, ratingdb::RatingExt};

#[derive(Debug, Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// Everything the services need from persistence.
///
/// Every mutating method is a single conditional write; implementations
/// must apply the write and its precondition check atomically.
pub trait JobStore: JobExt + LocationExt + RatingExt + Send + Sync + std::fmt::Debug {}

impl<T> JobStore for T where T: JobExt + LocationExt + RatingExt + Send + Sync + std::fmt::Debug {}
