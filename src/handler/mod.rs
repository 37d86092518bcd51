pub mod jobs;
pub mod locations;
pub mod ratings;
