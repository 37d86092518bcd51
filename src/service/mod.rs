pub mod background_jobs;
pub mod error;
pub mod geocoding_service;
pub mod lifecycle_service;
pub mod location_service;
pub mod notification_service;
pub mod proximity_service;
pub mod rating_service;
