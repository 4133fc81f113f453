pub mod clinic_api;
pub mod error;

pub use clinic_api::ClinicApiClient;
pub use error::DatabaseError;
