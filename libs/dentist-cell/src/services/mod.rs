pub mod availability;
pub mod calculator;
pub mod catalog;
pub mod working_hours;

pub use availability::AvailabilityService;
pub use calculator::{AvailabilityCalculator, SlotState};
pub use catalog::ServiceCatalog;
pub use working_hours::WorkingHoursService;
