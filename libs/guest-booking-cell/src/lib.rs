pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::{GuestBookingError, ScratchStoreError};
pub use models::*;
pub use router::{guest_booking_routes, GuestBookingState};
pub use services::*;
