pub mod flow;
pub mod scratch;

pub use flow::{AppointmentCreator, Authenticator, GuestBookingFlow};
pub use scratch::{MemoryScratchStore, RedisScratchStore, ScratchStore};
