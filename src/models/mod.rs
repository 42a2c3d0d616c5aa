pub mod booking;
pub mod session;

pub use booking::Booking;
pub use session::{
    BookingSession, Candidate, Field, FieldValue, FinishedIntake, PhoneNumber, Stage,
};
