pub mod clock;
pub mod datetime;
