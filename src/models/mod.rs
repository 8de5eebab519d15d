pub mod conversation;
pub mod reservation;
