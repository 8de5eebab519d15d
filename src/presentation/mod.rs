pub mod confirm_reservation;
pub mod conversation_redirect;
