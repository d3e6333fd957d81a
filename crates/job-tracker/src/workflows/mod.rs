pub mod followup;
pub mod intake;
