pub mod health;
pub mod me;
pub mod ott;
pub mod token;
