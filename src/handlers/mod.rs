//! API handlers for the RentHub backend

pub mod rental;
pub mod sponsorship;
pub mod wallet;

pub use rental::*;
pub use sponsorship::*;
pub use wallet::*;
