//! Route definitions for the RentHub API

mod rental;
mod sponsorship;
mod wallet;

pub use rental::rental_routes;
pub use sponsorship::sponsorship_routes;
pub use wallet::wallet_routes;
