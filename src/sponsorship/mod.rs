//! Paid ad-sponsorship lifecycle.

mod model;
mod service;

pub use model::{
    AdSponsorship, CreateSponsorshipRequest, ExtendSponsorshipRequest, SponsorshipStatus,
};
pub use service::SponsorshipService;
