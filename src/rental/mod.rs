//! Rental lifecycle: request, approval, payment, completion, and the
//! equipment-availability invariant.

mod model;
mod service;

pub use model::{
    billable_periods, compute_total_amount, rental_days, CreateRentalRequest, ListRentalsQuery,
    PaymentMethod, PaymentStatus, ReceiptDecision, ReceiptStatus, Rental, RentalStatus,
    UpdateStatusRequest, UploadReceiptRequest, ValidateReceiptRequest,
};
pub use service::RentalService;
