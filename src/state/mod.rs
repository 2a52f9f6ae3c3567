//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::JwtVerifier;
use crate::catalog::CatalogService;
use crate::rental::RentalService;
use crate::sponsorship::SponsorshipService;
use crate::wallet::WalletService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub wallet_service: Arc<WalletService>,
    pub rental_service: Arc<RentalService>,
    pub sponsorship_service: Arc<SponsorshipService>,
    pub catalog_service: Arc<CatalogService>,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(
        wallet_service: Arc<WalletService>,
        rental_service: Arc<RentalService>,
        sponsorship_service: Arc<SponsorshipService>,
        catalog_service: Arc<CatalogService>,
        jwt_verifier: Arc<JwtVerifier>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            wallet_service,
            rental_service,
            sponsorship_service,
            catalog_service,
            jwt_verifier,
            webhook_secret,
        }
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<WalletService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.wallet_service.clone()
    }
}

impl FromRef<AppState> for Arc<RentalService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rental_service.clone()
    }
}

impl FromRef<AppState> for Arc<SponsorshipService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sponsorship_service.clone()
    }
}

impl FromRef<AppState> for Arc<CatalogService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.catalog_service.clone()
    }
}
