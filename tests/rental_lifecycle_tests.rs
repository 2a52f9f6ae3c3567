//! Rental lifecycle tests: creation rules, approval side effects, wallet
//! payment coupling, and the timeout/reminder sweeps.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use std::sync::Arc;
    use uuid::Uuid;

    use renthub_server::catalog::CatalogService;
    use renthub_server::error::DomainError;
    use renthub_server::gateway::GatewayClient;
    use renthub_server::notifier::LogNotifier;
    use renthub_server::rental::{
        CreateRentalRequest, PaymentStatus, RentalService, RentalStatus,
    };
    use renthub_server::wallet::{TransactionType, WalletService};

    /// Helper to create a test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/renthub_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    fn services(pool: PgPool) -> (RentalService, WalletService, CatalogService) {
        let gateway = GatewayClient::new("http://localhost:9".to_string(), "test-key".to_string());
        let wallet = WalletService::new(pool.clone(), gateway);
        let catalog = CatalogService::new(pool.clone());
        let rental = RentalService::new(
            pool,
            catalog.clone(),
            wallet.clone(),
            Arc::new(LogNotifier),
            30,
        );
        (rental, wallet, catalog)
    }

    async fn seed_user(pool: &PgPool, role: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (email, full_name, role) VALUES ($1, 'Test User', $2::user_role) RETURNING id",
        )
        .bind(format!("{}@test.example", Uuid::new_v4()))
        .bind(role)
        .fetch_one(pool)
        .await
        .expect("Failed to seed user")
    }

    async fn seed_equipment(pool: &PgPool, owner_id: Uuid, daily_rate: Decimal) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO equipment (owner_id, name, daily_rate, price_period)
            VALUES ($1, 'Excavator', $2, 'daily')
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(daily_rate)
        .fetch_one(pool)
        .await
        .expect("Failed to seed equipment")
    }

    async fn equipment_available(pool: &PgPool, equipment_id: Uuid) -> bool {
        sqlx::query_scalar::<_, bool>("SELECT is_available FROM equipment WHERE id = $1")
            .bind(equipment_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn request(equipment_id: Uuid, days_from_now: i64, length_days: i64) -> CreateRentalRequest {
        let start = Utc::now().date_naive() + Duration::days(days_from_now);
        CreateRentalRequest {
            equipment_id,
            start_date: start,
            end_date: start + Duration::days(length_days),
            start_time: None,
            end_time: None,
            total_amount: None,
            payment_method: None,
            has_priority: None,
            priority_amount: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_create_computes_total_and_reminder() {
        let pool = setup_test_db().await;
        let (rental_service, _, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        let rental = rental_service
            .create(renter, request(equipment, 1, 4))
            .await
            .unwrap();

        assert_eq!(rental.status, RentalStatus::Pending);
        assert_eq!(rental.total_amount, dec!(200));
        assert_eq!(rental.return_reminder_date, rental.end_date - Duration::days(1));
        // Availability only changes on approval
        assert!(equipment_available(&pool, equipment).await);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_create_rejects_bad_dates() {
        let pool = setup_test_db().await;
        let (rental_service, _, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        // Start in the past
        let result = rental_service.create(renter, request(equipment, -1, 4)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        // End before start
        let mut bad = request(equipment, 2, 4);
        bad.end_date = bad.start_date - Duration::days(1);
        let result = rental_service.create(renter, bad).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        // End equals start
        let mut bad = request(equipment, 2, 4);
        bad.end_date = bad.start_date;
        let result = rental_service.create(renter, bad).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_create_rejects_own_equipment_and_landlords() {
        let pool = setup_test_db().await;
        let (rental_service, _, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let landlord = seed_user(&pool, "landlord").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        let result = rental_service.create(owner, request(equipment, 1, 4)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let result = rental_service.create(landlord, request(equipment, 1, 4)).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_approval_rejects_siblings_and_flips_availability() {
        let pool = setup_test_db().await;
        let (rental_service, _, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter_a = seed_user(&pool, "renter").await;
        let renter_b = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        let a = rental_service.create(renter_a, request(equipment, 1, 4)).await.unwrap();
        let b = rental_service.create(renter_b, request(equipment, 2, 3)).await.unwrap();

        // Only the owner may approve
        let denied = rental_service
            .update_status(a.id, RentalStatus::Approved, renter_a)
            .await;
        assert!(matches!(denied, Err(DomainError::Forbidden(_))));

        let approved = rental_service
            .update_status(a.id, RentalStatus::Approved, owner)
            .await
            .unwrap();
        assert_eq!(approved.status, RentalStatus::Approved);
        assert!(approved.approved_at.is_some());
        assert!(!equipment_available(&pool, equipment).await);

        let b = rental_service.get(b.id).await.unwrap();
        assert_eq!(b.status, RentalStatus::Rejected);

        // Cancelling the approved rental frees the equipment again
        rental_service
            .update_status(a.id, RentalStatus::Cancelled, renter_a)
            .await
            .unwrap();
        assert!(equipment_available(&pool, equipment).await);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_pay_with_wallet() {
        let pool = setup_test_db().await;
        let (rental_service, wallet_service, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        let rental = rental_service.create(renter, request(equipment, 1, 4)).await.unwrap();

        // Paying before approval is an invalid state
        let early = rental_service.pay_with_wallet(rental.id, renter).await;
        assert!(matches!(early, Err(DomainError::InvalidState(_))));

        rental_service
            .update_status(rental.id, RentalStatus::Approved, owner)
            .await
            .unwrap();

        // Unfunded wallet cannot pay, and the rental stays untouched
        let broke = rental_service.pay_with_wallet(rental.id, renter).await;
        assert!(matches!(broke, Err(DomainError::InsufficientBalance)));
        let unchanged = rental_service.get(rental.id).await.unwrap();
        assert_eq!(unchanged.status, RentalStatus::Approved);
        assert_eq!(unchanged.payment_status, PaymentStatus::Pending);

        let wallet = wallet_service.get_or_create(renter).await.unwrap();
        wallet_service
            .apply_transaction(wallet.id, TransactionType::Deposit, dec!(500), "seed", None)
            .await
            .unwrap();

        // Only the renter may pay
        let wrong_payer = rental_service.pay_with_wallet(rental.id, owner).await;
        assert!(matches!(wrong_payer, Err(DomainError::Forbidden(_))));

        let paid = rental_service.pay_with_wallet(rental.id, renter).await.unwrap();
        assert_eq!(paid.status, RentalStatus::Paid);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let wallet = wallet_service.get_or_create(renter).await.unwrap();
        assert_eq!(wallet.balance, dec!(300));

        // Double payment is rejected
        let again = rental_service.pay_with_wallet(rental.id, renter).await;
        assert!(matches!(again, Err(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_priority_fee_best_effort() {
        let pool = setup_test_db().await;
        let (rental_service, wallet_service, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        // Unfunded wallet: creation still succeeds, priority cleared
        let mut req = request(equipment, 1, 4);
        req.has_priority = Some(true);
        req.priority_amount = Some(dec!(25));
        let rental = rental_service.create(renter, req).await.unwrap();
        assert!(!rental.has_priority);
        assert!(rental.priority_amount.is_none());
        assert!(rental.priority_paid_at.is_none());

        // Funded wallet: priority sticks and the fee is debited
        let wallet = wallet_service.get_or_create(renter).await.unwrap();
        wallet_service
            .apply_transaction(wallet.id, TransactionType::Deposit, dec!(100), "seed", None)
            .await
            .unwrap();

        let mut req = request(equipment, 5, 4);
        req.has_priority = Some(true);
        req.priority_amount = Some(dec!(25));
        let rental = rental_service.create(renter, req).await.unwrap();
        assert!(rental.has_priority);
        assert_eq!(rental.priority_amount, Some(dec!(25)));
        assert!(rental.priority_paid_at.is_some());

        let wallet = wallet_service.get_or_create(renter).await.unwrap();
        assert_eq!(wallet.balance, dec!(75));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_cancel_expired_approved_timeout_boundary() {
        let pool = setup_test_db().await;
        let (rental_service, _, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment_old = seed_equipment(&pool, owner, dec!(50)).await;
        let equipment_new = seed_equipment(&pool, owner, dec!(50)).await;

        let stale = rental_service.create(renter, request(equipment_old, 1, 4)).await.unwrap();
        let fresh = rental_service.create(renter, request(equipment_new, 1, 4)).await.unwrap();
        rental_service.update_status(stale.id, RentalStatus::Approved, owner).await.unwrap();
        rental_service.update_status(fresh.id, RentalStatus::Approved, owner).await.unwrap();

        // Backdate the approvals: 25h and 23h against a 24h window
        sqlx::query("UPDATE rentals SET approved_at = now() - interval '25 hours' WHERE id = $1")
            .bind(stale.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE rentals SET approved_at = now() - interval '23 hours' WHERE id = $1")
            .bind(fresh.id)
            .execute(&pool)
            .await
            .unwrap();

        let cancelled = rental_service.cancel_expired_approved(24).await.unwrap();
        assert_eq!(cancelled, 1);

        let stale = rental_service.get(stale.id).await.unwrap();
        assert_eq!(stale.status, RentalStatus::Cancelled);
        assert!(equipment_available(&pool, equipment_old).await);

        let fresh = rental_service.get(fresh.id).await.unwrap();
        assert_eq!(fresh.status, RentalStatus::Approved);
        assert!(!equipment_available(&pool, equipment_new).await);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_return_reminders_marked_once() {
        let pool = setup_test_db().await;
        let (rental_service, wallet_service, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        let rental = rental_service.create(renter, request(equipment, 1, 2)).await.unwrap();
        rental_service.update_status(rental.id, RentalStatus::Approved, owner).await.unwrap();

        let wallet = wallet_service.get_or_create(renter).await.unwrap();
        wallet_service
            .apply_transaction(wallet.id, TransactionType::Deposit, dec!(500), "seed", None)
            .await
            .unwrap();
        rental_service.pay_with_wallet(rental.id, renter).await.unwrap();

        // Make the reminder due
        sqlx::query("UPDATE rentals SET return_reminder_date = CURRENT_DATE WHERE id = $1")
            .bind(rental.id)
            .execute(&pool)
            .await
            .unwrap();

        let due = rental_service.send_return_reminders().await.unwrap();
        assert!(due.iter().any(|r| r.id == rental.id));
        assert!(due.iter().all(|r| r.return_notification_sent));

        // Second sweep finds nothing for this rental
        let again = rental_service.send_return_reminders().await.unwrap();
        assert!(!again.iter().any(|r| r.id == rental.id));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_receipt_flow() {
        let pool = setup_test_db().await;
        let (rental_service, _, _) = services(pool.clone());
        let owner = seed_user(&pool, "landlord").await;
        let renter = seed_user(&pool, "renter").await;
        let equipment = seed_equipment(&pool, owner, dec!(50)).await;

        let mut req = request(equipment, 1, 4);
        req.payment_method = Some(renthub_server::rental::PaymentMethod::Receipt);
        let rental = rental_service.create(renter, req).await.unwrap();

        // Only the renter may upload
        let denied = rental_service
            .upload_payment_receipt(rental.id, owner, "https://cdn.example/r.png")
            .await;
        assert!(matches!(denied, Err(DomainError::Forbidden(_))));

        let uploaded = rental_service
            .upload_payment_receipt(rental.id, renter, "https://cdn.example/r.png")
            .await
            .unwrap();
        assert_eq!(
            uploaded.payment_receipt_status,
            Some(renthub_server::rental::ReceiptStatus::Pending)
        );

        let approved = rental_service
            .validate_payment_receipt(
                rental.id,
                renthub_server::rental::ValidateReceiptRequest {
                    decision: renthub_server::rental::ReceiptDecision::Approved,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.payment_status, PaymentStatus::Paid);
        assert_eq!(approved.status, RentalStatus::Paid);

        // No pending receipt left to validate
        let again = rental_service
            .validate_payment_receipt(
                rental.id,
                renthub_server::rental::ValidateReceiptRequest {
                    decision: renthub_server::rental::ReceiptDecision::Rejected,
                    reason: Some("duplicate".to_string()),
                },
            )
            .await;
        assert!(matches!(again, Err(DomainError::InvalidState(_))));
    }
}
