mod common;

use common::{client, product, Backend, Harness, Seed, BOTH};
use mercado_core::{AppConfig, Client, LineItem, PaymentMethod, Permissions, Role, SaleDraft, WALK_IN_CLIENT_ID};
use mercado_store::Collection;
use mercado_sync::Severity;

#[tokio::test]
async fn test_overpayment_clamps_debt_at_zero() {
    for backend in BOTH {
        let seed = Seed::new().client(client("jose", "Jose", 10.00)).build();
        let mut h = Harness::start(backend, seed).await;

        let payment = h.engine.ledger.register_payment("jose", 25.00).await.unwrap();

        assert_eq!(payment.old_debt, 10.00);
        assert_eq!(payment.new_debt, 0.0);
        assert_eq!(h.client("jose").await.debt, 0.0, "{backend:?}");
        assert_eq!(h.count(Collection::ClientPayments).await, 1);
        assert!(h
            .drain()
            .iter()
            .any(|n| n.severity == Severity::Success && n.message.contains("0.00")));
    }
}

#[tokio::test]
async fn test_partial_payment_is_exact() {
    for backend in BOTH {
        let seed = Seed::new().client(client("ana", "Ana", 10.00)).build();
        let h = Harness::start(backend, seed).await;

        let payment = h.engine.ledger.register_payment("ana", 3.30).await.unwrap();
        assert_eq!(payment.new_debt, 6.70);
        assert_eq!(h.client("ana").await.debt, 6.70);

        h.engine.ledger.register_payment("ana", 6.70).await.unwrap();
        assert_eq!(h.client("ana").await.debt, 0.0);

        let history = h.engine.ledger.history("ana").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].date >= history[1].date);
        assert_eq!(history[1].amount, 3.30);
    }
}

#[tokio::test]
async fn test_invalid_payments_rejected() {
    let seed = Seed::new()
        .client(client("luis", "Luis", 5.0))
        .client(Client::walk_in())
        .build();
    let h = Harness::start(Backend::Demo, seed).await;

    let err = h.engine.ledger.register_payment("luis", 0.0).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = h.engine.ledger.register_payment("luis", -2.0).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = h.engine.ledger.register_payment("luis", f64::NAN).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = h
        .engine
        .ledger
        .register_payment(WALK_IN_CLIENT_ID, 1.0)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PROTECTED_CLIENT");

    let err = h.engine.ledger.register_payment("nadie", 1.0).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(h.client("luis").await.debt, 5.0);
    assert_eq!(h.count(Collection::ClientPayments).await, 0);
}

#[tokio::test]
async fn test_payment_and_credit_sale_race_on_same_client() {
    let bag = product("bag", "Bolsa", 5.00, 100);
    let seed = Seed::new()
        .product(bag.clone())
        .client(client("pedro", "Pedro", 20.00))
        .build();
    let h = Harness::start(Backend::Cloud, seed).await;
    let other = h.second_register().await;

    let draft = SaleDraft::new(vec![LineItem::snapshot(&bag, 2)], PaymentMethod::Credit).with_client("pedro");
    let (sale, payment) = tokio::join!(
        other.sales.process(draft),
        h.engine.ledger.register_payment("pedro", 15.00)
    );
    sale.unwrap();
    payment.unwrap();

    // 20 + 10 - 15 regardless of which commit landed first.
    assert_eq!(h.client("pedro").await.debt, 15.00);
}

#[tokio::test]
async fn test_credit_limit_is_advisory() {
    let tv = product("tv", "Televisor", 300.0, 2);
    let seed = Seed::new()
        .product(tv.clone())
        .client(Client {
            credit_limit: 100.0,
            ..client("rosa", "Rosa", 0.0)
        })
        .build();
    let mut h = Harness::start(Backend::Demo, seed).await;

    h.engine
        .sales
        .process(SaleDraft::new(vec![LineItem::snapshot(&tv, 1)], PaymentMethod::Credit).with_client("rosa"))
        .await
        .unwrap();

    assert_eq!(h.client("rosa").await.debt, 300.0);
    let notes = h.drain();
    assert!(notes.iter().any(|n| n.severity == Severity::Warning));
    assert!(notes.iter().any(|n| n.severity == Severity::Success));
}

#[tokio::test]
async fn test_payment_requires_client_management() {
    for backend in BOTH {
        let config = AppConfig {
            permissions: Permissions {
                can_manage_clients: false,
                ..Permissions::default()
            },
            ..AppConfig::default()
        };
        let seed = Seed::new()
            .client(client("eva", "Eva", 10.0))
            .config(config)
            .build();
        let mut h = Harness::start_as(backend, seed, Role::Employee).await;
        h.drain();

        let err = h.engine.ledger.register_payment("eva", 4.0).await.unwrap_err();

        assert_eq!(err.code(), "PERMISSION_DENIED", "{backend:?}");
        assert_eq!(h.client("eva").await.debt, 10.0);
        assert_eq!(h.count(Collection::ClientPayments).await, 0);
        assert!(h.drain().iter().any(|n| n.severity == Severity::Error));
    }
}

#[tokio::test]
async fn test_employee_with_default_permissions_can_take_payment() {
    let seed = Seed::new().client(client("eva", "Eva", 10.0)).build();
    let h = Harness::start_as(Backend::Cloud, seed, Role::Employee).await;

    let payment = h.engine.ledger.register_payment("eva", 4.0).await.unwrap();
    assert_eq!(payment.new_debt, 6.0);
}
