mod common;

use common::{client, product, Backend, Harness, Seed, BOTH};
use mercado_core::{LineItem, PaymentMethod, SaleDraft, WALK_IN_CLIENT_ID};
use mercado_store::{Collection, SALES_COUNTER_ID};
use mercado_sync::Severity;

fn line(p: &mercado_core::Product, qty: i64) -> LineItem {
    LineItem::snapshot(p, qty)
}

#[tokio::test]
async fn test_failed_line_leaves_no_partial_writes() {
    for backend in BOTH {
        let a = product("a", "Harina", 1.10, 5);
        let b = product("b", "Aceite", 3.25, 5);
        let c = product("c", "Azucar", 0.95, 0);
        let seed = Seed::new()
            .product(a.clone())
            .product(b.clone())
            .product(c.clone())
            .strict_stock()
            .build();
        let mut h = Harness::start(backend, seed).await;

        let draft = SaleDraft::new(
            vec![line(&a, 1), line(&b, 2), line(&c, 1)],
            PaymentMethod::CashUsd,
        );
        let err = h.engine.sales.process(draft).await.unwrap_err();

        assert_eq!(err.code(), "INSUFFICIENT_STOCK", "{backend:?}");
        assert!(err.to_string().contains("Azucar"));
        assert_eq!(h.product("a").await.stock, 5);
        assert_eq!(h.product("b").await.stock, 5);
        assert_eq!(h.count(Collection::Sales).await, 0);
        assert!(h
            .store()
            .get(Collection::Counters, SALES_COUNTER_ID)
            .await
            .unwrap()
            .is_none());

        let notes = h.drain();
        assert!(notes.iter().any(|n| n.severity == Severity::Error));
    }
}

#[tokio::test]
async fn test_stock_runs_to_zero_then_refuses() {
    for backend in BOTH {
        let rice = mercado_core::Product {
            min_stock: 5,
            ..product("rice", "Arroz", 1.20, 10)
        };
        let seed = Seed::new().product(rice.clone()).strict_stock().build();
        let h = Harness::start(backend, seed).await;

        let sale = h
            .engine
            .sales
            .process(SaleDraft::new(vec![line(&rice, 10)], PaymentMethod::CashBs))
            .await
            .unwrap();
        assert_eq!(sale.total, 12.0);
        assert_eq!(h.product("rice").await.stock, 0);

        let err = h
            .engine
            .sales
            .process(SaleDraft::new(vec![line(&rice, 1)], PaymentMethod::CashBs))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_STOCK", "{backend:?}");
        assert_eq!(h.product("rice").await.stock, 0);
        assert_eq!(h.count(Collection::Sales).await, 1);
    }
}

#[tokio::test]
async fn test_negative_stock_allowed_by_default() {
    for backend in BOTH {
        let soda = product("soda", "Refresco", 2.0, 1);
        let h = Harness::start(backend, Seed::new().product(soda.clone()).build()).await;

        h.engine
            .sales
            .process(SaleDraft::new(vec![line(&soda, 3)], PaymentMethod::Card))
            .await
            .unwrap();
        assert_eq!(h.product("soda").await.stock, -2);
    }
}

#[tokio::test]
async fn test_lines_for_same_product_are_combined() {
    let eggs = product("eggs", "Huevos", 0.25, 3);
    let seed = Seed::new().product(eggs.clone()).strict_stock().build();
    let h = Harness::start(Backend::Demo, seed).await;

    let err = h
        .engine
        .sales
        .process(SaleDraft::new(
            vec![line(&eggs, 2), line(&eggs, 2)],
            PaymentMethod::CashUsd,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_STOCK");
    assert_eq!(h.product("eggs").await.stock, 3);
}

#[tokio::test]
async fn test_credit_sale_adds_exact_total_to_debt() {
    for backend in BOTH {
        let cheese = product("cheese", "Queso", 8.50, 20);
        let seed = Seed::new()
            .product(cheese.clone())
            .client(client("maria", "Maria", 10.00))
            .build();
        let h = Harness::start(backend, seed).await;

        let sale = h
            .engine
            .sales
            .process(SaleDraft::new(vec![line(&cheese, 3)], PaymentMethod::Credit).with_client("maria"))
            .await
            .unwrap();

        assert_eq!(sale.total, 25.50);
        assert_eq!(sale.client_id.as_deref(), Some("maria"));
        assert_eq!(h.client("maria").await.debt, 35.50, "{backend:?}");
    }
}

#[tokio::test]
async fn test_credit_needs_registered_client() {
    let bread = product("bread", "Pan", 1.0, 10);
    let seed = Seed::new()
        .product(bread.clone())
        .client(mercado_core::Client::walk_in())
        .build();
    let h = Harness::start(Backend::Demo, seed).await;

    let no_client = SaleDraft::new(vec![line(&bread, 1)], PaymentMethod::Credit);
    let err = h.engine.sales.process(no_client).await.unwrap_err();
    assert_eq!(err.code(), "CREDIT_REQUIRES_CLIENT");

    let walk_in = SaleDraft::new(vec![line(&bread, 1)], PaymentMethod::Credit).with_client(WALK_IN_CLIENT_ID);
    assert!(h.engine.sales.process(walk_in).await.is_err());

    let ghost = SaleDraft::new(vec![line(&bread, 1)], PaymentMethod::Credit).with_client("ghost");
    let err = h.engine.sales.process(ghost).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(h.product("bread").await.stock, 10);
    assert_eq!(h.count(Collection::Sales).await, 0);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    for backend in BOTH {
        let h = Harness::start(backend, Seed::new().build()).await;
        let gone = product("gone", "Descontinuado", 1.0, 1);

        let err = h
            .engine
            .sales
            .process(SaleDraft::new(vec![line(&gone, 1)], PaymentMethod::CashUsd))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{backend:?}");
        assert!(err.to_string().contains("gone"));
    }
}

#[tokio::test]
async fn test_empty_sale_rejected_before_storage() {
    let mut h = Harness::start(Backend::Cloud, Seed::new().build()).await;
    let before = h.remote.commit_count();

    let err = h
        .engine
        .sales
        .process(SaleDraft::new(Vec::new(), PaymentMethod::CashUsd))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EMPTY_SALE");
    assert_eq!(h.remote.commit_count(), before);
    assert!(h.drain().iter().any(|n| n.severity == Severity::Error));
}

#[tokio::test]
async fn test_sale_numbers_follow_counter() {
    for backend in BOTH {
        let tea = product("tea", "Te", 1.5, 100);
        let mut h = Harness::start(backend, Seed::new().product(tea.clone()).build()).await;

        let first = h
            .engine
            .sales
            .process(SaleDraft::new(vec![line(&tea, 1)], PaymentMethod::MobilePay))
            .await
            .unwrap();
        let second = h
            .engine
            .sales
            .process(SaleDraft::new(vec![line(&tea, 1)], PaymentMethod::MobilePay))
            .await
            .unwrap();

        assert_eq!(first.number, "V-000001");
        assert_eq!(second.number, "V-000002");
        assert!(h
            .drain()
            .iter()
            .any(|n| n.severity == Severity::Success && n.message.contains("V-000002")));
    }
}

#[tokio::test]
async fn test_totals_snapshot_exchange_rate_and_tax() {
    let lamp = product("lamp", "Bombillo", 2.00, 10);
    let config = mercado_core::AppConfig {
        exchange_rate: 50.0,
        tax_rate: 16.0,
        ..mercado_core::AppConfig::default()
    };
    let seed = Seed::new().product(lamp.clone()).config(config).build();
    let h = Harness::start(Backend::Cloud, seed).await;

    let sale = h
        .engine
        .sales
        .process(SaleDraft::new(vec![line(&lamp, 5)], PaymentMethod::Transfer))
        .await
        .unwrap();

    assert_eq!(sale.tax_amount, Some(1.6));
    assert_eq!(sale.total, 11.6);
    assert_eq!(sale.exchange_rate, 50.0);
    assert_eq!(sale.total_local, 580.0);
}

#[tokio::test]
async fn test_concurrent_last_unit_sells_once() {
    let last = product("last", "Ultima unidad", 4.0, 1);
    let seed = Seed::new().product(last.clone()).strict_stock().build();
    let h = Harness::start(Backend::Cloud, seed).await;
    let other = h.second_register().await;

    let draft = SaleDraft::new(vec![line(&last, 1)], PaymentMethod::CashUsd);
    let (a, b) = tokio::join!(
        h.engine.sales.process(draft.clone()),
        other.sales.process(draft)
    );

    let outcomes = [a, b];
    let ok = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.code(), "INSUFFICIENT_STOCK");

    assert_eq!(h.product("last").await.stock, 0);
    assert_eq!(h.count(Collection::Sales).await, 1);
}

#[tokio::test]
async fn test_concurrent_sales_on_disjoint_products_both_land() {
    let a = product("a", "Cafe", 3.0, 10);
    let b = product("b", "Leche", 1.5, 10);
    let seed = Seed::new().product(a.clone()).product(b.clone()).build();
    let h = Harness::start(Backend::Cloud, seed).await;
    let other = h.second_register().await;

    let (first, second) = tokio::join!(
        h.engine
            .sales
            .process(SaleDraft::new(vec![line(&a, 2)], PaymentMethod::CashUsd)),
        other
            .sales
            .process(SaleDraft::new(vec![line(&b, 3)], PaymentMethod::CashUsd))
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_ne!(first.number, second.number);
    assert_eq!(h.product("a").await.stock, 8);
    assert_eq!(h.product("b").await.stock, 7);
    assert_eq!(h.count(Collection::Sales).await, 2);
}

#[tokio::test]
async fn test_unavailable_remote_fails_without_writes() {
    let milk = product("milk", "Leche", 1.5, 10);
    let mut h = Harness::start(Backend::Cloud, Seed::new().product(milk.clone()).build()).await;
    h.drain();

    h.remote.set_available(false);
    let err = h
        .engine
        .sales
        .process(SaleDraft::new(vec![line(&milk, 1)], PaymentMethod::CashUsd))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNAVAILABLE");
    assert!(err.is_retryable());
    assert!(h.drain().iter().any(|n| n.severity == Severity::Error));

    h.remote.set_available(true);
    assert_eq!(h.product("milk").await.stock, 10);
    assert_eq!(h.count(Collection::Sales).await, 0);
}
