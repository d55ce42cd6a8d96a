mod common;

use common::{product, wait_for_cache, Backend, Harness, Seed};
use mercado_core::{LineItem, PaymentMethod, SaleDraft};
use mercado_store::Collection;
use mercado_sync::{SessionState, Severity};

#[tokio::test]
async fn test_demo_writes_stay_local_and_refresh_cache() {
    let rice = product("rice", "Arroz", 1.20, 10);
    let h = Harness::start(Backend::Demo, Seed::new().product(rice.clone()).build()).await;
    assert_eq!(h.controller.state().await, SessionState::Demo);

    h.engine
        .sales
        .process(SaleDraft::new(vec![LineItem::snapshot(&rice, 4)], PaymentMethod::CashUsd))
        .await
        .unwrap();

    assert_eq!(h.remote.commit_count(), 0);
    assert_eq!(h.ctx.cache().product("rice").await.unwrap().stock, 6);
    assert_eq!(h.ctx.cache().sales().await.len(), 1);
}

#[tokio::test]
async fn test_cloud_cache_follows_delivery() {
    let rice = product("rice", "Arroz", 1.20, 10);
    let h = Harness::start(Backend::Cloud, Seed::new().product(rice.clone()).build()).await;
    assert_eq!(h.controller.state().await, SessionState::Subscribed);

    h.engine
        .sales
        .process(SaleDraft::new(vec![LineItem::snapshot(&rice, 4)], PaymentMethod::CashUsd))
        .await
        .unwrap();
    assert_eq!(h.count(Collection::Sales).await, 1);

    // No reload in cloud mode: the change arrives with a subscription delivery.
    loop {
        let revision = h.ctx.cache().revision();
        if h.ctx.cache().product("rice").await.map(|p| p.stock) == Some(6) {
            break;
        }
        wait_for_cache(&h.ctx, revision).await;
    }
    assert_eq!(h.ctx.cache().product("rice").await.unwrap().stock, 6);
}

#[tokio::test]
async fn test_catalog_edit_cannot_clobber_sale_decrement() {
    let oil = product("oil", "Aceite", 3.0, 10);
    let h = Harness::start(Backend::Cloud, Seed::new().product(oil.clone()).build()).await;
    let other = h.second_register().await;

    // The edit form was opened before the sale, with stock 10.
    let mut edited = oil.clone();
    edited.sale_price = 3.5;

    other
        .sales
        .process(SaleDraft::new(vec![LineItem::snapshot(&oil, 3)], PaymentMethod::CashUsd))
        .await
        .unwrap();
    h.engine.catalog.update_product(&edited).await.unwrap();

    let stored = h.product("oil").await;
    assert_eq!(stored.stock, 7);
    assert_eq!(stored.sale_price, 3.5);
}

#[tokio::test]
async fn test_admin_actions_refused_in_cloud() {
    let mut h = Harness::start(Backend::Cloud, Seed::new().build()).await;
    h.drain();

    let err = h.engine.admin.reset_system().await.unwrap_err();
    assert_eq!(err.code(), "DEMO_ONLY");
    assert!(h
        .drain()
        .iter()
        .any(|n| n.severity == Severity::Warning));
}

#[tokio::test]
async fn test_sign_out_clears_cache() {
    let rice = product("rice", "Arroz", 1.20, 10);
    let h = Harness::start(Backend::Cloud, Seed::new().product(rice).build()).await;
    assert_eq!(h.ctx.cache().products().await.len(), 1);

    h.controller.sign_out().await.unwrap();
    assert_eq!(h.controller.state().await, SessionState::TornDown);
    assert!(h.ctx.cache().products().await.is_empty());
}
