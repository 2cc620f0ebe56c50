//! End-to-end tests for the order pricing flow.
//!
//! Tests cover the full journey:
//! - The reference calculation: header discounts, IPI and the totals chain
//! - A complete lifecycle from negotiated terms to a synced order
//! - Promotional items under the header-discount override
//! - The totals tolerance gate and discount summaries

mod common;

use std::sync::Arc;

use common::{complete_header, drain_events, entry, item, select_table, session};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use salesmasters_pricing::{
    commands::{ApplyHeaderDiscountsCommand, RefreshPriceDataCommand},
    config::EngineConfig,
    events::{create_event_channel, Event},
    models::{NegotiatedTerms, TIER_COUNT},
    session::{OrderSession, SessionState},
    sources::memory::{InMemoryNegotiatedTerms, InMemorySyncGateway},
};

// ==================== Reference Calculation ====================

#[tokio::test]
async fn header_discounts_price_the_reference_order() {
    let (mut session, _events) = session();
    session.header_mut().default_discounts[0] = dec!(5);

    let mut line = item("A100", dec!(3), dec!(200));
    line.ipi_percent = dec!(10);
    session.add_or_update(line).await.unwrap();

    session.apply(&ApplyHeaderDiscountsCommand).await.unwrap();

    let priced = &session.items()[0];
    assert_eq!(priced.net_unit_price, dec!(190));
    assert_eq!(priced.gross_total, dec!(600));
    assert_eq!(priced.net_total, dec!(570));
    assert_eq!(priced.total_with_ipi, dec!(627));
    assert_eq!(priced.total_with_taxes, dec!(627));
    assert_eq!(priced.discount_summary, "5.00%");

    let totals = session.totals();
    assert_eq!(totals.gross, dec!(600));
    assert_eq!(totals.net, dec!(570));
    assert_eq!(totals.ipi, dec!(57));
    assert_eq!(totals.with_taxes, dec!(627));
}

#[tokio::test]
async fn discount_summary_reads_in_application_order() {
    let (mut session, _events) = session();

    let mut line = item("A100", dec!(1), dec!(100));
    line.discounts.tiers[0] = dec!(10);
    line.discounts.tiers[2] = dec!(5);
    line.discounts.additional = dec!(2);
    session.add_or_update(line).await.unwrap();

    assert_eq!(session.items()[0].discount_summary, "10.00%+5.00%+2.00%");
}

// ==================== Full Lifecycle ====================

#[tokio::test]
async fn order_lifecycle_from_negotiated_terms_to_synced() {
    // Step 1: a new order for a client with negotiated conditions
    let client_id = Uuid::new_v4();
    let supplier_id = Uuid::new_v4();

    let terms_source = InMemoryNegotiatedTerms::new();
    let mut tiers = [Decimal::ZERO; TIER_COUNT];
    tiers[0] = dec!(10);
    terms_source.insert_terms(
        client_id,
        supplier_id,
        NegotiatedTerms {
            discount_tiers: tiers,
            payment_term: Some("28/35/42".into()),
            ..NegotiatedTerms::default()
        },
    );

    let (event_sender, mut events) = create_event_channel(64);
    let mut session = OrderSession::with_negotiated_terms(
        &EngineConfig::default(),
        event_sender,
        client_id,
        supplier_id,
        &terms_source,
    )
    .await
    .unwrap();

    assert_eq!(session.header().payment_term.as_deref(), Some("28/35/42"));
    assert_eq!(session.header().default_discounts[0], dec!(10));
    assert_eq!(session.header().display_number(), "(Novo)");

    // Step 2: items arrive, one with a blank description
    let mut filter = entry("A100", dec!(80));
    filter.ipi_percent = dec!(10);
    let table = select_table(&mut session, vec![filter, entry("B200", dec!(40))]);

    session.add_or_update(item("A100", dec!(2), dec!(80))).await.unwrap();
    let mut second = item("B200", dec!(5), dec!(40));
    second.description.clear();
    session.add_or_update(second).await.unwrap();

    // Step 3: header discounts, then a data refresh from the table
    session.apply(&ApplyHeaderDiscountsCommand).await.unwrap();
    let missing = session
        .apply(&RefreshPriceDataCommand::new(Arc::new(table)))
        .await
        .unwrap();
    assert!(missing.is_empty());

    assert_eq!(session.items()[1].description, "Produto B200");
    let totals = session.totals();
    assert_eq!(totals.gross, dec!(360));
    assert_eq!(totals.net, dec!(324));
    assert_eq!(totals.ipi, dec!(14.4));
    assert_eq!(totals.with_taxes, dec!(338.4));

    // Step 4: save the header, then sync the items
    complete_header(&mut session);
    let gateway = InMemorySyncGateway::new();

    let number = session.save_header(&gateway).await.unwrap();
    assert_eq!(number, 1);
    assert_eq!(session.header().display_number(), "1");
    assert_eq!(session.state(), SessionState::Saved);

    let synced = session.sync_items(&gateway).await.unwrap();
    assert_eq!(synced.net, dec!(324));
    assert_eq!(session.state(), SessionState::Synced);

    let stored = gateway.stored_items(number);
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|line| line.order_number == Some(number)));

    // Step 5: the event stream tells the same story, in order
    let events = drain_events(&mut events);
    let saved_at = events
        .iter()
        .position(|event| matches!(event, Event::HeaderSaved { order_number: 1 }))
        .unwrap();
    let synced_at = events
        .iter()
        .position(|event| matches!(event, Event::ItemsSynced { count: 2, .. }))
        .unwrap();
    assert!(saved_at < synced_at);
}

// ==================== Promotional Items ====================

#[tokio::test]
async fn promotional_items_keep_only_their_special_discount() {
    let (mut session, _events) = session();
    session.header_mut().default_discounts = [dec!(8); TIER_COUNT];

    let mut promo = item("PROMO-1", dec!(1), dec!(100));
    promo.promotional = true;
    promo.discounts.special = dec!(15);
    promo.discounts.additional = dec!(3);
    session.add_or_update(promo).await.unwrap();

    session.apply(&ApplyHeaderDiscountsCommand).await.unwrap();

    let priced = &session.items()[0];
    assert!(priced.discounts.tiers.iter().all(|d| d.is_zero()));
    assert!(priced.discounts.additional.is_zero());
    assert_eq!(priced.discounts.special, dec!(15));
    assert_eq!(priced.net_unit_price, dec!(85.00));
    assert_eq!(priced.discount_summary, "15.00%");
}

// ==================== Totals Tolerance ====================

#[tokio::test]
async fn totals_move_only_past_the_tolerance() {
    let (mut session, mut events) = session();

    session.add_or_update(item("A100", dec!(1), dec!(10))).await.unwrap();
    assert_eq!(session.totals().net, dec!(10));

    // half a cent of drift stays invisible
    let mut nudged = session.items()[0].clone();
    nudged.gross_unit_price = dec!(10.005);
    session.add_or_update(nudged).await.unwrap();
    assert_eq!(session.totals().net, dec!(10));

    // two cents must land
    let mut moved = session.items()[0].clone();
    moved.gross_unit_price = dec!(10.02);
    session.add_or_update(moved).await.unwrap();
    assert_eq!(session.totals().net, dec!(10.02));

    let total_changes = drain_events(&mut events)
        .into_iter()
        .filter(|event| matches!(event, Event::TotalsChanged { .. }))
        .count();
    assert_eq!(total_changes, 2);
}
