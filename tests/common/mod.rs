#![allow(dead_code)]

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use salesmasters_pricing::{
    config::EngineConfig,
    events::{create_event_channel, Event},
    models::{LineItem, PriceTableEntry, PriceTableRef},
    session::OrderSession,
    sources::memory::InMemoryPriceTable,
};

/// Fresh session under the default engine configuration. The receiver is
/// returned so tests can assert on the emitted events; tests that do not
/// care about events can keep it bound and ignore it.
pub fn session() -> (OrderSession, mpsc::Receiver<Event>) {
    session_with(EngineConfig::default())
}

pub fn session_with(config: EngineConfig) -> (OrderSession, mpsc::Receiver<Event>) {
    let (event_sender, events) = create_event_channel(64);
    (OrderSession::new(&config, event_sender), events)
}

/// Unpriced line item with a generated description.
pub fn item(product_code: &str, quantity: Decimal, unit_price: Decimal) -> LineItem {
    LineItem::new(
        product_code,
        format!("Produto {}", product_code),
        quantity,
        unit_price,
    )
}

/// Catalog row priced at `list_price`, everything else blank.
pub fn entry(product_code: &str, list_price: Decimal) -> PriceTableEntry {
    PriceTableEntry {
        product_code: product_code.into(),
        description: format!("Produto {}", product_code),
        list_price,
        ..PriceTableEntry::default()
    }
}

/// Builds an in-memory price table from `entries` and selects it on the
/// session header.
pub fn select_table(
    session: &mut OrderSession,
    entries: Vec<PriceTableEntry>,
) -> InMemoryPriceTable {
    let supplier_id = session.header().supplier_id.unwrap_or_else(Uuid::new_v4);
    let table = PriceTableRef::new(supplier_id, "T1");

    let source = InMemoryPriceTable::new();
    source.insert_table(table.clone(), entries);

    let header = session.header_mut();
    header.supplier_id = Some(supplier_id);
    header.price_table = Some(table);
    source
}

/// Fills whatever references the header is still missing so a save
/// passes validation. Already-selected references are kept.
pub fn complete_header(session: &mut OrderSession) {
    let header = session.header_mut();
    if header.client_id.is_none() {
        header.client_id = Some(Uuid::new_v4());
    }
    if header.supplier_id.is_none() {
        header.supplier_id = Some(Uuid::new_v4());
    }
    if header.carrier_id.is_none() {
        header.carrier_id = Some(Uuid::new_v4());
    }
    if header.seller_id.is_none() {
        header.seller_id = Some(Uuid::new_v4());
    }
    if header.price_table.is_none() {
        let supplier_id = header.supplier_id.unwrap_or_else(Uuid::new_v4);
        header.price_table = Some(PriceTableRef::new(supplier_id, "T1"));
    }
}

/// Collects every event emitted so far without blocking.
pub fn drain_events(events: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
