//! The order being edited, held in memory.
//!
//! [`OrderSession`] owns the header, the item collection and the staging
//! buffer, and is the only place that mutates them. Batch commands run
//! against a read-only view and their outcomes are applied here
//! atomically; persistence goes through the [`OrderSyncGateway`] trait
//! and a failed call leaves the session exactly as it was.

pub mod staging;

pub use staging::{ImportReport, ImportRow, MergeReport, StagingBuffer};

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::commands::{load_table_index, BatchCommand, BatchContext, RefreshPriceDataCommand};
use crate::common::{parse_decimal_or, parse_quantity};
use crate::config::EngineConfig;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::line_item::{ItemKey, LineItem};
use crate::models::order::{OrderHeader, OrderStatus, OrderTotals, SyncTotals};
use crate::pricing::{aggregate, recalculate};
use crate::sources::{NegotiatedTermsSource, OrderSyncGateway, PriceTableSource};

/// Where the session stands relative to the persistence gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Never saved; the order has no number yet.
    New,
    /// Header persisted; the local items were edited since the last
    /// sync, or were never pushed.
    Saved,
    /// Header and items both match the store.
    Synced,
}

/// One order under edit.
pub struct OrderSession {
    header: OrderHeader,
    items: Vec<LineItem>,
    staging: StagingBuffer,
    state: SessionState,
    tolerance: Decimal,
    event_sender: EventSender,
}

impl OrderSession {
    /// Blank order seeded from configuration.
    pub fn new(config: &EngineConfig, event_sender: EventSender) -> Self {
        let mut header = OrderHeader::new();
        header.allow_duplicate_items = config.allow_duplicate_items;
        header.freight = config.default_freight.parse().unwrap_or_default();

        Self {
            header,
            items: Vec::new(),
            staging: StagingBuffer::new(),
            state: SessionState::New,
            tolerance: config.totals_tolerance,
            event_sender,
        }
    }

    /// Blank order for a known client and supplier, with the client's
    /// negotiated conditions copied onto the header when any exist.
    #[instrument(skip(config, event_sender, source))]
    pub async fn with_negotiated_terms(
        config: &EngineConfig,
        event_sender: EventSender,
        client_id: Uuid,
        supplier_id: Uuid,
        source: &dyn NegotiatedTermsSource,
    ) -> Result<Self, ServiceError> {
        let mut session = Self::new(config, event_sender);
        session.header.client_id = Some(client_id);
        session.header.supplier_id = Some(supplier_id);

        if let Some(terms) = source.conditions(client_id, supplier_id).await? {
            info!(%client_id, %supplier_id, "Seeding order header from negotiated terms");
            session.header.apply_terms(&terms);
        }

        Ok(session)
    }

    /// Resumes an existing order. Items are repriced so derived fields
    /// reflect the current calculation, and the header totals follow
    /// under the usual tolerance gate.
    pub fn open(
        config: &EngineConfig,
        event_sender: EventSender,
        header: OrderHeader,
        items: Vec<LineItem>,
    ) -> Self {
        let state = if header.is_saved() {
            SessionState::Saved
        } else {
            SessionState::New
        };

        let mut session = Self {
            header,
            items,
            staging: StagingBuffer::new(),
            state,
            tolerance: config.totals_tolerance,
            event_sender,
        };
        for item in &mut session.items {
            recalculate(item);
        }
        let totals = aggregate(&session.items);
        if totals.differs_from(&session.header.totals, session.tolerance) {
            session.header.totals = totals;
        }
        session
    }

    pub fn header(&self) -> &OrderHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut OrderHeader {
        &mut self.header
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn totals(&self) -> &OrderTotals {
        &self.header.totals
    }

    pub fn staged_items(&self) -> &[LineItem] {
        self.staging.items()
    }

    pub fn find(&self, key: ItemKey) -> Option<&LineItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    /// Inserts a new item or replaces the stored one with the same
    /// entry id.
    ///
    /// The item is repriced before it lands in the collection. Inserts
    /// receive the next sequence; updates keep the stored one. Under
    /// the duplicate policy a second row with the same product and
    /// reference pair is rejected and the collection stays untouched.
    #[instrument(skip(self, item), fields(product_code = %item.product_code))]
    pub async fn add_or_update(&mut self, mut item: LineItem) -> Result<u32, ServiceError> {
        let position = self
            .find_position(ItemKey::Entry(item.entry_id))
            .or_else(|| {
                item.sequence
                    .and_then(|sequence| self.find_position(ItemKey::Sequence(sequence)))
            });

        if self.duplicate_conflict(&item, position) {
            let (product_code, reference_code) = item.identity_pair();
            let (product_code, reference_code) =
                (product_code.to_string(), reference_code.to_string());
            self.event_sender
                .send_or_log(Event::DuplicateRejected {
                    product_code: product_code.clone(),
                    reference_code: reference_code.clone(),
                })
                .await;
            return Err(ServiceError::duplicate_item(product_code, reference_code));
        }

        recalculate(&mut item);

        let sequence = match position {
            Some(index) => {
                let sequence = match self.items[index].sequence {
                    Some(sequence) => sequence,
                    None => self.next_sequence(),
                };
                item.sequence = Some(sequence);
                let entry_id = item.entry_id;
                let product_code = item.product_code.clone();
                self.items[index] = item;
                self.event_sender
                    .send_or_log(Event::ItemUpdated {
                        entry_id,
                        product_code,
                    })
                    .await;
                sequence
            }
            None => {
                let sequence = self.next_sequence();
                item.sequence = Some(sequence);
                let entry_id = item.entry_id;
                let product_code = item.product_code.clone();
                self.items.push(item);
                self.event_sender
                    .send_or_log(Event::ItemAdded {
                        entry_id,
                        sequence,
                        product_code,
                    })
                    .await;
                sequence
            }
        };

        self.mark_dirty();
        self.refresh_totals().await;
        Ok(sequence)
    }

    /// Removes one item. Its sequence number is retired with it.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, key: ItemKey) -> Result<LineItem, ServiceError> {
        let index = self
            .find_position(key)
            .ok_or_else(|| ServiceError::NotFound(format!("item {:?} not in the order", key)))?;

        let removed = self.items.remove(index);
        self.event_sender
            .send_or_log(Event::ItemRemoved {
                entry_id: removed.entry_id,
                product_code: removed.product_code.clone(),
            })
            .await;

        self.mark_dirty();
        self.refresh_totals().await;
        Ok(removed)
    }

    /// Replaces the whole collection, repricing every row. Rows without
    /// a sequence are assigned the following ones in order.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn replace_all(&mut self, mut items: Vec<LineItem>) {
        for item in &mut items {
            recalculate(item);
        }
        self.items = items;

        let mut next = self.next_sequence();
        for index in 0..self.items.len() {
            if self.items[index].sequence.is_none() {
                self.items[index].sequence = Some(next);
                next += 1;
            }
        }

        self.event_sender
            .send_or_log(Event::ItemsReplaced {
                operation: "replace_all".into(),
                count: self.items.len(),
            })
            .await;
        self.mark_dirty();
        self.refresh_totals().await;
    }

    /// Runs one batch command and adopts its outcome atomically.
    ///
    /// Returns the product codes the command could not resolve against
    /// the price table. When the command errors nothing is applied.
    #[instrument(skip(self, command), fields(operation = command.name()))]
    pub async fn apply(&mut self, command: &dyn BatchCommand) -> Result<Vec<String>, ServiceError> {
        let ctx = BatchContext {
            header: &self.header,
            items: &self.items,
        };
        let outcome = command.execute(ctx).await?;

        self.items = outcome.items;
        self.event_sender
            .send_or_log(Event::ItemsReplaced {
                operation: command.name().to_string(),
                count: self.items.len(),
            })
            .await;
        self.mark_dirty();
        self.refresh_totals().await;

        if !outcome.missing_products.is_empty() {
            warn!(
                operation = command.name(),
                missing = outcome.missing_products.len(),
                "Some products were not found in the price table"
            );
        }
        Ok(outcome.missing_products)
    }

    /// Resolves raw import rows against the selected price table and
    /// stages the matches.
    ///
    /// Quantities and prices arrive as free text and are coerced
    /// leniently; a blank or garbled price falls back to the table
    /// price. Rows whose product the table does not know are reported,
    /// never staged.
    #[instrument(skip(self, rows, source), fields(rows = rows.len()))]
    pub async fn stage_import(
        &mut self,
        rows: &[ImportRow],
        source: &dyn PriceTableSource,
    ) -> Result<ImportReport, ServiceError> {
        let index = load_table_index(source, &self.header).await?;
        let mut report = ImportReport::default();

        for row in rows {
            let Some(entry) = index.get(&row.product_code) else {
                report.missing_products.push(row.product_code.clone());
                continue;
            };

            let mut item = LineItem::new(
                entry.product_code.clone(),
                entry.description.clone(),
                parse_quantity(&row.quantity),
                parse_decimal_or(&row.unit_price, entry.list_price),
            );
            item.reference_code = row
                .reference_code
                .clone()
                .or_else(|| entry.reference_code.clone());
            item.ipi_percent = entry.ipi_percent;
            item.st_percent = entry.st_percent;
            item.discounts.tiers = self.header.default_discounts;
            recalculate(&mut item);

            self.staging.stage(item);
            report.staged += 1;
        }

        info!(
            staged = report.staged,
            missing = report.missing_products.len(),
            "Import rows staged"
        );
        Ok(report)
    }

    /// Moves the staged items into the order.
    ///
    /// The duplicate policy is enforced row by row against the growing
    /// collection; rejected rows are dropped and reported. Accepted
    /// rows receive their sequences in staging order.
    #[instrument(skip(self))]
    pub async fn merge_staged(&mut self) -> MergeReport {
        let staged = self.staging.take();
        let mut report = MergeReport::default();
        if staged.is_empty() {
            return report;
        }

        for mut item in staged {
            if self.duplicate_conflict(&item, None) {
                let (product_code, reference_code) = item.identity_pair();
                let (product_code, reference_code) =
                    (product_code.to_string(), reference_code.to_string());
                self.event_sender
                    .send_or_log(Event::DuplicateRejected {
                        product_code: product_code.clone(),
                        reference_code,
                    })
                    .await;
                report.rejected.push(product_code);
                continue;
            }

            item.sequence = Some(self.next_sequence());
            self.items.push(item);
            report.merged += 1;
        }

        if report.merged > 0 {
            self.event_sender
                .send_or_log(Event::StagedItemsMerged {
                    count: report.merged,
                })
                .await;
            self.mark_dirty();
            self.refresh_totals().await;
        }
        report
    }

    /// Drops the staged items without touching the order.
    pub fn discard_staged(&mut self) {
        let count = self.staging.len();
        self.staging.clear();
        if count > 0 {
            info!(count, "Staged items discarded");
        }
    }

    /// Validates and persists the header.
    ///
    /// All missing reference fields are reported together; nothing is
    /// sent to the gateway while any is absent. The first save adopts
    /// the number the gateway assigns.
    #[instrument(skip(self, gateway))]
    pub async fn save_header(&mut self, gateway: &dyn OrderSyncGateway) -> Result<i64, ServiceError> {
        if let Err(errors) = self.header.validate() {
            return Err(ServiceError::missing_fields_from(&errors));
        }
        self.warn_if_invoiced();

        let order_number = gateway.save_header(&self.header).await?;
        self.header.order_number = Some(order_number);
        if self.state == SessionState::New {
            self.state = SessionState::Saved;
        }

        self.event_sender
            .send_or_log(Event::HeaderSaved { order_number })
            .await;
        info!(order_number, "Order header saved");
        Ok(order_number)
    }

    /// Pushes the items to the store and adopts the totals it returns.
    ///
    /// Requires a saved header. When the gateway fails, the local items
    /// and totals stay exactly as they were so the caller can retry.
    #[instrument(skip(self, gateway))]
    pub async fn sync_items(&mut self, gateway: &dyn OrderSyncGateway) -> Result<SyncTotals, ServiceError> {
        let order_number = self.header.order_number.ok_or_else(|| {
            ServiceError::InvalidOperation(
                "order must be saved before its items can be synced".into(),
            )
        })?;
        self.warn_if_invoiced();

        let sync = gateway.sync_items(order_number, &self.items).await?;

        for item in &mut self.items {
            item.order_number = Some(order_number);
        }
        self.adopt_sync_totals(sync).await;
        self.state = SessionState::Synced;

        self.event_sender
            .send_or_log(Event::ItemsSynced {
                order_number,
                count: self.items.len(),
            })
            .await;
        Ok(sync)
    }

    /// Refreshes price data from the selected table and pushes the
    /// result to the store in one step. Returns the product codes the
    /// table no longer carries.
    #[instrument(skip(self, source, gateway))]
    pub async fn refresh_and_sync(
        &mut self,
        source: Arc<dyn PriceTableSource>,
        gateway: &dyn OrderSyncGateway,
    ) -> Result<Vec<String>, ServiceError> {
        let command = RefreshPriceDataCommand::new(source);
        let missing = self.apply(&command).await?;
        self.sync_items(gateway).await?;
        Ok(missing)
    }

    fn find_position(&self, key: ItemKey) -> Option<usize> {
        self.items.iter().position(|item| item.matches(key))
    }

    /// Highest assigned sequence plus one; gaps left by removals are
    /// not refilled.
    fn next_sequence(&self) -> u32 {
        self.items
            .iter()
            .filter_map(|item| item.sequence)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// True when `candidate` would collide with a row other than the
    /// one at `replacing` under the duplicate policy.
    fn duplicate_conflict(&self, candidate: &LineItem, replacing: Option<usize>) -> bool {
        if self.header.allow_duplicate_items {
            return false;
        }
        let identity = candidate.identity_pair();
        self.items
            .iter()
            .enumerate()
            .any(|(index, existing)| Some(index) != replacing && existing.identity_pair() == identity)
    }

    /// Local edits desynchronize the items from the store; the saved
    /// header itself stays saved.
    fn mark_dirty(&mut self) {
        if self.state == SessionState::Synced {
            self.state = SessionState::Saved;
        }
    }

    /// Recomputes the order totals, rewriting the header only when some
    /// component moved beyond the configured tolerance.
    async fn refresh_totals(&mut self) {
        let totals = aggregate(&self.items);
        if totals.differs_from(&self.header.totals, self.tolerance) {
            self.header.totals = totals;
            self.event_sender
                .send_or_log(Event::TotalsChanged {
                    gross_total: totals.gross,
                    net_total: totals.net,
                    net_with_tax_total: totals.with_taxes,
                })
                .await;
        }
    }

    /// Store totals win for gross, net and IPI; the tax-inclusive total
    /// is not part of the sync reply and stays locally computed.
    async fn adopt_sync_totals(&mut self, sync: SyncTotals) {
        let totals = OrderTotals {
            gross: sync.gross,
            net: sync.net,
            ipi: sync.ipi,
            with_taxes: aggregate(&self.items).with_taxes,
        };
        if totals.differs_from(&self.header.totals, self.tolerance) {
            self.header.totals = totals;
            self.event_sender
                .send_or_log(Event::TotalsChanged {
                    gross_total: totals.gross,
                    net_total: totals.net,
                    net_with_tax_total: totals.with_taxes,
                })
                .await;
        }
    }

    /// Editing an invoiced order is allowed but loudly flagged.
    fn warn_if_invoiced(&self) {
        if self.header.status == OrderStatus::Invoiced {
            warn!(
                order = %self.header.display_number(),
                "Order is already invoiced; changes will alter a billed document"
            );
        }
    }
}
