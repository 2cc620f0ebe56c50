use crate::errors::ServiceError;
use crate::models::line_item::LineItem;
use crate::models::order::OrderHeader;
use crate::models::price_table::PriceTableIndex;
use crate::sources::PriceTableSource;
use async_trait::async_trait;

/// Command trait for the batch update operations
///
/// Each named whole-collection transformation is one command object.
/// Commands read the session through a [`BatchContext`] and return a
/// [`BatchOutcome`]; they never mutate shared state themselves. The
/// session applies an outcome atomically, so a collaborator failure in
/// the middle of a command leaves the order exactly as it was.
#[async_trait]
pub trait BatchCommand: Send + Sync {
    /// Machine name used in events and logs.
    fn name(&self) -> &'static str;

    /// Execute the command against the current order state
    ///
    /// # Returns
    /// * `Result<BatchOutcome, ServiceError>` - The replacement
    ///   collection or an error, in which case nothing is applied
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError>;
}

/// Read-only view of the order a command executes against.
#[derive(Clone, Copy)]
pub struct BatchContext<'a> {
    pub header: &'a OrderHeader,
    pub items: &'a [LineItem],
}

/// Result of a batch command.
///
/// `items` is the full replacement collection with identities and
/// sequences preserved; commands never add or remove rows. Lookup
/// commands list the product codes the price table could not resolve so
/// callers can warn the user.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub items: Vec<LineItem>,
    pub missing_products: Vec<String>,
}

impl BatchOutcome {
    pub fn replaced(items: Vec<LineItem>) -> Self {
        Self {
            items,
            missing_products: Vec::new(),
        }
    }
}

/// Fetches the order's selected price table and indexes it by product
/// code. Commands that read the catalog all start here.
pub(crate) async fn load_table_index(
    source: &dyn PriceTableSource,
    header: &OrderHeader,
) -> Result<PriceTableIndex, ServiceError> {
    let table = header.price_table.as_ref().ok_or_else(|| {
        ServiceError::InvalidOperation("order has no price table selected".into())
    })?;
    let entries = source.entries(table).await?;
    Ok(PriceTableIndex::new(entries))
}

pub mod align_package_quantities_command;
pub mod apply_additional_discount_command;
pub mod apply_flat_tax_command;
pub mod apply_header_discounts_command;
pub mod apply_negotiated_prices_command;
pub mod apply_policy_discounts_command;
pub mod apply_table_prices_command;
pub mod fill_reference_codes_command;
pub mod force_header_discounts_command;
pub mod refresh_price_data_command;
pub mod revert_base_prices_command;

pub use align_package_quantities_command::AlignPackageQuantitiesCommand;
pub use apply_additional_discount_command::ApplyAdditionalDiscountCommand;
pub use apply_flat_tax_command::ApplyFlatTaxCommand;
pub use apply_header_discounts_command::ApplyHeaderDiscountsCommand;
pub use apply_negotiated_prices_command::ApplyNegotiatedPricesCommand;
pub use apply_policy_discounts_command::ApplyPolicyDiscountsCommand;
pub use apply_table_prices_command::ApplyTablePricesCommand;
pub use fill_reference_codes_command::FillReferenceCodesCommand;
pub use force_header_discounts_command::ForceHeaderDiscountsCommand;
pub use refresh_price_data_command::RefreshPriceDataCommand;
pub use revert_base_prices_command::RevertBasePricesCommand;
