use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use salesmasters_pricing::{
    commands::{ApplyHeaderDiscountsCommand, RefreshPriceDataCommand},
    config::{self, EngineConfig},
    events::{create_event_channel, EventSender},
    models::line_item::promo_flag,
    models::{LineItem, OrderTotals, PriceTableEntry, PriceTableRef, TIER_COUNT},
    pricing::recalculate_all,
    session::OrderSession,
    sources::memory::InMemoryPriceTable,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    match cli.command {
        Commands::Price(args) => handle_price_command(&context, args, cli.json).await?,
        Commands::Summary(args) => handle_summary_command(args, cli.json)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "pricing", about = "SalesMasters order pricing CLI", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price an order file: run the discount cascade and tax
    /// compounding over every item and print the order totals.
    Price(PriceArgs),
    /// Print the per-item discount summary text of an order file.
    Summary(SummaryArgs),
}

#[derive(Args)]
struct PriceArgs {
    #[arg(long, value_parser = clap::value_parser!(PathBuf), help = "Path to the order JSON file")]
    order: PathBuf,
    #[arg(
        long,
        value_parser = clap::value_parser!(PathBuf),
        help = "Optional price table JSON; item descriptions, IPI and ST are refreshed from it"
    )]
    table: Option<PathBuf>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Copy the header discount tiers onto every non-promotional item before pricing"
    )]
    header_discounts: bool,
}

#[derive(Args)]
struct SummaryArgs {
    #[arg(long, value_parser = clap::value_parser!(PathBuf), help = "Path to the order JSON file")]
    order: PathBuf,
}

/// On-disk order format accepted by the CLI.
#[derive(Deserialize)]
struct OrderFile {
    #[serde(default)]
    header: HeaderInput,
    items: Vec<ItemInput>,
}

#[derive(Default, Deserialize)]
struct HeaderInput {
    /// Header discount tiers, first to last. Missing slots stay zero.
    #[serde(default)]
    discounts: Vec<Decimal>,
    #[serde(default)]
    allow_duplicates: bool,
}

#[derive(Deserialize)]
struct ItemInput {
    product_code: String,
    #[serde(default)]
    description: String,
    quantity: Decimal,
    #[serde(default)]
    unit_price: Decimal,
    #[serde(default)]
    reference_code: Option<String>,
    /// Per-item discount tiers, first to last.
    #[serde(default)]
    discounts: Vec<Decimal>,
    #[serde(default)]
    special_discount: Decimal,
    #[serde(default)]
    additional_discount: Decimal,
    #[serde(default)]
    ipi_percent: Decimal,
    #[serde(default)]
    st_percent: Decimal,
    #[serde(with = "promo_flag", default)]
    promotional: bool,
}

impl ItemInput {
    fn into_line_item(self) -> LineItem {
        let mut item = LineItem::new(
            self.product_code,
            self.description,
            self.quantity,
            self.unit_price,
        );
        item.reference_code = self.reference_code;
        copy_tiers(&self.discounts, &mut item.discounts.tiers);
        item.discounts.special = self.special_discount;
        item.discounts.additional = self.additional_discount;
        item.ipi_percent = self.ipi_percent;
        item.st_percent = self.st_percent;
        item.promotional = self.promotional;
        item
    }
}

#[derive(Serialize)]
struct PricingOutput {
    items: Vec<LineItem>,
    totals: OrderTotals,
}

#[derive(Serialize)]
struct SummaryRow {
    product_code: String,
    discount_summary: String,
    net_unit_price: Decimal,
}

struct CliContext {
    config: EngineConfig,
    event_sender: EventSender,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load engine config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let (event_sender, mut event_rx) = create_event_channel(config.event_buffer);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "pricing_cli", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            event_sender,
        })
    }

    fn new_session(&self) -> OrderSession {
        OrderSession::new(&self.config, self.event_sender.clone())
    }
}

async fn handle_price_command(context: &CliContext, args: PriceArgs, json: bool) -> Result<()> {
    let order_file = read_order_file(&args.order)?;
    let mut session = context.new_session();

    {
        let header = session.header_mut();
        copy_tiers(&order_file.header.discounts, &mut header.default_discounts);
        if order_file.header.allow_duplicates {
            header.allow_duplicate_items = true;
        }
    }

    for input in order_file.items {
        session.add_or_update(input.into_line_item()).await?;
    }

    if let Some(path) = &args.table {
        let entries = read_table_file(path)?;
        let table_ref = PriceTableRef::new(Uuid::new_v4(), "cli");
        session.header_mut().price_table = Some(table_ref.clone());

        let source = InMemoryPriceTable::new();
        source.insert_table(table_ref, entries);
        let missing = session
            .apply(&RefreshPriceDataCommand::new(Arc::new(source)))
            .await?;
        for product in &missing {
            eprintln!("warning: product {} not found in the price table", product);
        }
    }

    if args.header_discounts {
        session.apply(&ApplyHeaderDiscountsCommand).await?;
    }

    if json {
        print_json(&PricingOutput {
            items: session.items().to_vec(),
            totals: *session.totals(),
        })?;
    } else {
        render_order(&session);
    }

    Ok(())
}

fn handle_summary_command(args: SummaryArgs, json: bool) -> Result<()> {
    let order_file = read_order_file(&args.order)?;
    let mut items: Vec<LineItem> = order_file
        .items
        .into_iter()
        .map(ItemInput::into_line_item)
        .collect();
    recalculate_all(&mut items);

    if json {
        let rows: Vec<SummaryRow> = items
            .iter()
            .map(|item| SummaryRow {
                product_code: item.product_code.clone(),
                discount_summary: item.discount_summary.clone(),
                net_unit_price: item.net_unit_price,
            })
            .collect();
        print_json(&rows)?;
    } else {
        for item in &items {
            println!(
                "- {} • {} • net {}",
                item.product_code,
                summary_or_none(item),
                item.net_unit_price
            );
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_order(session: &OrderSession) {
    let header = session.header();
    println!(
        "Order {} • {} item(s) • freight {}",
        header.display_number(),
        session.items().len(),
        header.freight
    );
    for item in session.items() {
        render_item(item);
    }
    render_totals(session.totals());
}

fn render_item(item: &LineItem) {
    let sequence = item
        .sequence
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    println!(
        "  • #{} {} {} • {} x {} net {} • discounts {} • total {}",
        sequence,
        item.product_code,
        item.description,
        item.quantity,
        item.gross_unit_price,
        item.net_unit_price,
        summary_or_none(item),
        item.total_with_taxes
    );
}

fn render_totals(totals: &OrderTotals) {
    println!(
        "Totals: gross {} • net {} • IPI {} • with taxes {}",
        totals.gross, totals.net, totals.ipi, totals.with_taxes
    );
}

fn summary_or_none(item: &LineItem) -> &str {
    if item.discount_summary.is_empty() {
        "none"
    } else {
        item.discount_summary.as_str()
    }
}

fn copy_tiers(values: &[Decimal], tiers: &mut [Decimal; TIER_COUNT]) {
    for (slot, value) in tiers.iter_mut().zip(values) {
        *slot = *value;
    }
}

fn read_order_file(path: &Path) -> Result<OrderFile> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read order file {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed to parse order file {}", path.display()))
}

fn read_table_file(path: &Path) -> Result<Vec<PriceTableEntry>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read price table file {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed to parse price table file {}", path.display()))
}
