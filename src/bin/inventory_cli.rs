use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use pharmacy_inventory::{
    config,
    db,
    entities::sale_transaction,
    InventoryEngine, SaleLineRequest, StockInRequest,
};
use rust_decimal::Decimal;
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(context.engine.db_pool())
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::Quantity(args) => {
            let quantity = context
                .engine
                .current_quantity(args.product_id)
                .await
                .with_context(|| format!("failed to read product {}", args.product_id))?;
            if cli.json {
                print_json(&quantity)?;
            } else {
                println!("Product {}: {} on hand", args.product_id, quantity);
            }
        }
        Commands::Expiry(args) => {
            let dates = context
                .engine
                .expiry_dates(args.product_id)
                .await
                .with_context(|| format!("failed to read product {}", args.product_id))?;
            if cli.json {
                print_json(&dates)?;
            } else if dates.is_empty() {
                println!("Product {} has no expiry dates", args.product_id);
            } else {
                for date in dates.iter() {
                    println!("{}", date);
                }
            }
        }
        Commands::StockIn(args) => handle_stock_in(&context, args, cli.json).await?,
        Commands::ReverseStockIn(args) => {
            context
                .engine
                .reverse_stock_in(args.id)
                .await
                .with_context(|| format!("failed to reverse stock-in {}", args.id))?;
            println!("Stock-in {} reversed", args.id);
        }
        Commands::InvoiceItems(args) => {
            let items = context
                .engine
                .invoice_stock_ins(args.id)
                .await
                .with_context(|| format!("failed to list stock-ins of invoice {}", args.id))?;
            if cli.json {
                print_json(&items)?;
            } else {
                for item in &items {
                    println!(
                        "- Stock-in {} • product {} • {} units @ {} • expiry {}",
                        item.id,
                        item.product_id,
                        item.quantity,
                        item.cost_price,
                        item.expiry_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }
        Commands::Sale(args) => {
            let sale = context
                .engine
                .record_sale(args.user, args.items)
                .await
                .context("failed to record sale")?;
            if cli.json {
                print_json(&sale)?;
            } else {
                render_sale(&sale);
            }
        }
        Commands::ReverseSale(args) => {
            context
                .engine
                .reverse_sale(args.id)
                .await
                .with_context(|| format!("failed to reverse sale {}", args.id))?;
            println!("Sale {} reversed", args.id);
        }
        Commands::ShowSale(args) => {
            let sale = context
                .engine
                .get_sale(args.id)
                .await
                .with_context(|| format!("failed to load sale {}", args.id))?;
            if cli.json {
                print_json(&sale)?;
            } else {
                render_sale(&sale);
            }
        }
        Commands::Sales(args) => {
            let (sales, total) = context
                .engine
                .list_sales(args.page, args.limit)
                .await
                .context("failed to list sales")?;
            if cli.json {
                print_json(&sales)?;
            } else {
                println!("{} sales in total", total);
                for sale in &sales {
                    println!(
                        "- Sale {} • user {} • {} lines • total {} • {}",
                        sale.id,
                        sale.user_id,
                        sale.items.len(),
                        sale.total(),
                        sale.created_at
                    );
                }
            }
        }
    }

    Ok(())
}

async fn handle_stock_in(context: &CliContext, args: StockInArgs, json: bool) -> Result<()> {
    let record = context
        .engine
        .stock_in_with(StockInRequest {
            product_id: args.product_id,
            invoice_id: args.invoice_id,
            quantity: args.quantity,
            cost_price: args.cost_price,
            expiry_date: args.expiry_date,
            comment: args.comment.unwrap_or_default(),
        })
        .await
        .context("failed to record stock-in")?;

    if json {
        print_json(&record)?;
    } else {
        println!(
            "Stock-in {} recorded: {} units of product {} on invoice {}",
            record.id, record.quantity, record.product_id, record.invoice_id
        );
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "inventory-cli",
    about = "Operator CLI for the pharmacy inventory engine",
    version
)]
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
    /// Apply pending schema migrations
    Migrate,
    /// Show a product's on-hand quantity
    Quantity(ProductArgs),
    /// Show a product's expiry dates
    Expiry(ProductArgs),
    /// Receive stock against an invoice
    StockIn(StockInArgs),
    /// Undo a stock-in
    ReverseStockIn(IdArgs),
    /// List the stock-ins of an invoice
    InvoiceItems(IdArgs),
    /// Record a sale
    Sale(SaleArgs),
    /// Undo a sale
    ReverseSale(IdArgs),
    /// Show one sale with its line items
    ShowSale(IdArgs),
    /// List sales, newest first
    Sales(PageArgs),
}

#[derive(Args)]
struct ProductArgs {
    #[arg(help = "Product id")]
    product_id: i32,
}

#[derive(Args)]
struct IdArgs {
    #[arg(help = "Record id")]
    id: i32,
}

#[derive(Args)]
struct StockInArgs {
    #[arg(long, help = "Product receiving the stock")]
    product_id: i32,
    #[arg(long, help = "Invoice the stock arrived on")]
    invoice_id: i32,
    #[arg(long, help = "Units received")]
    quantity: i32,
    #[arg(long, help = "Unit cost price")]
    cost_price: Decimal,
    #[arg(long, value_parser = parse_date, help = "Expiry date (YYYY-MM-DD)")]
    expiry_date: Option<NaiveDate>,
    #[arg(long, help = "Free-text note")]
    comment: Option<String>,
}

#[derive(Args)]
struct SaleArgs {
    #[arg(long, help = "Cashier user id")]
    user: i32,
    #[arg(
        long = "item",
        required = true,
        value_parser = parse_sale_line,
        help = "Line item as PRODUCT_ID:QUANTITY, repeatable"
    )]
    items: Vec<SaleLineRequest>,
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1, help = "1-based page number")]
    page: u64,
    #[arg(long, default_value_t = 20, help = "Sales per page (max 100)")]
    limit: u64,
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

fn parse_sale_line(value: &str) -> Result<SaleLineRequest> {
    let (product, quantity) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("expected PRODUCT_ID:QUANTITY, got '{}'", value))?;
    Ok(SaleLineRequest {
        product_id: product
            .trim()
            .parse()
            .with_context(|| format!("invalid product id '{}'", product))?,
        quantity: quantity
            .trim()
            .parse()
            .with_context(|| format!("invalid quantity '{}'", quantity))?,
    })
}

struct CliContext {
    engine: Arc<InventoryEngine>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(&config.log_level, config.log_json);
        tracing::debug!(environment = %config.environment, "configuration loaded");

        let engine = InventoryEngine::from_config(&config)
            .await
            .context("failed to initialize inventory engine")?;

        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_sale(sale: &sale_transaction::Model) {
    println!(
        "Sale {} • user {} • {} • total {}",
        sale.id,
        sale.user_id,
        sale.created_at,
        sale.total()
    );
    for item in &sale.items {
        println!(
            "  - {} ({}) • {} x {} = {}",
            item.generic_name,
            item.brand_name,
            item.quantity,
            item.selling_price,
            item.subtotal()
        );
    }
}
