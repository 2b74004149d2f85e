// Ledger primitives shared by every workflow
pub mod expiry;
pub mod ledger;

// Workflows
pub mod sales;
pub mod stock_in;

pub use sales::{RecordSaleRequest, SaleLineRequest, SaleService};
pub use stock_in::{StockInRequest, StockInService};
