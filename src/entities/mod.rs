pub mod invoice;
pub mod product;
pub mod sale_transaction;
pub mod stock_in;
