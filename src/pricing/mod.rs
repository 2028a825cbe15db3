//! Priced catalog and its serialized update path

pub mod ledger;

pub use ledger::{PriceEntry, PriceLedger, PriceUpdate};
