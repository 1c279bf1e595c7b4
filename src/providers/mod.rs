pub mod open_exchange;
pub mod util;

pub use open_exchange::{OpenExchangeAdapter, OpenExchangeProvider};
