mod account;
mod ledger;
mod money;
mod service;
mod transaction;

pub use account::*;
pub use ledger::*;
pub use money::*;
pub use service::*;
pub use transaction::*;
