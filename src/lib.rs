pub mod amount;
pub mod config;
pub mod csv;
pub mod ledger;
pub mod model;
pub mod registry;

pub use amount::{Amount, Balance};
pub use config::RegistryConfig;
pub use ledger::{ErrorKind, Ledger, LedgerError};
pub use model::{Address, Command, Event, ExpenseId, GroupId, GroupInfo, Page, ReceiptHash};
pub use registry::{GroupHandle, Registry, RegistryError};
