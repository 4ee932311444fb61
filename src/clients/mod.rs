pub mod deposit_client;
pub mod response;

pub use deposit_client::DepositClient;
pub use response::{DepositFailure, DepositOutcome, OutcomeStatus};
