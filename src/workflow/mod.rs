pub mod deposit_flow;
pub mod submission_ctx;

pub use deposit_flow::{DepositFlow, FlowResult};
pub use submission_ctx::SubmissionCtx;
