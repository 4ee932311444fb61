pub mod archiver;
pub mod export_files;
pub mod registry;
pub mod status_tracker;

pub use archiver::{archiver_for, Archiver, TarArchiver, ZipArchiver};
pub use registry::{DoiRegistry, FileDoiRegistry, InMemoryDoiRegistry, SeedSummary};
pub use status_tracker::{DepositStatusTracker, StatusUpdate};
