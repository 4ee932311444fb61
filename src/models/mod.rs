pub mod doi;
pub mod loaders;
pub mod submission;

pub use doi::{DoiRecord, DoiStatus};
pub use loaders::{load_all_submissions, load_submission};
pub use submission::{Author, Chapter, Publication, Series, Submission};
