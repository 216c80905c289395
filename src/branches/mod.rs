pub mod index;
pub mod record;

pub use index::{BranchIndex, DEFAULT_BRANCH_ICON};
pub use record::Branch;
