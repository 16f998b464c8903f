pub mod janitor;
pub mod loader;
pub mod passes;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;

pub use janitor::Janitor;
pub use store::ReportStore;
pub use types::JanitorStats;
