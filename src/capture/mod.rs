pub mod driver;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod snapshot;
pub mod types;

pub use driver::ScrollDriver;
pub use engine::{CaptureLoop, CaptureSettings, ItemHook};
pub use errors::DriverError;
pub use ledger::DedupLedger;
pub use snapshot::{Frame, SnapshotDriver};
pub use types::{Auxiliary, CaptureReport, CapturedItem, RenderedBlock, StopReason};
