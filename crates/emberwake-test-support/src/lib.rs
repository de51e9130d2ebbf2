//! Shared test doubles for the Emberwake narrative engine.

mod clock;
mod handler;
mod rng;
mod store;

pub use clock::FixedClock;
pub use handler::{FailingHandler, RecordingHandler};
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingRecordStore, ReadOnlyRecordStore, SlowRecordStore};
