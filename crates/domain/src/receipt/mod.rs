mod job;
mod order;

pub use job::{PrintJob, PrintLine, PrintOutcome, StyleHint};
pub use order::{OrderData, OrderItem};
