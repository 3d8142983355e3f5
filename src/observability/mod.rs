//! Observability for schemavault
//!
//! Structured JSON logs, one line per event, synchronous and unbuffered.
//! Lifecycle operations (dump, restore, promote, discard, delete) each emit
//! start/success/fail events carrying tenant, schema, and file context.

mod logger;

pub use logger::{Logger, Severity};
