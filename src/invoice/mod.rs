mod engine;
mod exporter;
mod locator;
mod notifier;
mod populator;

#[cfg(test)]
mod mocks;

pub use engine::{InvoiceEngine, RunOutcome};
