//! Tune metadata lookup against thesession.org.

pub mod abc;
pub mod client;
pub mod html;

pub use client::{
    HttpFetcher,
    PageFetcher,
    TheSessionResolver,
    REQUEST_DELAY,
};

use crate::core::{
    LookupError,
    TuneRecord,
};

/// Anything that can turn a candidate title into a tune record.
pub trait TuneLookup {
    fn lookup(&self, title: &str) -> Result<TuneRecord, LookupError>;
}
