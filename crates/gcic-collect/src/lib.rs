//! GalacticCIC collection pipeline
//!
//! Runner + parsers + collectors. Collectors are the only layer with side
//! effects, and those flow exclusively through the runner, the HTTP client,
//! and the store.

pub mod collectors;
pub mod geo;
pub mod parse;
pub mod runner;
pub mod singleflight;

pub use collectors::{registry, Collector, CollectorContext, CollectorOutcome, Tier};
pub use geo::GeoClient;
pub use runner::{CommandOutcome, CommandOutput, CommandRunner};
pub use singleflight::SingleFlight;
