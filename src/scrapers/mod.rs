pub mod availability;
pub mod browser;
pub mod discovery;
#[cfg(test)]
pub mod fake;
pub mod parse;
pub mod traits;
pub mod types;

pub use availability::AvailabilityExtractor;
pub use browser::ChromeDriverFactory;
pub use discovery::ListingDiscovery;
pub use traits::DriverFactory;
pub use types::ExtractorSettings;
