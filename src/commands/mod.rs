//! CLI command implementations.

mod config;
mod generator;
mod init;
mod invoice;
mod lookup;
mod output;
mod prompt;
mod rateio;
mod representative;
mod status;
mod subscriber;

pub use config::ConfigCmd;
pub use generator::GeneratorCmd;
pub use init::InitCmd;
pub use invoice::InvoiceCmd;
pub use lookup::LookupCmd;
pub use rateio::RateioCmd;
pub use representative::RepresentativeCmd;
pub use status::StatusCmd;
pub use subscriber::SubscriberCmd;
