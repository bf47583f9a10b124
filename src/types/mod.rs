mod document;
mod error;
mod generator;
mod invoice;
mod rateio;
mod representative;
mod subscriber;

pub use document::*;
pub use error::*;
pub use generator::*;
pub use invoice::*;
pub use rateio::*;
pub use representative::*;
pub use subscriber::*;
