#![deny(unsafe_code)]

pub mod config;
pub mod destination;
pub mod generator;

pub use config::DestinationConfig;
pub use destination::{Destination, DestinationResolver};
pub use generator::RuleGenerator;
