pub mod client;
pub mod credentials;
pub mod rest;
pub mod token;
pub mod types;

pub use client::TargetClient;
pub use credentials::{CredentialStore, HealthCounter, TargetHandle, TargetRegistry};
pub use token::TokenStatus;
