#![warn(clippy::pedantic)]
//! Client for Yandex Cloud's native `foundationModels/v1/completion` endpoint.

pub mod client;
pub mod error;
pub mod types;

pub use client::YandexClient;
pub use error::YandexError;
pub use types::*;
