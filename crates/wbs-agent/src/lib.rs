//! # wbs-agent
//!
//! Language model access for the WBS generator.
//!
//! The generator only needs `generate(prompt) -> text`. This crate provides:
//! - The [`LanguageModel`] trait every generation call goes through
//! - [`ModelSession`]: credential plus model id, constructed once and passed in
//! - [`GeminiClient`]: the Google Gemini `generateContent` implementation
//! - [`ScriptedModel`]: canned replies for tests and offline runs
//!
//! Calls are stateless and never retried here; the caller decides.

mod auth;
mod client;
pub mod mock;
mod types;

pub use auth::get_api_key;
pub use client::{GeminiClient, LanguageModel};
pub use mock::ScriptedModel;
pub use types::*;
