//! # Signalist Providers
//!
//! HTTP clients for the external collaborators (Gemini inference, Finnhub
//! market news) and the adapter that turns a prompt plus an inference call
//! into a [`SummaryResult`](signalist_core::SummaryResult) with per-flow
//! fallbacks.

pub mod finnhub;
pub mod gemini;
pub mod summarize;

pub use finnhub::FinnhubClient;
pub use gemini::GeminiClient;
pub use summarize::{FallbackPolicy, SummarizationAdapter, WELCOME_FALLBACK_INTRO};
