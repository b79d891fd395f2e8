//! Client library for the downstream text-to-speech backend.
//!
//! [`SynthesisBackend`] is the seam the broker schedules against;
//! [`TtsApi`] implements it over HTTP with [`reqwest`].

pub mod api;
pub mod backend;

pub use api::TtsApi;
pub use backend::SynthesisBackend;
