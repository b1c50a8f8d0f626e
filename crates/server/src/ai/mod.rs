//! AI features backed by the Gemini API

pub mod client;
pub mod insights;
pub mod prescription;

pub use client::GeminiClient;
