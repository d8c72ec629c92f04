//! HTTP-backed collaborators and configuration for the Tandem pair.
//!
//! `tandem-core` owns the orchestration; this crate supplies the concrete
//! writer/reviewer implementations (OpenAI-compatible chat endpoints), the
//! endpoint configuration, and the prompt preambles the pair runs with.

pub mod config;
pub mod prompts;
pub mod providers;
