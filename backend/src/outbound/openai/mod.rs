//! OpenAI outbound adapters.
//!
//! A thin reqwest implementation of the `AvatarProvider` port: chat
//! completions with an image part for analysis, image generations for
//! synthesis.

mod dto;
mod http_provider;

pub use http_provider::{OpenAiConfig, OpenAiHttpProvider};
