pub mod client;

pub use client::{read_stream, CompletionClient, CompletionProvider, SamplingParams};
