pub mod analyze;
pub mod answer;
pub mod artifacts;
pub mod chat;
pub mod chunking;
pub mod compare;
pub mod config;
pub mod embeddings;
pub mod indexing;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod response;
pub mod retrieve;
pub mod store;
