pub mod core;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod rag;
pub mod server;
pub mod state;
