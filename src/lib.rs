pub mod ai;
pub mod anthropic;
pub mod cli;
pub mod core;
pub mod openai;
pub mod session;
