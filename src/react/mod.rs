//! 对话层：Coder 的工具调用循环

pub mod loop_;

pub use loop_::{converse, DialogueOutcome};
