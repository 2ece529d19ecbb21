//! Tool adapter for LLM hosts.
//!
//! Tools take JSON arguments and return text. They can be called one at a
//! time from the CLI or served over JSON-RPC on stdio.

pub mod input;
pub mod render;
pub mod rpc;
pub mod runner;

pub use input::{
    parse_args, parse_args_str, ClearArgs, LevelArgs, ModuleArgs, NextArgs, RegisterArgs,
    SearchArgs, StepArgs,
};
pub use rpc::serve;
pub use runner::{ToolName, ToolOutput, ToolRunner};
