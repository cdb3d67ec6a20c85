//! SDKMAN 命令层：执行、解析、交互式版本选择

pub mod commands;
pub mod executor;
pub mod parser;
pub mod selection;

pub use commands::{CommandResult, SdkCommands};
pub use executor::{CommandExecutor, CommandOutput, ShellExecutor};
pub use parser::{parse_versions, VersionRecord};
pub use selection::{CancelToken, Prompter, SelectionEngine, SelectionOutcome, TerminalPrompter};
