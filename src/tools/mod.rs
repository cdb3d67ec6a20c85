pub mod base;
pub mod sdk_tools;

pub use base::{MCPTool, Schema, SchemaBoolean, SchemaObject, SchemaString};
pub use sdk_tools::{sdk_tools, InteractiveInstallTool, SdkTool, SdkToolKind};
