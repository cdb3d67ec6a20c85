//! # SDKMAN MCP
//!
//! 通过 MCP (Model Context Protocol) 暴露 SDKMAN! 的 SDK 管理能力。
//!
//! ## 特性
//!
//! - 📦 **SDK 管理** - 列出、安装、切换、卸载各类 SDK 版本
//! - 🔍 **版本表解析** - 把 `sdk list <candidate>` 的表格解析为结构化记录
//! - 🖥️ **交互式安装** - 编号菜单选择版本，确认后安装，可随时取消
//! - 🚀 **MCP协议** - 基于 stdio 的 JSON-RPC 2.0 通信
//!
//! ## 快速开始
//!
//! ```no_run
//! use std::sync::Arc;
//! use sdkman_mcp::{config::SdkmanConfig, mcp::{MCPServer, SdkResources, Server}};
//! use sdkman_mcp::sdk::{CancelToken, SdkCommands, ShellExecutor};
//! use sdkman_mcp::tools::sdk_tools;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let commands = SdkCommands::new(Arc::new(ShellExecutor::new(SdkmanConfig::from_env())));
//!     let registry = MCPServer::new();
//!     for tool in sdk_tools(commands.clone(), &CancelToken::new()) {
//!         registry.register_tool(tool).await?;
//!     }
//!     Server::new("sdkman".into(), "0.1.0".into(), registry)
//!         .with_resources(SdkResources::new(commands))
//!         .run()
//!         .await
//! }
//! ```

pub mod config;
pub mod errors;
pub mod mcp;
pub mod sdk;
pub mod tools;

pub use errors::{MCPError, Result, SdkError};

/// 服务器名称
pub const SERVER_NAME: &str = "sdkman";

/// 服务器版本
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
