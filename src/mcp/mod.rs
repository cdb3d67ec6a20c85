pub mod protocol;
pub mod resources;
pub mod server;

pub use protocol::{Request, Response, JSONRPC_VERSION, MCP_VERSION};
pub use resources::SdkResources;
pub use server::{MCPServer, Server, ToolInfo};
