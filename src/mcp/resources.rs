use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::MCPError;
use crate::sdk::commands::{CommandResult, SdkCommands};

pub const VERSION_URI: &str = "sdkman://version";
pub const CURRENT_URI: &str = "sdkman://current";
pub const CANDIDATES_PREFIX: &str = "sdkman://candidates/";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// 只读资源：SDKMAN 版本、当前 SDK、候选软件版本列表
#[derive(Clone)]
pub struct SdkResources {
    commands: SdkCommands,
}

impl SdkResources {
    pub fn new(commands: SdkCommands) -> Self {
        Self { commands }
    }

    pub fn list(&self) -> Vec<ResourceInfo> {
        vec![
            ResourceInfo {
                uri: VERSION_URI.to_string(),
                name: "SDKMAN version".to_string(),
                description: "Get SDKMAN version information.".to_string(),
                mime_type: "text/plain".to_string(),
            },
            ResourceInfo {
                uri: CURRENT_URI.to_string(),
                name: "Current SDKs".to_string(),
                description: "Get information about currently active SDKs.".to_string(),
                mime_type: "text/plain".to_string(),
            },
        ]
    }

    pub fn templates(&self) -> Vec<Value> {
        vec![json!({
            "uriTemplate": format!("{CANDIDATES_PREFIX}{{candidate}}"),
            "name": "Candidate versions",
            "description": "Get available versions for a specific candidate.",
            "mimeType": "text/plain",
        })]
    }

    /// 读取资源；命令失败时返回错误文本而不是协议错误
    pub fn read(&self, uri: &str) -> Result<String, MCPError> {
        if uri == VERSION_URI {
            return Ok(render(self.commands.version(), "SDKMAN version"));
        }
        if uri == CURRENT_URI {
            return Ok(render(self.commands.current(), "current SDKs"));
        }
        if let Some(candidate) = uri.strip_prefix(CANDIDATES_PREFIX) {
            let candidate = candidate.trim_matches('/');
            if !candidate.is_empty() && !candidate.contains('/') {
                return Ok(render(
                    self.commands.list_candidate(candidate),
                    &format!("versions for {candidate}"),
                ));
            }
        }
        Err(MCPError::ResourceNotFound(uri.to_string()))
    }
}

fn render(result: CommandResult, what: &str) -> String {
    if result.success {
        result.data.unwrap_or_default()
    } else {
        format!(
            "Error getting {}: {}",
            what,
            result.error.as_deref().unwrap_or("Unknown error")
        )
    }
}
