use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::protocol::{
    error_codes, InitializeParams, InitializeResult, Request, Response, ServerInfo,
    JSONRPC_VERSION, MCP_VERSION,
};
use super::resources::SdkResources;
use crate::errors::{MCPError, SdkError};
use crate::tools::base::MCPTool;

/// 工具信息结构
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// MCP 工具注册表
pub struct MCPServer {
    tools: Arc<RwLock<Vec<Box<dyn MCPTool>>>>,
}

impl Default for MCPServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MCPServer {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register_tool(&self, tool: Box<dyn MCPTool>) -> Result<()> {
        let mut tools = self.tools.write().await;
        if tools.iter().any(|t| t.name() == tool.name()) {
            return Err(anyhow::anyhow!("工具已存在: {}", tool.name()));
        }
        tools.push(tool);
        Ok(())
    }

    pub async fn execute_tool(&self, tool_name: &str, params: Value) -> Result<Value> {
        let tools = self.tools.read().await;

        for tool in tools.iter() {
            if tool.name() == tool_name {
                return tool.execute(params).await;
            }
        }

        Err(MCPError::InvalidParams(format!("Unknown tool: {tool_name}")).into())
    }

    /// 获取所有工具列表
    pub async fn list_tools(&self) -> Vec<ToolInfo> {
        let tools = self.tools.read().await;
        tools
            .iter()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema().to_json_schema(),
            })
            .collect()
    }

    /// 获取工具数量
    pub async fn get_tool_count(&self) -> usize {
        self.tools.read().await.len()
    }
}

/// stdio 上的 MCP 服务器
pub struct Server {
    /// 服务器名称
    name: String,
    /// 服务器版本
    version: String,
    /// 是否已初始化
    initialized: bool,
    mcp_server: MCPServer,
    resources: Option<SdkResources>,
}

impl Server {
    /// 创建新的 MCP 服务器实例
    pub fn new(name: String, version: String, mcp_server: MCPServer) -> Self {
        Self {
            name,
            version,
            initialized: false,
            mcp_server,
            resources: None,
        }
    }

    pub fn with_resources(mut self, resources: SdkResources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// 在 stdin/stdout 上运行服务器
    pub async fn run(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// 按行读取 JSON-RPC 消息直到 EOF
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("🔧 MCP服务器已启动，等待请求...");

        loop {
            let mut request_line = String::new();
            match reader.read_line(&mut request_line).await {
                Ok(0) => {
                    info!("📡 客户端断开连接");
                    break;
                }
                Ok(n) => debug!("📥 收到 {} 字节数据: {}", n, request_line.trim()),
                Err(e) => {
                    warn!("❌ 读取输入错误: {}", e);
                    break;
                }
            }

            if request_line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&request_line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!("❌ 请求解析失败: {}", e);
                    Some(Response::from_error(
                        Value::Null,
                        &MCPError::ParseError(e.to_string()),
                    ))
                }
            };

            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!("📤 发送响应: {}", response_json);
                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        info!("👋 MCP服务器关闭");
        Ok(())
    }

    /// 处理 MCP 请求；通知不产生响应
    pub async fn handle_request(&mut self, request: Request) -> Option<Response> {
        if request.is_notification() {
            debug!("收到通知: {}", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request.params),
            "ping" => Ok(json!({})),
            _ if !self.initialized => {
                Err(MCPError::InvalidRequest("Server not initialized".to_string()))
            }
            "shutdown" => {
                self.initialized = false;
                Ok(Value::Null)
            }
            "tools/list" => Ok(self.handle_list_tools().await),
            "tools/call" => self.handle_tool_call(&request.params).await,
            "resources/list" => Ok(self.handle_list_resources()),
            "resources/templates/list" => Ok(self.handle_list_resource_templates()),
            "resources/read" => self.handle_read_resource(&request.params).await,
            other => Err(MCPError::MethodNotFound(other.to_string())),
        };

        Some(match result {
            Ok(value) => Response::success(id, value),
            Err(err) => Response::from_error(id, &err),
        })
    }

    /// 处理初始化请求
    fn handle_initialize(&mut self, params: &Value) -> Result<Value, MCPError> {
        if self.initialized {
            return Err(MCPError::InvalidRequest("Server already initialized".to_string()));
        }

        let params: InitializeParams = if params.is_null() {
            InitializeParams::default()
        } else {
            serde_json::from_value(params.clone())
                .map_err(|e| MCPError::InvalidParams(e.to_string()))?
        };

        if let Some(client) = &params.client_info {
            info!("Client connected: {} {}", client.name, client.version);
        }

        let mut capabilities = json!({ "tools": { "listChanged": false } });
        if self.resources.is_some() {
            capabilities["resources"] = json!({ "subscribe": false, "listChanged": false });
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            capabilities,
            instructions: Some(
                "SDKMAN! SDK Manager for managing parallel versions of multiple SDKs".to_string(),
            ),
        };

        let value = serde_json::to_value(result).map_err(|e| MCPError::Internal(e.to_string()))?;
        self.initialized = true;
        Ok(value)
    }

    /// 处理工具列表请求
    async fn handle_list_tools(&self) -> Value {
        let tool_list: Vec<Value> = self
            .mcp_server
            .list_tools()
            .await
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.parameters
                })
            })
            .collect();

        json!({ "tools": tool_list })
    }

    /// 处理工具调用请求
    async fn handle_tool_call(&self, params: &Value) -> Result<Value, MCPError> {
        let tool_name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| MCPError::InvalidParams("Missing tool name".to_string()))?;

        let tool_params = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        let result = self
            .mcp_server
            .execute_tool(tool_name, tool_params)
            .await
            .map_err(protocol_error)?;

        let is_error = !result
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let text = serde_json::to_string_pretty(&result)
            .map_err(|e| MCPError::Internal(e.to_string()))?;

        Ok(json!({
            "content": [
                {
                    "type": "text",
                    "text": text
                }
            ],
            "isError": is_error
        }))
    }

    fn handle_list_resources(&self) -> Value {
        let resources = self
            .resources
            .as_ref()
            .map(|r| serde_json::to_value(r.list()).unwrap_or_else(|_| json!([])))
            .unwrap_or_else(|| json!([]));
        json!({ "resources": resources })
    }

    fn handle_list_resource_templates(&self) -> Value {
        let templates = self
            .resources
            .as_ref()
            .map(|r| r.templates())
            .unwrap_or_default();
        json!({ "resourceTemplates": templates })
    }

    async fn handle_read_resource(&self, params: &Value) -> Result<Value, MCPError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| MCPError::InvalidParams("Missing resource uri".to_string()))?;
        let resources = self
            .resources
            .clone()
            .ok_or_else(|| MCPError::ResourceNotFound(uri.to_string()))?;

        let target = uri.to_string();
        let text = tokio::task::spawn_blocking(move || resources.read(&target))
            .await
            .map_err(|e| MCPError::Internal(e.to_string()))??;
        Ok(json!({
            "contents": [
                {
                    "uri": uri,
                    "mimeType": "text/plain",
                    "text": text
                }
            ]
        }))
    }
}

/// 把工具执行错误映射为协议错误
fn protocol_error(err: anyhow::Error) -> MCPError {
    match err.downcast::<MCPError>() {
        Ok(mcp) => mcp,
        Err(err) => match err.downcast::<SdkError>() {
            Ok(sdk) => sdk.into(),
            Err(other) => MCPError::Internal(format!("工具执行失败: {other}")),
        },
    }
}
