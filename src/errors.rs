use thiserror::Error;

pub type Result<T> = anyhow::Result<T>;

/// SDK 操作层错误
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("参数无效: {0}")]
    InvalidParameter(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("命令执行失败: {0}")]
    CommandFailed(String),

    #[error("no interactive terminal available: {0}")]
    NoTerminal(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl SdkError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SdkError::InvalidParameter(_) => "INVALID_PARAMETER",
            SdkError::NotFound(_) => "NOT_FOUND",
            SdkError::CommandFailed(_) => "COMMAND_FAILED",
            SdkError::NoTerminal(_) => "NO_TERMINAL",
            SdkError::Io(_) => "IO_ERROR",
            SdkError::Json(_) => "JSON_ERROR",
        }
    }
}

/// 协议层错误，携带 JSON-RPC 错误码
#[derive(Error, Debug)]
pub enum MCPError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MCPError {
    pub fn code(&self) -> i32 {
        use crate::mcp::protocol::error_codes;

        match self {
            MCPError::ParseError(_) => error_codes::PARSE_ERROR,
            MCPError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            MCPError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            MCPError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            MCPError::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            MCPError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            MCPError::ParseError(_) => "请确保每行是一个完整的 JSON-RPC 消息",
            MCPError::InvalidRequest(_) => "请先发送 initialize 请求",
            MCPError::MethodNotFound(_) => "使用 tools/list 或 resources/list 查看可用能力",
            MCPError::InvalidParams(_) => "请检查参数格式并确保所有必需参数都已提供",
            MCPError::ResourceNotFound(_) => "请检查资源 URI 是否正确",
            MCPError::Internal(_) => "请稍后重试，如果问题持续存在请检查服务端日志",
        }
    }
}

impl From<SdkError> for MCPError {
    fn from(err: SdkError) -> Self {
        match err {
            SdkError::InvalidParameter(msg) => MCPError::InvalidParams(msg),
            SdkError::NotFound(msg) => MCPError::ResourceNotFound(msg),
            other => MCPError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_maps_to_protocol_error() {
        let err: MCPError = SdkError::InvalidParameter("mode".to_string()).into();
        assert_eq!(err.code(), -32602);

        let err: MCPError = SdkError::CommandFailed("boom".to_string()).into();
        assert_eq!(err.code(), -32603);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SdkError::NotFound("java".into()).error_code(), "NOT_FOUND");
        assert_eq!(SdkError::NoTerminal("tty".into()).error_code(), "NO_TERMINAL");
    }

    #[test]
    fn test_io_error_converts() {
        fn dup_fd() -> std::result::Result<(), SdkError> {
            Err(std::io::Error::from_raw_os_error(9))?;
            Ok(())
        }
        let err = dup_fd().unwrap_err();
        assert!(matches!(err, SdkError::Io(_)));
        assert_eq!(err.error_code(), "IO_ERROR");

        let err: MCPError = err.into();
        assert_eq!(err.code(), -32603);
    }
}
