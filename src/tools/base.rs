use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::errors::SdkError;

/// JSON Schema 定义
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Schema {
    Object(SchemaObject),
    String(SchemaString),
    Boolean(SchemaBoolean),
}

impl Schema {
    pub fn validate(&self, value: &Value) -> Result<(), SdkError> {
        match self {
            Schema::Object(obj) => obj.validate(value),
            Schema::String(s) => s.validate(value),
            Schema::Boolean(b) => b.validate(value),
        }
    }

    /// 转换为标准 JSON Schema，用于 tools/list 的 inputSchema
    pub fn to_json_schema(&self) -> Value {
        match self {
            Schema::Object(obj) => {
                let properties: Map<String, Value> = obj
                    .properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                let mut out = json!({
                    "type": "object",
                    "properties": properties,
                    "required": obj.required,
                });
                if let Some(desc) = &obj.description {
                    out["description"] = json!(desc);
                }
                out
            }
            Schema::String(s) => {
                let mut out = json!({ "type": "string" });
                if let Some(desc) = &s.description {
                    out["description"] = json!(desc);
                }
                if let Some(values) = &s.enum_values {
                    out["enum"] = json!(values);
                }
                out
            }
            Schema::Boolean(b) => {
                let mut out = json!({ "type": "boolean" });
                if let Some(desc) = &b.description {
                    out["description"] = json!(desc);
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SchemaObject {
    pub required: Vec<String>,
    pub properties: BTreeMap<String, Schema>,
    pub description: Option<String>,
}

impl SchemaObject {
    pub fn validate(&self, value: &Value) -> Result<(), SdkError> {
        let Some(obj) = value.as_object() else {
            return Err(SdkError::InvalidParameter("Expected object".to_string()));
        };

        for req in &self.required {
            if obj.get(req).map_or(true, Value::is_null) {
                return Err(SdkError::InvalidParameter(format!(
                    "Required property {req} missing"
                )));
            }
        }

        for (name, schema) in &self.properties {
            match obj.get(name) {
                // 可选参数允许显式传 null
                None | Some(Value::Null) => {}
                Some(v) => schema
                    .validate(v)
                    .map_err(|e| SdkError::InvalidParameter(format!("{name}: {e}")))?,
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SchemaString {
    pub description: Option<String>,
    pub enum_values: Option<Vec<String>>,
}

impl SchemaString {
    pub fn described(description: &str) -> Schema {
        Schema::String(Self {
            description: Some(description.to_string()),
            enum_values: None,
        })
    }

    pub fn one_of(description: &str, values: &[&str]) -> Schema {
        Schema::String(Self {
            description: Some(description.to_string()),
            enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
        })
    }

    pub fn validate(&self, value: &Value) -> Result<(), SdkError> {
        let Some(str_val) = value.as_str() else {
            return Err(SdkError::InvalidParameter("Expected string".to_string()));
        };

        if let Some(enum_values) = &self.enum_values {
            if !enum_values.iter().any(|v| v == str_val) {
                return Err(SdkError::InvalidParameter(format!(
                    "Value must be one of: {enum_values:?}"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SchemaBoolean {
    pub description: Option<String>,
}

impl SchemaBoolean {
    pub fn validate(&self, value: &Value) -> Result<(), SdkError> {
        if !value.is_boolean() {
            return Err(SdkError::InvalidParameter("Expected boolean".to_string()));
        }
        Ok(())
    }
}

// Tool 的基础 trait 定义
#[async_trait]
pub trait MCPTool: Send + Sync {
    /// 获取工具名称
    fn name(&self) -> &str;

    /// 获取工具描述
    fn description(&self) -> &str;

    /// 获取工具参数Schema
    fn parameters_schema(&self) -> &Schema;

    /// 执行工具
    async fn execute(&self, params: Value) -> Result<Value>;

    /// 验证输入参数
    fn validate_params(&self, params: &Value) -> Result<(), SdkError> {
        self.parameters_schema().validate(params)
    }
}
