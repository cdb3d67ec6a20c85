use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::executor::{CommandExecutor, CommandOutput};
use super::parser::{parse_versions, VersionRecord};
use crate::errors::SdkError;

pub const OFFLINE_MODES: &[&str] = &["enable", "disable"];
pub const FLUSH_MODES: &[&str] = &["tmp", "metadata", "version"];
pub const ENV_ACTIONS: &[&str] = &["init", "install", "clear"];

/// 对外暴露的统一结果形状 `{success, data?, error?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// 非零退出码时优先使用 stderr，stderr 为空才用默认消息
    pub fn from_output(output: CommandOutput, default_error: impl FnOnce() -> String) -> Self {
        if output.success() {
            Self::ok(output.stdout)
        } else {
            Self::failure(failure_message(&output, default_error))
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({ "success": false, "error": format!("failed to serialize result: {e}") })
        })
    }
}

fn failure_message(output: &CommandOutput, default_error: impl FnOnce() -> String) -> String {
    if output.stderr.trim().is_empty() {
        default_error()
    } else {
        output.stderr.clone()
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// SDKMAN 子命令封装，每个方法对应一个 `sdk <command>`
#[derive(Clone)]
pub struct SdkCommands {
    executor: Arc<dyn CommandExecutor>,
}

impl SdkCommands {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    fn run(&self, args: Vec<String>, default_error: impl FnOnce() -> String) -> CommandResult {
        debug!("sdk {}", args.join(" "));
        let result = CommandResult::from_output(self.executor.execute(&args), default_error);
        if let Some(err) = &result.error {
            warn!("⚠️ sdk {} 失败: {}", args.join(" "), err.trim());
        }
        result
    }

    pub fn list(&self) -> CommandResult {
        self.run(argv(&["list"]), || "Failed to list candidates".to_string())
    }

    pub fn list_candidate(&self, candidate: &str) -> CommandResult {
        self.run(argv(&["list", candidate]), || {
            format!("Failed to list versions for {candidate}")
        })
    }

    /// 获取并解析候选软件的版本表
    ///
    /// 边界调用失败时原样返回 stderr；解析后为空视为未找到。
    pub fn list_versions(
        &self,
        candidate: &str,
        filter: Option<&str>,
    ) -> Result<Vec<VersionRecord>, SdkError> {
        let output = self.executor.execute(&argv(&["list", candidate]));
        if !output.success() {
            return Err(SdkError::CommandFailed(failure_message(&output, || {
                format!("Failed to list versions for {candidate}")
            })));
        }

        let records = parse_versions(&output.stdout, filter);
        debug!("解析到 {} 个 {} 版本", records.len(), candidate);
        if records.is_empty() {
            return Err(SdkError::NotFound(not_found_message(candidate, filter)));
        }
        Ok(records)
    }

    /// 结构化版本查询，data 为 JSON 文本
    pub fn find_versions(&self, candidate: &str, filter: Option<&str>) -> CommandResult {
        match self.list_versions(candidate, filter) {
            Ok(versions) => {
                let payload = json!({
                    "candidate": candidate,
                    "filter": filter,
                    "count": versions.len(),
                    "versions": versions,
                });
                match serde_json::to_string_pretty(&payload) {
                    Ok(data) => CommandResult::ok(data),
                    Err(e) => CommandResult::failure(SdkError::from(e).to_string()),
                }
            }
            Err(SdkError::CommandFailed(msg)) | Err(SdkError::NotFound(msg)) => {
                CommandResult::failure(msg)
            }
            Err(other) => CommandResult::failure(other.to_string()),
        }
    }

    pub fn current(&self) -> CommandResult {
        self.run(argv(&["current"]), || "Failed to get current versions".to_string())
    }

    pub fn current_candidate(&self, candidate: &str) -> CommandResult {
        self.run(argv(&["current", candidate]), || {
            format!("Failed to get current version of {candidate}")
        })
    }

    pub fn install(&self, candidate: &str, version: Option<&str>, path: Option<&str>) -> CommandResult {
        let mut args = argv(&["install", candidate]);
        args.extend(version.filter(|v| !v.is_empty()).map(String::from));
        args.extend(path.filter(|p| !p.is_empty()).map(String::from));
        self.run(args, || format!("Failed to install {candidate}"))
    }

    pub fn uninstall(&self, candidate: &str, version: &str) -> CommandResult {
        self.run(argv(&["uninstall", candidate, version]), || {
            format!("Failed to uninstall {candidate} {version}")
        })
    }

    pub fn use_version(&self, candidate: &str, version: &str) -> CommandResult {
        self.run(argv(&["use", candidate, version]), || {
            format!("Failed to use {candidate} {version}")
        })
    }

    pub fn default_version(&self, candidate: &str, version: &str) -> CommandResult {
        self.run(argv(&["default", candidate, version]), || {
            format!("Failed to set {candidate} {version} as default")
        })
    }

    pub fn home(&self, candidate: &str, version: &str) -> CommandResult {
        let mut result = self.run(argv(&["home", candidate, version]), || {
            format!("Failed to get home directory of {candidate} {version}")
        });
        // 去掉结尾换行，方便直接当路径使用
        if let Some(data) = result.data.as_mut() {
            *data = data.trim().to_string();
        }
        result
    }

    pub fn env(&self, action: Option<&str>) -> CommandResult {
        let action = action.filter(|a| !a.is_empty());
        if let Some(action) = action {
            if !ENV_ACTIONS.contains(&action) {
                return CommandResult::failure("Action must be 'init', 'install', or 'clear'");
            }
        }
        let mut args = argv(&["env"]);
        args.extend(action.map(String::from));
        self.run(args, || format!("Failed to execute env {}", action.unwrap_or("")))
    }

    pub fn upgrade(&self, candidate: Option<&str>) -> CommandResult {
        let candidate = candidate.filter(|c| !c.is_empty());
        let mut args = argv(&["upgrade"]);
        args.extend(candidate.map(String::from));
        self.run(args, || {
            format!("Failed to upgrade {}", candidate.unwrap_or("all candidates"))
        })
    }

    pub fn version(&self) -> CommandResult {
        self.run(argv(&["version"]), || "Failed to get SDKMAN version".to_string())
    }

    pub fn offline(&self, mode: &str) -> CommandResult {
        if !OFFLINE_MODES.contains(&mode) {
            return CommandResult::failure("Mode must be 'enable' or 'disable'");
        }
        self.run(argv(&["offline", mode]), || format!("Failed to {mode} offline mode"))
    }

    pub fn selfupdate(&self, force: bool) -> CommandResult {
        let mut args = argv(&["selfupdate"]);
        if force {
            args.push("force".to_string());
        }
        self.run(args, || "Failed to update SDKMAN".to_string())
    }

    pub fn update(&self) -> CommandResult {
        self.run(argv(&["update"]), || "Failed to update SDKMAN candidates".to_string())
    }

    pub fn flush(&self, mode: Option<&str>) -> CommandResult {
        let mode = mode.filter(|m| !m.is_empty());
        if let Some(mode) = mode {
            if !FLUSH_MODES.contains(&mode) {
                return CommandResult::failure("Mode must be 'tmp', 'metadata', or 'version'");
            }
        }
        let mut args = argv(&["flush"]);
        args.extend(mode.map(String::from));
        self.run(args, || format!("Failed to flush {}", mode.unwrap_or("all")))
    }

    pub fn help(&self, command: Option<&str>) -> CommandResult {
        let command = command.filter(|c| !c.is_empty());
        let mut args = argv(&["help"]);
        args.extend(command.map(String::from));
        self.run(args, || {
            format!("Failed to get help for {}", command.unwrap_or("SDKMAN"))
        })
    }

    pub fn config(&self) -> CommandResult {
        self.run(argv(&["config"]), || "Failed to edit SDKMAN configuration".to_string())
    }
}

pub fn not_found_message(candidate: &str, filter: Option<&str>) -> String {
    match filter.filter(|f| !f.is_empty()) {
        Some(f) => format!("No versions of {candidate} found matching '{f}'"),
        None => format!("No versions of {candidate} found"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// 记录调用并按脚本返回输出的执行器
    #[derive(Default)]
    pub struct ScriptedExecutor {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub replies: Mutex<VecDeque<CommandOutput>>,
    }

    impl ScriptedExecutor {
        pub fn new(replies: Vec<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            })
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandExecutor for ScriptedExecutor {
        fn execute(&self, args: &[String]) -> CommandOutput {
            self.calls.lock().unwrap().push(args.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| CommandOutput::new(0, "", ""))
        }
    }
}
