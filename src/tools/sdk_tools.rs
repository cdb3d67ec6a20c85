use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::base::{MCPTool, Schema, SchemaBoolean, SchemaObject, SchemaString};
use crate::sdk::commands::{CommandResult, SdkCommands, ENV_ACTIONS, FLUSH_MODES, OFFLINE_MODES};
use crate::sdk::selection::{CancelToken, Prompter, SelectionEngine, TerminalPrompter};

const CANDIDATE_DESC: &str = "Name of the SDK candidate (e.g., java, gradle, kotlin)";

/// 直接映射到单个 sdk 子命令的工具
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkToolKind {
    ListAll,
    ListVersions,
    FindVersions,
    CurrentAll,
    CurrentVersion,
    InstallVersion,
    UninstallVersion,
    UseVersion,
    SetDefault,
    GetHome,
    ManageEnv,
    CheckUpgrade,
    GetVersion,
    SetOffline,
    SelfUpdate,
    UpdateCandidates,
    FlushState,
    GetHelp,
    EditConfig,
}

impl SdkToolKind {
    pub const ALL: &'static [SdkToolKind] = &[
        SdkToolKind::ListAll,
        SdkToolKind::ListVersions,
        SdkToolKind::FindVersions,
        SdkToolKind::CurrentAll,
        SdkToolKind::CurrentVersion,
        SdkToolKind::InstallVersion,
        SdkToolKind::UninstallVersion,
        SdkToolKind::UseVersion,
        SdkToolKind::SetDefault,
        SdkToolKind::GetHome,
        SdkToolKind::ManageEnv,
        SdkToolKind::CheckUpgrade,
        SdkToolKind::GetVersion,
        SdkToolKind::SetOffline,
        SdkToolKind::SelfUpdate,
        SdkToolKind::UpdateCandidates,
        SdkToolKind::FlushState,
        SdkToolKind::GetHelp,
        SdkToolKind::EditConfig,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SdkToolKind::ListAll => "sdk_list_all",
            SdkToolKind::ListVersions => "sdk_list_versions",
            SdkToolKind::FindVersions => "sdk_find_versions",
            SdkToolKind::CurrentAll => "sdk_current_all",
            SdkToolKind::CurrentVersion => "sdk_current_version",
            SdkToolKind::InstallVersion => "sdk_install_version",
            SdkToolKind::UninstallVersion => "sdk_uninstall_version",
            SdkToolKind::UseVersion => "sdk_use_version",
            SdkToolKind::SetDefault => "sdk_set_default",
            SdkToolKind::GetHome => "sdk_get_home",
            SdkToolKind::ManageEnv => "sdk_manage_env",
            SdkToolKind::CheckUpgrade => "sdk_check_upgrade",
            SdkToolKind::GetVersion => "sdk_get_version",
            SdkToolKind::SetOffline => "sdk_set_offline",
            SdkToolKind::SelfUpdate => "sdk_self_update",
            SdkToolKind::UpdateCandidates => "sdk_update_candidates",
            SdkToolKind::FlushState => "sdk_flush_state",
            SdkToolKind::GetHelp => "sdk_get_help",
            SdkToolKind::EditConfig => "sdk_edit_config",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SdkToolKind::ListAll => "List all available SDK candidates in SDKMAN.",
            SdkToolKind::ListVersions => {
                "List all available versions for a specific SDK candidate as raw text."
            }
            SdkToolKind::FindVersions => {
                "List versions of a candidate as structured records (vendor, in_use, version, distribution, status, identifier), optionally filtered by a version substring."
            }
            SdkToolKind::CurrentAll => "Show current versions of all installed SDKs.",
            SdkToolKind::CurrentVersion => "Show the current version of a specific SDK candidate.",
            SdkToolKind::InstallVersion => {
                "Install a specific version of an SDK candidate, or the latest stable when no version is given."
            }
            SdkToolKind::UninstallVersion => "Uninstall a specific version of an SDK candidate.",
            SdkToolKind::UseVersion => {
                "Use a specific version of an SDK candidate in the current shell."
            }
            SdkToolKind::SetDefault => "Set the default version of an SDK candidate.",
            SdkToolKind::GetHome => {
                "Get the home directory of a specific version of an SDK candidate."
            }
            SdkToolKind::ManageEnv => "Manage the .sdkmanrc file for the current directory.",
            SdkToolKind::CheckUpgrade => {
                "Check for available upgrades or upgrade a specific candidate."
            }
            SdkToolKind::GetVersion => "Display the SDKMAN version.",
            SdkToolKind::SetOffline => "Enable or disable offline mode.",
            SdkToolKind::SelfUpdate => "Update SDKMAN itself.",
            SdkToolKind::UpdateCandidates => "Update SDKMAN candidates.",
            SdkToolKind::FlushState => "Flush SDKMAN local state.",
            SdkToolKind::GetHelp => "Get help about SDKMAN or a specific command.",
            SdkToolKind::EditConfig => "Edit the SDKMAN configuration.",
        }
    }

    fn schema(self) -> Schema {
        let mut required = Vec::new();
        let mut properties = BTreeMap::new();

        match self {
            SdkToolKind::ListVersions | SdkToolKind::CurrentVersion => {
                add_candidate(&mut properties, &mut required, CANDIDATE_DESC);
            }
            SdkToolKind::FindVersions => {
                add_candidate(&mut properties, &mut required, CANDIDATE_DESC);
                properties.insert(
                    "filter".to_string(),
                    SchemaString::described("Case-sensitive substring the version must contain (e.g., 21)"),
                );
            }
            SdkToolKind::InstallVersion => {
                add_candidate(&mut properties, &mut required, CANDIDATE_DESC);
                properties.insert(
                    "version".to_string(),
                    SchemaString::described("Version to install (optional, installs latest stable if not specified)"),
                );
                properties.insert(
                    "path".to_string(),
                    SchemaString::described("Path to a local installation (optional)"),
                );
            }
            SdkToolKind::UninstallVersion
            | SdkToolKind::UseVersion
            | SdkToolKind::SetDefault
            | SdkToolKind::GetHome => {
                add_candidate(&mut properties, &mut required, CANDIDATE_DESC);
                properties.insert("version".to_string(), SchemaString::described("Version identifier"));
                required.push("version".to_string());
            }
            SdkToolKind::ManageEnv => {
                properties.insert(
                    "action".to_string(),
                    SchemaString::one_of("Action to perform on .sdkmanrc", ENV_ACTIONS),
                );
            }
            SdkToolKind::CheckUpgrade => {
                properties.insert(
                    "candidate".to_string(),
                    SchemaString::described(
                        "Name of the SDK candidate to upgrade (optional, checks all if not specified)",
                    ),
                );
            }
            SdkToolKind::SetOffline => {
                properties.insert("mode".to_string(), SchemaString::one_of("Offline mode", OFFLINE_MODES));
                required.push("mode".to_string());
            }
            SdkToolKind::SelfUpdate => {
                properties.insert(
                    "force".to_string(),
                    Schema::Boolean(SchemaBoolean {
                        description: Some(
                            "Force update even if there is no new version available".to_string(),
                        ),
                    }),
                );
            }
            SdkToolKind::FlushState => {
                properties.insert(
                    "mode".to_string(),
                    SchemaString::one_of("What to flush; flushes all if not specified", FLUSH_MODES),
                );
            }
            SdkToolKind::GetHelp => {
                properties.insert(
                    "command".to_string(),
                    SchemaString::described("Command to get help for (optional)"),
                );
            }
            SdkToolKind::ListAll
            | SdkToolKind::CurrentAll
            | SdkToolKind::GetVersion
            | SdkToolKind::UpdateCandidates
            | SdkToolKind::EditConfig => {}
        }

        Schema::Object(SchemaObject {
            required,
            properties,
            description: None,
        })
    }
}

fn add_candidate(properties: &mut BTreeMap<String, Schema>, required: &mut Vec<String>, desc: &str) {
    properties.insert("candidate".to_string(), SchemaString::described(desc));
    required.push("candidate".to_string());
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("{} 参数无效", key))
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// 单个 sdk 子命令的 MCP 工具
pub struct SdkTool {
    kind: SdkToolKind,
    schema: Schema,
    commands: SdkCommands,
}

impl SdkTool {
    pub fn new(kind: SdkToolKind, commands: SdkCommands) -> Self {
        Self {
            kind,
            schema: kind.schema(),
            commands,
        }
    }

    pub fn kind(&self) -> SdkToolKind {
        self.kind
    }
}

/// 在阻塞线程上执行，命令调用会等待子进程结束
fn dispatch(kind: SdkToolKind, sdk: &SdkCommands, params: &Value) -> Result<CommandResult> {
    let result = match kind {
        SdkToolKind::ListAll => sdk.list(),
        SdkToolKind::ListVersions => sdk.list_candidate(required_str(params, "candidate")?),
        SdkToolKind::FindVersions => sdk.find_versions(
            required_str(params, "candidate")?,
            optional_str(params, "filter"),
        ),
        SdkToolKind::CurrentAll => sdk.current(),
        SdkToolKind::CurrentVersion => sdk.current_candidate(required_str(params, "candidate")?),
        SdkToolKind::InstallVersion => sdk.install(
            required_str(params, "candidate")?,
            optional_str(params, "version"),
            optional_str(params, "path"),
        ),
        SdkToolKind::UninstallVersion => sdk.uninstall(
            required_str(params, "candidate")?,
            required_str(params, "version")?,
        ),
        SdkToolKind::UseVersion => sdk.use_version(
            required_str(params, "candidate")?,
            required_str(params, "version")?,
        ),
        SdkToolKind::SetDefault => sdk.default_version(
            required_str(params, "candidate")?,
            required_str(params, "version")?,
        ),
        SdkToolKind::GetHome => sdk.home(
            required_str(params, "candidate")?,
            required_str(params, "version")?,
        ),
        SdkToolKind::ManageEnv => sdk.env(optional_str(params, "action")),
        SdkToolKind::CheckUpgrade => sdk.upgrade(optional_str(params, "candidate")),
        SdkToolKind::GetVersion => sdk.version(),
        SdkToolKind::SetOffline => sdk.offline(required_str(params, "mode")?),
        SdkToolKind::SelfUpdate => {
            sdk.selfupdate(params.get("force").and_then(Value::as_bool).unwrap_or(false))
        }
        SdkToolKind::UpdateCandidates => sdk.update(),
        SdkToolKind::FlushState => sdk.flush(optional_str(params, "mode")),
        SdkToolKind::GetHelp => sdk.help(optional_str(params, "command")),
        SdkToolKind::EditConfig => sdk.config(),
    };
    Ok(result)
}

#[async_trait]
impl MCPTool for SdkTool {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn parameters_schema(&self) -> &Schema {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        self.validate_params(&params)?;
        info!("🔧 {} {}", self.kind.name(), params);

        let kind = self.kind;
        let commands = self.commands.clone();
        let result =
            tokio::task::spawn_blocking(move || dispatch(kind, &commands, &params)).await??;
        Ok(result.to_value())
    }
}

/// 交互式安装工具
///
/// 唯一一个多步提示的工具。stdio 被协议占用，因此每次调用时打开控制终端读取回答，
/// 调用结束即关闭。
pub struct InteractiveInstallTool {
    schema: Schema,
    engine: SelectionEngine,
    prompter: Option<Arc<Mutex<Box<dyn Prompter + Send>>>>,
    cancel: CancelToken,
}

impl InteractiveInstallTool {
    pub const NAME: &'static str = "sdk_interactive_install";

    /// `cancel` 由宿主在收到中断信号时触发
    pub fn new(commands: SdkCommands, cancel: CancelToken) -> Self {
        Self::build(commands, None, cancel)
    }

    pub fn with_prompter(commands: SdkCommands, prompter: Box<dyn Prompter + Send>) -> Self {
        Self::build(commands, Some(Arc::new(Mutex::new(prompter))), CancelToken::new())
    }

    fn build(
        commands: SdkCommands,
        prompter: Option<Arc<Mutex<Box<dyn Prompter + Send>>>>,
        cancel: CancelToken,
    ) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("candidate".to_string(), SchemaString::described(CANDIDATE_DESC));
        properties.insert(
            "filter".to_string(),
            SchemaString::described("Only offer versions containing this substring (e.g., 21)"),
        );

        Self {
            schema: Schema::Object(SchemaObject {
                required: vec!["candidate".to_string()],
                properties,
                description: None,
            }),
            engine: SelectionEngine::new(commands),
            prompter,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// 一次完整的交互会话；未注入提示器时临时打开 /dev/tty
fn run_session(
    engine: &SelectionEngine,
    prompter: Option<&Mutex<Box<dyn Prompter + Send>>>,
    cancel: &CancelToken,
    candidate: &str,
    filter: Option<&str>,
) -> Result<CommandResult> {
    // 会话之外收到的中断不影响本次会话
    cancel.reset();

    let outcome = match prompter {
        Some(shared) => {
            let mut guard = shared.lock().map_err(|_| anyhow!("交互提示器已损坏"))?;
            engine.run(candidate, filter, &mut **guard, cancel)
        }
        None => match TerminalPrompter::tty() {
            Ok(mut tty) => engine.run(candidate, filter, &mut tty, cancel),
            Err(e) => return Ok(CommandResult::failure(e.to_string())),
        },
    };

    info!("📦 交互式安装 {} 结束: {:?}", candidate, outcome);
    Ok(outcome.into_result())
}

#[async_trait]
impl MCPTool for InteractiveInstallTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Interactively install a version of an SDK candidate: shows a numbered list of matching versions on the terminal, asks the user to pick one and confirm, then installs it."
    }

    fn parameters_schema(&self) -> &Schema {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        self.validate_params(&params)?;
        let candidate = required_str(&params, "candidate")?.to_string();
        let filter = optional_str(&params, "filter").map(String::from);
        info!("🔧 {} {} {}", Self::NAME, candidate, filter.as_deref().unwrap_or(""));

        let engine = self.engine.clone();
        let prompter = self.prompter.clone();
        let cancel = self.cancel.clone();
        let result = tokio::task::spawn_blocking(move || {
            run_session(&engine, prompter.as_deref(), &cancel, &candidate, filter.as_deref())
        })
        .await??;
        Ok(result.to_value())
    }
}

/// 构建全部 SDK 工具，交互式安装共享 `cancel`
pub fn sdk_tools(commands: SdkCommands, cancel: &CancelToken) -> Vec<Box<dyn MCPTool>> {
    let mut tools: Vec<Box<dyn MCPTool>> = SdkToolKind::ALL
        .iter()
        .map(|&kind| Box::new(SdkTool::new(kind, commands.clone())) as Box<dyn MCPTool>)
        .collect();
    tools.push(Box::new(InteractiveInstallTool::new(commands, cancel.clone())));
    tools
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::sdk::commands::test_support::ScriptedExecutor;
    use crate::sdk::executor::CommandOutput;

    fn tool(kind: SdkToolKind, replies: Vec<CommandOutput>) -> (SdkTool, Arc<ScriptedExecutor>) {
        let executor = ScriptedExecutor::new(replies);
        (SdkTool::new(kind, SdkCommands::new(executor.clone())), executor)
    }

    struct Answers(VecDeque<String>);

    impl Prompter for Answers {
        fn present(&mut self, _message: &str) {}

        fn prompt(&mut self, _message: &str, _cancel: &CancelToken) -> Option<String> {
            self.0.pop_front()
        }
    }

    #[test]
    fn test_tool_names_unique() {
        let executor = ScriptedExecutor::new(vec![]);
        let tools = sdk_tools(SdkCommands::new(executor), &CancelToken::new());
        let names: HashSet<_> = tools.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names.len(), SdkToolKind::ALL.len() + 1);
        assert!(names.contains("sdk_interactive_install"));
        assert!(names.contains("sdk_find_versions"));
    }

    #[tokio::test]
    async fn test_use_version_tool() {
        let (tool, executor) = tool(
            SdkToolKind::UseVersion,
            vec![CommandOutput::new(0, "Using java version 17.0.9-tem in this shell.", "")],
        );
        let result = tool
            .execute(json!({ "candidate": "java", "version": "17.0.9-tem" }))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(executor.calls()[0], vec!["use", "java", "17.0.9-tem"]);
    }

    #[tokio::test]
    async fn test_missing_required_param_is_error() {
        let (tool, executor) = tool(SdkToolKind::UninstallVersion, vec![]);
        assert!(tool.execute(json!({ "candidate": "java" })).await.is_err());
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_offline_enum_is_validated() {
        let (tool, executor) = tool(SdkToolKind::SetOffline, vec![]);
        assert!(tool.execute(json!({ "mode": "maybe" })).await.is_err());
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_self_update_force_flag() {
        let (tool, executor) = tool(SdkToolKind::SelfUpdate, vec![]);
        tool.execute(json!({ "force": true })).await.unwrap();
        tool.execute(json!({})).await.unwrap();
        assert_eq!(executor.calls(), vec![vec!["selfupdate", "force"], vec!["selfupdate"]]);
    }

    #[tokio::test]
    async fn test_failure_is_a_value_not_an_error() {
        let (tool, _) = tool(SdkToolKind::ListAll, vec![CommandOutput::new(1, "", "")]);
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result, json!({ "success": false, "error": "Failed to list candidates" }));
    }

    #[tokio::test]
    async fn test_interactive_install_with_injected_prompter() {
        let table = "Vendor | Use | Version | Dist | Status | Identifier\nOracle\n| |21.0.1|tar||21.0.1-oracle\n";
        let executor = ScriptedExecutor::new(vec![
            CommandOutput::new(0, table, ""),
            CommandOutput::new(0, "installed", ""),
        ]);
        let answers = Answers(VecDeque::from(vec!["1".to_string(), "y".to_string()]));
        let tool = InteractiveInstallTool::with_prompter(
            SdkCommands::new(executor.clone()),
            Box::new(answers),
        );

        let result = tool.execute(json!({ "candidate": "java", "filter": "21" })).await.unwrap();
        assert_eq!(result, json!({ "success": true, "data": "installed" }));
        assert_eq!(executor.calls()[1], vec!["install", "java", "21.0.1-oracle"]);
    }

    #[tokio::test]
    async fn test_interactive_install_cancel_is_distinct() {
        let table = "Vendor | Use | Version | Dist | Status | Identifier\n| |21.0.1|tar||21.0.1-oracle\n";
        let executor = ScriptedExecutor::new(vec![CommandOutput::new(0, table, "")]);
        let answers = Answers(VecDeque::from(vec!["quit".to_string()]));
        let tool = InteractiveInstallTool::with_prompter(SdkCommands::new(executor), Box::new(answers));

        let result = tool.execute(json!({ "candidate": "java" })).await.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], crate::sdk::selection::CANCELLED_MESSAGE);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_terminal_input() {
        let table = "Vendor | Use | Version | Dist | Status | Identifier\n| |21.0.1|tar||21.0.1-oracle\n";
        let executor = ScriptedExecutor::new(vec![CommandOutput::new(0, table, "")]);
        let (_host, term) = UnixStream::pair().unwrap();
        let tool = InteractiveInstallTool::with_prompter(
            SdkCommands::new(executor.clone()),
            Box::new(TerminalPrompter::from_parts(term, Box::new(std::io::sink()))),
        );

        let cancel = tool.cancel_token().clone();
        let interrupt = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        });

        let result = tool.execute(json!({ "candidate": "java" })).await.unwrap();
        interrupt.await.unwrap();

        assert_eq!(result["success"], false);
        assert_eq!(result["error"], crate::sdk::selection::CANCELLED_MESSAGE);
        assert_eq!(executor.calls(), vec![vec!["list", "java"]]);
    }
}
