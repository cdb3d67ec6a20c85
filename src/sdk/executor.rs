use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::SdkmanConfig;

/// 不需要加引号的参数字符集
static SAFE_ARG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._+\-/=:@]+$").expect("static regex")
});

/// 一次外部命令调用的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// sdk 命令执行边界
///
/// 核心逻辑只把非零退出码视为统一的失败信号，不进一步解释退出码。
pub trait CommandExecutor: Send + Sync {
    /// 以给定参数执行 `sdk`，同步返回 (exit_code, stdout, stderr)
    fn execute(&self, args: &[String]) -> CommandOutput;
}

/// 通过 shell 先 source 初始化脚本再执行 `sdk` 的执行器
pub struct ShellExecutor {
    config: SdkmanConfig,
}

impl ShellExecutor {
    pub fn new(config: SdkmanConfig) -> Self {
        if !config.init_script_exists() {
            warn!(
                "⚠️ 未找到 SDKMAN 初始化脚本: {}",
                config.init_script.display()
            );
        }
        Self { config }
    }

    pub fn config(&self) -> &SdkmanConfig {
        &self.config
    }

    /// 构建实际交给 shell 的命令行
    pub fn shell_command(&self, args: &[String]) -> String {
        let mut line = format!(
            "source {} && sdk",
            shell_quote(&self.config.init_script.to_string_lossy())
        );
        for arg in args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, args: &[String]) -> CommandOutput {
        let shell_cmd = self.shell_command(args);
        debug!("执行 shell 命令: {}", shell_cmd);

        match Command::new(&self.config.shell)
            .arg("-c")
            .arg(&shell_cmd)
            .output()
        {
            Ok(output) => CommandOutput {
                // 被信号终止时没有退出码
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                error!("❌ 执行命令失败 {:?}: {}", args, e);
                CommandOutput::new(1, "", e.to_string())
            }
        }
    }
}

/// 按 POSIX shell 规则给参数加单引号
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && SAFE_ARG.is_match(arg) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor_for(dir: &std::path::Path) -> ShellExecutor {
        ShellExecutor::new(SdkmanConfig::default().with_sdkman_dir(dir))
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("21.0.1-tem"), "21.0.1-tem");
        assert_eq!(shell_quote("/opt/jdk"), "/opt/jdk");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("x; rm -rf /"), "'x; rm -rf /'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_shell_command_line() {
        let executor = executor_for(std::path::Path::new("/opt/sdkman"));
        let line = executor.shell_command(&["install".to_string(), "java".to_string()]);
        assert_eq!(line, "source /opt/sdkman/bin/sdkman-init.sh && sdk install java");
    }

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::new(0, "ok", "").success());
        assert!(!CommandOutput::new(2, "", "bad").success());
    }
}
