use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 默认日志过滤
pub const DEFAULT_LOG_FILTER: &str = "sdkman_mcp=info";

/// SDKMAN 运行配置
///
/// 与 shell 配置中的初始化方式一致:
/// `export SDKMAN_DIR="$HOME/.sdkman"` 然后 `source "$SDKMAN_DIR/bin/sdkman-init.sh"`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkmanConfig {
    /// SDKMAN 安装目录
    pub sdkman_dir: PathBuf,
    /// 初始化脚本路径
    pub init_script: PathBuf,
    /// 执行 sdk 命令所用的 shell
    pub shell: String,
    /// tracing 过滤表达式
    pub log_filter: String,
}

impl Default for SdkmanConfig {
    fn default() -> Self {
        let sdkman_dir = default_sdkman_dir();
        Self {
            init_script: init_script_for(&sdkman_dir),
            sdkman_dir,
            shell: "/bin/bash".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl SdkmanConfig {
    /// 从环境变量读取配置（调用方负责先加载 .env）
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("SDKMAN_DIR") {
            if !dir.trim().is_empty() {
                config = config.with_sdkman_dir(dir);
            }
        }
        if let Ok(script) = env::var("SDKMAN_INIT_SCRIPT") {
            if !script.trim().is_empty() {
                config.init_script = PathBuf::from(script);
            }
        }
        if let Ok(shell) = env::var("SDKMAN_MCP_SHELL") {
            if !shell.trim().is_empty() {
                config.shell = shell;
            }
        }
        if let Ok(filter) = env::var("RUST_LOG") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        config
    }

    /// 替换 SDKMAN 目录，初始化脚本随之指向新目录
    pub fn with_sdkman_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sdkman_dir = dir.into();
        self.init_script = init_script_for(&self.sdkman_dir);
        self
    }

    pub fn init_script_exists(&self) -> bool {
        self.init_script.is_file()
    }
}

fn default_sdkman_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".sdkman")
}

fn init_script_for(sdkman_dir: &Path) -> PathBuf {
    sdkman_dir.join("bin").join("sdkman-init.sh")
}
