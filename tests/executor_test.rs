use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use sdkman_mcp::config::SdkmanConfig;
use sdkman_mcp::sdk::{CommandExecutor, SdkCommands, ShellExecutor};

/// 在临时目录中伪造一个 SDKMAN 安装：`sdk` 函数回显参数
fn fake_sdkman() -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("bin"))?;
    fs::write(
        dir.path().join("bin").join("sdkman-init.sh"),
        r#"
sdk() {
    case "$1" in
        fail) echo "Stop! boom" >&2; return 3 ;;
        home) echo "$SDKMAN_FAKE_ROOT/candidates/$2/$3" ;;
        *) printf '%s\n' "$@" ;;
    esac
}
SDKMAN_FAKE_ROOT="/fake"
"#,
    )?;
    Ok(dir)
}

fn executor(dir: &Path) -> ShellExecutor {
    ShellExecutor::new(SdkmanConfig::default().with_sdkman_dir(dir))
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_arguments_reach_sdk_unchanged() -> Result<()> {
    let dir = fake_sdkman()?;
    let output = executor(dir.path()).execute(&args(&["install", "java", "it's; echo pwned"]));

    assert!(output.success());
    assert_eq!(output.stdout, "install\njava\nit's; echo pwned\n");
    assert!(output.stderr.is_empty());
    Ok(())
}

#[test]
fn test_exit_code_and_stderr_are_captured() -> Result<()> {
    let dir = fake_sdkman()?;
    let output = executor(dir.path()).execute(&args(&["fail"]));

    assert_eq!(output.exit_code, 3);
    assert_eq!(output.stderr.trim(), "Stop! boom");
    Ok(())
}

#[test]
fn test_commands_over_shell() -> Result<()> {
    let dir = fake_sdkman()?;
    let commands = SdkCommands::new(Arc::new(executor(dir.path())));

    let home = commands.home("java", "21.0.1-tem");
    assert!(home.success);
    assert_eq!(home.data.as_deref(), Some("/fake/candidates/java/21.0.1-tem"));

    let version = commands.version();
    assert_eq!(version.data.as_deref(), Some("version\n"));
    Ok(())
}

#[test]
fn test_missing_init_script_fails_without_panicking() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = executor(dir.path()).execute(&args(&["version"]));

    assert!(!output.success());
    assert!(!output.stderr.is_empty());
    Ok(())
}

#[test]
fn test_missing_shell_becomes_failed_output() -> Result<()> {
    let dir = fake_sdkman()?;
    let mut config = SdkmanConfig::default().with_sdkman_dir(dir.path());
    config.shell = dir.path().join("no-such-shell").to_string_lossy().into_owned();

    let output = ShellExecutor::new(config).execute(&args(&["version"]));

    assert_eq!(output.exit_code, 1);
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
    Ok(())
}
