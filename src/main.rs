use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sdkman_mcp::config::SdkmanConfig;
use sdkman_mcp::mcp::{MCPServer, SdkResources, Server};
use sdkman_mcp::sdk::{
    CancelToken, CommandResult, SdkCommands, SelectionEngine, SelectionOutcome, ShellExecutor,
    TerminalPrompter,
};
use sdkman_mcp::tools::sdk_tools;
use sdkman_mcp::{SdkError, SERVER_NAME, SERVER_VERSION};

/// SDKMAN MCP 服务器 - 通过 MCP 管理 SDK 版本
#[derive(Parser)]
#[command(name = "sdkman-mcp")]
#[command(about = "SDKMAN MCP 服务器 - 通过 MCP 协议管理 SDK 版本")]
#[command(version)]
struct Cli {
    /// 启用详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SDKMAN 安装目录（覆盖 SDKMAN_DIR）
    #[arg(long, global = true)]
    sdkman_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 在 stdio 上启动MCP服务器（默认）
    Serve,
    /// 交互式安装 SDK 版本
    Install {
        /// 候选软件名称，如 java
        candidate: String,
        /// 只显示包含该子串的版本
        #[arg(short = 'v', long = "version")]
        filter: Option<String>,
    },
    /// 列出候选软件或某个候选软件的版本
    List {
        candidate: Option<String>,
    },
    /// 显示当前使用的版本
    Current {
        candidate: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 加载环境变量
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = SdkmanConfig::from_env();
    if let Some(dir) = &cli.sdkman_dir {
        config = config.with_sdkman_dir(dir);
    }

    // 初始化日志，stdout 留给协议
    let filter = if cli.verbose {
        EnvFilter::new("sdkman_mcp=debug")
    } else {
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("sdkman_mcp=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let commands = SdkCommands::new(Arc::new(ShellExecutor::new(config)));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(commands).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Install { candidate, filter } => install(commands, candidate, filter).await,
        Commands::List { candidate } => Ok(report(match candidate {
            Some(c) => commands.list_candidate(&c),
            None => commands.list(),
        })),
        Commands::Current { candidate } => Ok(report(match candidate {
            Some(c) => commands.current_candidate(&c),
            None => commands.current(),
        })),
    }
}

async fn serve(commands: SdkCommands) -> Result<()> {
    info!("🚀 启动 SDKMAN MCP 服务器...");

    // 中断信号只结束正在进行的交互式安装
    let cancel = CancelToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到中断信号，取消交互式安装");
                cancel.cancel();
            }
        })
    };

    let mcp_server = MCPServer::new();
    for tool in sdk_tools(commands.clone(), &cancel) {
        mcp_server.register_tool(tool).await?;
    }
    info!("✅ 已注册 {} 个工具", mcp_server.get_tool_count().await);

    let mut server = Server::new(SERVER_NAME.to_string(), SERVER_VERSION.to_string(), mcp_server)
        .with_resources(SdkResources::new(commands));

    let result = server.run().await;
    watcher.abort();
    if let Err(e) = &result {
        error!("❌ 服务器运行错误: {}", e);
    }
    result
}

async fn install(commands: SdkCommands, candidate: String, filter: Option<String>) -> Result<ExitCode> {
    let cancel = CancelToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到中断信号");
                cancel.cancel();
            }
        })
    };

    let engine = SelectionEngine::new(commands);
    let session_cancel = cancel.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<SelectionOutcome, SdkError> {
        let mut prompter = TerminalPrompter::stdio()?;
        Ok(engine.run(&candidate, filter.as_deref(), &mut prompter, &session_cancel))
    })
    .await?;
    watcher.abort();

    Ok(report(match outcome {
        Ok(outcome) => outcome.into_result(),
        Err(e) => CommandResult::failure(e.to_string()),
    }))
}

/// 打印结果，失败时返回非零退出码
fn report(result: CommandResult) -> ExitCode {
    if result.success {
        if let Some(data) = result.data {
            println!("{}", data.trim_end());
        }
        ExitCode::SUCCESS
    } else {
        eprintln!("错误: {}", result.error.as_deref().unwrap_or("Unknown error"));
        ExitCode::FAILURE
    }
}
