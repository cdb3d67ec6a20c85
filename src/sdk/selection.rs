//! 交互式版本选择
//!
//! 版本列表在进入时获取并过滤一次，之后的无效输入、拒绝确认都不会重新获取，
//! 因此用户看到的序号在整个会话中保持稳定。

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::commands::{CommandResult, SdkCommands};
use super::parser::VersionRecord;
use crate::errors::SdkError;

pub const CANCELLED_MESSAGE: &str = "user cancelled the installation";

const CANCEL_WORDS: &[&str] = &["q", "quit", "exit"];
const CONFIRM_WORDS: &[&str] = &["y", "yes", "是"];
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 协作式取消信号，可在线程间共享
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 与调用方交互的原语
pub trait Prompter {
    /// 输出消息，不读取输入
    fn present(&mut self, message: &str);

    /// 显示提示并阻塞读取一行；`cancel` 触发或输入关闭时返回 `None`
    fn prompt(&mut self, message: &str, cancel: &CancelToken) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    AwaitingSelection,
    AwaitingConfirmation,
    Installing,
    Done,
    Cancelled,
}

/// 对一次输入的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// 选中了某个序号（0 基）
    Selected(usize),
    /// 输入无效，附带纠正提示，状态不变
    Rejected(String),
    Confirmed,
    /// 拒绝确认，回到选择状态
    Declined,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Installed {
        identifier: String,
        vendor: String,
        version: String,
        output: String,
    },
    Cancelled,
    NotFound(String),
    Failed(String),
}

impl SelectionOutcome {
    pub fn into_result(self) -> CommandResult {
        match self {
            SelectionOutcome::Installed { output, .. } => CommandResult::ok(output),
            SelectionOutcome::Cancelled => CommandResult::failure(CANCELLED_MESSAGE),
            SelectionOutcome::NotFound(msg) | SelectionOutcome::Failed(msg) => {
                CommandResult::failure(msg)
            }
        }
    }
}

/// 一次交互式安装的会话状态
#[derive(Debug, Clone)]
pub struct SelectionSession {
    candidate: String,
    filter: Option<String>,
    records: Vec<VersionRecord>,
    state: SelectionState,
    selected: Option<usize>,
}

impl SelectionSession {
    pub fn new(candidate: impl Into<String>, filter: Option<String>, records: Vec<VersionRecord>) -> Self {
        Self {
            candidate: candidate.into(),
            filter: filter.filter(|f| !f.is_empty()),
            records,
            state: SelectionState::AwaitingSelection,
            selected: None,
        }
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected(&self) -> Option<&VersionRecord> {
        self.selected.and_then(|idx| self.records.get(idx))
    }

    /// 按当前状态处理一行输入
    pub fn handle_input(&mut self, input: &str) -> InputOutcome {
        match self.state {
            SelectionState::AwaitingSelection => self.handle_selection(input),
            SelectionState::AwaitingConfirmation => self.handle_confirmation(input),
            other => InputOutcome::Rejected(format!("当前状态 {other:?} 不接受输入")),
        }
    }

    fn handle_selection(&mut self, input: &str) -> InputOutcome {
        let input = input.trim();
        if CANCEL_WORDS.contains(&input.to_lowercase().as_str()) {
            self.cancel();
            return InputOutcome::Cancelled;
        }

        match input.parse::<usize>() {
            Ok(n) if (1..=self.records.len()).contains(&n) => {
                self.selected = Some(n - 1);
                self.state = SelectionState::AwaitingConfirmation;
                InputOutcome::Selected(n - 1)
            }
            Ok(_) => InputOutcome::Rejected(format!(
                "无效的选择，请输入 1 到 {} 之间的数字",
                self.records.len()
            )),
            Err(_) => InputOutcome::Rejected("请输入有效的数字".to_string()),
        }
    }

    fn handle_confirmation(&mut self, input: &str) -> InputOutcome {
        if CONFIRM_WORDS.contains(&input.trim().to_lowercase().as_str()) {
            self.state = SelectionState::Installing;
            InputOutcome::Confirmed
        } else {
            self.selected = None;
            self.state = SelectionState::AwaitingSelection;
            InputOutcome::Declined
        }
    }

    pub fn cancel(&mut self) {
        self.selected = None;
        self.state = SelectionState::Cancelled;
    }

    fn finish(&mut self) {
        self.state = SelectionState::Done;
    }

    /// 渲染带序号的版本表
    pub fn render_table(&self) -> String {
        let rule = "=".repeat(75);
        let mut out = String::new();
        let filter_note = self
            .filter
            .as_deref()
            .map(|f| format!(" (符合条件: '{f}')"))
            .unwrap_or_default();

        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(
            out,
            "可用的 {} 版本{} - {}个结果",
            self.candidate,
            filter_note,
            self.records.len()
        );
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "{:<6} {:<12} | {:<4} | {:<10} | {:<10} | {:<12} | {}",
            "序号", "供应商", "使用", "版本", "分发", "状态", "标识符"
        );
        let _ = writeln!(
            out,
            "{} {} | {} | {} | {} | {} | {}",
            "-".repeat(6),
            "-".repeat(12),
            "-".repeat(4),
            "-".repeat(10),
            "-".repeat(10),
            "-".repeat(12),
            "-".repeat(25)
        );
        for (i, record) in self.records.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:<6} {:<12} | {:<4} | {:<10} | {:<10} | {:<12} | {}",
                i + 1,
                record.vendor,
                record.use_marker(),
                record.version,
                record.distribution,
                record.status,
                record.identifier
            );
        }
        let _ = writeln!(out, "\n说明: 使用列中的 >>> 表示当前默认版本");
        out
    }
}

/// 驱动 选择 → 确认 → 安装 的状态机
#[derive(Clone)]
pub struct SelectionEngine {
    commands: SdkCommands,
}

impl SelectionEngine {
    pub fn new(commands: SdkCommands) -> Self {
        Self { commands }
    }

    pub fn run(
        &self,
        candidate: &str,
        filter: Option<&str>,
        prompter: &mut dyn Prompter,
        cancel: &CancelToken,
    ) -> SelectionOutcome {
        let records = match self.commands.list_versions(candidate, filter) {
            Ok(records) => records,
            Err(SdkError::NotFound(msg)) => return SelectionOutcome::NotFound(msg),
            Err(SdkError::CommandFailed(msg)) => return SelectionOutcome::Failed(msg),
            Err(other) => return SelectionOutcome::Failed(other.to_string()),
        };

        let mut session = SelectionSession::new(candidate, filter.map(String::from), records);
        info!("📋 {} 个 {} 版本可供选择", session.records().len(), candidate);
        self.drive(&mut session, prompter, cancel)
    }

    /// 在已有会话上运行交互循环，没有重试上限
    pub fn drive(
        &self,
        session: &mut SelectionSession,
        prompter: &mut dyn Prompter,
        cancel: &CancelToken,
    ) -> SelectionOutcome {
        prompter.present(&session.render_table());

        loop {
            let message = match session.state() {
                SelectionState::AwaitingSelection => {
                    "\n请选择要安装的版本序号 (或输入 'q' 退出): ".to_string()
                }
                SelectionState::AwaitingConfirmation => {
                    let Some(record) = session.selected() else {
                        session.cancel();
                        continue;
                    };
                    prompter.present(&format!(
                        "\n您选择了: {} {} ({})",
                        record.vendor, record.version, record.identifier
                    ));
                    "确认安装? (y/n): ".to_string()
                }
                SelectionState::Installing => return self.install(session, prompter),
                SelectionState::Done => {
                    return SelectionOutcome::Failed("selection session already finished".to_string())
                }
                SelectionState::Cancelled => return SelectionOutcome::Cancelled,
            };

            let input = if cancel.is_cancelled() {
                None
            } else {
                prompter.prompt(&message, cancel)
            };
            let Some(input) = input.filter(|_| !cancel.is_cancelled()) else {
                prompter.present("\n操作被用户中断");
                session.cancel();
                return SelectionOutcome::Cancelled;
            };

            match session.handle_input(&input) {
                InputOutcome::Selected(idx) => debug!("选择了第 {} 项", idx + 1),
                InputOutcome::Rejected(hint) => prompter.present(&hint),
                InputOutcome::Confirmed => {}
                InputOutcome::Declined => {
                    prompter.present("取消安装操作");
                    prompter.present(&session.render_table());
                }
                InputOutcome::Cancelled => {
                    info!("⏭️ 用户取消安装 {}", session.candidate());
                    return SelectionOutcome::Cancelled;
                }
            }
        }
    }

    fn install(&self, session: &mut SelectionSession, prompter: &mut dyn Prompter) -> SelectionOutcome {
        let Some(record) = session.selected().cloned() else {
            session.cancel();
            return SelectionOutcome::Cancelled;
        };
        let candidate = session.candidate().to_string();

        prompter.present(&format!("\n正在安装 {} {}，请稍候...\n", candidate, record.identifier));
        let result = self.commands.install(&candidate, Some(&record.identifier), None);
        session.finish();

        if result.success {
            info!("✅ 安装成功: {} {}", candidate, record.identifier);
            prompter.present(&format!(
                "\n安装成功! 通过以下命令使用该版本:\n  sdk use {} {}",
                candidate, record.identifier
            ));
            SelectionOutcome::Installed {
                identifier: record.identifier,
                vendor: record.vendor,
                version: record.version,
                output: result.data.unwrap_or_default(),
            }
        } else {
            SelectionOutcome::Failed(
                result
                    .error
                    .unwrap_or_else(|| format!("Failed to install {candidate}")),
            )
        }
    }
}

/// 基于终端的提示器
///
/// 只在 `prompt` 期间读取输入：先以 `POLL_INTERVAL` 为超时等待可读并检查取消信号，
/// 再逐字节读到换行为止。会话结束后剩余的输入原样留给终端的其他读者。
pub struct TerminalPrompter {
    input: File,
    out: Box<dyn Write + Send>,
}

impl TerminalPrompter {
    /// 从 stdin 读取，输出到 stdout（命令行模式）
    pub fn stdio() -> Result<Self, SdkError> {
        let input = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self::from_parts(input, Box::new(io::stdout())))
    }

    /// 从控制终端读取，输出到 stderr（stdio 被协议占用时）
    pub fn tty() -> Result<Self, SdkError> {
        let tty = File::open("/dev/tty")
            .map_err(|e| SdkError::NoTerminal(format!("/dev/tty: {e}")))?;
        Ok(Self::from_parts(tty, Box::new(io::stderr())))
    }

    pub fn from_parts(input: impl Into<OwnedFd>, out: Box<dyn Write + Send>) -> Self {
        Self {
            input: File::from(input.into()),
            out,
        }
    }

    fn read_line(&mut self, cancel: &CancelToken) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if !wait_readable(&self.input, POLL_INTERVAL)? {
                continue;
            }
            match self.input.read(&mut byte) {
                Ok(0) if line.is_empty() => return Ok(None),
                Ok(0) => return Ok(Some(decode_line(&line))),
                Ok(_) if byte[0] == b'\n' => return Ok(Some(decode_line(&line))),
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Prompter for TerminalPrompter {
    fn present(&mut self, message: &str) {
        let _ = writeln!(self.out, "{message}");
        let _ = self.out.flush();
    }

    fn prompt(&mut self, message: &str, cancel: &CancelToken) -> Option<String> {
        let _ = write!(self.out, "{message}");
        let _ = self.out.flush();

        match self.read_line(cancel) {
            Ok(line) => line,
            Err(e) => {
                warn!("❌ 读取输入失败: {}", e);
                None
            }
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string()
}

/// 等待 fd 可读，超时返回 `false`；被信号打断视为超时
fn wait_readable(file: &File, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    let result = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(result > 0)
}
