use std::collections::VecDeque;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sdkman_mcp::sdk::selection::CANCELLED_MESSAGE;
use sdkman_mcp::sdk::{
    CancelToken, CommandExecutor, CommandOutput, Prompter, SdkCommands, SelectionEngine,
    SelectionOutcome, TerminalPrompter,
};

const JAVA_TABLE: &str = "\
================================================================================
Available Java Versions for Linux 64bit
================================================================================
 Vendor        | Use | Version      | Dist    | Status     | Identifier
--------------------------------------------------------------------------------
 Oracle
               |     | 21.0.1       | oracle  | installed  | 21.0.1-oracle
               | >>> | 17.0.9       | oracle  | installed  | 17.0.9-oracle
 Eclipse Temurin
               |     | 21.0.1       | tem     |            | 21.0.1-tem
               |     | 17.0.9       | tem     |            | 17.0.9-tem
================================================================================
";

/// 按顺序返回预设输出的假执行器
struct FakeSdk {
    calls: Mutex<Vec<Vec<String>>>,
    replies: Mutex<VecDeque<CommandOutput>>,
}

impl FakeSdk {
    fn new(replies: Vec<CommandOutput>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandExecutor for FakeSdk {
    fn execute(&self, args: &[String]) -> CommandOutput {
        self.calls.lock().unwrap().push(args.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::new(1, "", "unexpected call"))
    }
}

#[derive(Default)]
struct Answers {
    answers: VecDeque<String>,
    shown: Vec<String>,
    prompts: usize,
}

impl Answers {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl Prompter for Answers {
    fn present(&mut self, message: &str) {
        self.shown.push(message.to_string());
    }

    fn prompt(&mut self, _message: &str, _cancel: &CancelToken) -> Option<String> {
        self.prompts += 1;
        self.answers.pop_front()
    }
}

fn engine(sdk: &Arc<FakeSdk>) -> SelectionEngine {
    SelectionEngine::new(SdkCommands::new(sdk.clone()))
}

#[test]
fn test_filtered_selection_installs_identifier() {
    let sdk = FakeSdk::new(vec![
        CommandOutput::new(0, JAVA_TABLE, ""),
        CommandOutput::new(0, "Done installing!", ""),
    ]);
    let mut prompter = Answers::new(&["2", "y"]);

    let outcome = engine(&sdk).run("java", Some("17"), &mut prompter, &CancelToken::new());

    match outcome {
        SelectionOutcome::Installed { identifier, vendor, version, output } => {
            assert_eq!(identifier, "17.0.9-tem");
            assert_eq!(vendor, "Eclipse Temurin");
            assert_eq!(version, "17.0.9");
            assert_eq!(output, "Done installing!");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        sdk.calls(),
        vec![
            vec!["list".to_string(), "java".to_string()],
            vec!["install".to_string(), "java".to_string(), "17.0.9-tem".to_string()],
        ]
    );
}

#[test]
fn test_invalid_inputs_reprompt_then_decline_and_retry() {
    let sdk = FakeSdk::new(vec![
        CommandOutput::new(0, JAVA_TABLE, ""),
        CommandOutput::new(0, "ok", ""),
    ]);
    let mut prompter = Answers::new(&["abc", "9", "1", "n", "3", "yes"]);

    let outcome = engine(&sdk).run("java", None, &mut prompter, &CancelToken::new());

    match outcome {
        SelectionOutcome::Installed { identifier, .. } => assert_eq!(identifier, "21.0.1-tem"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(prompter.prompts, 6);
    // 拒绝后不重新获取列表
    assert_eq!(sdk.calls().len(), 2);
}

#[test]
fn test_quit_never_installs() {
    let sdk = FakeSdk::new(vec![CommandOutput::new(0, JAVA_TABLE, "")]);
    let mut prompter = Answers::new(&["Q"]);

    let result = engine(&sdk)
        .run("java", None, &mut prompter, &CancelToken::new())
        .into_result();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(CANCELLED_MESSAGE));
    assert_eq!(sdk.calls().len(), 1);
}

#[test]
fn test_no_matching_versions() {
    let sdk = FakeSdk::new(vec![CommandOutput::new(0, JAVA_TABLE, "")]);
    let mut prompter = Answers::new(&[]);

    let result = engine(&sdk)
        .run("java", Some("8.0"), &mut prompter, &CancelToken::new())
        .into_result();

    assert_eq!(
        result.error.as_deref(),
        Some("No versions of java found matching '8.0'")
    );
    assert_eq!(prompter.prompts, 0);
}

#[test]
fn test_list_failure_reports_stderr() {
    let sdk = FakeSdk::new(vec![CommandOutput::new(1, "", "Stop! nope is not a valid candidate.")]);
    let mut prompter = Answers::new(&[]);

    let outcome = engine(&sdk).run("nope", None, &mut prompter, &CancelToken::new());

    assert!(matches!(outcome, SelectionOutcome::Failed(msg) if msg.contains("not a valid candidate")));
}

#[test]
fn test_install_failure_is_reported() {
    let sdk = FakeSdk::new(vec![
        CommandOutput::new(0, JAVA_TABLE, ""),
        CommandOutput::new(1, "", ""),
    ]);
    let mut prompter = Answers::new(&["1", "是"]);

    let result = engine(&sdk)
        .run("java", None, &mut prompter, &CancelToken::new())
        .into_result();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Failed to install java"));
}

#[test]
fn test_terminal_prompter_cancelled_while_waiting() {
    let sdk = FakeSdk::new(vec![CommandOutput::new(0, JAVA_TABLE, "")]);
    let cancel = CancelToken::new();
    let (_host, term) = UnixStream::pair().unwrap();
    let mut prompter = TerminalPrompter::from_parts(term, Box::new(std::io::sink()));

    let trigger = cancel.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        trigger.cancel();
    });

    let outcome = engine(&sdk).run("java", None, &mut prompter, &cancel);
    handle.join().unwrap();

    assert_eq!(outcome, SelectionOutcome::Cancelled);
    assert_eq!(sdk.calls().len(), 1);
}

#[test]
fn test_terminal_prompter_reads_lines() {
    let sdk = FakeSdk::new(vec![
        CommandOutput::new(0, JAVA_TABLE, ""),
        CommandOutput::new(0, "installed", ""),
    ]);
    let (mut host, term) = UnixStream::pair().unwrap();
    let mut prompter = TerminalPrompter::from_parts(term, Box::new(std::io::sink()));

    host.write_all(b"4\ny\n").unwrap();
    let result = engine(&sdk)
        .run("java", None, &mut prompter, &CancelToken::new())
        .into_result();

    assert!(result.success);
    assert_eq!(sdk.calls()[1], vec!["install", "java", "17.0.9-tem"]);
}

#[test]
fn test_terminal_input_untouched_after_session_ends() {
    let sdk = FakeSdk::new(vec![CommandOutput::new(0, JAVA_TABLE, "")]);
    let (mut host, term) = UnixStream::pair().unwrap();
    // 会话结束后终端的其他读者
    let mut shell = term.try_clone().unwrap();
    shell.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    let mut prompter = TerminalPrompter::from_parts(term, Box::new(std::io::sink()));

    host.write_all(b"q\nsdk current\n").unwrap();
    let outcome = engine(&sdk).run("java", None, &mut prompter, &CancelToken::new());
    assert_eq!(outcome, SelectionOutcome::Cancelled);

    let mut expected = b"sdk current\n".to_vec();
    for i in 0..20 {
        let line = format!("line {i}\n");
        host.write_all(line.as_bytes()).unwrap();
        expected.extend_from_slice(line.as_bytes());
    }

    let mut received = vec![0u8; expected.len()];
    shell.read_exact(&mut received).unwrap();
    assert_eq!(received, expected);
}
