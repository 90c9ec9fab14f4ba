//! End-to-end sessions driven through `Shell::submit`.

use vsh_core::models::OutputLineData;
use vsh_core::{HostRequest, OutputLine, SessionMode, Shell};

fn shell() -> Shell {
    let mut shell = Shell::in_memory();
    shell.state.transcript.clear();
    shell
}

/// Submit `line` and return the plain text it added, without the echo.
fn run(shell: &mut Shell, line: &str) -> Vec<String> {
    let before = shell.transcript().len();
    shell.submit(line);
    shell
        .transcript()
        .iter()
        .skip(before)
        .filter(|l| !matches!(l.data, OutputLineData::Command { .. }))
        .map(OutputLine::plain_text)
        .collect()
}

#[test]
fn test_create_write_read() {
    let mut sh = shell();
    for line in ["mkdir notes", "cd notes", "touch a.txt", "echo hello > a.txt"] {
        assert!(run(&mut sh, line).is_empty(), "{} printed output", line);
    }
    assert_eq!(run(&mut sh, "cat a.txt"), vec!["hello"]);
    assert_eq!(sh.prompt(), "user@vsh:~/notes$ ");
}

#[test]
fn test_alias_lifecycle() {
    let mut sh = shell();
    run(&mut sh, "touch .hidden");
    run(&mut sh, "alias ll='ls -la'");
    let listing = run(&mut sh, "ll");
    assert!(listing.iter().any(|l| l.ends_with(".hidden")));
    assert!(listing.iter().any(|l| l.ends_with(" ..")));

    assert_eq!(run(&mut sh, "unalias ll"), vec!["1 alias(es) removed"]);
    assert_eq!(run(&mut sh, "ll"), vec!["ll: command not found"]);
}

#[test]
fn test_alias_expands_once() {
    let mut sh = shell();
    run(&mut sh, "alias a=b");
    run(&mut sh, "alias b=pwd");
    assert_eq!(run(&mut sh, "a"), vec!["b: command not found"]);
    assert_eq!(run(&mut sh, "b"), vec!["/home/user"]);
}

#[test]
fn test_su_three_wrong_passwords() {
    let mut sh = shell();
    run(&mut sh, "su root");
    let mut failures = Vec::new();
    for _ in 0..3 {
        failures.extend(run(&mut sh, "guess"));
    }
    assert_eq!(failures, vec!["su: Authentication failure"; 3]);
    assert!(sh.mode().is_normal());
    assert_eq!(sh.state.uid(), 1001);
    assert_eq!(run(&mut sh, "whoami"), vec!["user"]);
}

#[test]
fn test_su_and_exit_round_trip() {
    let mut sh = shell();
    run(&mut sh, "su");
    assert_eq!(run(&mut sh, "toor"), vec!["Switched to user root"]);
    assert_eq!(sh.prompt(), "root@vsh:~# ");
    assert_eq!(run(&mut sh, "su alice"), vec!["Switched to user alice"]);
    assert_eq!(run(&mut sh, "exit"), vec!["Returned to user: root"]);
    assert_eq!(sh.state.cwd, "/root");
}

#[test]
fn test_exit_closes_terminal() {
    let mut sh = shell();
    run(&mut sh, "exit");
    assert_eq!(sh.drain_host_requests(), vec![HostRequest::Close]);
}

#[test]
fn test_sudo_writes_outside_home() {
    let mut sh = shell();
    run(&mut sh, "sudo mkdir /srv");
    assert!(matches!(sh.mode(), SessionMode::Auth(_)));
    run(&mut sh, "user123");
    assert!(sh.state.fs.is_directory("/srv"));
    assert_eq!(run(&mut sh, "whoami"), vec!["user"]);
    assert_eq!(run(&mut sh, "sudo -v"), vec!["sudo: valid authentication"]);
}

#[test]
fn test_tar_round_trip() {
    let mut sh = shell();
    run(&mut sh, "mkdir -p src/lib");
    run(&mut sh, "echo one > src/a.txt");
    run(&mut sh, "echo two > src/lib/b.txt");
    run(&mut sh, "tar -cf src.tar src");
    run(&mut sh, "mkdir out");
    run(&mut sh, "cd out");
    assert_eq!(run(&mut sh, "tar -xf ../src.tar"), vec!["Extracted 4 items from ../src.tar"]);
    assert_eq!(sh.state.fs.read_file("/home/user/out/src/a.txt").unwrap(), "one\n");
    assert_eq!(
        sh.state.fs.read_file("/home/user/out/src/lib/b.txt").unwrap(),
        "two\n"
    );
}

#[test]
fn test_zip_round_trip() {
    let mut sh = shell();
    let body = "abc ".repeat(200);
    sh.state
        .fs
        .create("/home/user/big.txt", false, Some(&body))
        .unwrap();
    run(&mut sh, "echo x > small.txt");
    run(&mut sh, "zip pack.zip big.txt small.txt");
    run(&mut sh, "rm big.txt small.txt");
    run(&mut sh, "unzip pack.zip");
    assert_eq!(sh.state.fs.read_file("/home/user/big.txt").unwrap(), body);
    assert_eq!(sh.state.fs.read_file("/home/user/small.txt").unwrap(), "x\n");
}

#[test]
fn test_history_survives_user_switch() {
    let mut sh = shell();
    run(&mut sh, "pwd");
    run(&mut sh, "su root");
    run(&mut sh, "toor");
    assert_eq!(run(&mut sh, "history"), vec!["1  history"]);
    run(&mut sh, "exit");
    assert_eq!(
        run(&mut sh, "history"),
        vec!["1  pwd", "2  su root", "3  history"]
    );
}

#[test]
fn test_history_navigation() {
    let mut sh = shell();
    run(&mut sh, "pwd");
    run(&mut sh, "whoami");
    assert_eq!(sh.history_up("draft").as_deref(), Some("whoami"));
    assert_eq!(sh.history_up("").as_deref(), Some("pwd"));
    assert_eq!(sh.history_down("").as_deref(), Some("whoami"));
    assert_eq!(sh.history_down("").as_deref(), Some("draft"));
}

#[test]
fn test_completion_menu_cycles() {
    let mut sh = shell();
    run(&mut sh, "mkdir dir1 dir2");
    assert_eq!(sh.tab("cd di").as_deref(), Some("cd dir"));
    let menu = sh.menu().unwrap();
    assert_eq!(menu.suggestions.len(), 2);
    sh.move_selection(1);
    sh.move_selection(1);
    assert_eq!(sh.accept_suggestion().as_deref(), Some("cd dir1/"));
    assert!(sh.menu().is_none());
}

#[test]
fn test_persisted_session_restores() {
    let mut sh = shell();
    run(&mut sh, "mkdir work");
    run(&mut sh, "cd work");
    run(&mut sh, "alias w=whoami");
    let snapshot = sh.state.snapshot(100, None).to_json().unwrap();

    let mut restored = Shell::new(Box::new(vsh_core::MemoryStorage::with_data(snapshot)));
    assert_eq!(restored.state.cwd, "/home/user/work");
    assert_eq!(run(&mut restored, "w"), vec!["user"]);
}
