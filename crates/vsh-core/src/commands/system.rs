//! Identity and session commands.
//!
//! - `whoami`, `su`, `sudo`, `passwd`, `exit`
//! - `date`, `history`, `stats`, `reset`
//! - `alias`, `unalias`
//!
//! `su`, `sudo` and `passwd` only decide whether a password prompt is needed;
//! the prompt itself is resolved by the shell once the password arrives.

use std::sync::LazyLock;

use chrono::{Local, Utc};
use regex::Regex;

use crate::alias::strip_quotes;
use crate::autocomplete::Suggestion;
use crate::config::ROOT_UID;
use crate::env::is_valid_var_name;
use crate::error::CommandError;
use crate::host::HostRequest;
use crate::models::{OutputLine, Stats};
use crate::parser;
use crate::session::{AuthKind, AuthPrompt, ResetStep, SessionMode};
use crate::state::ShellState;
use crate::utils::format::{format_duration, truncate};

use super::{
    Category, Command, CommandContext, CommandResult, CompletionContext, Invocation, Registry,
    command_suggestions, render_error, user_suggestions,
};

pub(super) fn register(registry: &mut Registry) {
    registry.register(Box::new(Whoami));
    registry.register(Box::new(Su));
    registry.register(Box::new(Sudo));
    registry.register(Box::new(Passwd));
    registry.register(Box::new(Exit));
    registry.register(Box::new(Date));
    registry.register(Box::new(History));
    registry.register(Box::new(StatsCommand));
    registry.register(Box::new(Reset));
    registry.register(Box::new(Alias));
    registry.register(Box::new(Unalias));
}

/// Run `command` as root, then drop back to the calling identity.
///
/// The caller is restored only while root is still active; a nested `su`
/// keeps the identity it switched to.
pub(crate) fn run_elevated(registry: &Registry, state: &mut ShellState, command: &str) -> CommandResult {
    let caller = state.settings.current_user;
    let last = state.settings.last_user;
    state.settings.current_user = ROOT_UID;
    state.stats.sudo += 1;
    log::debug!("sudo: running '{}' for uid {}", command, caller);

    let name = parser::first_word(command).to_string();
    let result = match registry.run(state, command) {
        Some(Ok(result)) => result,
        Some(Err(e)) => CommandResult::line(OutputLine::error(render_error(&name, &e))),
        None => CommandResult::line(OutputLine::error(
            CommandError::UnknownCommand(name).to_string(),
        )),
    };

    if state.settings.current_user == ROOT_UID && state.settings.last_user == last {
        state.settings.current_user = caller;
    } else if state.settings.last_user == ROOT_UID {
        state.settings.last_user = caller;
    }
    result
}

/// Lines printed by `reset` before the first confirmation.
fn reset_warning() -> Vec<OutputLine> {
    vec![
        OutputLine::error("TERMINAL RESET WARNING"),
        OutputLine::empty(),
        OutputLine::text("This will permanently delete ALL terminal data:"),
        OutputLine::text("  • Command history"),
        OutputLine::text("  • File system state"),
        OutputLine::text("  • Settings and configurations"),
        OutputLine::text("  • All unsaved work"),
        OutputLine::empty(),
        OutputLine::text("Are you absolutely sure? [y/N]"),
    ]
}

/// Lines printed before the final reset confirmation.
pub(crate) fn reset_final_warning() -> Vec<OutputLine> {
    vec![
        OutputLine::empty(),
        OutputLine::error("FINAL CONFIRMATION"),
        OutputLine::empty(),
        OutputLine::error("LAST WARNING!"),
        OutputLine::text("This action cannot be undone."),
        OutputLine::empty(),
        OutputLine::text("Press Y to confirm terminal reset [y/N]"),
    ]
}

fn nothing(_ctx: &CompletionContext<'_>, _partial: &str) -> Option<Vec<Suggestion>> {
    Some(Vec::new())
}

// =============================================================================
// Identity
// =============================================================================

struct Whoami;

impl Command for Whoami {
    fn name(&self) -> &'static str {
        "whoami"
    }

    fn description(&self) -> &'static str {
        "Print the current user"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let name = ctx
            .state
            .settings
            .user(inv.acting)
            .map_or("unknown", |u| u.name.as_str());
        Ok(CommandResult::text(name))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

struct Su;

impl Command for Su {
    fn name(&self) -> &'static str {
        "su"
    }

    fn description(&self) -> &'static str {
        "Switch user"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let name = inv.args.first().map_or("root", String::as_str);
        let Some(target) = ctx.state.settings.find_by_name(name) else {
            return Err(CommandError::usage(format!("user {} does not exist", name)));
        };

        if inv.acting == ROOT_UID || !target.has_password() {
            let (uid, name) = (target.uid, target.name.clone());
            ctx.state.switch_user(uid);
            return Ok(CommandResult::line(OutputLine::success(format!(
                "Switched to user {}",
                name
            ))));
        }
        Ok(CommandResult::enter(SessionMode::Auth(AuthPrompt::su(target.uid))))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(user_suggestions(ctx, partial))
    }
}

struct Sudo;

impl Command for Sudo {
    fn name(&self) -> &'static str {
        "sudo"
    }

    fn description(&self) -> &'static str {
        "Execute a command as root"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        match inv.args.first().map(String::as_str) {
            None => return Err(CommandError::usage("a command must be specified")),
            Some("-k") => {
                ctx.state.sudo.revoke(inv.acting, Utc::now());
                return Ok(CommandResult::text("sudo: cache cleared"));
            }
            Some("-v") => {
                let text = if ctx.state.sudo.is_valid(inv.acting) {
                    "sudo: valid authentication"
                } else {
                    "sudo: no valid authentication"
                };
                return Ok(CommandResult::text(text));
            }
            Some(_) => {}
        }

        let command = inv.rest().to_string();
        let name = parser::first_word(&command);
        if !ctx.registry.contains(name) {
            return Err(CommandError::UnknownCommand(name.to_string()));
        }

        if inv.acting == ROOT_UID || ctx.state.sudo.is_valid(inv.acting) {
            return Ok(run_elevated(ctx.registry, ctx.state, &command));
        }
        let user = ctx.state.settings.name_of(inv.acting);
        Ok(CommandResult::enter(SessionMode::Auth(AuthPrompt::sudo(&user, command))))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(command_suggestions(ctx.registry, partial))
    }
}

struct Passwd;

impl Command for Passwd {
    fn name(&self) -> &'static str {
        "passwd"
    }

    fn description(&self) -> &'static str {
        "Change user password"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let settings = &ctx.state.settings;
        let name = inv
            .args
            .first()
            .cloned()
            .unwrap_or_else(|| settings.name_of(inv.acting));
        let Some(target) = settings.find_by_name(&name) else {
            return Err(CommandError::usage(format!("user '{}' does not exist", name)));
        };

        let privileged = inv.acting == ROOT_UID;
        if !privileged && target.uid != inv.acting {
            return Err(CommandError::usage("permission denied"));
        }

        let prompt = if !privileged && target.has_password() {
            AuthPrompt::new(
                AuthKind::PasswdCurrent { target: target.uid },
                crate::config::prompts::PASSWD_CURRENT,
            )
        } else {
            AuthPrompt::new(
                AuthKind::PasswdNew { target: target.uid },
                crate::config::prompts::PASSWD_NEW,
            )
        };
        Ok(CommandResult::enter(SessionMode::Auth(prompt)))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(user_suggestions(ctx, partial))
    }
}

struct Exit;

impl Command for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "Return to the previous user or close the terminal"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        let settings = &ctx.state.settings;
        let previous = settings.last_user;
        if settings.current_user != previous && settings.user(previous).is_some() {
            ctx.state.switch_user(previous);
            // Returning does not create a new way back
            ctx.state.settings.last_user = previous;
            return Ok(CommandResult::line(OutputLine::success(format!(
                "Returned to user: {}",
                ctx.state.user_name()
            ))));
        }
        Ok(CommandResult::line(OutputLine::info("Closing terminal...")).with_host(HostRequest::Close))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

// =============================================================================
// Session Info
// =============================================================================

struct Date;

impl Command for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    fn description(&self) -> &'static str {
        "Print the current date and time"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, _ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::text(
            Local::now().format("%a %b %e %H:%M:%S %Y").to_string(),
        ))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

struct History;

impl Command for History {
    fn name(&self) -> &'static str {
        "history"
    }

    fn description(&self) -> &'static str {
        "Display command history"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.iter().any(|a| a == "-c") {
            ctx.state.clear_history();
            return Ok(CommandResult::empty());
        }
        if ctx.state.history.is_empty() {
            return Ok(CommandResult::text("No commands in history."));
        }
        let lines = ctx
            .state
            .history
            .iter()
            .enumerate()
            .map(|(i, cmd)| OutputLine::text(format!("{}  {}", i + 1, cmd)))
            .collect();
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

// =============================================================================
// stats
// =============================================================================

struct StatsCommand;

const STATS_USAGE: &str = "Usage: stats [OPTION]\n\
Options:\n\
    -c, --commands            display command statistics\n\
    -s, --screenshots         display screenshot statistics\n\
    -e, --errors              display error statistics\n\
    -complete, -all           display all statistics";

const RULE: &str = "-----------------------------------------------";

fn most_used(stats: &Stats) -> String {
    match stats.top_commands(1).first() {
        Some((name, count)) => format!("{} ({} times)", name, count),
        None => "N/A".to_string(),
    }
}

fn count_line(label: &str, count: u64) -> String {
    format!("{}:{}{} times", label, " ".repeat(15usize.saturating_sub(label.len())), count)
}

fn labeled(width: usize, label: &str, value: impl std::fmt::Display) -> OutputLine {
    OutputLine::text(format!("{:<width$}{}", label, value, width = width))
}

impl StatsCommand {
    fn summary(stats: &Stats, uptime: u64) -> Vec<OutputLine> {
        vec![
            labeled(20, "Total commands:", stats.total_commands()),
            labeled(20, "Most used command:", most_used(stats)),
            labeled(20, "Sudo commands:", stats.sudo),
            labeled(20, "Screenshots:", stats.screenshots.values().sum::<u64>()),
            labeled(20, "Time spent:", format_duration(uptime)),
        ]
    }

    fn complete(stats: &Stats, uptime: u64) -> Vec<OutputLine> {
        vec![
            labeled(22, "Total commands:", stats.total_commands()),
            labeled(22, "Most used command:", most_used(stats)),
            labeled(22, "Sudo commands:", stats.sudo),
            labeled(22, "Screenshots:", stats.screenshots.values().sum::<u64>()),
            labeled(22, "Time spent:", format_duration(uptime)),
            labeled(22, "Errors:", stats.errors.len()),
            labeled(22, "Files created:", stats.files),
            labeled(22, "Directories created:", stats.directories),
        ]
    }

    fn commands(stats: &Stats) -> Vec<OutputLine> {
        let mut lines = vec![
            OutputLine::text(format!("Most used command: {}", most_used(stats))),
            OutputLine::text(format!("Total commands: {}", stats.total_commands())),
            OutputLine::text(RULE),
            OutputLine::text("Command statistics:"),
        ];
        lines.extend(
            stats
                .top_commands(usize::MAX)
                .into_iter()
                .map(|(name, count)| OutputLine::text(count_line(name, count))),
        );
        lines
    }

    fn screenshots(stats: &Stats) -> Vec<OutputLine> {
        let mut lines = vec![
            OutputLine::text(format!(
                "Screenshots: {}",
                stats.screenshots.values().sum::<u64>()
            )),
            OutputLine::text(RULE),
        ];
        lines.extend(
            stats
                .screenshots
                .iter()
                .map(|(day, count)| OutputLine::text(count_line(day, *count))),
        );
        lines
    }

    fn errors(stats: &Stats) -> Vec<OutputLine> {
        let mut lines = vec![
            OutputLine::text(format!("Errors: {}", stats.errors.len())),
            OutputLine::text(RULE),
        ];
        lines.extend(stats.errors.iter().enumerate().map(|(i, record)| {
            let message = if record.message.chars().count() > 48 {
                truncate(&record.message, 46)
            } else {
                record.message.clone()
            };
            OutputLine::text(format!("{}. {}", i + 1, message))
        }));
        lines
    }
}

impl Command for StatsCommand {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn description(&self) -> &'static str {
        "Print terminal statistics"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let stats = &ctx.state.stats;
        let uptime = ctx.state.uptime_ms();
        let lines = match inv.args.first().map(String::as_str) {
            None => Self::summary(stats, uptime),
            Some("--help" | "-h") => STATS_USAGE.lines().map(OutputLine::text).collect(),
            Some("-c" | "-commands" | "--commands") => Self::commands(stats),
            Some("-s" | "-screenshot" | "-screenshots" | "--screenshots") => Self::screenshots(stats),
            Some("-e" | "-error" | "-errors" | "--errors") => Self::errors(stats),
            Some("-all" | "-complete" | "--all") => Self::complete(stats, uptime),
            Some(other) => {
                return Err(CommandError::usage(format!("{}: invalid argument", other)));
            }
        };
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

// =============================================================================
// reset
// =============================================================================

struct Reset;

impl Command for Reset {
    fn name(&self) -> &'static str {
        "reset"
    }

    fn description(&self) -> &'static str {
        "Erase all terminal data and restart"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, _ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        Ok(CommandResult {
            output: reset_warning(),
            mode: Some(SessionMode::ResetConfirm(ResetStep::First)),
            host: Vec::new(),
        })
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

// =============================================================================
// alias / unalias
// =============================================================================

static ALIAS_DEFINITION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([^=]+)=(.+)$").ok());

struct Alias;

impl Alias {
    fn define(ctx: &mut CommandContext<'_>, name: &str, value: &str) -> Result<CommandResult, CommandError> {
        if !is_valid_var_name(name) {
            return Err(CommandError::usage(format!("invalid alias name '{}'", name)));
        }
        if ctx.registry.contains(name) {
            return Err(CommandError::usage(format!(
                "cannot alias '{}': command already exists",
                name
            )));
        }
        ctx.state.aliases.set(name, value);
        ctx.state.save_aliases();
        Ok(CommandResult::line(OutputLine::success(format!(
            "alias {}='{}'",
            name, value
        ))))
    }
}

impl Command for Alias {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn description(&self) -> &'static str {
        "Create and manage command aliases"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.is_empty() {
            if ctx.state.aliases.is_empty() {
                return Ok(CommandResult::text("No aliases defined"));
            }
            let lines = ctx
                .state
                .aliases
                .iter()
                .map(|(name, value)| OutputLine::text(format!("alias {}='{}'", name, value)))
                .collect();
            return Ok(CommandResult::output(lines));
        }

        // Quotes are part of the value, so the raw text is parsed
        if let Some(re) = ALIAS_DEFINITION.as_ref()
            && let Some(caps) = re.captures(inv.rest())
        {
            let name = caps[1].trim();
            let value = strip_quotes(caps[2].trim());
            return Self::define(ctx, name, value);
        }

        let lines = inv
            .args
            .iter()
            .map(|name| match ctx.state.aliases.get(name) {
                Some(value) => OutputLine::text(format!("alias {}='{}'", name, value)),
                None => OutputLine::error(format!("alias: {}: not found", name)),
            })
            .collect();
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

struct Unalias;

impl Command for Unalias {
    fn name(&self) -> &'static str {
        "unalias"
    }

    fn description(&self) -> &'static str {
        "Remove command aliases"
    }

    fn category(&self) -> Category {
        Category::System
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.is_empty() {
            return Err(CommandError::usage("usage: unalias [-a] name [name ...]"));
        }
        if inv.args.iter().any(|a| a == "-a") {
            ctx.state.aliases.clear();
            ctx.state.save_aliases();
            return Ok(CommandResult::line(OutputLine::success("All aliases removed")));
        }

        let mut lines = Vec::new();
        let mut removed = 0;
        for name in &inv.args {
            if ctx.state.aliases.remove(name) {
                removed += 1;
            } else {
                lines.push(OutputLine::error(format!("unalias: {}: not found", name)));
            }
        }
        if removed > 0 {
            ctx.state.save_aliases();
            lines.push(OutputLine::success(format!("{} alias(es) removed", removed)));
        }
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(
            ctx.state
                .aliases
                .iter()
                .filter(|(name, _)| name.starts_with(partial))
                .map(|(name, value)| Suggestion::alias(name, value))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{run, run_plain};

    #[test]
    fn test_whoami() {
        let mut state = ShellState::new();
        assert_eq!(run_plain(&mut state, "whoami"), vec!["user"]);
    }

    #[test]
    fn test_su_prompts_for_password() {
        let mut state = ShellState::new();
        let result = run(&mut state, "su").unwrap();
        assert!(matches!(
            result.mode,
            Some(SessionMode::Auth(AuthPrompt {
                kind: AuthKind::Su { target: 0 },
                ..
            }))
        ));
        assert_eq!(state.uid(), 1001);
        assert_eq!(
            run(&mut state, "su bob").unwrap_err().to_string(),
            "user bob does not exist"
        );
    }

    #[test]
    fn test_su_without_password_switches() {
        let mut state = ShellState::new();
        state.settings.user_mut(1000).unwrap().password.clear();
        assert_eq!(run_plain(&mut state, "su alice"), vec!["Switched to user alice"]);
        assert_eq!(state.uid(), 1000);
        assert_eq!(state.cwd, "/home/alice");

        assert_eq!(run_plain(&mut state, "exit"), vec!["Returned to user: user"]);
        assert_eq!(state.uid(), 1001);
        let result = run(&mut state, "exit").unwrap();
        assert_eq!(result.host, vec![HostRequest::Close]);
    }

    #[test]
    fn test_root_switches_without_prompt() {
        let mut state = ShellState::new();
        state.switch_user(0);
        assert_eq!(run_plain(&mut state, "su user"), vec!["Switched to user user"]);
        assert_eq!(state.uid(), 1001);
    }

    #[test]
    fn test_sudo_paths() {
        let mut state = ShellState::new();
        assert_eq!(
            run(&mut state, "sudo").unwrap_err().to_string(),
            "a command must be specified"
        );
        assert_eq!(
            run(&mut state, "sudo frobnicate").unwrap_err().to_string(),
            "frobnicate: command not found"
        );

        let result = run(&mut state, "sudo whoami").unwrap();
        assert!(matches!(
            result.mode,
            Some(SessionMode::Auth(ref p)) if p.prompt == "[sudo] password for user: "
        ));
        assert_eq!(state.stats.sudo, 0);

        state.sudo.grant(1001, Utc::now());
        assert_eq!(run_plain(&mut state, "sudo -v"), vec!["sudo: valid authentication"]);
        assert_eq!(run_plain(&mut state, "sudo whoami"), vec!["root"]);
        assert_eq!(state.uid(), 1001);
        assert_eq!(state.stats.sudo, 1);

        assert_eq!(run_plain(&mut state, "sudo -k"), vec!["sudo: cache cleared"]);
        assert_eq!(run_plain(&mut state, "sudo -v"), vec!["sudo: no valid authentication"]);
    }

    #[test]
    fn test_elevated_su_keeps_new_identity() {
        let mut state = ShellState::new();
        let registry = Registry::with_defaults();
        run_elevated(&registry, &mut state, "su alice");
        assert_eq!(state.uid(), 1000);
        assert_eq!(state.settings.last_user, 1001);
    }

    #[test]
    fn test_passwd_rules() {
        let mut state = ShellState::new();
        let result = run(&mut state, "passwd").unwrap();
        assert!(matches!(
            result.mode,
            Some(SessionMode::Auth(AuthPrompt {
                kind: AuthKind::PasswdCurrent { target: 1001 },
                ..
            }))
        ));
        assert_eq!(
            run(&mut state, "passwd alice").unwrap_err().to_string(),
            "permission denied"
        );
        assert_eq!(
            run(&mut state, "passwd ghost").unwrap_err().to_string(),
            "user 'ghost' does not exist"
        );

        state.switch_user(0);
        let result = run(&mut state, "passwd alice").unwrap();
        assert!(matches!(
            result.mode,
            Some(SessionMode::Auth(AuthPrompt {
                kind: AuthKind::PasswdNew { target: 1000 },
                ..
            }))
        ));
    }

    #[test]
    fn test_history_listing() {
        let mut state = ShellState::new();
        assert_eq!(run_plain(&mut state, "history"), vec!["No commands in history."]);
        state.record_history("ls");
        state.record_history("pwd");
        assert_eq!(run_plain(&mut state, "history"), vec!["1  ls", "2  pwd"]);
        run(&mut state, "history -c").unwrap();
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_stats_views() {
        let mut state = ShellState::new();
        state.stats.record_command("ls");
        state.stats.record_command("ls");
        state.stats.record_command("cd");
        state.stats.record_error("x".repeat(60), "t");

        let summary = run_plain(&mut state, "stats");
        assert_eq!(summary[0], "Total commands:     3");
        assert_eq!(summary[1], "Most used command:  ls (2 times)");

        let commands = run_plain(&mut state, "stats -c");
        assert_eq!(commands[4], "ls:             2 times");
        assert_eq!(commands[5], "cd:             1 times");

        let errors = run_plain(&mut state, "stats -e");
        assert_eq!(errors[0], "Errors: 1");
        assert_eq!(errors[2], format!("1. {}...", "x".repeat(43)));

        let all = run_plain(&mut state, "stats -all");
        assert_eq!(all.len(), 8);
        assert_eq!(all[7], "Directories created:  0");

        assert_eq!(
            run(&mut state, "stats -z").unwrap_err().to_string(),
            "-z: invalid argument"
        );
    }

    #[test]
    fn test_reset_enters_confirmation() {
        let mut state = ShellState::new();
        let result = run(&mut state, "reset").unwrap();
        assert_eq!(result.mode, Some(SessionMode::ResetConfirm(ResetStep::First)));
        assert!(!result.output.is_empty());
    }

    #[test]
    fn test_alias_define_and_list() {
        let mut state = ShellState::new();
        assert_eq!(
            run_plain(&mut state, "alias gs='git status'"),
            vec!["alias gs='git status'"]
        );
        assert_eq!(state.aliases.get("gs"), Some("git status"));
        assert!(
            state
                .fs
                .read_file("/home/user/.bash_aliases")
                .unwrap()
                .contains("alias gs='git status'")
        );
        assert_eq!(run_plain(&mut state, "alias gs"), vec!["alias gs='git status'"]);
        assert_eq!(run_plain(&mut state, "alias nope"), vec!["alias: nope: not found"]);

        assert_eq!(
            run(&mut state, "alias ls='ls -a'").unwrap_err().to_string(),
            "cannot alias 'ls': command already exists"
        );
        assert_eq!(
            run(&mut state, "alias 9x=pwd").unwrap_err().to_string(),
            "invalid alias name '9x'"
        );
    }

    #[test]
    fn test_unalias() {
        let mut state = ShellState::new();
        assert_eq!(
            run_plain(&mut state, "unalias ll la zz"),
            vec!["unalias: zz: not found", "2 alias(es) removed"]
        );
        assert_eq!(state.aliases.get("ll"), None);
        run(&mut state, "unalias -a").unwrap();
        assert_eq!(run_plain(&mut state, "alias"), vec!["No aliases defined"]);
        assert!(run(&mut state, "unalias").is_err());
    }
}
