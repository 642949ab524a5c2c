//! User interaction for reconciliation decisions
//!
//! Reconcilers only consume resolved answers through the `PromptProvider`
//! trait, so the same workflow runs against a terminal, a non-interactive
//! default policy, or a scripted test harness.

use dialoguer::theme::SimpleTheme;
use dialoguer::{Confirm, Input, MultiSelect};
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// Error type for prompt operations
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt cancelled by user")]
    Cancelled,

    #[error("Non-interactive environment")]
    NonInteractive,

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("No scripted answer left for: {0}")]
    Exhausted(String),
}

/// Validator applied to free-text answers; `Err` carries the message shown
/// before asking again
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

/// Accepts every answer
pub fn accept_any(_: &str) -> Result<(), String> {
    Ok(())
}

/// Trait for collecting user decisions
///
/// Implementations must re-ask free-text input until `validate` accepts it;
/// invalid answers are never coerced.
pub trait PromptProvider: Send + Sync {
    /// Yes/no question
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Free-text input, validated
    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError>;

    /// Pick any number of `choices`; returns selected indices in ascending order
    fn multi_select(
        &self,
        message: &str,
        choices: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>, PromptError>;

    /// Whether a human is answering
    fn is_interactive(&self) -> bool;
}

// ============================================================================
// Terminal Prompts
// ============================================================================

/// Terminal prompts backed by `dialoguer`
#[derive(Debug, Default)]
pub struct TerminalPrompts;

impl TerminalPrompts {
    pub fn new() -> Self {
        Self
    }

    fn ensure_terminal(&self) -> Result<(), PromptError> {
        if atty_check() {
            Ok(())
        } else {
            Err(PromptError::NonInteractive)
        }
    }
}

impl PromptProvider for TerminalPrompts {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        self.ensure_terminal()?;
        Confirm::with_theme(&SimpleTheme)
            .with_prompt(message)
            .default(default)
            .interact_opt()
            .map_err(|e| PromptError::Terminal(e.to_string()))?
            .ok_or(PromptError::Cancelled)
    }

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        self.ensure_terminal()?;
        let mut input = Input::<String>::with_theme(&SimpleTheme)
            .with_prompt(message)
            .allow_empty(true)
            .validate_with(|answer: &String| validate(answer.trim()));
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        let answer = input
            .interact_text()
            .map_err(|e| PromptError::Terminal(e.to_string()))?;
        Ok(answer.trim().to_string())
    }

    fn multi_select(
        &self,
        message: &str,
        choices: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>, PromptError> {
        self.ensure_terminal()?;
        MultiSelect::with_theme(&SimpleTheme)
            .with_prompt(message)
            .items(choices)
            .defaults(defaults)
            .interact_opt()
            .map_err(|e| PromptError::Terminal(e.to_string()))?
            .ok_or(PromptError::Cancelled)
    }

    fn is_interactive(&self) -> bool {
        atty_check()
    }
}

// ============================================================================
// Auto Prompts (unattended runs)
// ============================================================================

/// Answers every prompt without asking
///
/// Confirmations take their default (or a fixed answer), inputs take their
/// default when it validates (or stay empty when nothing is required), and
/// multi-selects keep their default picks.
#[derive(Debug, Default)]
pub struct AutoPrompts {
    confirm_override: Option<bool>,
}

impl AutoPrompts {
    /// Take every default
    pub fn accept_defaults() -> Self {
        Self {
            confirm_override: None,
        }
    }

    /// Answer "no" to every confirmation
    pub fn decline_all() -> Self {
        Self {
            confirm_override: Some(false),
        }
    }
}

impl PromptProvider for AutoPrompts {
    fn confirm(&self, _message: &str, default: bool) -> Result<bool, PromptError> {
        Ok(self.confirm_override.unwrap_or(default))
    }

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        match default {
            Some(value) if validate(value).is_ok() => Ok(value.to_string()),
            None if validate("").is_ok() => Ok(String::new()),
            _ => {
                tracing::warn!(prompt = %message, "No usable default for unattended input");
                Err(PromptError::NonInteractive)
            }
        }
    }

    fn multi_select(
        &self,
        _message: &str,
        choices: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>, PromptError> {
        if self.confirm_override == Some(false) {
            return Ok(Vec::new());
        }
        Ok((0..choices.len())
            .filter(|i| defaults.get(*i).copied().unwrap_or(false))
            .collect())
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Scripted Prompts (for testing)
// ============================================================================

/// One scripted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Text(String),
    Select(Vec<usize>),
    /// Take whatever default the prompt offers
    Default,
}

impl Answer {
    pub fn yes() -> Self {
        Self::Confirm(true)
    }

    pub fn no() -> Self {
        Self::Confirm(false)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// Kind of prompt that was asked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Confirm,
    Input,
    MultiSelect,
}

/// A recorded prompt
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub kind: PromptKind,
    pub message: String,
    /// Answers the validator turned down before one was accepted
    pub rejected: Vec<String>,
}

/// Provider that replays queued answers and records every prompt
#[derive(Debug, Default)]
pub struct ScriptedPrompts {
    answers: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedPrompts {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Get all recorded prompts
    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, message: &str) -> Result<Answer, PromptError> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PromptError::Exhausted(message.to_string()))
    }

    fn record(&self, kind: PromptKind, message: &str, rejected: Vec<String>) {
        self.prompts.lock().unwrap().push(RecordedPrompt {
            kind,
            message: message.to_string(),
            rejected,
        });
    }

    fn mismatch(message: &str, answer: &Answer) -> PromptError {
        PromptError::Exhausted(format!("{} (got {:?})", message, answer))
    }
}

impl PromptProvider for ScriptedPrompts {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        self.record(PromptKind::Confirm, message, Vec::new());
        match self.next(message)? {
            Answer::Confirm(value) => Ok(value),
            Answer::Default => Ok(default),
            other => Err(Self::mismatch(message, &other)),
        }
    }

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        let mut rejected = Vec::new();
        let result = loop {
            let candidate = match self.next(message) {
                Ok(Answer::Text(text)) => text.trim().to_string(),
                Ok(Answer::Default) => default.unwrap_or_default().to_string(),
                Ok(other) => break Err(Self::mismatch(message, &other)),
                Err(e) => break Err(e),
            };
            match validate(&candidate) {
                Ok(()) => break Ok(candidate),
                Err(_) => rejected.push(candidate),
            }
        };
        self.record(PromptKind::Input, message, rejected);
        result
    }

    fn multi_select(
        &self,
        message: &str,
        choices: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>, PromptError> {
        self.record(PromptKind::MultiSelect, message, Vec::new());
        match self.next(message)? {
            Answer::Select(mut picks) => {
                picks.retain(|i| *i < choices.len());
                picks.sort_unstable();
                picks.dedup();
                Ok(picks)
            }
            Answer::Default => Ok((0..choices.len())
                .filter(|i| defaults.get(*i).copied().unwrap_or(false))
                .collect()),
            other => Err(Self::mismatch(message, &other)),
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if stdin and stderr (where prompts render) are connected to a terminal
fn atty_check() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: isatty is safe to call with any file descriptor
        unsafe {
            libc::isatty(std::io::stdin().as_raw_fd()) != 0
                && libc::isatty(std::io::stderr().as_raw_fd()) != 0
        }
    }

    #[cfg(not(unix))]
    {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_empty(s: &str) -> Result<(), String> {
        if s.is_empty() {
            Err("This value is required".to_string())
        } else {
            Ok(())
        }
    }

    #[test]
    fn test_auto_prompts() {
        let auto = AutoPrompts::accept_defaults();
        assert!(auto.confirm("Proceed?", true).unwrap());
        assert!(!auto.confirm("Proceed?", false).unwrap());
        assert_eq!(auto.input("Name", Some("x"), &non_empty).unwrap(), "x");
        assert!(matches!(
            auto.input("Name", None, &non_empty),
            Err(PromptError::NonInteractive)
        ));
        assert_eq!(auto.input("Nickname", None, &accept_any).unwrap(), "");
        assert!(matches!(
            auto.input("Name", Some(""), &non_empty),
            Err(PromptError::NonInteractive)
        ));

        let choices = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            auto.multi_select("Pick", &choices, &[false, true]).unwrap(),
            vec![1]
        );

        let decline = AutoPrompts::decline_all();
        assert!(!decline.confirm("Proceed?", true).unwrap());
        assert!(decline
            .multi_select("Pick", &choices, &[true, true])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_scripted_input_reasks_until_valid() {
        let prompts = ScriptedPrompts::new([Answer::text(""), Answer::text("  ok  ")]);
        let value = prompts.input("Value", None, &non_empty).unwrap();

        assert_eq!(value, "ok");
        let recorded = prompts.prompts();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, PromptKind::Input);
        assert_eq!(recorded[0].rejected, vec![String::new()]);
    }

    #[test]
    fn test_scripted_exhausted_and_mismatch() {
        let prompts = ScriptedPrompts::new([Answer::text("y")]);
        assert!(matches!(
            prompts.confirm("Proceed?", true),
            Err(PromptError::Exhausted(_))
        ));
        assert!(matches!(
            prompts.confirm("Again?", true),
            Err(PromptError::Exhausted(_))
        ));
        assert_eq!(prompts.prompt_count(), 2);
    }

    #[test]
    fn test_scripted_multi_select_filters_indices() {
        let prompts = ScriptedPrompts::new([Answer::Select(vec![3, 1, 1, 0]), Answer::Default]);
        let choices = vec!["a".to_string(), "b".to_string()];

        assert_eq!(
            prompts.multi_select("Pick", &choices, &[]).unwrap(),
            vec![0, 1]
        );
        assert_eq!(
            prompts.multi_select("Pick", &choices, &[true]).unwrap(),
            vec![0]
        );
        assert_eq!(prompts.remaining(), 0);
    }
}
