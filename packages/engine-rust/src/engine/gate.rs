//! Confirmation gate between a preview and a destructive delete.
//!
//! State machine:
//!
//! ```text
//! Preview ─┬─> NothingToDo                       (zero matches)
//!          ├─> DryRunExit                        (dry run)
//!          ├─> ConfirmedAndDelaying              (--yes)
//!          └─> AwaitingConfirmation ─┬─> Cancelled
//!                                    ├─> Interrupted
//!                                    └─> ConfirmedAndDelaying ─┬─> Proceed
//!                                                              └─> Interrupted
//! ```

use std::time::Duration;

use super::abort::AbortSignal;
use super::console::Console;
use super::error::EngineError;
use super::reporter::MatchReport;

/// Gate states. See the module docs for the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Preview,
    NothingToDo,
    DryRunExit,
    AwaitingConfirmation,
    Cancelled,
    ConfirmedAndDelaying,
    Proceed,
    Interrupted,
}

impl GateState {
    /// The outcome for terminal states, `None` for states that transition on.
    #[must_use]
    pub fn outcome(self) -> Option<GateOutcome> {
        match self {
            Self::NothingToDo => Some(GateOutcome::NothingToDo),
            Self::DryRunExit => Some(GateOutcome::DryRun),
            Self::Cancelled => Some(GateOutcome::Cancelled),
            Self::Proceed => Some(GateOutcome::Proceed),
            Self::Interrupted => Some(GateOutcome::Interrupted),
            Self::Preview | Self::AwaitingConfirmation | Self::ConfirmedAndDelaying => None,
        }
    }
}

/// Where the gate came to rest. Only `Proceed` permits deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    NothingToDo,
    DryRun,
    Cancelled,
    Proceed,
    Interrupted,
}

/// Mode flags for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    pub dry_run: bool,
    /// Skip the interactive prompt.
    pub assume_yes: bool,
}

pub struct ConfirmationGate {
    grace_period: Duration,
    abort: AbortSignal,
}

impl ConfirmationGate {
    #[must_use]
    pub fn new(grace_period: Duration, abort: AbortSignal) -> Self {
        Self {
            grace_period,
            abort,
        }
    }

    /// Walks the state machine for one collection's report.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Console`] if the prompt cannot be written or
    /// the answer cannot be read.
    pub async fn decide<C>(
        &self,
        report: &MatchReport,
        mode: RunMode,
        console: &mut C,
    ) -> Result<GateOutcome, EngineError>
    where
        C: Console + ?Sized,
    {
        let mut state = GateState::Preview;
        loop {
            if let Some(outcome) = state.outcome() {
                return Ok(outcome);
            }
            let next = self.step(state, report, mode, console).await?;
            tracing::debug!(
                collection = %report.collection,
                from = ?state,
                to = ?next,
                "gate transition"
            );
            state = next;
        }
    }

    async fn step<C>(
        &self,
        state: GateState,
        report: &MatchReport,
        mode: RunMode,
        console: &mut C,
    ) -> Result<GateState, EngineError>
    where
        C: Console + ?Sized,
    {
        let next = match state {
            GateState::Preview if self.abort.is_aborted() => GateState::Interrupted,
            GateState::Preview if report.total == 0 => GateState::NothingToDo,
            GateState::Preview if mode.dry_run => GateState::DryRunExit,
            GateState::Preview if mode.assume_yes => GateState::ConfirmedAndDelaying,
            GateState::Preview => GateState::AwaitingConfirmation,
            GateState::AwaitingConfirmation => {
                let prompt = format!(
                    "Delete {} document(s) from {}? Type 'yes' to continue: ",
                    report.total, report.collection
                );
                tokio::select! {
                    biased;
                    () = self.abort.aborted() => GateState::Interrupted,
                    answer = console.confirm(&prompt) => {
                        match answer.map_err(EngineError::Console)? {
                            Some(line) if is_confirmation(&line) => GateState::ConfirmedAndDelaying,
                            _ => GateState::Cancelled,
                        }
                    }
                }
            }
            GateState::ConfirmedAndDelaying => {
                if !self.grace_period.is_zero() {
                    console
                        .notice(&format!(
                            "Deleting from {} in {}s, press Ctrl-C to abort",
                            report.collection,
                            self.grace_period.as_secs()
                        ))
                        .await
                        .map_err(EngineError::Console)?;
                }
                tokio::select! {
                    biased;
                    () = self.abort.aborted() => GateState::Interrupted,
                    () = tokio::time::sleep(self.grace_period) => GateState::Proceed,
                }
            }
            terminal => terminal,
        };
        Ok(next)
    }
}

/// `yes` in any case, ignoring the trailing line ending only.
fn is_confirmation(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::abort::AbortController;
    use crate::engine::console::ScriptedConsole;

    const GRACE: Duration = Duration::from_secs(5);

    fn report(total: usize) -> MatchReport {
        MatchReport {
            collection: "notes".into(),
            total,
            degraded: false,
            preview: Vec::new(),
        }
    }

    fn live() -> RunMode {
        RunMode::default()
    }

    #[tokio::test]
    async fn zero_matches_never_prompts() {
        let gate = ConfirmationGate::new(GRACE, AbortSignal::never());
        for mode in [live(), RunMode { dry_run: true, assume_yes: false }] {
            let mut console = ScriptedConsole::answering(["yes"]);
            let outcome = gate.decide(&report(0), mode, &mut console).await.unwrap();
            assert_eq!(outcome, GateOutcome::NothingToDo);
            assert!(console.prompts.is_empty());
        }
    }

    #[tokio::test]
    async fn dry_run_exits_even_with_assume_yes() {
        let gate = ConfirmationGate::new(GRACE, AbortSignal::never());
        let mut console = ScriptedConsole::default();
        let mode = RunMode {
            dry_run: true,
            assume_yes: true,
        };
        let outcome = gate.decide(&report(3), mode, &mut console).await.unwrap();
        assert_eq!(outcome, GateOutcome::DryRun);
        assert!(console.prompts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typed_yes_proceeds_after_grace_period() {
        let gate = ConfirmationGate::new(GRACE, AbortSignal::never());
        let mut console = ScriptedConsole::answering(["YES\r\n"]);

        let started = tokio::time::Instant::now();
        let outcome = gate.decide(&report(3), live(), &mut console).await.unwrap();

        assert_eq!(outcome, GateOutcome::Proceed);
        assert!(started.elapsed() >= GRACE);
        assert_eq!(console.prompts.len(), 1);
        assert_eq!(console.notices.len(), 1);
    }

    #[tokio::test]
    async fn anything_but_yes_cancels() {
        let gate = ConfirmationGate::new(GRACE, AbortSignal::never());
        for answer in ["y\n", "\n", "no\n", " yes\n", "yess\n"] {
            let mut console = ScriptedConsole::answering([answer]);
            let outcome = gate.decide(&report(3), live(), &mut console).await.unwrap();
            assert_eq!(outcome, GateOutcome::Cancelled, "{answer:?}");
            assert_eq!(console.prompts.len(), 1);
        }
    }

    #[tokio::test]
    async fn closed_input_cancels() {
        let gate = ConfirmationGate::new(GRACE, AbortSignal::never());
        let mut console = ScriptedConsole::default();
        let outcome = gate.decide(&report(3), live(), &mut console).await.unwrap();
        assert_eq!(outcome, GateOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn assume_yes_skips_prompt_but_keeps_grace() {
        let gate = ConfirmationGate::new(GRACE, AbortSignal::never());
        let mut console = ScriptedConsole::default();
        let mode = RunMode {
            dry_run: false,
            assume_yes: true,
        };

        let started = tokio::time::Instant::now();
        let outcome = gate.decide(&report(3), mode, &mut console).await.unwrap();

        assert_eq!(outcome, GateOutcome::Proceed);
        assert!(console.prompts.is_empty());
        assert!(started.elapsed() >= GRACE);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_during_grace_interrupts() {
        let controller = AbortController::new();
        let gate = ConfirmationGate::new(GRACE, controller.signal());
        let mut console = ScriptedConsole::default();
        let mode = RunMode {
            dry_run: false,
            assume_yes: true,
        };

        let rep = report(3);
        let decide = gate.decide(&rep, mode, &mut console);
        let trigger = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            controller.trigger();
        };
        let (outcome, ()) = tokio::join!(decide, trigger);
        assert_eq!(outcome.unwrap(), GateOutcome::Interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_while_prompting_interrupts() {
        let controller = AbortController::new();
        let gate = ConfirmationGate::new(GRACE, controller.signal());
        let mut console = ScriptedConsole::hanging();

        let rep = report(3);
        let decide = gate.decide(&rep, live(), &mut console);
        let trigger = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            controller.trigger();
        };
        let (outcome, ()) = tokio::join!(decide, trigger);
        assert_eq!(outcome.unwrap(), GateOutcome::Interrupted);
    }

    #[tokio::test]
    async fn already_aborted_run_never_prompts() {
        let controller = AbortController::new();
        controller.trigger();
        let gate = ConfirmationGate::new(GRACE, controller.signal());
        let mut console = ScriptedConsole::answering(["yes"]);

        let outcome = gate.decide(&report(3), live(), &mut console).await.unwrap();
        assert_eq!(outcome, GateOutcome::Interrupted);
        assert!(console.prompts.is_empty());
    }

    #[test]
    fn only_terminal_states_have_outcomes() {
        assert_eq!(GateState::Preview.outcome(), None);
        assert_eq!(GateState::AwaitingConfirmation.outcome(), None);
        assert_eq!(GateState::ConfirmedAndDelaying.outcome(), None);
        assert_eq!(GateState::DryRunExit.outcome(), Some(GateOutcome::DryRun));
        assert_eq!(GateState::Proceed.outcome(), Some(GateOutcome::Proceed));
    }
}
