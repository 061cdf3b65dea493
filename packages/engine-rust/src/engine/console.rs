//! Operator-facing I/O.
//!
//! Reports and the run summary go to stdout (as text or JSON lines); prompts
//! and notices go to stderr so stdout stays machine-readable in JSON mode.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

use super::orchestrator::RunSummary;
use super::reporter::MatchReport;

/// Where the engine sends previews and summaries and reads confirmations from.
#[async_trait]
pub trait Console: Send {
    /// Displays one collection's match report.
    async fn show(&mut self, report: &MatchReport) -> anyhow::Result<()>;

    /// Displays an informational line.
    async fn notice(&mut self, message: &str) -> anyhow::Result<()>;

    /// Prints `prompt` and reads one line. `None` means input was closed or
    /// could not be read.
    async fn confirm(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;

    /// Displays the end-of-run summary.
    async fn summary(&mut self, summary: &RunSummary) -> anyhow::Result<()>;
}

/// Console on the process's standard streams.
pub struct TerminalConsole {
    json: bool,
    stdin: BufReader<Stdin>,
}

impl TerminalConsole {
    #[must_use]
    pub fn new(json: bool) -> Self {
        Self {
            json,
            stdin: BufReader::new(tokio::io::stdin()),
        }
    }

    async fn stdout_line(line: &str) -> anyhow::Result<()> {
        let mut out = tokio::io::stdout();
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }

    async fn stderr(text: &str) -> anyhow::Result<()> {
        let mut err = tokio::io::stderr();
        err.write_all(text.as_bytes()).await?;
        err.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn show(&mut self, report: &MatchReport) -> anyhow::Result<()> {
        let line = if self.json {
            serde_json::to_string(report)?
        } else {
            report.to_string()
        };
        Self::stdout_line(&line).await
    }

    async fn notice(&mut self, message: &str) -> anyhow::Result<()> {
        Self::stderr(&format!("{message}\n")).await
    }

    async fn confirm(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        Self::stderr(prompt).await?;
        let mut buf = Vec::new();
        let read = self.stdin.read_until(b'\n', &mut buf).await;
        Ok(decode_answer(read, &buf))
    }

    async fn summary(&mut self, summary: &RunSummary) -> anyhow::Result<()> {
        let line = if self.json {
            serde_json::to_string(summary)?
        } else {
            summary.to_string()
        };
        Self::stdout_line(&line).await
    }
}

/// Turns one raw line of input into an answer. Undecodable bytes are
/// replaced rather than rejected; a read error counts as closed input.
fn decode_answer(read: std::io::Result<usize>, buf: &[u8]) -> Option<String> {
    match read {
        Ok(0) => None,
        Ok(_) => Some(String::from_utf8_lossy(buf).into_owned()),
        Err(e) => {
            tracing::warn!(error = %e, "confirmation input unreadable, treating as no");
            None
        }
    }
}

/// In-memory console that answers prompts from a queue and records
/// everything it is shown.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    hang_on_confirm: bool,
    fail_when_exhausted: bool,
    pub reports: Vec<MatchReport>,
    pub notices: Vec<String>,
    pub prompts: Vec<String>,
    pub summaries: Vec<RunSummary>,
}

impl ScriptedConsole {
    /// Answers prompts with `answers` in order, then behaves as closed input.
    #[must_use]
    pub fn answering<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Answers prompts with `answers` in order, then fails every later one.
    #[must_use]
    pub fn failing_after<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fail_when_exhausted: true,
            ..Self::answering(answers)
        }
    }

    /// Never answers a prompt.
    #[must_use]
    pub fn hanging() -> Self {
        Self {
            hang_on_confirm: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn show(&mut self, report: &MatchReport) -> anyhow::Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    async fn notice(&mut self, message: &str) -> anyhow::Result<()> {
        self.notices.push(message.to_string());
        Ok(())
    }

    async fn confirm(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        if self.hang_on_confirm {
            std::future::pending::<()>().await;
        }
        match self.answers.pop_front() {
            None if self.fail_when_exhausted => anyhow::bail!("input stream broken"),
            answer => Ok(answer),
        }
    }

    async fn summary(&mut self, summary: &RunSummary) -> anyhow::Result<()> {
        self.summaries.push(summary.clone());
        Ok(())
    }
}
