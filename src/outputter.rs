use core::fmt;
use std::fmt::Display;

use console::style;
use flume::Receiver;

use crate::corpus::CorpusSource;
use crate::corpus::FallbackReason;
use crate::runner::Connectivity;
use crate::runner::ProbeEvent;
use crate::runner::StepOutcome;

const RULE_WIDTH: usize = 50;

pub struct OutPutter;

impl OutPutter {
    /// Prints events as they arrive until the runner drops its sender.
    pub async fn start(rx: Receiver<ProbeEvent>) {
        while let Ok(event) = rx.recv_async().await {
            println!("{event}");
        }
    }
}

fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

impl Display for ProbeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeEvent::Checking { url } => write!(
                f,
                "{}",
                style(format!("Checking connection to {url} ...")).bold().cyan()
            ),

            ProbeEvent::Connectivity(connectivity) => write!(f, "{connectivity}"),

            ProbeEvent::SweepStarted { source, count } => {
                rule(f)?;
                writeln!(f, "{}", style("Testing NLP microservice").bold())?;
                rule(f)?;
                if let CorpusSource::Fallback { path, reason } = source {
                    let notice = match reason {
                        FallbackReason::Missing => {
                            format!("File {} not found. Using sample texts.", path.display())
                        }
                        FallbackReason::Empty => {
                            format!("File {} is empty. Using sample texts.", path.display())
                        }
                        FallbackReason::Unreadable(err) => {
                            format!("Error reading file: {err}. Using sample texts.")
                        }
                    };
                    writeln!(f, "{} {}", style("⚠").yellow().bold(), style(notice).yellow())?;
                }
                write!(
                    f,
                    "{} Loaded {count} texts for processing",
                    style("✅").green()
                )
            }

            ProbeEvent::Step {
                index,
                total,
                report,
            } => {
                writeln!(f)?;
                writeln!(
                    f,
                    "{}",
                    style(format!("[{index}/{total}] {}:", report.endpoint.label)).bold()
                )?;
                write!(f, "   {}", report.outcome)
            }

            ProbeEvent::SweepFinished { base_url } => {
                let docs = base_url.join("docs").map_err(|_| fmt::Error)?;
                let redoc = base_url.join("redoc").map_err(|_| fmt::Error)?;

                writeln!(f)?;
                rule(f)?;
                writeln!(f, "For complete testing use:")?;
                writeln!(f, "  - Swagger UI: {docs}")?;
                writeln!(f, "  - ReDoc: {redoc}")?;
                write!(f, "{}", "=".repeat(RULE_WIDTH))
            }
        }
    }
}

impl Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Healthy { message } => {
                write!(f, "{} {}", style("✅").green(), style("Server is up!").green().bold())?;
                if let Some(message) = message {
                    write!(f, "\nMessage: {message}")?;
                }
                Ok(())
            }
            Connectivity::Unhealthy { status } => write!(
                f,
                "{} Server returned status {}",
                style("❌").red(),
                style(status.as_u16()).red().bold()
            ),
            Connectivity::Refused {
                port,
                start_command,
            } => {
                writeln!(
                    f,
                    "{} {}",
                    style("❌").red(),
                    style("Cannot connect to the server").red().bold()
                )?;
                writeln!(f)?;
                writeln!(f, "Make sure that:")?;
                writeln!(f, "1. The server is running on port {port}")?;
                writeln!(f, "2. It was started with:")?;
                write!(f, "   {}", style(start_command).yellow())
            }
            Connectivity::TimedOut(after) => write!(
                f,
                "{} Connection to the server timed out after {after:?}",
                style("❌").red()
            ),
            Connectivity::Unknown(err) => {
                write!(f, "{} Unknown error: {err}", style("❌").red())
            }
        }
    }
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Passed(summary) => write!(f, "{} {summary}", style("✅").green()),
            StepOutcome::HttpError { status, body } => write!(
                f,
                "{} Error {}: {body}",
                style("❌").red(),
                style(status.as_u16()).red().bold()
            ),
            StepOutcome::Transport(err) => {
                write!(f, "{} Connection error: {err}", style("❌").red())
            }
            StepOutcome::UnexpectedBody(message) => {
                write!(f, "{} Unexpected response: {message}", style("❌").red())
            }
        }
    }
}
