use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use domain::printer::{Alignment, PrinterCommand};
use domain::{PrintError, PrintJob, StyleHint};

use crate::connection::ConnectionManager;

/// Lines fed before the cut so the last printed line clears the blade
const FEED_BEFORE_CUT: u8 = 3;

/// Runs one deadline-bounded print (or probe) against the managed handle.
///
/// Every call resets the connection manager when it finishes, whatever the
/// outcome, so the next job starts from a fresh handle.
pub struct PrintExecutor {
    manager: Arc<ConnectionManager>,
    settle_delay: Duration,
}

impl PrintExecutor {
    pub fn new(manager: Arc<ConnectionManager>, settle_delay: Duration) -> Self {
        Self {
            manager,
            settle_delay,
        }
    }

    /// Print a job: acquire, open, emit, cut, close, settle.
    pub async fn execute(&self, job: &PrintJob, deadline: Duration) -> Result<(), PrintError> {
        let commands = emission_commands(job);
        let outcome = timeout(deadline, self.print_sequence(&commands)).await;
        self.finish(outcome, deadline, "print").await?;
        info!(lines = job.len(), "Print job completed");
        Ok(())
    }

    /// Connectivity check: acquire, open, close.
    pub async fn probe(&self, deadline: Duration) -> Result<(), PrintError> {
        let outcome = timeout(deadline, self.probe_sequence()).await;
        self.finish(outcome, deadline, "probe").await
    }

    async fn finish(
        &self,
        outcome: Result<Result<(), PrintError>, tokio::time::error::Elapsed>,
        deadline: Duration,
        operation: &'static str,
    ) -> Result<(), PrintError> {
        // The sequence future is dropped on expiry, leaving its channel open
        // for the reset to close
        self.manager.reset().await;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Printer operation failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    operation,
                    deadline_ms = deadline.as_millis() as u64,
                    "Printer operation exceeded deadline"
                );
                Err(PrintError::Timeout(deadline))
            }
        }
    }

    async fn print_sequence(&self, commands: &[PrinterCommand]) -> Result<(), PrintError> {
        {
            let session = self.manager.session().await?;
            let mut channel = session.channel().await;
            channel.open().await?;
            debug!(
                handle_id = session.handle().id(),
                commands = commands.len(),
                "Emitting commands"
            );
            channel.send(commands).await?;
            channel.close().await?;
        }
        sleep(self.settle_delay).await;
        Ok(())
    }

    async fn probe_sequence(&self) -> Result<(), PrintError> {
        let session = self.manager.session().await?;
        let mut channel = session.channel().await;
        channel.open().await?;
        channel.close().await?;
        let handle = session.handle();
        debug!(handle_id = handle.id(), device = %handle.label(), "Printer probe succeeded");
        Ok(())
    }
}

/// Translate a formatted job into the printer command stream.
///
/// Centered lines switch alignment, emphasized lines are wrapped in bold
/// on/off, and the stream ends with a feed and a cut.
pub fn emission_commands(job: &PrintJob) -> Vec<PrinterCommand> {
    let mut commands = Vec::with_capacity(job.len() * 2 + 3);
    commands.push(PrinterCommand::Initialize);

    let mut alignment = Alignment::Left;
    for line in job.lines() {
        let wanted = match line.style {
            StyleHint::Centered => Alignment::Center,
            StyleHint::Normal | StyleHint::Emphasized => Alignment::Left,
        };
        if wanted != alignment {
            commands.push(PrinterCommand::Align(wanted));
            alignment = wanted;
        }

        if line.style == StyleHint::Emphasized {
            commands.push(PrinterCommand::Bold(true));
            commands.push(PrinterCommand::text(line.text.as_str()));
            commands.push(PrinterCommand::Bold(false));
        } else {
            commands.push(PrinterCommand::text(line.text.as_str()));
        }
    }

    if alignment != Alignment::Left {
        commands.push(PrinterCommand::Align(Alignment::Left));
    }
    commands.push(PrinterCommand::Feed(FEED_BEFORE_CUT));
    commands.push(PrinterCommand::Cut);
    commands
}
