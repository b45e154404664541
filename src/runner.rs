//! Per-device command execution and transcript assembly

use confsnap_session::{CommandError, DeviceSession};

/// Ordered command/output record for one device
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<(String, String)>,
}

impl Transcript {
    /// Append one command's raw output
    pub fn push(&mut self, command: impl Into<String>, output: impl Into<String>) {
        self.entries.push((command.into(), output.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Render with the on-disk delimiter convention
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (command, output) in &self.entries {
            out.push_str(&format!("\n\n<------ {} ----->\n", command));
            out.push_str(output);
        }
        out
    }
}

/// Run every command in order on an open session.
///
/// The first failing command aborts the rest and fails the whole device;
/// the partial transcript is dropped with the error and can never be
/// persisted.
pub async fn run_commands<S: DeviceSession>(
    session: &mut S,
    commands: &[String],
) -> Result<Transcript, CommandError> {
    let mut transcript = Transcript::default();
    for command in commands {
        let output = session.run_command(command).await?;
        transcript.push(command.clone(), output);
    }
    Ok(transcript)
}
