use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::chat::ChatSession;
use crate::completion::Completer;
use crate::config::RemoteErrorPolicy;
use crate::model::Message;

/// Exact, case-sensitive line that ends the session.
pub const QUIT_COMMAND: &str = "quit";

const BANNER: &str = "Starting the conversation. Type 'quit' to exit.";
const HELP: &str = "Commands: '/history' shows the conversation, '/reset' clears it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Quit,
    EndOfInput,
    Aborted,
}

impl LoopExit {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

pub async fn run_repl<C, R, W>(
    session: &mut ChatSession<C>,
    on_remote_error: RemoteErrorPolicy,
    mut input: R,
    output: &mut W,
) -> Result<LoopExit>
where
    C: Completer,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{BANNER}").context("Failed to write to stdout")?;
    writeln!(output, "{HELP}\n").context("Failed to write to stdout")?;

    loop {
        write!(output, "You: ").context("Failed to write to stdout")?;
        output.flush().context("Failed to flush stdout")?;

        let mut raw = Vec::new();
        let read = input
            .read_until(b'\n', &mut raw)
            .context("Failed to read stdin")?;
        if read == 0 {
            info!("end of input; leaving chat loop");
            writeln!(output).context("Failed to write to stdout")?;
            return Ok(LoopExit::EndOfInput);
        }

        let raw = match String::from_utf8(raw) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "ignoring input line that is not valid UTF-8");
                writeln!(output, "Error: input was not valid UTF-8; line ignored\n")
                    .context("Failed to write to stdout")?;
                continue;
            }
        };

        let line = raw.trim_end_matches(['\n', '\r']);
        if line == QUIT_COMMAND {
            info!(turns = session.conversation().len() / 2, "quit requested");
            return Ok(LoopExit::Quit);
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command == "/reset" {
            session.reset();
            writeln!(output, "conversation reset\n").context("Failed to write to stdout")?;
            continue;
        }
        if command == "/history" {
            print_history(output, session.conversation().messages())?;
            continue;
        }

        match session.send(line).await {
            Ok(reply) => {
                writeln!(output, "AI: {}\n", reply.trim())
                    .context("Failed to write to stdout")?;
            }
            Err(err) => {
                writeln!(output, "Error: {err}\n").context("Failed to write to stdout")?;
                if on_remote_error == RemoteErrorPolicy::Abort {
                    warn!(error = %err, "aborting chat loop after failed turn");
                    return Ok(LoopExit::Aborted);
                }
            }
        }
    }
}

fn print_history<W: Write>(output: &mut W, history: &[Message]) -> Result<()> {
    if history.is_empty() {
        writeln!(output, "(history is empty)\n").context("Failed to write to stdout")?;
        return Ok(());
    }

    for (idx, msg) in history.iter().enumerate() {
        writeln!(output, "[{}] {}: {}", idx, msg.role.as_str(), msg.content)
            .context("Failed to write to stdout")?;
    }
    writeln!(output).context("Failed to write to stdout")?;
    Ok(())
}
