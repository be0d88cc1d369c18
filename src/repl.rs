//! Interactive prompt loop: one line per turn.

use crate::agents::Orchestrator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

pub const WELCOME: &str = "Welcome to the AI Assistant! Type 'exit' to quit.";
pub const PROMPT: &str = "Your query: ";
pub const GOODBYE: &str = "Exiting the assistant. Goodbye!";

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `exit`
    Exit,
    EndOfInput,
    TurnLimit,
}

/// True for `exit` in any case, surrounding whitespace ignored.
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Read lines from `reader` and answer each on `writer` until exit, EOF or the turn limit.
///
/// Blank lines are ignored and never reach the orchestrator.
pub async fn run_session<R, W>(
    orchestrator: &mut Orchestrator,
    reader: R,
    mut writer: W,
) -> std::io::Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    writer.write_all(format!("{}\n", WELCOME).as_bytes()).await?;

    let end = loop {
        if orchestrator.is_exhausted() {
            break SessionEnd::TurnLimit;
        }

        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break SessionEnd::EndOfInput;
        };
        if is_exit(&line) {
            break SessionEnd::Exit;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let outcome = orchestrator.handle_turn(input).await;
        writer
            .write_all(format!("Response: {}\n", outcome.render()).as_bytes())
            .await?;
    };

    if end != SessionEnd::EndOfInput {
        writer.write_all(format!("{}\n", GOODBYE).as_bytes()).await?;
    } else {
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;

    info!(end = ?end, turns = orchestrator.turns(), "Session ended");
    Ok(end)
}
