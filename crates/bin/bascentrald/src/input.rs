//! Console stand-in for the board buttons.
//!
//! Each line on stdin is one button press: an empty line, `r` or `read`
//! presses the configured read button, a number presses that button.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use bascentral_app::input::ButtonEdge;

/// Parse one console line into a press edge.
#[must_use]
pub fn parse_line(line: &str, read_button: u8) -> Option<ButtonEdge> {
    match line.trim() {
        "" | "r" | "read" => Some(ButtonEdge::pressed(read_button)),
        other => match other.parse::<u8>() {
            Ok(button @ 1..=32) => Some(ButtonEdge::pressed(button)),
            _ => None,
        },
    }
}

/// Forward presses read from `reader` until it ends or the receiver is gone.
pub async fn forward_lines<R>(reader: R, read_button: u8, edges: mpsc::Sender<ButtonEdge>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "failed to read console input");
                break;
            }
        };
        let Some(edge) = parse_line(&line, read_button) else {
            tracing::warn!(input = %line.trim(), "expected a button number or 'read'");
            continue;
        };
        if edges.send(edge).await.is_err() {
            break;
        }
        // Release right away so the next press is an edge again.
        if edges
            .send(ButtonEdge {
                state: 0,
                changed: edge.changed,
            })
            .await
            .is_err()
        {
            break;
        }
    }
    tracing::debug!("console input closed");
}
