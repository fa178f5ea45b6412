use crossbeam_channel::Sender;
use overlay_core::ChatMessage;
use std::{
    io::{self, BufRead},
    thread,
};

/// Parses `author: text`. Lines without an author are attributed to `chat`.
pub fn parse_line(line: &str) -> Option<ChatMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(':') {
        Some((author, text)) if !author.trim().is_empty() && !author.contains(' ') => {
            Some(ChatMessage::new(author.trim(), text.trim()))
        }
        _ => Some(ChatMessage::new("chat", line)),
    }
}

/// Reads chat lines from stdin on a background thread. The render loop is
/// never blocked; lines arriving while the channel is full are dropped.
pub fn spawn_stdin_feed(tx: Sender<ChatMessage>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(error = %e, "Chat feed read error");
                    break;
                }
            };
            let Some(msg) = parse_line(&line) else {
                continue;
            };
            if tx.try_send(msg).is_err() {
                tracing::debug!("Dropped chat line (render loop busy)");
            }
        }
        tracing::info!("Chat feed closed");
    })
}
