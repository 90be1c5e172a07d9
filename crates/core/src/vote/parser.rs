//! Chat line parsing.
//!
//! The chat protocol is line oriented; each inbound line is either a server
//! keep-alive probe, a chat message, or noise. Vote extraction from a
//! message body is a separate pure function so the pattern is independently
//! testable.

use regex_lite::Regex;
use std::sync::OnceLock;

/// A classified inbound chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    /// Server keep-alive; must be answered with the same payload.
    Ping(String),
    /// A chat message from a named sender.
    Message { sender: String, body: String },
    /// Anything else. Logged and ignored, never fatal.
    Unrecognized,
}

fn privmsg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^:([^!\s]+)![^\s]+\s+PRIVMSG\s+#\S+\s+:(.*)$")
            .expect("invalid PRIVMSG pattern")
    })
}

fn vote_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^!v(?:ote)?\s*(\d{1,3})$").expect("invalid vote pattern"))
}

/// Classify one raw chat line.
pub fn parse_chat_line(line: &str) -> ChatLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(payload) = line.strip_prefix("PING ") {
        return ChatLine::Ping(payload.to_string());
    }
    if line == "PING" {
        return ChatLine::Ping(String::new());
    }

    if let Some(caps) = privmsg_regex().captures(line) {
        return ChatLine::Message {
            sender: caps[1].to_string(),
            body: caps[2].trim().to_string(),
        };
    }

    ChatLine::Unrecognized
}

/// Extract a vote from a message body.
///
/// Accepts `!v<N>` and `!vote <N>`; only values in `[1, num_options]` count.
pub fn parse_vote(body: &str, num_options: u32) -> Option<u32> {
    let caps = vote_regex().captures(body.trim())?;
    let value: u32 = caps[1].parse().ok()?;
    if (1..=num_options).contains(&value) {
        Some(value)
    } else {
        None
    }
}
