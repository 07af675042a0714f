use crate::error::Error;

/// Marker a relay puts in front of the nickname it forwards.
pub const RELAY_MARKER: char = '*';

const PM_COMMAND: &str = "/pm";
const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Broadcast { body: String },
    PrivateMessage { target: String, body: String },
    Disconnect,
}

/// Turns the first payload of a connection into the nickname to register.
/// Relay markers are dropped wherever they appear.
pub fn parse_handshake(raw: &str) -> Result<String, Error> {
    let nick: String = raw
        .trim()
        .chars()
        .filter(|c| *c != RELAY_MARKER)
        .collect();
    let nick = nick.trim();

    if nick.is_empty() {
        return Err(Error::HandshakeRejected);
    }

    Ok(nick.to_string())
}

/// Classifies one inbound line. Blank lines yield `Ok(None)`.
pub fn parse_line(raw: &str) -> Result<Option<Command>, Error> {
    let line = raw.trim();

    if line.is_empty() {
        return Ok(None);
    }

    if line.eq_ignore_ascii_case(EXIT_COMMAND) {
        return Ok(Some(Command::Disconnect));
    }

    let (first, rest) = split_word(line);
    if first.eq_ignore_ascii_case(PM_COMMAND) {
        return parse_pm(rest).map(Some);
    }

    if let Some(mention) = line.strip_prefix('@') {
        if let Some((target, body)) = mention.split_once(':') {
            let target = target.trim();
            if target.is_empty() || target.contains(char::is_whitespace) {
                return Err(Error::InvalidPrivateMessage);
            }

            return Ok(Some(Command::PrivateMessage {
                target: target.to_string(),
                body: body.trim().to_string(),
            }));
        }
    }

    Ok(Some(Command::Broadcast {
        body: line.to_string(),
    }))
}

fn parse_pm(params: &str) -> Result<Command, Error> {
    let (target, body) = split_word(params);

    if target.is_empty() || body.is_empty() {
        return Err(Error::PmUsage);
    }

    Ok(Command::PrivateMessage {
        target: target.to_string(),
        body: body.to_string(),
    })
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}
