//! Request frame parsing.
//!
//! Parsing is tolerant: tokens are split on arbitrary whitespace runs, the
//! way the original C implementation's `sscanf("%s")` calls are. Every
//! command line is matched on its leading verb before the rest of the line
//! is tokenized.

use thiserror::Error;

/// Maximum accepted length for an `AUTH` token, mirroring the server-wide cap.
pub const MAX_TOKEN_LEN: usize = 127;

/// A parsed `AUTH <token>` line.
#[derive(Debug)]
pub struct AuthLine<'a> {
    /// The token as presented on the wire, unvalidated against the server secret.
    pub token: &'a str,
}

/// Failure to parse the leading `AUTH` line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthParseError {
    /// The line did not start with the `AUTH` verb at all.
    #[error("auth required")]
    Missing,
    /// The line started with `AUTH` but had no token, or the token is too long.
    #[error("invalid auth format")]
    Malformed,
}

/// Parses the first line of a connection, which must be `AUTH <token>`.
pub fn parse_auth(line: &str) -> Result<AuthLine<'_>, AuthParseError> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("AUTH") => {}
        _ => return Err(AuthParseError::Missing),
    }
    let token = parts.next().ok_or(AuthParseError::Malformed)?;
    if token.len() > MAX_TOKEN_LEN {
        return Err(AuthParseError::Malformed);
    }
    Ok(AuthLine { token })
}

/// A parsed client command, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `UPLOAD <name> <size>` — `size` is the declared payload length in bytes.
    Upload { name: String, size: u64 },
    /// `DOWNLOAD <name>`.
    Download { name: String },
    /// `LIST [user]` — `user` scopes the listing to one user's subdirectory.
    List { user: Option<String> },
    /// `DELETE <name>`.
    Delete { name: String },
    /// `LOCKS` — no arguments.
    Locks,
    /// `LOGS` — no arguments.
    Logs,
}

impl Command {
    /// The verb this command dispatches as, for logging/tracing.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Upload { .. } => "UPLOAD",
            Command::Download { .. } => "DOWNLOAD",
            Command::List { .. } => "LIST",
            Command::Delete { .. } => "DELETE",
            Command::Locks => "LOCKS",
            Command::Logs => "LOGS",
        }
    }
}

/// Failure to parse a command line after authentication.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    /// The verb itself is not recognised.
    #[error("unknown command")]
    Unknown,
    /// The verb is recognised but its arguments are malformed.
    #[error("invalid {verb} command format")]
    InvalidFormat {
        /// The verb whose arguments failed to parse.
        verb: &'static str,
    },
}

/// Parses a post-auth command line into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, CommandParseError> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or(CommandParseError::Unknown)?;

    match verb {
        "UPLOAD" => {
            let name = parts
                .next()
                .ok_or(CommandParseError::InvalidFormat { verb: "UPLOAD" })?;
            let size: u64 = parts
                .next()
                .ok_or(CommandParseError::InvalidFormat { verb: "UPLOAD" })?
                .parse()
                .map_err(|_| CommandParseError::InvalidFormat { verb: "UPLOAD" })?;
            Ok(Command::Upload {
                name: name.to_string(),
                size,
            })
        }
        "DOWNLOAD" => {
            let name = parts
                .next()
                .ok_or(CommandParseError::InvalidFormat { verb: "DOWNLOAD" })?;
            Ok(Command::Download {
                name: name.to_string(),
            })
        }
        "LIST" => Ok(Command::List {
            user: parts.next().map(str::to_string),
        }),
        "DELETE" => {
            let name = parts
                .next()
                .ok_or(CommandParseError::InvalidFormat { verb: "DELETE" })?;
            Ok(Command::Delete {
                name: name.to_string(),
            })
        }
        "LOCKS" => Ok(Command::Locks),
        "LOGS" => Ok(Command::Logs),
        _ => Err(CommandParseError::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth_line() {
        let auth = parse_auth("AUTH secret-token").unwrap();
        assert_eq!(auth.token, "secret-token");
    }

    #[test]
    fn rejects_missing_auth_verb() {
        assert_eq!(parse_auth("UPLOAD a 5").unwrap_err(), AuthParseError::Missing);
    }

    #[test]
    fn rejects_auth_with_no_token() {
        assert_eq!(parse_auth("AUTH").unwrap_err(), AuthParseError::Malformed);
    }

    #[test]
    fn parses_upload_command() {
        let cmd = parse_command("UPLOAD alice/note 12").unwrap();
        assert_eq!(
            cmd,
            Command::Upload {
                name: "alice/note".to_string(),
                size: 12
            }
        );
    }

    #[test]
    fn parses_list_without_user() {
        assert_eq!(parse_command("LIST").unwrap(), Command::List { user: None });
    }

    #[test]
    fn parses_list_with_user() {
        assert_eq!(
            parse_command("LIST alice").unwrap(),
            Command::List {
                user: Some("alice".to_string())
            }
        );
    }

    #[test]
    fn rejects_unknown_verb() {
        assert_eq!(
            parse_command("FROBNICATE x").unwrap_err(),
            CommandParseError::Unknown
        );
    }

    #[test]
    fn rejects_malformed_upload() {
        assert!(matches!(
            parse_command("UPLOAD onlyname").unwrap_err(),
            CommandParseError::InvalidFormat { verb: "UPLOAD" }
        ));
    }

    #[test]
    fn tolerates_excess_whitespace() {
        let cmd = parse_command("UPLOAD   alice/note    12").unwrap();
        assert_eq!(
            cmd,
            Command::Upload {
                name: "alice/note".to_string(),
                size: 12
            }
        );
    }
}
