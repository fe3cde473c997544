//! Wire protocol: newline-terminated ASCII request frames and `STATUS
//! message` response frames (§4.7 of the design).

pub mod request;
pub mod response;

pub use request::{AuthLine, AuthParseError, Command, CommandParseError, parse_auth, parse_command};
pub use response::{Response, Status};
