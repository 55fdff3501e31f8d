//! Request decoding.
//!
//! Wire format: `<protocol-name> <version> <command> <argument...>`, fields
//! separated by runs of ASCII whitespace. The argument is whatever follows
//! the third separator run, trimmed of whitespace and NUL bytes.

use crate::error::ParseError;

/// Protocol name expected in the first field.
pub const PROTOCOL_NAME: &str = "PTDP";

/// Protocol version expected in the second field.
pub const PROTOCOL_VERSION: &str = "v1";

/// Separator between the two identifiers of a dual-argument command.
pub const TUPLE_SEPARATOR: char = ';';

/// Minimum argument length for commands that take one.
const MIN_ARGUMENT_LEN: usize = 2;

/// How many identifiers a command expects in its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Single,
    Dual,
}

/// A decoded command verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ListStates,
    InitState,
    ChangeDirectory,
    ReadBytes,
    StatEntity,
    ListDir,
    ListFiles,
    ListSubdirs,
    WalkTree,
}

impl Command {
    /// Verbs in matching priority order.
    pub const PRIORITY: [Command; 9] = [
        Command::ListStates,
        Command::InitState,
        Command::ChangeDirectory,
        Command::ReadBytes,
        Command::StatEntity,
        Command::ListDir,
        Command::ListFiles,
        Command::ListSubdirs,
        Command::WalkTree,
    ];

    /// Wire literal for this verb.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::ListStates => "LIST_STATES",
            Command::InitState => "INIT_STATE",
            Command::ChangeDirectory => "CD_SUBDIR",
            Command::ReadBytes => "READ_BYTES",
            Command::StatEntity => "STAT_ENTITY",
            Command::ListDir => "LIST_DIR",
            Command::ListFiles => "LIST_FILES",
            Command::ListSubdirs => "LIST_SUBDIRS",
            Command::WalkTree => "WALK_TREE",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Command::ListStates => Arity::None,
            Command::InitState
            | Command::ListDir
            | Command::ListFiles
            | Command::ListSubdirs
            | Command::WalkTree => Arity::Single,
            Command::ChangeDirectory | Command::ReadBytes | Command::StatEntity => Arity::Dual,
        }
    }

    /// Find the first verb, in priority order, contained in `field`.
    ///
    /// Matching is by substring containment, so `XLIST_FILESX` still
    /// resolves to [`Command::ListFiles`].
    pub fn match_field(field: &str) -> Option<Command> {
        Self::PRIORITY
            .iter()
            .copied()
            .find(|command| field.contains(command.verb()))
    }
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub argument: String,
}

impl Request {
    /// Decode a raw request buffer.
    pub fn decode(buffer: &[u8]) -> Result<Self, ParseError> {
        let text = String::from_utf8_lossy(buffer);

        let (name, rest) = next_field(&text);
        let (version, rest) = next_field(rest);
        let (command, rest) = next_field(rest);
        let argument = rest.trim_matches(is_trimmed);

        if name != PROTOCOL_NAME {
            return Err(ParseError::BadProtocolName);
        }
        if version != PROTOCOL_VERSION {
            return Err(ParseError::BadVersion);
        }
        if !command.contains(Command::ListStates.verb())
            && argument.chars().count() < MIN_ARGUMENT_LEN
        {
            return Err(ParseError::BadArgument);
        }

        let command = Command::match_field(command).ok_or(ParseError::BadCommand)?;
        Ok(Self {
            command,
            argument: argument.to_string(),
        })
    }

    /// Split a dual-argument payload into `(session, entity)`.
    pub fn split_pair(&self) -> Result<(&str, &str), ParseError> {
        split_pair(&self.argument)
    }
}

/// Split `a;b` into exactly two non-empty parts.
pub fn split_pair(argument: &str) -> Result<(&str, &str), ParseError> {
    let mut parts = argument.split(TUPLE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) if !first.is_empty() && !second.is_empty() => {
            Ok((first, second))
        }
        _ => Err(ParseError::NeedsTwoHashes),
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_ascii_whitespace()
}

fn is_trimmed(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\0'
}

/// Skip leading delimiters and split off the next field.
fn next_field(input: &str) -> (&str, &str) {
    let input = input.trim_start_matches(is_delimiter);
    match input.find(is_delimiter) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, ""),
    }
}
