use std::error::Error;
use std::fmt;

/// Parsed token id: a word (`5`), an empty node (`5.1`) or a multiword
/// range (`5-6`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NodeId {
    Word(u32),
    Empty { word: u32, sub: u32 },
    Range { start: u32, end: u32 },
}

impl NodeId {
    /// Parse the `ID` column text.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let invalid = || IdError {
            raw: raw.to_string(),
        };
        let number = |s: &str| {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            s.parse::<u32>().map_err(|_| invalid())
        };

        if let Some((start, end)) = raw.split_once('-') {
            Ok(NodeId::Range {
                start: number(start)?,
                end: number(end)?,
            })
        } else if let Some((word, sub)) = raw.split_once('.') {
            Ok(NodeId::Empty {
                word: number(word)?,
                sub: number(sub)?,
            })
        } else {
            Ok(NodeId::Word(number(raw)?))
        }
    }

    pub fn is_word(self) -> bool {
        matches!(self, NodeId::Word(_))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Word(n) => write!(f, "{n}"),
            NodeId::Empty { word, sub } => write!(f, "{word}.{sub}"),
            NodeId::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

/// Token id that is neither an integer, a decimal nor a range.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdError {
    pub raw: String,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid token id {:?}", self.raw)
    }
}

impl Error for IdError {}
