//! The argument cursor shared by every option during one parse, and the
//! per-option consumer that takes tokens from it.

use crate::error::{Error, Result};
use crate::option::Arity;
use crate::value::{Coerce, Value};

/// How the token at the front of the cursor matched an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `-x VALUE`: the trigger and the following token.
    Short,
    /// `--name=VALUE`: a single token carrying its value.
    Long,
    /// A bare token for an option without triggers.
    Positional,
}

/// Tokens for one parse, consumed front to back.
///
/// Consumption advances a position instead of removing tokens, so every
/// option sees the same shrinking view.
#[derive(Debug, Clone, Default)]
pub struct ArgCursor {
    tokens: Vec<String>,
    pos: usize,
}

impl ArgCursor {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            pos: 0,
        }
    }

    pub fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    /// Number of tokens not consumed yet.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Tokens not consumed yet.
    pub fn rest(&self) -> &[String] {
        &self.tokens[self.pos..]
    }

    /// Take every remaining token, leaving the cursor empty.
    pub fn take_rest(&mut self) -> Vec<String> {
        let rest = self.tokens[self.pos..].to_vec();
        self.pos = self.tokens.len();
        rest
    }

    fn get(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.pos + offset).map(String::as_str)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len());
    }
}

/// How many more values an option may accept during this parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Count(usize),
    /// `?` before its single value was taken.
    Optional,
    Unbounded,
}

impl Remaining {
    /// Whether the option may still be offered tokens.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Count(0))
    }

    fn record_consumed(&mut self) {
        *self = match *self {
            Self::Count(n) => Self::Count(n.saturating_sub(1)),
            Self::Optional => Self::Count(0),
            Self::Unbounded => Self::Unbounded,
        };
    }
}

impl From<Arity> for Remaining {
    fn from(arity: Arity) -> Self {
        match arity {
            Arity::Exactly(n) => Self::Count(n),
            Arity::Optional => Self::Optional,
            Arity::Any => Self::Unbounded,
        }
    }
}

/// One option's handle on the shared cursor for a single attempt.
#[derive(Debug)]
pub struct Consumer<'a> {
    cursor: &'a mut ArgCursor,
    remaining: &'a mut Remaining,
}

impl<'a> Consumer<'a> {
    pub fn new(cursor: &'a mut ArgCursor, remaining: &'a mut Remaining) -> Self {
        Self { cursor, remaining }
    }

    pub fn peek(&self) -> Option<&str> {
        self.cursor.peek()
    }

    pub fn remaining_tokens(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn remaining_arity(&self) -> Remaining {
        *self.remaining
    }

    /// Take one value for `mode`, coerce it, and only then advance the
    /// cursor. Nothing is consumed when this fails.
    pub fn consume(&mut self, mode: Mode, coerce: &Coerce) -> Result<Value> {
        let (raw, width) = match mode {
            Mode::Short => {
                let value = self.cursor.get(1).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "missing value for {}",
                        self.cursor.peek().unwrap_or_default()
                    ))
                })?;
                (value, 2)
            }
            Mode::Long => {
                let token = self.cursor.peek().unwrap_or_default();
                let (_, value) = token
                    .split_once('=')
                    .ok_or_else(|| Error::InvalidArgument(token.to_string()))?;
                (value, 1)
            }
            Mode::Positional => {
                let token = self
                    .cursor
                    .peek()
                    .ok_or_else(|| Error::InvalidArgument("no argument left".to_string()))?;
                (token, 1)
            }
        };

        let value = coerce
            .apply(raw)
            .map_err(|msg| Error::InvalidArgument(format!("{raw}: {msg}")))?;
        tracing::debug!(raw, width, "consumed value");
        self.cursor.advance(width);
        self.remaining.record_consumed();
        Ok(value)
    }

    /// Consume only the trigger token (flags and constants).
    pub fn skip_trigger(&mut self) {
        self.cursor.advance(1);
    }

    /// Consume the trigger token and seize every token after it.
    pub fn seize_rest(&mut self) -> Vec<String> {
        self.cursor.advance(1);
        self.cursor.take_rest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;
    use serde_json::json;

    #[test]
    fn short_takes_trigger_and_next_token() {
        let mut cursor = ArgCursor::new(["-n", "5", "rest"]);
        let mut left = Remaining::from(Arity::Exactly(2));
        let mut c = Consumer::new(&mut cursor, &mut left);
        assert_eq!(c.consume(Mode::Short, &value::integer()).unwrap(), json!(5));
        assert_eq!(cursor.rest(), ["rest"]);
        assert_eq!(left, Remaining::Count(1));
    }

    #[test]
    fn short_without_value_is_invalid() {
        let mut cursor = ArgCursor::new(["-n"]);
        let mut left = Remaining::Optional;
        let err = Consumer::new(&mut cursor, &mut left)
            .consume(Mode::Short, &value::string())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn long_requires_equals_value() {
        let mut cursor = ArgCursor::new(["--name"]);
        let mut left = Remaining::Unbounded;
        let err = Consumer::new(&mut cursor, &mut left)
            .consume(Mode::Long, &value::string())
            .unwrap_err();
        match err {
            Error::InvalidArgument(msg) => assert_eq!(msg, "--name"),
            other => panic!("expected InvalidArgument, got: {other:?}"),
        }

        let mut cursor = ArgCursor::new(["--name=a=b"]);
        let v = Consumer::new(&mut cursor, &mut left)
            .consume(Mode::Long, &value::string())
            .unwrap();
        assert_eq!(v, json!("a=b"));
        assert!(cursor.is_empty());
    }

    #[test]
    fn failed_coercion_consumes_nothing() {
        let mut cursor = ArgCursor::new(["abc"]);
        let mut left = Remaining::Optional;
        assert!(
            Consumer::new(&mut cursor, &mut left)
                .consume(Mode::Positional, &value::integer())
                .is_err()
        );
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(left, Remaining::Optional);
    }

    #[test]
    fn optional_closes_after_one_value() {
        let mut cursor = ArgCursor::new(["a", "b"]);
        let mut left = Remaining::from(Arity::Optional);
        Consumer::new(&mut cursor, &mut left)
            .consume(Mode::Positional, &value::string())
            .unwrap();
        assert!(!left.is_open());
    }

    #[test]
    fn seize_rest_empties_cursor() {
        let mut cursor = ArgCursor::new(["build", "-x", "1", "extra"]);
        let mut left = Remaining::Unbounded;
        let tail = Consumer::new(&mut cursor, &mut left).seize_rest();
        assert_eq!(tail, ["-x", "1", "extra"]);
        assert!(cursor.is_empty());
    }
}
