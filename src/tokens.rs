use std::{ops::RangeBounds, str::Lines, str::SplitWhitespace};

use crate::error::InvalidInput;

/// Whitespace separated reader over a line oriented text dump.
///
/// Tokens may be spread over any number of lines, except where a whole line is requested
/// with [`Tokens::next_line`].
pub(crate) struct Tokens<'a> {
    lines: Lines<'a>,
    current: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Tokens {
            lines: text.lines(),
            current: "".split_whitespace(),
        }
    }

    /// The next non-empty line. Unread tokens on the current line are dropped.
    pub(crate) fn next_line(&mut self, what: &'static str) -> Result<&'a str, InvalidInput> {
        self.current = "".split_whitespace();
        self.lines
            .by_ref()
            .find(|l| !l.trim().is_empty())
            .ok_or(InvalidInput::UnexpectedEnd(what))
    }

    pub(crate) fn next_str(&mut self, what: &'static str) -> Result<&'a str, InvalidInput> {
        loop {
            if let Some(tok) = self.current.next() {
                return Ok(tok);
            }
            let line = self.lines.next().ok_or(InvalidInput::UnexpectedEnd(what))?;
            self.current = line.split_whitespace();
        }
    }

    pub(crate) fn next_int(&mut self, what: &'static str) -> Result<i64, InvalidInput> {
        let tok = self.next_str(what)?;
        tok.parse().map_err(|_| InvalidInput::MalformedToken {
            what,
            token: tok.to_string(),
        })
    }

    pub(crate) fn next_in<R: RangeBounds<i64>>(
        &mut self,
        what: &'static str,
        range: R,
    ) -> Result<i64, InvalidInput> {
        let value = self.next_int(what)?;
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(InvalidInput::OutOfRange { what, value })
        }
    }

    pub(crate) fn next_bit(&mut self, what: &'static str) -> Result<bool, InvalidInput> {
        Ok(self.next_in(what, 0..=1)? == 1)
    }

    /// Fails unless only whitespace remains.
    pub(crate) fn expect_end(&mut self) -> Result<(), InvalidInput> {
        match self.next_str("end of input") {
            Err(InvalidInput::UnexpectedEnd(_)) => Ok(()),
            Err(e) => Err(e),
            Ok(tok) => Err(InvalidInput::MalformedToken {
                what: "end of input",
                token: tok.to_string(),
            }),
        }
    }
}
