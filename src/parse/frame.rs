//! Stack frame lines as printed by the exploitable extension.
//!
//! Frame numbers are right-aligned in three columns after the marker, so
//! frames 0-99 print as `#  4 sym ...` (the number is a separate field) while
//! frames from 100 on print as `#100 sym ...`.
use crate::constants::FRAME_MARKER;

/// Frame line split into number and the `sym... at <addr> in module...` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLine<'a> {
    /// `#  4 None at 0x7ffff6fad93b in /usr/lib/libcairo.so.2`
    Padded { number: usize, body: Vec<&'a str> },
    /// `#100 Parser::getObj at 0x56997b in /src/poppler/utils/pdftocairo`
    Wide { number: usize, body: Vec<&'a str> },
}

/// Fields of a frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout<'a> {
    /// Everything before `at`.
    pub symbol: String,
    /// Field right after `at`.
    pub address: &'a str,
    /// Everything after `in`.
    pub module: String,
}

impl<'a> FrameLine<'a> {
    /// Classify a line starting with the frame marker, `None` if it isn't one.
    pub fn classify(line: &'a str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let marker = fields.next()?;
        if marker == FRAME_MARKER {
            let number = fields.next()?.parse().ok()?;
            Some(FrameLine::Padded {
                number,
                body: fields.collect(),
            })
        } else {
            let number = marker.strip_prefix(FRAME_MARKER)?.parse().ok()?;
            Some(FrameLine::Wide {
                number,
                body: fields.collect(),
            })
        }
    }

    #[cfg(test)]
    fn number(&self) -> usize {
        match *self {
            FrameLine::Padded { number, .. } | FrameLine::Wide { number, .. } => number,
        }
    }

    pub fn body(&self) -> &[&'a str] {
        match self {
            FrameLine::Padded { body, .. } | FrameLine::Wide { body, .. } => body,
        }
    }

    /// Split the body around the `at` field. Symbols may contain spaces, so the
    /// position of `at` isn't fixed.
    pub fn layout(&self) -> Option<FrameLayout<'a>> {
        let body = self.body();
        let at = body.iter().position(|&field| field == "at")?;
        if at == 0 {
            return None;
        }
        let address = *body.get(at + 1)?;
        let rest = &body[at + 2..];
        let module = match rest.split_first() {
            Some((&"in", module)) => module,
            _ => rest,
        };
        Some(FrameLayout {
            symbol: body[..at].join(" "),
            address,
            module: module.join(" "),
        })
    }
}
