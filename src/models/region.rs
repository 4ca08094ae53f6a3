use std::fmt;
use std::str::FromStr;

/// Editable sub-region of a block, carried by rendered markup as `data-region`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// Paragraph/heading content, article body.
    Body,
    Title,
    Text,
    Author,
    ButtonLabel,
    Line(usize),
    Caption(usize),
    LeftTitle,
    LeftBody,
    Cell(usize, usize),
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Body => write!(f, "body"),
            Region::Title => write!(f, "title"),
            Region::Text => write!(f, "text"),
            Region::Author => write!(f, "author"),
            Region::ButtonLabel => write!(f, "button"),
            Region::Line(i) => write!(f, "line:{i}"),
            Region::Caption(i) => write!(f, "caption:{i}"),
            Region::LeftTitle => write!(f, "left-title"),
            Region::LeftBody => write!(f, "left-body"),
            Region::Cell(r, c) => write!(f, "cell:{r}:{c}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown region `{0}`")]
pub struct ParseRegionError(pub String);

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRegionError(s.to_string());
        let mut parts = s.split(':');
        let head = parts.next().ok_or_else(err)?;
        let mut num = || -> Result<usize, ParseRegionError> {
            parts
                .next()
                .and_then(|p| p.parse::<usize>().ok())
                .ok_or_else(err)
        };
        let region = match head {
            "body" => Region::Body,
            "title" => Region::Title,
            "text" => Region::Text,
            "author" => Region::Author,
            "button" => Region::ButtonLabel,
            "line" => Region::Line(num()?),
            "caption" => Region::Caption(num()?),
            "left-title" => Region::LeftTitle,
            "left-body" => Region::LeftBody,
            "cell" => {
                let r = num()?;
                let c = num()?;
                Region::Cell(r, c)
            }
            _ => return Err(err()),
        };
        Ok(region)
    }
}
