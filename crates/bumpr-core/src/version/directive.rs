//! Bump directives: the optional value passed alongside a bump flag.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// What a bump flag asks for.
///
/// `--patch` alone is [`Directive::Increment`]; `--patch alpha` is
/// [`Directive::Alpha`]; `--patch 7` is [`Directive::Exact`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase", tag = "directive", content = "value")]
pub enum Directive {
    /// Bare flag: increment by one.
    #[default]
    Increment,
    /// `alpha` / `a`
    Alpha,
    /// `beta` / `b`
    Beta,
    /// `rc` / `pre` / `r`
    Rc,
    /// A literal non-negative integer to set the component to.
    Exact(u64),
    /// Anything else. Rejected by the bump engine.
    Other(String),
}

impl Directive {
    /// Interpret the optional value given to a bump flag.
    pub fn from_flag(value: Option<&str>) -> Self {
        value.map_or(Self::Increment, Self::parse)
    }

    /// Interpret a directive string. Never fails; unknown input becomes
    /// [`Directive::Other`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" | "true" => Self::Increment,
            "alpha" | "a" => Self::Alpha,
            "beta" | "b" => Self::Beta,
            "rc" | "pre" | "r" => Self::Rc,
            digits if digits.bytes().all(|b| b.is_ascii_digit()) => digits
                .parse()
                .map_or_else(|_| Self::Other(s.to_owned()), Self::Exact),
            _ => Self::Other(s.to_owned()),
        }
    }
}

impl FromStr for Directive {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increment => write!(f, "increment"),
            Self::Alpha => write!(f, "alpha"),
            Self::Beta => write!(f, "beta"),
            Self::Rc => write!(f, "rc"),
            Self::Exact(n) => write!(f, "{n}"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}
