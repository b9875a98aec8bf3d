//! Fixed-point asset amounts with eight decimal places.

use chainvm_derive::{BinaryCodec, Error};
use std::fmt;
use std::str::FromStr;

/// Number of indivisible units in one whole token.
pub const DECIMALS: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fixed8ParseError {
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount {0:?} has more than 8 decimal places")]
    TooPrecise(String),
    #[error("amount {0:?} is out of range")]
    OutOfRange(String),
}

/// Amount stored as a signed count of 10^-8 units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct Fixed8(pub i64);

impl Fixed8 {
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Whole tokens, or `None` on overflow.
    pub fn from_whole(whole: i64) -> Option<Self> {
        whole.checked_mul(DECIMALS).map(Self)
    }

    pub const fn units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / DECIMALS as u64;
        let frac = abs % DECIMALS as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:08}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Fixed8 {
    type Err = Fixed8ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Fixed8ParseError::Invalid(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) || (body.contains('.') && frac.is_empty()) {
            return Err(invalid());
        }
        if frac.len() > 8 {
            return Err(Fixed8ParseError::TooPrecise(s.to_string()));
        }

        let out_of_range = || Fixed8ParseError::OutOfRange(s.to_string());
        let whole: i64 = whole.parse().map_err(|_| out_of_range())?;
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<8}").parse().map_err(|_| invalid())?
        };
        let units = whole
            .checked_mul(DECIMALS)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(out_of_range)?;
        Ok(Self(if negative { -units } else { units }))
    }
}
