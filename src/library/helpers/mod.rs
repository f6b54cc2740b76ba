//! Various small helper functions

mod backoff;

pub use backoff::Backoff;

use std::num::ParseIntError;
use std::time::Duration;

/// Parses a Duration from a string containing seconds.
/// Useful for command line parsing
pub fn parse_seconds(src: &str) -> Result<Duration, ParseIntError> {
    let seconds = src.parse::<u64>()?;
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn parse_seconds_from_integer() {
        assert_eq!(parse_seconds("10"), Ok(Duration::from_secs(10)));
    }

    #[test]
    fn reject_fractional_seconds() {
        assert!(parse_seconds("1.5").is_err());
    }
}
