use crate::error::RangeError;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Inclusive integer interval `[start, stop]` where either bound may be
/// absent (infinite).
///
/// String syntax:
///
/// ```text
/// "3"      -> [3, 3]
/// "3+"     -> [3, ∞)
/// "3-"     -> (-∞, 3]
/// "3..5"   -> [3, 5]      ("3,5" is equivalent)
/// "*..5"   -> (-∞, 5]
/// "*"      -> (-∞, ∞)
/// ```
///
/// Invariant: when both bounds are present, `start <= stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenRange {
    start: Option<i64>,
    stop: Option<i64>,
}

impl OpenRange {
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Result<Self, RangeError> {
        if let (Some(start), Some(stop)) = (start, stop) {
            if start > stop {
                return Err(RangeError::Reversed { start, stop });
            }
        }
        Ok(OpenRange { start, stop })
    }

    pub const fn unbounded() -> Self {
        OpenRange { start: None, stop: None }
    }

    pub const fn exact(value: i64) -> Self {
        OpenRange { start: Some(value), stop: Some(value) }
    }

    pub const fn at_least(value: i64) -> Self {
        OpenRange { start: Some(value), stop: None }
    }

    pub const fn at_most(value: i64) -> Self {
        OpenRange { start: None, stop: Some(value) }
    }

    /// `[start, stop]`, panicking on reversed bounds. For literals only.
    pub fn between(start: i64, stop: i64) -> Self {
        assert!(start <= stop, "reversed range {start}..{stop}");
        OpenRange { start: Some(start), stop: Some(stop) }
    }

    pub fn start(&self) -> Option<i64> {
        self.start
    }

    pub fn stop(&self) -> Option<i64> {
        self.stop
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() && self.stop.is_some()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.stop.is_none()
    }

    pub fn contains(&self, value: i64) -> bool {
        self.start.is_none_or(|s| value >= s) && self.stop.is_none_or(|e| value <= e)
    }

    /// Values common to both ranges, `None` when disjoint.
    pub fn intersect(&self, other: &OpenRange) -> Option<OpenRange> {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let stop = match (self.stop, other.stop) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        OpenRange::new(start, stop).ok()
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &OpenRange) -> OpenRange {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        let stop = match (self.stop, other.stop) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        OpenRange { start, stop }
    }
}

impl Add<i64> for OpenRange {
    type Output = OpenRange;

    fn add(self, rhs: i64) -> OpenRange {
        OpenRange { start: self.start.map(|s| s + rhs), stop: self.stop.map(|e| e + rhs) }
    }
}

impl Sub<i64> for OpenRange {
    type Output = OpenRange;

    fn sub(self, rhs: i64) -> OpenRange {
        self + (-rhs)
    }
}

/// Interval addition: `[a, b] + [c, d] = [a + c, b + d]`.
impl Add for OpenRange {
    type Output = OpenRange;

    fn add(self, rhs: OpenRange) -> OpenRange {
        let start = self.start.zip(rhs.start).map(|(a, b)| a + b);
        let stop = self.stop.zip(rhs.stop).map(|(a, b)| a + b);
        OpenRange { start, stop }
    }
}

impl Sub for OpenRange {
    type Output = OpenRange;

    fn sub(self, rhs: OpenRange) -> OpenRange {
        self + (-rhs)
    }
}

impl Neg for OpenRange {
    type Output = OpenRange;

    fn neg(self) -> OpenRange {
        OpenRange { start: self.stop.map(|e| -e), stop: self.start.map(|s| -s) }
    }
}

impl fmt::Display for OpenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.stop) {
            (None, None) => f.write_str("*"),
            (Some(s), Some(e)) if s == e => write!(f, "{s}"),
            (Some(s), Some(e)) => write!(f, "{s}..{e}"),
            (Some(s), None) => write!(f, "{s}+"),
            (None, Some(e)) => write!(f, "{e}-"),
        }
    }
}

impl FromStr for OpenRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = crate::regex!(
            r"^\s*(?:(?P<a>-?\d+|\*)\s*(?:\.\.|,)\s*(?P<b>-?\d+|\*)|(?P<c>-?\d+)\s*(?P<sign>[+-])|(?P<d>-?\d+)|(?P<star>\*))\s*$"
        );
        let caps = re.captures(s).ok_or_else(|| RangeError::Parse(s.to_string()))?;

        let bound = |name: &str| -> Result<Option<i64>, RangeError> {
            match caps.name(name).map(|m| m.as_str()) {
                None | Some("*") => Ok(None),
                Some(text) => text.parse::<i64>().map(Some).map_err(|_| RangeError::Parse(s.to_string())),
            }
        };

        if caps.name("a").is_some() {
            OpenRange::new(bound("a")?, bound("b")?)
        } else if caps.name("c").is_some() {
            let value = bound("c")?;
            match caps.name("sign").map(|m| m.as_str()) {
                Some("+") => OpenRange::new(value, None),
                _ => OpenRange::new(None, value),
            }
        } else if caps.name("d").is_some() {
            let value = bound("d")?;
            OpenRange::new(value, value)
        } else {
            Ok(OpenRange::unbounded())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(s: &str) -> OpenRange {
        s.parse().unwrap()
    }

    #[test]
    fn parses_every_form() {
        assert_eq!(r("3"), OpenRange::exact(3));
        assert_eq!(r("3+"), OpenRange::at_least(3));
        assert_eq!(r("3-"), OpenRange::at_most(3));
        assert_eq!(r("-1-"), OpenRange::at_most(-1));
        assert_eq!(r("-2"), OpenRange::exact(-2));
        assert_eq!(r("3..5"), OpenRange::between(3, 5));
        assert_eq!(r(" 3 , 5 "), OpenRange::between(3, 5));
        assert_eq!(r("*..5"), OpenRange::at_most(5));
        assert_eq!(r("2..*"), OpenRange::at_least(2));
        assert_eq!(r("*"), OpenRange::unbounded());
    }

    #[test]
    fn rejects_malformed_and_reversed() {
        assert!(matches!("abc".parse::<OpenRange>(), Err(RangeError::Parse(_))));
        assert!(matches!("3..".parse::<OpenRange>(), Err(RangeError::Parse(_))));
        assert_eq!("5..3".parse::<OpenRange>(), Err(RangeError::Reversed { start: 5, stop: 3 }));
    }

    #[test]
    fn canonical_forms_round_trip() {
        for text in ["3+", "3..5", "*", "7", "4-", "-3..-1"] {
            assert_eq!(r(text).to_string(), text);
        }
    }

    #[test]
    fn intersect_and_union() {
        assert_eq!(r("1..5").intersect(&r("3+")), Some(r("3..5")));
        assert_eq!(r("1..2").intersect(&r("4..5")), None);
        assert_eq!(r("*").intersect(&r("2-")), Some(r("2-")));
        assert_eq!(r("1..2").union(&r("4..5")), r("1..5"));
        assert_eq!(r("1..2").union(&r("4+")), r("1+"));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(r("1..3") + 2, r("3..5"));
        assert_eq!(r("1+") - 1, r("0+"));
        assert_eq!(-r("1..3"), r("-3..-1"));
        assert_eq!(-r("2+"), r("-2-"));
        assert_eq!(r("1..3") + r("0+"), r("1+"));
        assert_eq!(r("1..3") - r("1..2"), r("-1..2"));
        assert!(r("0+").contains(0));
        assert!(!r("0+").contains(-1));
    }

    proptest! {
        #[test]
        fn display_reparses_to_equal_range(a in -50i64..50, b in -50i64..50, form in 0u8..5) {
            let (lo, hi) = (a.min(b), a.max(b));
            let range = match form {
                0 => OpenRange::exact(lo),
                1 => OpenRange::at_least(lo),
                2 => OpenRange::at_most(hi),
                3 => OpenRange::between(lo, hi),
                _ => OpenRange::unbounded(),
            };
            let reparsed: OpenRange = range.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, range);
        }
    }
}
