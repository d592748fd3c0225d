//! Result tags describing how a feature relates to the AOI

use std::fmt;

/// Placeholder written to the `RESULT` column when a rule finds nothing
pub const NO_OVERLAPS_FOUND: &str = "NO OVERLAPS FOUND";

/// Relationship between a result feature and the area of interest
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayTag {
    /// Feature interacts with the AOI itself
    Intersect,

    /// Feature lies inside the buffer ring (radius in metres) but not the AOI
    Within(f64),
}

impl OverlayTag {
    /// Parse a tag as written by [`fmt::Display`]
    ///
    /// Accepts `INTERSECT` and `WITHIN {radius} m`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        if upper == "INTERSECT" {
            return Some(Self::Intersect);
        }

        let radius = upper.strip_prefix("WITHIN")?.trim().strip_suffix('M')?.trim();
        radius.parse::<f64>().ok().filter(|r| r.is_finite()).map(Self::Within)
    }

    /// True for [`OverlayTag::Intersect`]
    pub fn is_intersect(&self) -> bool {
        matches!(self, Self::Intersect)
    }
}

impl fmt::Display for OverlayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intersect => f.write_str("INTERSECT"),
            // whole-metre radii print without a fractional part
            Self::Within(radius) if radius.fract() == 0.0 => write!(f, "WITHIN {:.0} m", radius),
            Self::Within(radius) => write!(f, "WITHIN {} m", radius),
        }
    }
}
