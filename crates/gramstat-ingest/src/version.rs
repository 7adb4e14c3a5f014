//! Job manager version string parser.
//!
//! Job managers report versions like
//! `3.14 (gcc32dbg, 1222134484-78) [Globus Toolkit 4.2.0]`; the bracketed
//! distribution suffix is optional.

use regex::Regex;

use gramstat_store::VersionKey;

pub struct VersionParser {
    re: Regex,
}

impl VersionParser {
    pub fn new() -> Result<Self, regex::Error> {
        let re = Regex::new(r"^([0-9]+)\.([0-9]+) \(([^,]*), ([0-9]+)-([0-9]+)\)( \[([^\]]*)\])?")?;
        Ok(Self { re })
    }

    /// Parse a version string. Anything that does not match, including
    /// numbers too large for an `i64`, yields `None`.
    pub fn parse(&self, text: &str) -> Option<VersionKey> {
        let caps = self.re.captures(text)?;
        Some(VersionKey {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            flavor: caps[3].to_string(),
            dirt_timestamp: caps[4].parse().ok()?,
            dirt_branch: caps[5].parse().ok()?,
            distro_string: caps.get(7).map(|m| m.as_str().to_string()),
        })
    }
}
