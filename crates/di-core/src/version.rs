use std::cmp::Ordering;

use semver::Prerelease;

/// Returns true iff `candidate` is strictly newer than `current`.
///
/// Versions are dot-separated numeric segments. The shorter segment list is
/// zero-padded on the right, so `1.2` compares as `1.2.0`. A leading `v` is
/// ignored and a `-pre.release` suffix only breaks ties between equal numeric
/// cores. Equal versions are not newer. When either side is not numeric the
/// versions are compared as plain strings and any difference counts as newer.
#[must_use]
pub fn is_newer_version(current: &str, candidate: &str) -> bool {
    match (
        ParsedVersion::parse(current),
        ParsedVersion::parse(candidate),
    ) {
        (Some(current), Some(candidate)) => candidate.cmp(&current) == Ordering::Greater,
        _ => strip_tag_prefix(current.trim()) != strip_tag_prefix(candidate.trim()),
    }
}

/// Drops the `v` GitHub tags conventionally carry.
#[must_use]
pub fn strip_tag_prefix(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

#[derive(Debug)]
struct ParsedVersion {
    segments: Vec<u64>,
    pre: Prerelease,
}

impl ParsedVersion {
    fn parse(version: &str) -> Option<Self> {
        let version = strip_tag_prefix(version.trim());
        let without_build = version.split_once('+').map_or(version, |(core, _)| core);
        let (core, pre) = without_build.split_once('-').unwrap_or((without_build, ""));

        let segments = core
            .split('.')
            .map(|segment| segment.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let pre = if pre.is_empty() {
            Prerelease::EMPTY
        } else {
            Prerelease::new(pre).ok()?
        };

        Some(Self { segments, pre })
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            let ours = self.segments.get(idx).copied().unwrap_or(0);
            let theirs = other.segments.get(idx).copied().unwrap_or(0);
            match ours.cmp(&theirs) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        self.pre.cmp(&other.pre)
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
