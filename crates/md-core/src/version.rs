//! Version directory names such as `1_0_2`, ordered by numeric segments
//!
//! Segments are compared left to right as integers; a missing segment counts
//! as 0, so `1` and `1_0` compare equal on value and the shorter name sorts
//! first.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

const SEGMENT_SEPARATOR: char = '_';

/// Check that a name is one or more digit runs joined by `_`
pub fn is_valid_version(name: &str) -> bool {
    !name.is_empty()
        && name
            .split(SEGMENT_SEPARATOR)
            .all(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
}

fn segments(name: &str) -> Result<Vec<u64>> {
    if !is_valid_version(name) {
        return Err(Error::InvalidVersion(name.to_string()));
    }
    name.split(SEGMENT_SEPARATOR)
        .map(|seg| seg.parse().map_err(|_| Error::InvalidVersion(name.to_string())))
        .collect()
}

fn compare_segments(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Compare two version names
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(compare_segments(&segments(a)?, &segments(b)?))
}

/// Sort version names ascending. Fails if any name is malformed.
pub fn sort_versions<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>> {
    let mut keyed = names
        .iter()
        .map(|n| segments(n.as_ref()).map(|segs| (segs, n.as_ref().to_string())))
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| compare_segments(a, b));
    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}

/// Names of the version directories directly under `root`, in merge order
pub fn list_versions<P: AsRef<Path>>(root: P) -> Result<Vec<String>> {
    let root = root.as_ref();
    let read_error = |e| Error::FileRead {
        path: root.to_path_buf(),
        source: e,
    };
    let entries = fs::read_dir(root).map_err(read_error)?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_error)?;
        if entry.file_type().map_err(read_error)?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    sort_versions(&names)
}

/// The greatest version directory under `root`, if any
pub fn max_version<P: AsRef<Path>>(root: P) -> Result<Option<String>> {
    Ok(list_versions(root)?.pop())
}

/// `target` itself if listed, otherwise the greatest listed version below it
pub fn find_previous<S: AsRef<str>>(versions: &[S], target: &str) -> Result<String> {
    if versions.iter().any(|v| v.as_ref() == target) {
        return Ok(target.to_string());
    }

    let target_segs = segments(target)?;
    let mut best: Option<(Vec<u64>, &str)> = None;
    for version in versions {
        let segs = segments(version.as_ref())?;
        if compare_segments(&segs, &target_segs) != Ordering::Less {
            continue;
        }
        let better = best
            .as_ref()
            .map_or(true, |(b, _)| compare_segments(&segs, b) == Ordering::Greater);
        if better {
            best = Some((segs, version.as_ref()));
        }
    }

    best.map(|(_, name)| name.to_string())
        .ok_or_else(|| Error::VersionNotFound(format!("no version at or below {}", target)))
}

/// The inclusive run `start..=end` of an ordered list.
///
/// `None` bounds mean the first / last entry.
pub fn slice_versions<S: AsRef<str>>(
    ordered: &[S],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<String>> {
    let position = |name: &str| {
        ordered
            .iter()
            .position(|v| v.as_ref() == name)
            .ok_or_else(|| Error::VersionNotFound(name.to_string()))
    };

    if ordered.is_empty() {
        return Ok(Vec::new());
    }

    let first = start.map(position).transpose()?.unwrap_or(0);
    let last = end.map(position).transpose()?.unwrap_or(ordered.len() - 1);
    if first > last {
        return Ok(Vec::new());
    }

    Ok(ordered[first..=last]
        .iter()
        .map(|v| v.as_ref().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_valid_version() {
        assert!(is_valid_version("1"));
        assert!(is_valid_version("1_0_12"));
        assert!(!is_valid_version(""));
        assert!(!is_valid_version("1__2"));
        assert!(!is_valid_version("v1_0"));
        assert!(!is_valid_version("1.0"));
    }

    #[test]
    fn test_sort_versions_numeric() {
        let sorted = sort_versions(&["1_10", "1_2", "1", "0_9_9", "1_0"]).unwrap();
        assert_eq!(sorted, vec!["0_9_9", "1", "1_0", "1_2", "1_10"]);
    }

    #[test]
    fn test_sort_versions_rejects_invalid() {
        assert!(matches!(
            sort_versions(&["1_0", "beta"]),
            Err(Error::InvalidVersion(name)) if name == "beta"
        ));
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("2", "10").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("1_0_1", "1_0").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("3_1", "3_1").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_find_previous() {
        let versions = ["1_0", "1_2", "2_0"];
        assert_eq!(find_previous(&versions, "1_2").unwrap(), "1_2");
        assert_eq!(find_previous(&versions, "1_5").unwrap(), "1_2");
        assert_eq!(find_previous(&versions, "9").unwrap(), "2_0");
        assert!(find_previous(&versions, "0_1").is_err());
    }

    #[test]
    fn test_slice_versions() {
        let versions = ["1", "2", "3", "4"];
        assert_eq!(slice_versions(&versions, Some("2"), Some("3")).unwrap(), vec!["2", "3"]);
        assert_eq!(slice_versions(&versions, None, Some("2")).unwrap(), vec!["1", "2"]);
        assert_eq!(slice_versions(&versions, Some("3"), None).unwrap(), vec!["3", "4"]);
        assert!(slice_versions(&versions, Some("7"), None).is_err());
    }

    #[test]
    fn test_list_and_max_version() {
        let dir = TempDir::new().unwrap();
        for name in ["1_0", "1_10", "1_9"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README"), "ignored").unwrap();

        assert_eq!(list_versions(dir.path()).unwrap(), vec!["1_0", "1_9", "1_10"]);
        assert_eq!(max_version(dir.path()).unwrap(), Some("1_10".to_string()));
    }

    #[test]
    fn test_max_version_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(max_version(dir.path()).unwrap(), None);
    }
}
