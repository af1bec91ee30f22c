//! Ant-style include pattern resolution.

use crate::core::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Ant's default excludes for version-control metadata and editor droppings.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.svn/**",
    "**/.hg/**",
    "**/CVS/**",
    "**/*~",
    "**/.DS_Store",
];

const EXCLUDED_DIRS: &[&str] = &[".git", ".svn", ".hg", "CVS"];

/// Split a comma-separated include list into normalized patterns.
fn split_patterns(includes: &str) -> Vec<String> {
    includes
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut pattern = p.replace('\\', "/");
            while let Some(stripped) = pattern.strip_prefix("./") {
                pattern = stripped.to_string();
            }
            if pattern.ends_with('/') {
                pattern.push_str("**");
            }
            pattern
        })
        .collect()
}

/// Ant only knows `*`, `?` and `**`; brackets and braces are literal.
fn ant_literals(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' | ']' | '{' | '}' => {
                escaped.push('[');
                escaped.push(c);
                escaped.push(']');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

fn build_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(&ant_literals(pattern.as_ref()))
            // `*` and `?` stay within one path segment.
            .literal_separator(true)
            .backslash_escape(false)
            .build()?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Resolve `includes` against `root`.
///
/// Returns root-relative, `/`-separated file paths in sorted order. A blank
/// include list matches nothing.
pub fn scan(root: &Path, includes: &str) -> Result<Vec<String>> {
    scan_excluding::<&str>(root, includes, &[])
}

/// [`scan`] with extra exclude patterns on top of [`DEFAULT_EXCLUDES`].
pub fn scan_excluding<S: AsRef<str>>(root: &Path, includes: &str, excludes: &[S]) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(Error::workspace(format!(
            "workspace root {} does not exist",
            root.display()
        )));
    }

    let patterns = split_patterns(includes);
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    let include_set = build_set(patterns.as_slice())?;
    let mut exclude_patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
    for exclude in excludes {
        exclude_patterns.extend(split_patterns(exclude.as_ref()));
    }
    let exclude_set = build_set(exclude_patterns.as_slice())?;

    let mut matches = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| EXCLUDED_DIRS.contains(&name)))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if include_set.is_match(&relative) && !exclude_set.is_match(&relative) {
            matches.push(relative);
        }
    }

    matches.sort();
    debug!(
        root = %root.display(),
        includes,
        count = matches.len(),
        "resolved include pattern"
    );
    Ok(matches)
}
