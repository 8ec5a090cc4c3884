//! Resolution of type sources to a file list.
//!
//! Globs are matched per path segment: `*`, `?` and `[..]` never cross a
//! `/`, and a `**` segment matches zero or more directories. Each pattern is
//! walked from its literal prefix directory.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;
use wildmatch::WildMatch;

use crate::error::GenerationError;
use crate::options::GenerationOptions;

/// Files making up the program, sorted and deduplicated.
///
/// Globs take precedence over the manifest when both are given.
pub fn resolve_sources(options: &GenerationOptions) -> Result<Vec<PathBuf>, GenerationError> {
    let files = if !options.type_sources.is_empty() {
        expand_globs(&options.type_sources)?
    } else if let Some(manifest) = &options.manifest {
        manifest_sources(manifest)?
    } else {
        return Err(GenerationError::MissingSources);
    };
    tracing::debug!(count = files.len(), "resolved source files");
    Ok(files)
}

enum Segment {
    AnyDepth,
    Name(WildMatch),
}

struct Glob {
    base: PathBuf,
    segments: Vec<Segment>,
}

impl Glob {
    fn new(pattern: &str) -> Self {
        let normalized = pattern.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').collect();
        let literal = parts
            .iter()
            .take_while(|p| !p.contains(['*', '?', '[']))
            .count();
        // The last literal part is a file name, not a directory, when the
        // pattern has no wildcard at all.
        let base_len = if literal == parts.len() {
            literal.saturating_sub(1)
        } else {
            literal
        };
        let joined = parts[..base_len].join("/");
        let base = match joined.as_str() {
            "" if normalized.starts_with('/') => PathBuf::from("/"),
            "" => PathBuf::from("."),
            _ => PathBuf::from(joined),
        };
        let segments = parts[base_len..]
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| match *p {
                "**" => Segment::AnyDepth,
                p => Segment::Name(WildMatch::new(p)),
            })
            .collect();
        Self { base, segments }
    }

    fn matches(&self, relative: &[String]) -> bool {
        matches_segments(&self.segments, relative)
    }
}

fn matches_segments(pattern: &[Segment], path: &[String]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| matches_segments(rest, &path[skip..]))
        }
        Some((Segment::Name(name), rest)) => path
            .split_first()
            .is_some_and(|(head, tail)| name.matches(head) && matches_segments(rest, tail)),
    }
}

/// Expands glob patterns into the files they match.
pub fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>, GenerationError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let glob = Glob::new(pattern);
        if !glob.base.is_dir() {
            tracing::warn!(pattern = %pattern, base = %glob.base.display(), "glob base directory does not exist");
            continue;
        }
        for entry in WalkDir::new(&glob.base).follow_links(true) {
            let entry = entry.map_err(|e| GenerationError::ProgramUnavailable {
                path: glob.base.clone(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&glob.base) else {
                continue;
            };
            let relative: Vec<String> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            if glob.matches(&relative) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[derive(Debug, Deserialize)]
struct Manifest {
    lib: Option<Target>,
    #[serde(default)]
    bin: Vec<Target>,
}

#[derive(Debug, Deserialize)]
struct Target {
    path: Option<PathBuf>,
}

/// Every `.rs` file under the source roots of the crate `manifest` describes.
///
/// A source root is the directory holding a `[lib]` or `[[bin]]` path; a
/// manifest without explicit paths uses `src/`.
pub fn manifest_sources(manifest: &Path) -> Result<Vec<PathBuf>, GenerationError> {
    let text = std::fs::read_to_string(manifest).map_err(|e| GenerationError::Manifest {
        path: manifest.to_path_buf(),
        reason: e.to_string(),
    })?;
    let parsed: Manifest = toml::from_str(&text).map_err(|e| GenerationError::Manifest {
        path: manifest.to_path_buf(),
        reason: e.to_string(),
    })?;
    let crate_dir = manifest.parent().unwrap_or_else(|| Path::new("."));

    let mut roots: Vec<PathBuf> = parsed
        .lib
        .iter()
        .chain(parsed.bin.iter())
        .filter_map(|target| target.path.as_ref())
        .filter_map(|path| crate_dir.join(path).parent().map(Path::to_path_buf))
        .collect();
    if roots.is_empty() {
        roots.push(crate_dir.join("src"));
    }
    roots.sort();
    roots.dedup();

    let mut files = Vec::new();
    for root in &roots {
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| GenerationError::ProgramUnavailable {
                path: root.clone(),
                reason: e.to_string(),
            })?;
            let is_rust = entry.path().extension().is_some_and(|ext| ext == "rs");
            if entry.file_type().is_file() && is_rust {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}
