//! Output path computation for generated declaration files.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::CacheError;

/// Returns the deepest directory that contains every entrypoint.
///
/// Only parent directories are compared, so a single entrypoint yields its
/// own directory. Returns an empty path when the entrypoints share no
/// leading component.
pub fn common_path_prefix(entrypoints: &[PathBuf]) -> PathBuf {
    let mut parents = entrypoints
        .iter()
        .map(|p| p.parent().unwrap_or_else(|| Path::new("")));

    let Some(first) = parents.next() else {
        return PathBuf::new();
    };
    let mut common: Vec<Component<'_>> = first.components().collect();

    for parent in parents {
        let shared = common
            .iter()
            .zip(parent.components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }

    common.into_iter().collect()
}

/// Maps a source extension to its declaration-file extension.
///
/// ES module and CommonJS sources keep their module flavor (`.mts` becomes
/// `.d.mts`, `.cjs` becomes `.d.cts`); everything else becomes `.d.ts`.
pub fn declaration_extension(source: &Path) -> &'static str {
    match source.extension().and_then(|e| e.to_str()) {
        Some("mts" | "mjs") => "d.mts",
        Some("cts" | "cjs") => "d.cts",
        _ => "d.ts",
    }
}

/// Computes where the declaration file for `entry` is written.
///
/// The shared `prefix` is stripped from the entry, the extension is replaced
/// with the declaration extension, and the result is placed under `outdir`.
/// Entries outside the prefix keep only their file name.
pub fn declaration_path(entry: &Path, prefix: &Path, outdir: &Path) -> PathBuf {
    let relative = entry
        .strip_prefix(prefix)
        .ok()
        .filter(|r| !r.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| entry.file_name().map(PathBuf::from))
        .unwrap_or_else(|| entry.to_path_buf());

    outdir.join(relative.with_extension(declaration_extension(entry)))
}

/// Maps every entrypoint to its declaration path under `outdir`.
///
/// Fails with [`CacheError::OutputCollision`] when two entrypoints would
/// write the same file, such as `a.ts` next to `a.tsx`.
pub fn plan_outputs(
    entrypoints: &[PathBuf],
    outdir: &Path,
) -> Result<BTreeMap<PathBuf, PathBuf>, CacheError> {
    let prefix = common_path_prefix(entrypoints);
    let mut owners: BTreeMap<PathBuf, &PathBuf> = BTreeMap::new();
    let mut plan = BTreeMap::new();

    for entry in entrypoints {
        let out = declaration_path(entry, &prefix, outdir);
        if let Some(first) = owners.insert(out.clone(), entry) {
            return Err(CacheError::OutputCollision {
                output: out,
                first: first.clone(),
                second: entry.clone(),
            });
        }
        plan.insert(entry.clone(), out);
    }
    Ok(plan)
}
