//! Filesystem side of organizing: flattening before planning and executing a
//! finished plan.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::algo::misc::MISC_FOLDER;
use crate::error::{FoldersError, Result};
use crate::plan::{FolderContents, FolderPlan};

/// What an [`apply`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub created_dirs: usize,
    pub moved: usize,
    /// Planned files no longer at the root (already moved or deleted).
    pub missing: usize,
    /// Files left in place because their destination already exists.
    pub conflicts: Vec<String>,
}

/// Move every nested file under `dir` up to `dir` and remove the emptied
/// subdirectories. Returns the number of files moved.
///
/// A name already taken at the root gets `_<n>` before its extension.
/// Subdirectories that cannot be removed are logged and left alone.
pub fn flatten_directory(dir: &Path) -> Result<usize> {
    let nested: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    for path in &nested {
        let Some(name) = path.file_name() else { continue };
        let destination = free_path(&dir.join(name));
        fs::rename(path, &destination)?;
        debug!(from = %path.display(), to = %destination.display(), "flattened file");
    }

    let subdirs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    for sub in subdirs {
        if let Err(e) = fs::remove_dir(&sub) {
            warn!(dir = %sub.display(), "could not remove folder: {e}");
        }
    }

    if !nested.is_empty() {
        info!(dir = %dir.display(), files = nested.len(), "flattened directory");
    }
    Ok(nested.len())
}

/// `path` if unused, else the first free `<stem>_<n>.<ext>` next to it.
fn free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().unwrap_or(Path::new(""));

    let mut n = 1;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Create the plan's folders under `root` and move each file from `root`
/// into place.
///
/// Existing folders are reused and files missing from `root` are skipped, so
/// applying the same plan twice is harmless.
pub fn apply(root: &Path, plan: &FolderPlan) -> Result<ApplyReport> {
    if !root.is_dir() {
        return Err(FoldersError::MissingDirectory(root.to_path_buf()));
    }
    check_names(plan)?;

    let mut report = ApplyReport::default();
    apply_level(root, root, plan, &mut report)?;
    info!(
        root = %root.display(),
        created = report.created_dirs,
        moved = report.moved,
        missing = report.missing,
        conflicts = report.conflicts.len(),
        "applied folder plan"
    );
    Ok(report)
}

fn apply_level(root: &Path, dir: &Path, plan: &FolderPlan, report: &mut ApplyReport) -> Result<()> {
    for folder in &plan.folders {
        let folder_dir = dir.join(&folder.name);
        ensure_dir(&folder_dir, report)?;
        match &folder.contents {
            FolderContents::Files(files) => {
                for file in files {
                    move_file(root, file, &folder_dir, report)?;
                }
            }
            FolderContents::Nested(sub) => apply_level(root, &folder_dir, sub, report)?,
        }
    }

    if dir != root {
        for file in &plan.loose {
            move_file(root, file, dir, report)?;
        }
    }

    for (category, files) in &plan.misc {
        let category_dir = dir.join(MISC_FOLDER).join(category);
        ensure_dir(&category_dir, report)?;
        for file in files {
            move_file(root, file, &category_dir, report)?;
        }
    }
    Ok(())
}

fn ensure_dir(dir: &Path, report: &mut ApplyReport) -> Result<()> {
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
        report.created_dirs += 1;
    }
    Ok(())
}

fn move_file(root: &Path, file: &str, dest_dir: &Path, report: &mut ApplyReport) -> Result<()> {
    let source = root.join(file);
    if !source.is_file() {
        debug!(file, "planned file not found, skipping");
        report.missing += 1;
        return Ok(());
    }
    let destination = dest_dir.join(file);
    if destination.exists() {
        warn!(file, dest = %destination.display(), "destination exists, leaving file in place");
        report.conflicts.push(file.to_string());
        return Ok(());
    }
    fs::rename(&source, &destination)?;
    report.moved += 1;
    Ok(())
}

/// Plan names become path components; anything that could escape the root is rejected.
fn check_names(plan: &FolderPlan) -> Result<()> {
    let mut names: Vec<&str> = plan.loose.iter().map(String::as_str).collect();
    for folder in &plan.folders {
        names.push(&folder.name);
        match &folder.contents {
            FolderContents::Files(files) => names.extend(files.iter().map(String::as_str)),
            FolderContents::Nested(sub) => check_names(sub)?,
        }
    }
    for (category, files) in &plan.misc {
        names.push(category);
        names.extend(files.iter().map(String::as_str));
    }

    match names.into_iter().find(|n| !is_single_component(n)) {
        Some(bad) => Err(FoldersError::InvalidParameter(format!(
            "'{bad}' is not a valid file or folder name"
        ))),
        None => Ok(()),
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
