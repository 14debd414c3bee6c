//! On-disk job output and published links under the storage root.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::StorageError;

/// Output files are named `part-r-<n>-<hash>.avro`; the hash is shared by
/// every file of one job and by its published links.
static RE_OUTPUT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^part-r-[0-9]+-(.+?)\.avro$").unwrap());

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/organizations/<org>/record_group/<rg>/jobs/<label>/<job>`
    pub fn job_output_dir(
        &self,
        organization_id: i64,
        record_group_id: i64,
        kind_label: &str,
        job_id: i64,
    ) -> PathBuf {
        self.root
            .join("organizations")
            .join(organization_id.to_string())
            .join("record_group")
            .join(record_group_id.to_string())
            .join("jobs")
            .join(kind_label)
            .join(job_id.to_string())
    }

    pub fn published_dir(&self) -> PathBuf {
        self.root.join("published")
    }

    /// Filename hash shared by a job's output files, if it wrote any.
    pub fn output_filename_hash(&self, output_dir: &Path) -> Result<Option<String>, StorageError> {
        let mut names = self.file_names(output_dir)?;
        names.sort();
        Ok(names.iter().find_map(|name| {
            RE_OUTPUT_HASH
                .captures(name)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        }))
    }

    /// Removes entries of the published directory whose names contain
    /// `hash`. Returns how many were removed.
    pub fn remove_published_links(&self, hash: &str) -> Result<usize, StorageError> {
        let published = self.published_dir();
        let mut removed = 0;
        for name in self.file_names(&published)? {
            if !name.contains(hash) {
                continue;
            }
            let path = published.join(&name);
            std::fs::remove_file(&path).map_err(|e| StorageError::Remove {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Removed published link {}", path.display());
            removed += 1;
        }
        Ok(removed)
    }

    /// Deletes a job's output directory. Returns false if it did not exist.
    pub fn remove_job_output(&self, output_dir: &Path) -> Result<bool, StorageError> {
        if !output_dir.starts_with(&self.root) || output_dir == self.root {
            return Err(StorageError::OutsideRoot(output_dir.to_path_buf()));
        }
        if !output_dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(output_dir).map_err(|e| StorageError::Remove {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        log::debug!("Removed job output {}", output_dir.display());
        Ok(true)
    }

    /// Names of the files and links directly inside `dir`; empty if it is
    /// missing.
    fn file_names(&self, dir: &Path) -> Result<Vec<String>, StorageError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::ReadDirectory {
                path: dir.to_path_buf(),
                source: e,
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
