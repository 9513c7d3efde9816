//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides the shadow-copy helpers used by the assembly loader:
//! a private temporary directory per loaded assembly, and copying the
//! assembly's files into it.
//!
//! 此模块提供程序集加载器使用的影子复制辅助功能：
//! 为每个加载的程序集创建私有临时目录，并将程序集文件复制到其中。

use anyhow::{Context, Result};
use fs_extra::file::{CopyOptions, copy};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a unique, temporary directory for one shadow copy.
///
/// # Arguments
/// * `assembly_name` - Name used to make the directory recognizable
///
/// # Returns
/// The directory; it is removed when the returned value is dropped
pub fn create_shadow_dir(assembly_name: &str) -> Result<TempDir> {
    let sanitized_name = assembly_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();

    tempfile::Builder::new()
        .prefix(&format!("front_runner_{sanitized_name}_"))
        .tempdir()
        .context("Failed to create shadow copy directory")
}

/// Copies `files` into `target_dir`, keeping their file names.
///
/// # Returns
/// The paths of the copies, in the same order as `files`
pub fn copy_files_into(files: &[&Path], target_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut options = CopyOptions::new();
    options.overwrite = true;

    files
        .iter()
        .map(|file| {
            let file_name = file
                .file_name()
                .with_context(|| format!("Not a file path: {}", file.display()))?;
            let target = target_dir.join(file_name);
            copy(file, &target, &options)
                .with_context(|| format!("Failed to copy {} to {}", file.display(), target.display()))?;
            Ok(target)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_copy_files_into_shadow_dir() {
        let source = tempfile::tempdir().unwrap();
        let file = source.path().join("tests.toml");
        fs::write(&file, "name = \"x\"").unwrap();

        let shadow = create_shadow_dir("My.Tests").unwrap();
        let copies = copy_files_into(&[file.as_path()], shadow.path()).unwrap();

        assert_eq!(copies.len(), 1);
        assert_eq!(fs::read_to_string(&copies[0]).unwrap(), "name = \"x\"");
        assert!(shadow.path().file_name().unwrap().to_string_lossy().starts_with("front_runner_My_Tests_"));
    }
}
