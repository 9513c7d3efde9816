//! # Assembly Loader Module / 程序集加载模块
//!
//! Acquires a loadable handle for a test assembly. The front controller
//! acquires exactly one handle and releases it when dropped; the isolation
//! policy is interpreted here and nowhere else.
//!
//! 获取测试程序集的可加载句柄。前端控制器只获取一个句柄，并在被丢弃时释放它；
//! 隔离策略只在此处解释。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

use crate::core::{
    assembly::TestAssembly,
    config::{IsolationMode, IsolationPolicy},
    error::LoadError,
};
use crate::infra::{
    fs,
    manifest::AssemblyManifest,
    source_info::SourceInformationProvider,
};

/// What to load and how.
/// 要加载的内容及加载方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAssembly {
    pub assembly_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub isolation: IsolationPolicy,
}

impl ProjectAssembly {
    pub fn new(assembly_path: impl Into<PathBuf>) -> Self {
        Self {
            assembly_path: assembly_path.into(),
            config_path: None,
            isolation: IsolationPolicy::default(),
        }
    }

    pub fn with_config(mut self, config_path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(config_path.into());
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationPolicy) -> Self {
        self.isolation = isolation;
        self
    }
}

/// Keeps a loaded assembly's files alive. A shadow copy is deleted when the
/// handle is dropped.
///
/// 保持已加载程序集的文件可用。影子副本会在句柄被丢弃时删除。
#[derive(Debug)]
pub struct AssemblyHandle {
    path: PathBuf,
    shadow_dir: Option<TempDir>,
}

impl AssemblyHandle {
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shadow_dir: None,
        }
    }

    pub fn shadow_copied(path: PathBuf, shadow_dir: TempDir) -> Self {
        Self {
            path,
            shadow_dir: Some(shadow_dir),
        }
    }

    /// The path the assembly was actually loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_shadow_copy(&self) -> bool {
        self.shadow_dir.is_some()
    }
}

/// A loaded assembly together with the handle keeping it loaded.
pub struct LoadedAssembly {
    pub assembly: Arc<TestAssembly>,
    pub handle: AssemblyHandle,
    /// The assembly's own source lookup, if it ships one.
    pub source_info: Option<Arc<dyn SourceInformationProvider>>,
    /// Culture the isolation policy asks the assembly to run in.
    pub default_culture: Option<String>,
}

/// Turns a project description into a loaded assembly.
/// 将项目描述转换为已加载的程序集。
pub trait AssemblyLoader: Send + Sync {
    fn load(&self, project: &ProjectAssembly) -> Result<LoadedAssembly, LoadError>;
}

/// Loads TOML assembly manifests from disk.
///
/// Paths go through `~`/environment-variable expansion. With
/// `shadow_copy` (or a required isolation mode) the manifest and config file
/// are copied into a private temporary directory first.
///
/// 从磁盘加载 TOML 程序集清单。路径会进行 `~` 和环境变量展开。
/// 启用 `shadow_copy`（或要求隔离模式）时，清单和配置文件会先被复制到私有临时目录中。
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestLoader;

impl ManifestLoader {
    fn wants_shadow_copy(policy: &IsolationPolicy) -> bool {
        policy.shadow_copy || policy.isolation == IsolationMode::Required
    }
}

impl AssemblyLoader for ManifestLoader {
    fn load(&self, project: &ProjectAssembly) -> Result<LoadedAssembly, LoadError> {
        let assembly_path = expand_path(&project.assembly_path)?;
        if !assembly_path.is_file() {
            return Err(LoadError::NotFound(assembly_path));
        }
        let config_path = project.config_path.as_deref().map(expand_path).transpose()?;
        if let Some(config) = &config_path {
            if !config.is_file() {
                return Err(LoadError::NotFound(config.clone()));
            }
        }

        let handle = if Self::wants_shadow_copy(&project.isolation) {
            let stem = assembly_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let shadow_dir = fs::create_shadow_dir(&stem).map_err(|e| LoadError::ShadowCopy(format!("{e:#}")))?;

            let mut files = vec![assembly_path.as_path()];
            files.extend(config_path.as_deref());
            let copies = fs::copy_files_into(&files, shadow_dir.path())
                .map_err(|e| LoadError::ShadowCopy(format!("{e:#}")))?;
            let copied_assembly = copies
                .into_iter()
                .next()
                .ok_or_else(|| LoadError::ShadowCopy("nothing was copied".to_string()))?;

            debug!(from = %assembly_path.display(), to = %copied_assembly.display(), "shadow copied assembly");
            AssemblyHandle::shadow_copied(copied_assembly, shadow_dir)
        } else {
            AssemblyHandle::in_place(assembly_path)
        };

        let (assembly, sources) = AssemblyManifest::load(handle.path())?.into_assembly()?;
        let source_info: Option<Arc<dyn SourceInformationProvider>> = if sources.is_empty() {
            None
        } else {
            Some(Arc::new(sources))
        };

        Ok(LoadedAssembly {
            assembly: Arc::new(assembly),
            handle,
            source_info,
            default_culture: project.isolation.culture.clone(),
        })
    }
}

/// Hands out an assembly that already lives in memory.
/// 提供一个已存在于内存中的程序集。
#[derive(Clone)]
pub struct InMemoryLoader {
    assembly: Arc<TestAssembly>,
    source_info: Option<Arc<dyn SourceInformationProvider>>,
}

impl InMemoryLoader {
    pub fn new(assembly: TestAssembly) -> Self {
        Self {
            assembly: Arc::new(assembly),
            source_info: None,
        }
    }

    pub fn with_source_information(mut self, provider: Arc<dyn SourceInformationProvider>) -> Self {
        self.source_info = Some(provider);
        self
    }
}

impl AssemblyLoader for InMemoryLoader {
    fn load(&self, project: &ProjectAssembly) -> Result<LoadedAssembly, LoadError> {
        Ok(LoadedAssembly {
            assembly: Arc::clone(&self.assembly),
            handle: AssemblyHandle::in_place(project.assembly_path.clone()),
            source_info: self.source_info.clone(),
            default_culture: project.isolation.culture.clone(),
        })
    }
}

fn expand_path(path: &Path) -> Result<PathBuf, LoadError> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| LoadError::Io(std::io::Error::other(e.to_string())))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
