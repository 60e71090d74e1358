use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::page::PageBox;

pub const DEFAULT_WIDTH_PT: f64 = 630.0;
pub const DEFAULT_HEIGHT_PT: f64 = 412.0;

pub const PROJECT_MANIFEST: &str = "Cargo.toml";
pub const TOOL_SECTION: &str = "pagefig";
pub const LEGACY_CONFIG_FILE: &str = "config.json";

/// The `width`/`height` pair a configuration file may declare.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SizeRecord {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl SizeRecord {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Fills missing or unusable values from the defaults.
    fn sanitized(self, path: &Path) -> PageBox {
        let width = sanitize_dimension(self.width, DEFAULT_WIDTH_PT, "width", path);
        let height = sanitize_dimension(self.height, DEFAULT_HEIGHT_PT, "height", path);
        PageBox::from_parts(width, height)
    }
}

fn sanitize_dimension(value: Option<f64>, default: f64, key: &str, path: &Path) -> f64 {
    match value {
        Some(value) if value.is_finite() && value > 0.0 => value,
        Some(value) => {
            tracing::warn!(
                path = %path.display(),
                key,
                value,
                "page box dimension must be positive; using default {default}pt"
            );
            default
        }
        None => default,
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Manifest {
    package: Option<ManifestSection>,
    workspace: Option<ManifestSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ManifestSection {
    metadata: Option<ToolMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ToolMetadata {
    pagefig: Option<SizeRecord>,
}

impl Manifest {
    fn size_record(self) -> SizeRecord {
        [self.package, self.workspace]
            .into_iter()
            .flatten()
            .filter_map(|section| section.metadata?.pagefig)
            .next()
            .unwrap_or_default()
    }
}

/// Which tier supplied the page box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Project(PathBuf),
    Legacy(PathBuf),
    Default,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(path) => write!(f, "project manifest {}", path.display()),
            Self::Legacy(path) => write!(f, "user config {}", path.display()),
            Self::Default => f.write_str("built-in defaults"),
        }
    }
}

/// Where configuration is looked up. Constructed explicitly so tests can
/// point it at temporary directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub search_root: PathBuf,
    pub user_config: Option<PathBuf>,
    /// Last directory the manifest search visits. `None` walks to the
    /// filesystem root.
    pub ceiling: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn discover() -> AppResult<Self> {
        let search_root = std::env::current_dir().map_err(|source| {
            AppError::io_with_context(source, "failed to resolve current directory")
        })?;
        Ok(Self {
            search_root,
            user_config: default_user_config_path(),
            ceiling: None,
        })
    }

    pub fn new(search_root: impl Into<PathBuf>, user_config: Option<PathBuf>) -> Self {
        Self {
            search_root: search_root.into(),
            user_config,
            ceiling: None,
        }
    }

    pub fn with_ceiling(mut self, ceiling: impl Into<PathBuf>) -> Self {
        self.ceiling = Some(ceiling.into());
        self
    }

    /// The manifest that takes precedence over the per-user file, if any.
    pub fn project_manifest(&self) -> Option<PathBuf> {
        find_project_manifest(&self.search_root, self.ceiling.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub page_box: PageBox,
    pub origin: ConfigOrigin,
}

impl LoadedConfig {
    pub fn defaults() -> Self {
        Self {
            page_box: PageBox::default(),
            origin: ConfigOrigin::Default,
        }
    }
}

/// Resolves the page box from the project manifest, then the per-user file,
/// then the built-in defaults.
pub fn load(paths: &ConfigPaths) -> AppResult<LoadedConfig> {
    if let Some(manifest) = paths.project_manifest() {
        let record = load_project_manifest(&manifest)?;
        if record.is_empty() {
            tracing::debug!(
                path = %manifest.display(),
                "project manifest declares no page box; using defaults"
            );
            return Ok(LoadedConfig::defaults());
        }
        tracing::debug!(path = %manifest.display(), "page box loaded from project manifest");
        return Ok(LoadedConfig {
            page_box: record.sanitized(&manifest),
            origin: ConfigOrigin::Project(manifest),
        });
    }

    if let Some(path) = paths.user_config.as_deref()
        && let Some(record) = load_legacy(path)?
    {
        tracing::warn!(
            path = %path.display(),
            "reading the page box from the per-user config file is deprecated; \
             declare [package.metadata.{TOOL_SECTION}] in {PROJECT_MANIFEST} instead"
        );
        return Ok(LoadedConfig {
            page_box: record.sanitized(path),
            origin: ConfigOrigin::Legacy(path.to_path_buf()),
        });
    }

    tracing::debug!("no configuration found; using default page box");
    Ok(LoadedConfig::defaults())
}

/// Walks from `start` towards the root, stopping after `ceiling` when given.
pub fn find_project_manifest(start: &Path, ceiling: Option<&Path>) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(PROJECT_MANIFEST);
        if candidate.is_file() {
            return Some(candidate);
        }
        if ceiling == Some(dir) {
            break;
        }
    }
    None
}

pub fn load_project_manifest(path: impl AsRef<Path>) -> AppResult<SizeRecord> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| {
        AppError::io_with_context(source, format!("failed to read manifest: {}", path.display()))
    })?;
    let manifest = toml::from_str::<Manifest>(&raw)
        .map_err(|source| AppError::config(path, source.to_string()))?;
    Ok(manifest.size_record())
}

/// Returns `None` when the file does not exist.
pub fn load_legacy(path: impl AsRef<Path>) -> AppResult<Option<SizeRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    if !path.is_file() {
        return Err(AppError::config(path, "config path is not a regular file"));
    }

    let raw = fs::read_to_string(path).map_err(|source| {
        AppError::io_with_context(source, format!("failed to read config: {}", path.display()))
    })?;
    let record = serde_json::from_str::<SizeRecord>(&raw)
        .map_err(|source| AppError::config(path, source.to_string()))?;
    Ok(Some(record))
}

/// Writes the page box into the per-user file, keeping any other keys it
/// already holds.
///
/// A file that exists but cannot be read or is not a JSON object is left
/// untouched and reported as an error.
pub fn write_user_config(path: impl AsRef<Path>, page_box: PageBox) -> AppResult<()> {
    let path = path.as_ref();
    let mut object = match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Err(AppError::config(path, "expected a JSON object")),
            Err(source) => return Err(AppError::config(path, source.to_string())),
        },
        Err(source) if source.kind() == io::ErrorKind::NotFound => Map::new(),
        Err(source) => {
            return Err(AppError::io_with_context(
                source,
                format!("failed to read config: {}", path.display()),
            ));
        }
    };
    object.insert("width".to_string(), Value::from(page_box.width_pt()));
    object.insert("height".to_string(), Value::from(page_box.height_pt()));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| {
            AppError::io_with_context(
                source,
                format!("failed to create config directory: {}", parent.display()),
            )
        })?;
    }

    let rendered = serde_json::to_string_pretty(&Value::Object(object))
        .map_err(|source| AppError::config(path, source.to_string()))?;
    fs::write(path, rendered).map_err(|source| {
        AppError::io_with_context(source, format!("failed to write config: {}", path.display()))
    })
}

pub fn default_user_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("PAGEFIG_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("pagefig").join(LEGACY_CONFIG_FILE));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("pagefig")
                .join(LEGACY_CONFIG_FILE),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("pagefig").join(LEGACY_CONFIG_FILE));
    }
    None
}
