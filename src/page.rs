use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::config::{
    self, ConfigOrigin, ConfigPaths, DEFAULT_HEIGHT_PT, DEFAULT_WIDTH_PT, LoadedConfig,
    TOOL_SECTION,
};
use crate::error::{AppError, AppResult};
use crate::figsize::{FigsizeParams, FigureSize, figsize};

/// Usable width and height of the typeset page region, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    width_pt: f64,
    height_pt: f64,
}

impl PageBox {
    pub fn new(width_pt: f64, height_pt: f64) -> AppResult<Self> {
        if !(width_pt.is_finite() && width_pt > 0.0) {
            return Err(AppError::invalid_argument(format!(
                "page width must be positive, got {width_pt}"
            )));
        }
        if !(height_pt.is_finite() && height_pt > 0.0) {
            return Err(AppError::invalid_argument(format!(
                "page height must be positive, got {height_pt}"
            )));
        }
        Ok(Self::from_parts(width_pt, height_pt))
    }

    pub(crate) fn from_parts(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    pub fn width_pt(&self) -> f64 {
        self.width_pt
    }

    pub fn height_pt(&self) -> f64 {
        self.height_pt
    }

    pub fn get(&self) -> (f64, f64) {
        (self.width_pt, self.height_pt)
    }
}

impl Default for PageBox {
    fn default() -> Self {
        Self::from_parts(DEFAULT_WIDTH_PT, DEFAULT_HEIGHT_PT)
    }
}

impl fmt::Display for PageBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pt, {}pt", self.width_pt, self.height_pt)
    }
}

/// Owns the current page box and the sources it was read from.
///
/// Not meant to be shared across threads: overrides are a save/restore
/// discipline on one call stack, which `context` enforces through `&mut`.
#[derive(Debug, Clone)]
pub struct PageBoxConfig {
    current: PageBox,
    origin: ConfigOrigin,
    paths: Option<ConfigPaths>,
}

impl PageBoxConfig {
    /// Loads from the current directory and the per-user config location.
    pub fn load() -> AppResult<Self> {
        Self::load_from(ConfigPaths::discover()?)
    }

    pub fn load_from(paths: ConfigPaths) -> AppResult<Self> {
        let LoadedConfig { page_box, origin } = config::load(&paths)?;
        Ok(Self {
            current: page_box,
            origin,
            paths: Some(paths),
        })
    }

    /// An in-memory config with no backing files; `set` never persists and
    /// `reload` is a no-op.
    pub fn in_memory(page_box: PageBox) -> Self {
        Self {
            current: page_box,
            origin: ConfigOrigin::Default,
            paths: None,
        }
    }

    pub fn get(&self) -> PageBox {
        self.current
    }

    pub fn origin(&self) -> &ConfigOrigin {
        &self.origin
    }

    /// Replaces the page box and persists it to the per-user config file.
    ///
    /// The in-memory value is updated before persisting, so a write failure
    /// is reported but leaves the new size in effect.
    ///
    /// When a project manifest is in scope the per-user file would never be
    /// read back, so nothing is written: the new size lasts until the next
    /// `reload` and a warning names the manifest to edit instead.
    pub fn set(&mut self, width_pt: f64, height_pt: f64) -> AppResult<()> {
        let page_box = PageBox::new(width_pt, height_pt)?;
        self.current = page_box;

        let Some(paths) = self.paths.as_ref() else {
            return Ok(());
        };
        if let Some(manifest) = paths.project_manifest() {
            tracing::warn!(
                path = %manifest.display(),
                "page box {page_box} is kept in memory only; set width/height under \
                 [package.metadata.{TOOL_SECTION}] in the project manifest to keep it"
            );
            return Ok(());
        }
        match paths.user_config.as_deref() {
            Some(path) => config::write_user_config(path, page_box),
            None => Ok(()),
        }
    }

    /// Temporarily applies a page box until the returned guard is dropped.
    pub fn context(&mut self, width_pt: f64, height_pt: f64) -> AppResult<PageBoxOverride<'_>> {
        let page_box = PageBox::new(width_pt, height_pt)?;
        let saved = std::mem::replace(&mut self.current, page_box);
        Ok(PageBoxOverride {
            config: self,
            saved,
        })
    }

    pub fn with_context<R>(
        &mut self,
        width_pt: f64,
        height_pt: f64,
        f: impl FnOnce(&mut PageBoxConfig) -> R,
    ) -> AppResult<R> {
        let mut guard = self.context(width_pt, height_pt)?;
        Ok(f(&mut *guard))
    }

    /// Re-reads the backing sources, discarding any `set` not yet on disk.
    ///
    /// Reloading through an active override guard is not supported: the
    /// guard restores its saved box on drop and the reloaded one is lost.
    pub fn reload(&mut self) -> AppResult<()> {
        let Some(paths) = self.paths.as_ref() else {
            return Ok(());
        };
        let LoadedConfig { page_box, origin } = config::load(paths)?;
        self.current = page_box;
        self.origin = origin;
        Ok(())
    }

    pub fn figsize(&self, params: &FigsizeParams) -> AppResult<FigureSize> {
        figsize(self.current, params)
    }
}

impl fmt::Display for PageBoxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.current, f)
    }
}

/// Restores the page box saved by [`PageBoxConfig::context`] when dropped,
/// including during unwinding.
#[derive(Debug)]
pub struct PageBoxOverride<'a> {
    config: &'a mut PageBoxConfig,
    saved: PageBox,
}

impl Deref for PageBoxOverride<'_> {
    type Target = PageBoxConfig;

    fn deref(&self) -> &Self::Target {
        self.config
    }
}

impl DerefMut for PageBoxOverride<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.config
    }
}

impl Drop for PageBoxOverride<'_> {
    fn drop(&mut self) {
        self.config.current = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::{PageBox, PageBoxConfig};
    use crate::config::tests::unique_temp_dir;
    use crate::config::{ConfigOrigin, ConfigPaths};
    use crate::error::{AppError, AppResult};

    fn config_10_20() -> PageBoxConfig {
        PageBoxConfig::in_memory(PageBox::new(10.0, 20.0).expect("valid box"))
    }

    #[test]
    fn get_and_set_replace_both_fields() {
        let mut config = config_10_20();
        assert_eq!(config.get().get(), (10.0, 20.0));

        config.set(43.0, 44.0).expect("memory-only set should succeed");
        assert_eq!(config.get().get(), (43.0, 44.0));
    }

    #[test]
    fn set_rejects_non_positive_without_partial_update() {
        let mut config = config_10_20();
        let err = config.set(43.0, 0.0).expect_err("zero height must be rejected");
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(config.get().get(), (10.0, 20.0));
    }

    #[test]
    fn context_restores_after_scope() {
        let mut config = config_10_20();
        {
            let scoped = config.context(44.0, 43.0).expect("valid override");
            assert_eq!(scoped.get().get(), (44.0, 43.0));
        }
        assert_eq!(config.get().get(), (10.0, 20.0));
    }

    #[test]
    fn context_restores_after_error_return() {
        fn fails_inside(config: &mut PageBoxConfig) -> AppResult<()> {
            let scoped = config.context(44.0, 43.0)?;
            assert_eq!(scoped.get().get(), (44.0, 43.0));
            Err(AppError::invalid_argument("boom"))
        }

        let mut config = config_10_20();
        assert!(fails_inside(&mut config).is_err());
        assert_eq!(config.get().get(), (10.0, 20.0));
    }

    #[test]
    fn context_restores_after_panic() {
        let mut config = config_10_20();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _scoped = config.context(44.0, 43.0).expect("valid override");
            panic!("plotting failed");
        }));
        assert!(result.is_err());
        assert_eq!(config.get().get(), (10.0, 20.0));
    }

    #[test]
    fn nested_context_restores_enclosing_override() {
        let mut config = config_10_20();
        {
            let mut outer = config.context(100.0, 200.0).expect("valid override");
            {
                let inner = outer.context(1.0, 2.0).expect("valid override");
                assert_eq!(inner.get().get(), (1.0, 2.0));
            }
            assert_eq!(outer.get().get(), (100.0, 200.0));
        }
        assert_eq!(config.get().get(), (10.0, 20.0));
    }

    #[test]
    fn with_context_returns_closure_result() {
        let mut config = config_10_20();
        let seen = config
            .with_context(44.0, 43.0, |scoped| scoped.get().get())
            .expect("valid override");
        assert_eq!(seen, (44.0, 43.0));
        assert_eq!(config.get().get(), (10.0, 20.0));
    }

    #[test]
    fn set_persists_and_reload_reads_it_back() {
        let root = unique_temp_dir("page_set");
        let user = root.join("user").join("config.json");
        let paths = ConfigPaths::new(&root, Some(user.clone())).with_ceiling(&root);
        let mut config = PageBoxConfig::load_from(paths).expect("config should load");
        assert_eq!(config.origin(), &ConfigOrigin::Default);

        config.set(345.0, 598.0).expect("set should persist");
        let raw = fs::read_to_string(&user).expect("user config should exist");
        assert!(raw.contains("345"));

        config.reload().expect("reload should succeed");
        assert_eq!(config.get().get(), (345.0, 598.0));
        assert_eq!(config.origin(), &ConfigOrigin::Legacy(user.clone()));

        fs::remove_dir_all(&root).expect("temp dir should be removed");
    }

    #[test]
    fn reload_discards_unpersisted_changes() {
        let root = unique_temp_dir("page_reload");
        fs::write(
            root.join("Cargo.toml"),
            "[package.metadata.pagefig]\nwidth = 400\nheight = 300\n",
        )
        .expect("manifest should be written");
        let mut config =
            PageBoxConfig::load_from(ConfigPaths::new(&root, None)).expect("config should load");
        assert_eq!(config.get().get(), (400.0, 300.0));

        config.set(1.0, 1.0).expect("memory-only set should succeed");
        config.reload().expect("reload should succeed");
        assert_eq!(config.get().get(), (400.0, 300.0));

        fs::remove_dir_all(&root).expect("temp dir should be removed");
    }

    #[test]
    fn set_under_manifest_does_not_write_user_file() {
        let root = unique_temp_dir("page_set_manifest");
        fs::write(
            root.join("Cargo.toml"),
            "[package.metadata.pagefig]\nwidth = 400\nheight = 300\n",
        )
        .expect("manifest should be written");
        let user = root.join("user").join("config.json");
        let paths = ConfigPaths::new(&root, Some(user.clone())).with_ceiling(&root);
        let mut config = PageBoxConfig::load_from(paths).expect("config should load");

        config.set(100.0, 50.0).expect("memory-only set should succeed");
        assert_eq!(config.get().get(), (100.0, 50.0));
        assert!(!user.exists());

        config.reload().expect("reload should succeed");
        assert_eq!(config.get().get(), (400.0, 300.0));
        assert_eq!(
            config.origin(),
            &ConfigOrigin::Project(root.join("Cargo.toml"))
        );

        fs::remove_dir_all(&root).expect("temp dir should be removed");
    }

    #[test]
    fn set_under_manifest_without_section_does_not_write_user_file() {
        let root = unique_temp_dir("page_set_bare_manifest");
        fs::write(root.join("Cargo.toml"), "[package]\nname = \"bare\"\n")
            .expect("manifest should be written");
        let user = root.join("config.json");
        let paths = ConfigPaths::new(&root, Some(user.clone())).with_ceiling(&root);
        let mut config = PageBoxConfig::load_from(paths).expect("config should load");
        assert_eq!(config.origin(), &ConfigOrigin::Default);

        config.set(100.0, 50.0).expect("memory-only set should succeed");
        assert!(!user.exists());

        fs::remove_dir_all(&root).expect("temp dir should be removed");
    }

    #[test]
    fn set_keeps_new_value_when_persisting_fails() {
        let root = unique_temp_dir("page_persist_fail");
        let blocker = root.join("not_a_dir");
        fs::write(&blocker, "file").expect("blocker should be written");
        let paths =
            ConfigPaths::new(&root, Some(blocker.join("config.json"))).with_ceiling(&root);
        let mut config = PageBoxConfig::load_from(paths).expect("config should load");

        let err = config.set(43.0, 44.0).expect_err("write below a file must fail");
        assert!(matches!(err, AppError::Io { .. }));
        assert_eq!(config.get().get(), (43.0, 44.0));

        fs::remove_dir_all(&root).expect("temp dir should be removed");
    }

    #[test]
    fn display_uses_point_suffix() {
        assert_eq!(config_10_20().to_string(), "10pt, 20pt");
    }
}
