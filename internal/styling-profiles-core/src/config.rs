use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{profile::ProfileId, Error, Result};

/// Name of the optional config file looked up in the app root.
pub const CONFIG_FILE: &str = "styling-profiles.toml";

const THEMES_DIR: &str = "themes/custom";
const STAGING_DIR: &str = "sites/default/files/styling_profiles";

fn default_themes() -> Vec<String> {
    vec!["iq_barrio".to_owned(), "iq_custom".to_owned()]
}

fn default_primary_theme() -> String {
    "iq_barrio".to_owned()
}

fn default_extensions() -> Vec<String> {
    vec!["scss".to_owned(), "ini".to_owned(), "rb".to_owned()]
}

fn default_template() -> PathBuf {
    PathBuf::from("resources/sass/_template.scss.txt")
}

fn default_definitions() -> PathBuf {
    PathBuf::from("resources/sass/_definitions.scss")
}

/// Locations and theme names every staging and rendering step works from.
///
/// `app_root` is never read from the config file; it is whatever the caller
/// passed to [`load_config`] or [`PathConfig::new`].
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathConfig {
    #[serde(skip)]
    pub app_root: PathBuf,
    #[serde(default = "default_themes")]
    pub themes: Vec<String>,
    #[serde(default = "default_primary_theme")]
    pub primary_theme: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Relative to the primary theme's source root.
    #[serde(default = "default_template")]
    pub template: PathBuf,
    /// Relative to the primary theme's staged root.
    #[serde(default = "default_definitions")]
    pub definitions: PathBuf,
    pub profiles_dir: Option<PathBuf>,
    pub base_settings: Option<PathBuf>,
    pub compile_command: Option<Vec<String>>,
}

impl PathConfig {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            themes: default_themes(),
            primary_theme: default_primary_theme(),
            extensions: default_extensions(),
            template: default_template(),
            definitions: default_definitions(),
            profiles_dir: None,
            base_settings: None,
            compile_command: None,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.app_root.join(CONFIG_FILE)
    }

    /// `<app_root>/themes/custom`, the prefix stripped from every staged path.
    pub fn themes_root(&self) -> PathBuf {
        self.app_root.join(THEMES_DIR)
    }

    pub fn theme_roots(&self) -> Vec<PathBuf> {
        let root = self.themes_root();
        self.themes.iter().map(|theme| root.join(theme)).collect()
    }

    pub fn staging_root(&self) -> PathBuf {
        self.app_root.join(STAGING_DIR)
    }

    pub fn profile_root(&self, id: &ProfileId) -> PathBuf {
        self.staging_root().join(id.as_str())
    }

    pub fn template_path(&self) -> PathBuf {
        self.themes_root()
            .join(&self.primary_theme)
            .join(&self.template)
    }

    pub fn definitions_path(&self, id: &ProfileId) -> PathBuf {
        self.profile_root(id)
            .join(&self.primary_theme)
            .join(&self.definitions)
    }

    pub fn profiles_dir(&self) -> PathBuf {
        match &self.profiles_dir {
            Some(dir) => self.app_root.join(dir),
            None => self.app_root.join("config/styling_profiles"),
        }
    }

    pub fn base_settings_path(&self) -> PathBuf {
        match &self.base_settings {
            Some(path) => self.app_root.join(path),
            None => self
                .app_root
                .join("config")
                .join(format!("{}.settings.toml", self.primary_theme)),
        }
    }

    /// True if `path` has an extension from the allow-list. Case-sensitive.
    pub fn is_staged_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == *ext))
    }
}

pub fn load_config(app_root: &Path) -> Result<PathConfig> {
    let path = app_root.join(CONFIG_FILE);

    let mut config = match fs::read_to_string(&path) {
        Ok(contents) => toml::from_str::<PathConfig>(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => PathConfig::new(app_root),
        Err(e) => return Err(Error::io(&path)(e)),
    };
    config.app_root = app_root.to_owned();

    if config.extensions.iter().any(|e| e.is_empty()) {
        return Err(Error::Config(
            "styling-profiles config extensions can't be empty strings".to_owned(),
        ));
    }

    if !config.themes.contains(&config.primary_theme) {
        return Err(Error::Config(format!(
            "primary theme `{}` is not one of the configured themes",
            config.primary_theme
        )));
    }

    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PathConfig::new("/srv/www");
        let id = ProfileId::parse("dark").expect("valid id");

        assert_eq!(
            config.theme_roots(),
            vec![
                PathBuf::from("/srv/www/themes/custom/iq_barrio"),
                PathBuf::from("/srv/www/themes/custom/iq_custom"),
            ]
        );
        assert_eq!(
            config.template_path(),
            PathBuf::from("/srv/www/themes/custom/iq_barrio/resources/sass/_template.scss.txt")
        );
        assert_eq!(
            config.definitions_path(&id),
            PathBuf::from(
                "/srv/www/sites/default/files/styling_profiles/dark/iq_barrio/resources/sass/_definitions.scss"
            )
        );
        assert_eq!(
            config.base_settings_path(),
            PathBuf::from("/srv/www/config/iq_barrio.settings.toml")
        );
    }

    #[test]
    fn test_staged_extension() {
        let config = PathConfig::new("/srv/www");

        assert!(config.is_staged_extension(Path::new("a/b/_vars.scss")));
        assert!(config.is_staged_extension(Path::new("config.rb")));
        assert!(config.is_staged_extension(Path::new("theme.ini")));
        assert!(!config.is_staged_extension(Path::new("a/b/_vars.SCSS")));
        assert!(!config.is_staged_extension(Path::new("logo.png")));
        assert!(!config.is_staged_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(dir.path()).expect("defaults");

        assert_eq!(config.app_root, dir.path());
        assert_eq!(config.extensions, default_extensions());
    }

    #[test]
    fn test_load_config_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
            themes = ["base", "site"]
            primary_theme = "base"
            extensions = ["scss", "rb"]
            compile_command = ["sass", "--no-source-map"]
            "#,
        )
        .expect("write config");

        let config = load_config(dir.path()).expect("valid config");
        assert_eq!(config.themes, vec!["base", "site"]);
        assert_eq!(config.extensions, vec!["scss", "rb"]);
        assert_eq!(config.template, default_template());
        assert_eq!(
            config.compile_command,
            Some(vec!["sass".to_owned(), "--no-source-map".to_owned()])
        );
    }

    #[test]
    fn test_load_config_rejects_bad_values() {
        let dir = tempfile::tempdir().expect("tempdir");

        fs::write(dir.path().join(CONFIG_FILE), "extensions = [\"scss\", \"\"]").unwrap();
        assert!(matches!(load_config(dir.path()), Err(Error::Config(_))));

        fs::write(dir.path().join(CONFIG_FILE), "primary_theme = \"missing\"").unwrap();
        assert!(matches!(load_config(dir.path()), Err(Error::Config(_))));

        fs::write(dir.path().join(CONFIG_FILE), "unknown_key = 1").unwrap();
        assert!(matches!(load_config(dir.path()), Err(Error::Config(_))));
    }
}
