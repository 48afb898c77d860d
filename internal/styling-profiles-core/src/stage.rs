use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{config::PathConfig, profile::ProfileId, Error, Result};

/// Creates the missing ancestors of `path` with mode `0755`.
pub(crate) fn create_parent_dirs(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt as _;
        builder.mode(0o755);
    }
    builder.create(parent).map_err(Error::io(parent))
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StageReport {
    /// Destination of every copied file, in walk order.
    pub copied: Vec<PathBuf>,
}

/// Copies the allow-listed theme sources into a profile's staging directory.
pub struct Stager<'a> {
    config: &'a PathConfig,
}

impl<'a> Stager<'a> {
    pub fn new(config: &'a PathConfig) -> Self {
        Self { config }
    }

    /// Maps a file under `themes/custom` onto the profile's staging directory.
    pub fn destination(&self, id: &ProfileId, source: &Path) -> Option<PathBuf> {
        let relative = source.strip_prefix(self.config.themes_root()).ok()?;
        Some(self.config.profile_root(id).join(relative))
    }

    /// Recopies every matching file. Stale files in the destination are left
    /// alone, and files copied before a failure stay copied.
    pub fn stage(&self, id: &ProfileId) -> Result<StageReport> {
        info!("Staging theme sources for profile {id}");

        let mut report = StageReport::default();

        for root in self.config.theme_roots() {
            let meta = fs::metadata(&root).map_err(Error::io(&root))?;
            if !meta.is_dir() {
                return Err(Error::Io {
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "theme root is not a directory",
                    ),
                    path: root,
                });
            }

            for entry in WalkDir::new(&root) {
                let entry = entry?;
                if !entry.file_type().is_file() || !self.config.is_staged_extension(entry.path()) {
                    continue;
                }

                let Some(dest) = self.destination(id, entry.path()) else {
                    continue;
                };

                create_parent_dirs(&dest)?;
                fs::copy(entry.path(), &dest).map_err(Error::io(&dest))?;
                debug!("{} -> {}", entry.path().display(), dest.display());
                report.copied.push(dest);
            }
        }

        info!("Staged {} files for profile {id}", report.copied.len());
        Ok(report)
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn files_under(root: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).unwrap().to_owned())
            .collect()
    }

    fn fixture() -> (tempfile::TempDir, PathConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let themes = dir.path().join("themes/custom");

        write(&themes.join("iq_barrio/resources/sass/_template.scss.txt"), "$p: {{primary}};");
        write(&themes.join("iq_barrio/resources/sass/style.scss"), "@import 'definitions';");
        write(&themes.join("iq_barrio/resources/sass/components/_button.scss"), ".btn {}");
        write(&themes.join("iq_barrio/config.rb"), "sass_dir = 'sass'");
        write(&themes.join("iq_barrio/iq_barrio.info.yml"), "name: barrio");
        write(&themes.join("iq_barrio/images/logo.png"), "png");
        write(&themes.join("iq_custom/theme.ini"), "[theme]");
        write(&themes.join("iq_custom/resources/sass/_custom.scss"), "$x: 1;");
        write(&themes.join("iq_custom/resources/sass/UPPER.SCSS"), "$y: 1;");
        fs::create_dir_all(themes.join("iq_custom/empty/nested")).unwrap();

        let config = PathConfig::new(dir.path());
        (dir, config)
    }

    #[test]
    fn test_stage_copies_allow_listed_files() {
        let (dir, config) = fixture();
        let id = ProfileId::parse("dark").unwrap();

        let report = Stager::new(&config).stage(&id).expect("should stage");
        assert_eq!(report.copied.len(), 5);

        let staged = config.profile_root(&id);
        assert_eq!(
            files_under(&staged),
            [
                "iq_barrio/resources/sass/style.scss",
                "iq_barrio/resources/sass/components/_button.scss",
                "iq_barrio/config.rb",
                "iq_custom/theme.ini",
                "iq_custom/resources/sass/_custom.scss",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect::<BTreeSet<_>>()
        );
        assert!(!staged.join("iq_custom/empty").exists());

        for relative in files_under(&staged) {
            let source = dir.path().join("themes/custom").join(&relative);
            assert_eq!(fs::read(source).unwrap(), fs::read(staged.join(&relative)).unwrap());
        }
    }

    #[test]
    fn test_stage_overwrites_and_keeps_stale_files() {
        let (dir, config) = fixture();
        let id = ProfileId::parse("dark").unwrap();
        let stager = Stager::new(&config);
        stager.stage(&id).expect("should stage");

        let staged = config.profile_root(&id);
        write(&staged.join("iq_custom/stale.scss"), "old");
        write(
            &dir.path().join("themes/custom/iq_custom/resources/sass/_custom.scss"),
            "$x: 2;",
        );

        stager.stage(&id).expect("should stage again");
        assert_eq!(
            fs::read_to_string(staged.join("iq_custom/resources/sass/_custom.scss")).unwrap(),
            "$x: 2;"
        );
        assert!(staged.join("iq_custom/stale.scss").exists());
    }

    #[test]
    fn test_stage_missing_theme_root() {
        let (dir, mut config) = fixture();
        config.themes.push("missing".to_owned());
        let id = ProfileId::parse("dark").unwrap();

        let r = Stager::new(&config).stage(&id);
        let expected = dir.path().join("themes/custom/missing");
        assert!(matches!(r, Err(Error::Io { ref path, .. }) if *path == expected));
    }

    #[test]
    fn test_stage_respects_extension_config() {
        let (_dir, mut config) = fixture();
        config.extensions = vec!["scss".to_owned(), "rb".to_owned()];
        let id = ProfileId::parse("light").unwrap();

        Stager::new(&config).stage(&id).expect("should stage");
        let staged = files_under(&config.profile_root(&id));
        assert!(!staged.contains(Path::new("iq_custom/theme.ini")));
        assert!(staged.contains(Path::new("iq_barrio/config.rb")));
    }

    #[test]
    fn test_stage_failure_keeps_earlier_copies() {
        let (_dir, config) = fixture();
        let id = ProfileId::parse("dark").unwrap();
        let staged = config.profile_root(&id);

        // iq_custom can't be created as a directory, iq_barrio is walked first.
        write(&staged.join("iq_custom"), "in the way");

        let r = Stager::new(&config).stage(&id);
        let blocked = staged.join("iq_custom");
        assert!(matches!(r, Err(Error::Io { ref path, .. }) if path.starts_with(&blocked)));
        assert!(staged.join("iq_barrio/resources/sass/style.scss").is_file());
        assert!(staged.join("iq_barrio/config.rb").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_created_dirs_use_0755() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a/b/c.txt");
        create_parent_dirs(&path).expect("should create");

        let mode = fs::metadata(dir.path().join("a/b")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777 & !0o755, 0);
    }
}
