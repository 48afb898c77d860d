use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use styling_profiles_core::{load_config, PathConfig, ProfileId};
use tokio::{sync::mpsc, task::spawn_blocking};

use crate::{internal_prelude::*, open, Service};

/// What a changed path means for the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteChange {
    Config,
    /// A staged theme source or the definitions template.
    Sources,
    Profile(ProfileId),
}

pub fn classify(config: &PathConfig, path: &Path) -> Option<SiteChange> {
    if path == config.config_file() {
        return Some(SiteChange::Config);
    }

    let profiles_dir = config.profiles_dir();
    if path.parent() == Some(profiles_dir.as_path()) {
        if !path.extension().is_some_and(|ext| ext == "toml") {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy();
        return ProfileId::parse(&stem).ok().map(SiteChange::Profile);
    }

    let in_theme = config.theme_roots().iter().any(|root| path.starts_with(root));
    if in_theme && (config.is_staged_extension(path) || path == config.template_path()) {
        Some(SiteChange::Sources)
    } else {
        None
    }
}

/// Changes collected over one debounce window.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingRebuild {
    pub config: bool,
    pub sources: bool,
    pub profiles: BTreeSet<ProfileId>,
}

impl PendingRebuild {
    pub fn add(&mut self, change: SiteChange) {
        match change {
            SiteChange::Config => self.config = true,
            SiteChange::Sources => self.sources = true,
            SiteChange::Profile(id) => {
                self.profiles.insert(id);
            }
        }
    }

    pub fn add_path(&mut self, config: &PathConfig, path: &Path) {
        if let Some(change) = classify(config, path) {
            self.add(change);
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.config && !self.sources && self.profiles.is_empty()
    }

    /// Config or source changes rebuild every profile; record changes only
    /// rebuild the profiles whose record changed. Returns the rebuilt ids.
    pub fn apply(&self, service: &Service) -> Result<Vec<ProfileId>> {
        if self.config || self.sources {
            return Ok(service
                .materialize_all()?
                .into_iter()
                .map(|(id, _)| id)
                .collect());
        }

        let mut rebuilt = Vec::new();
        for id in &self.profiles {
            // Deleted records have nothing left to rebuild.
            if !service.store().exists(id) {
                continue;
            }
            let profile = service.store().load(id)?;
            service.materialize(&profile)?;
            rebuilt.push(id.clone());
        }
        Ok(rebuilt)
    }
}

fn watch_site(config: &PathConfig) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |e: notify::Result<Event>| {
        if let Ok(e) = e {
            for path in e.paths {
                if events_tx.send(path).is_err() {
                    break;
                }
            }
        }
    })?;

    // The app root is watched rather than the config file so a config
    // created after startup is picked up too.
    watcher.watch(&config.app_root, RecursiveMode::NonRecursive)?;

    let profiles_dir = config.profiles_dir();
    fs::create_dir_all(&profiles_dir).map_err(styling_profiles_core::Error::io(&profiles_dir))?;
    watcher.watch(&profiles_dir, RecursiveMode::NonRecursive)?;

    for root in config.theme_roots() {
        watcher.watch(&root, RecursiveMode::Recursive)?;
    }

    Ok((watcher, events_rx))
}

async fn next_batch(
    config: &PathConfig,
    events: &mut mpsc::UnboundedReceiver<PathBuf>,
) -> Option<PendingRebuild> {
    let mut pending = PendingRebuild::default();
    while pending.is_empty() {
        let path = events.recv().await?;
        pending.add_path(config, &path);
    }

    // Editors tend to emit a burst of events per save.
    while let Ok(Some(path)) = tokio::time::timeout(Duration::from_millis(50), events.recv()).await {
        pending.add_path(config, &path);
    }

    Some(pending)
}

/// Rebuilds every profile, then keeps rebuilding as theme sources, profile
/// records or the config file change.
pub async fn run(app_root: PathBuf, mut config: PathConfig) -> Result<()> {
    let pending = PendingRebuild {
        sources: true,
        ..Default::default()
    };
    let service = open(config.clone());
    let rebuilt = spawn_blocking(move || pending.apply(&service)).await??;
    info!("Rebuilt {} styling profiles", rebuilt.len());

    loop {
        let (_watcher, mut events) = watch_site(&config)?;
        info!("Watching {} for changes", config.app_root.display());

        loop {
            let Some(pending) = next_batch(&config, &mut events).await else {
                return Ok(());
            };

            let reload = pending.config;
            if reload {
                let app_root = app_root.clone();
                match spawn_blocking(move || load_config(&app_root)).await? {
                    Ok(new_config) => config = new_config,
                    Err(e) => {
                        error!("{e}");
                        continue;
                    }
                }
            }

            let service = open(config.clone());
            match spawn_blocking(move || pending.apply(&service)).await? {
                Ok(rebuilt) => info!("Rebuilt {} styling profiles", rebuilt.len()),
                Err(e) => error!("{e}"),
            }

            // Theme roots and the profiles dir may have moved.
            if reload {
                break;
            }
        }
    }
}
