use std::path::Path;

use tracing::{info, warn};

use crate::{
    config::PathConfig,
    form::{ProfileForm, Submission},
    profile::{ProfileId, StylingProfile},
    render::{render, RenderOutcome},
    stage::{StageReport, Stager},
    store::{ProfileStore, SaveStatus},
    Error, Result,
};

/// Hands a staged profile tree to the stylesheet compiler.
pub trait CompilationTrigger {
    fn compile(&self, id: &ProfileId, staged_root: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompilation;

impl CompilationTrigger for NoCompilation {
    fn compile(&self, _id: &ProfileId, _staged_root: &Path) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub stage: StageReport,
    pub render: RenderOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Saved {
    pub profile: StylingProfile,
    pub status: SaveStatus,
    pub materialized: Materialized,
}

pub struct ProfileService<C = NoCompilation> {
    config: PathConfig,
    store: ProfileStore,
    compiler: C,
}

impl ProfileService<NoCompilation> {
    pub fn new(config: PathConfig) -> Self {
        Self::with_compiler(config, NoCompilation)
    }
}

impl<C: CompilationTrigger> ProfileService<C> {
    pub fn with_compiler(config: PathConfig, compiler: C) -> Self {
        let store = ProfileStore::new(config.profiles_dir());
        Self {
            config,
            store,
            compiler,
        }
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Validates and persists a submission, then stages and renders it.
    ///
    /// A staging or rendering failure leaves the record persisted.
    pub fn save(&self, form: ProfileForm<'_>, submission: Submission) -> Result<Saved> {
        let profile = form.validate(submission, &self.store)?;
        let status = self.store.save(&profile)?;

        let materialized = self.materialize(&profile)?;

        let staged_root = self.config.profile_root(&profile.id);
        if let Err(e) = self.compiler.compile(&profile.id, &staged_root) {
            warn!("Compilation for profile {} failed to start: {e}", profile.id);
        }

        info!(
            "Styling profile {} has been {}.",
            profile.label,
            status.as_str()
        );

        Ok(Saved {
            profile,
            status,
            materialized,
        })
    }

    /// Stages the theme sources for `profile`, then renders its definitions file.
    pub fn materialize(&self, profile: &StylingProfile) -> Result<Materialized> {
        let stage = Stager::new(&self.config).stage(&profile.id)?;
        let render = render(
            &profile.styles,
            &self.config.template_path(),
            &self.config.definitions_path(&profile.id),
        )?;
        Ok(Materialized { stage, render })
    }

    /// Materializes every stored profile, stopping at the first failure.
    pub fn materialize_all(&self) -> Result<Vec<(ProfileId, Materialized)>> {
        self.store
            .list()?
            .into_iter()
            .map(|profile| Ok((profile.id.clone(), self.materialize(&profile)?)))
            .collect()
    }

    /// Removes the record and the staged tree. Returns whether a record existed.
    pub fn delete(&self, id: &ProfileId) -> Result<bool> {
        let existed = self.store.delete(id)?;

        let staged_root = self.config.profile_root(id);
        if staged_root.is_dir() {
            std::fs::remove_dir_all(&staged_root).map_err(Error::io(&staged_root))?;
        }

        if existed {
            info!("Styling profile {id} has been deleted.");
        }
        Ok(existed)
    }
}
