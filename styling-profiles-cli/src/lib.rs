use std::{
    path::Path,
    process::{Command, Stdio},
    thread,
};

use styling_profiles_core::{
    load_base_settings, CompilationTrigger, FormFieldSet, ProfileForm, ProfileId, ProfileService,
    ScalarValue, SettingsFieldProvider, StylingProfile, Submission,
};
pub use styling_profiles_core::{load_config, PathConfig};

pub mod watch;

mod internal_prelude {
    pub use crate::errors::*;
    pub use color_eyre::eyre::{bail, eyre};
    pub use tracing::*;
}
use internal_prelude::*;

pub mod errors {
    pub use color_eyre::eyre::Report as Error;
    pub use color_eyre::eyre::Result;
}

pub mod tracing {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    use crate::internal_prelude::*;

    pub fn install_tracing() -> Result<()> {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(false)
            .without_time();
        let filter_layer = EnvFilter::try_from_default_env().or_else(|_| {
            EnvFilter::try_new("info,styling_profiles_cli=debug,styling_profiles_core=debug")
        })?;

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();

        color_eyre::install()?;
        Ok(())
    }
}

/// Starts the configured compile command for a staged profile and returns
/// without waiting for it.
#[derive(Debug, Clone, Default)]
pub struct CommandCompiler {
    argv: Option<Vec<String>>,
}

impl CommandCompiler {
    pub fn new(argv: Option<Vec<String>>) -> Self {
        Self { argv }
    }
}

impl CompilationTrigger for CommandCompiler {
    fn compile(&self, id: &ProfileId, staged_root: &Path) -> styling_profiles_core::Result<()> {
        let Some((program, args)) = self.argv.as_ref().and_then(|argv| argv.split_first()) else {
            debug!("No compile command configured, skipping compilation of {id}");
            return Ok(());
        };

        let mut child = Command::new(program)
            .args(args)
            .env("STYLING_PROFILE_ID", id.as_str())
            .env("STYLING_PROFILE_DIR", staged_root)
            .stdin(Stdio::null())
            .spawn()
            .map_err(styling_profiles_core::Error::io(program))?;

        info!("Started `{program}` (pid {}) for profile {id}", child.id());

        // Reaped off-thread so watch mode doesn't accumulate zombies.
        let program = program.clone();
        let id = id.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("`{program}` finished for profile {id}"),
            Ok(status) => warn!("`{program}` exited with {status} for profile {id}"),
            Err(e) => warn!("Failed to wait for `{program}`: {e}"),
        });
        Ok(())
    }
}

pub type Service = ProfileService<CommandCompiler>;

pub fn open(config: PathConfig) -> Service {
    let compiler = CommandCompiler::new(config.compile_command.clone());
    ProfileService::with_compiler(config, compiler)
}

/// Parses `name=value`. The value is read as a TOML scalar when possible
/// (`12`, `0.5`, `true`, `"quoted"`), otherwise taken as a plain string.
pub fn parse_key_value(input: &str) -> std::result::Result<(String, ScalarValue), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{input}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in `{input}`"));
    }
    if is_reserved_field(name) {
        return Err(format!("`{name}` can't be set as a style, use --{name}"));
    }
    Ok((name.to_owned(), parse_scalar(value)))
}

fn parse_scalar(value: &str) -> ScalarValue {
    toml::from_str::<toml::Table>(&format!("v = {value}"))
        .ok()
        .and_then(|table| table.get("v").and_then(ScalarValue::from_toml))
        .unwrap_or_else(|| ScalarValue::String(value.to_owned()))
}

fn is_reserved_field(name: &str) -> bool {
    name == "id" || name == "label"
}

/// Builds a submission the way the admin form would post it: every theme
/// field at its default, then the explicit overrides. Overrides may only
/// target style fields; `id` and `label` come from their own arguments.
pub fn submission_from_form(
    fields: &FormFieldSet,
    id: &ProfileId,
    label: &str,
    overrides: Vec<(String, ScalarValue)>,
) -> styling_profiles_core::Result<Submission> {
    let mut submission = Submission::new(id.as_str(), label);
    for field in fields {
        if is_reserved_field(&field.name) {
            continue;
        }
        if let Some(default) = &field.default {
            submission = submission.set(field.name.clone(), default.clone());
        }
    }
    for (name, value) in overrides {
        if is_reserved_field(&name) {
            return Err(styling_profiles_core::Error::validation(
                name,
                "only style values can be overridden",
            ));
        }
        submission = submission.set(name, value);
    }
    Ok(submission)
}

fn field_provider(service: &Service) -> Result<(SettingsFieldProvider, styling_profiles_core::Styles)> {
    let settings = load_base_settings(&service.config().base_settings_path())?;
    Ok((SettingsFieldProvider::new(settings.clone()), settings))
}

pub fn create(
    service: &Service,
    id: Option<&str>,
    label: &str,
    overrides: Vec<(String, ScalarValue)>,
) -> Result<StylingProfile> {
    if label.trim().is_empty() {
        return Err(styling_profiles_core::Error::validation("label", "Label field is required.").into());
    }
    let id = match id {
        Some(id) => ProfileId::parse(id)?,
        None => ProfileId::from_label(label).map_err(|_| {
            styling_profiles_core::Error::validation(
                "label",
                format!("no machine name can be derived from `{}`, pass --id", label.trim()),
            )
        })?,
    };

    let (provider, settings) = field_provider(service)?;
    let form = ProfileForm::create();
    let fields = form.build(&settings, &provider);
    let submission = submission_from_form(&fields, &id, label, overrides)?;

    Ok(service.save(form, submission)?.profile)
}

pub fn update(
    service: &Service,
    id: &str,
    label: Option<&str>,
    overrides: Vec<(String, ScalarValue)>,
) -> Result<StylingProfile> {
    let id = ProfileId::parse(id)?;
    if !service.store().exists(&id) {
        bail!("Styling profile `{id}` does not exist");
    }
    let existing = service.store().load(&id)?;

    let (provider, settings) = field_provider(service)?;
    let form = ProfileForm::edit(&existing);
    let fields = form.build(&settings, &provider);
    let label = label.unwrap_or(&existing.label);
    let submission = submission_from_form(&fields, &id, label, overrides)?;

    Ok(service.save(form, submission)?.profile)
}

pub fn load(service: &Service, id: &str) -> Result<StylingProfile> {
    let id = ProfileId::parse(id)?;
    if !service.store().exists(&id) {
        return Err(eyre!("Styling profile `{id}` does not exist"));
    }
    Ok(service.store().load(&id)?)
}

pub fn form_fields(service: &Service, id: Option<&str>) -> Result<FormFieldSet> {
    let (provider, settings) = field_provider(service)?;
    match id {
        Some(id) => {
            let existing = load(service, id)?;
            Ok(ProfileForm::edit(&existing).build(&settings, &provider))
        }
        None => Ok(ProfileForm::create().build(&settings, &provider)),
    }
}

pub fn print_profile(profile: &StylingProfile) {
    println!("{} ({})", profile.label, profile.id);
    for (name, value) in &profile.styles {
        println!("  {name} = {value}");
    }
}

pub fn print_form(fields: &FormFieldSet) {
    for field in fields {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.disabled {
            flags.push("disabled");
        }
        let default = field
            .default
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        println!(
            "{:<24} {:<12} {:<28} {:<24} {}",
            field.name,
            format!("{:?}", field.kind),
            field.title,
            default,
            flags.join(",")
        );
    }
}
