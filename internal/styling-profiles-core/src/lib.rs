mod config;
mod error;
mod fields;
mod form;
mod parse;
mod profile;
mod render;
mod service;
mod stage;
mod store;

pub use config::{load_config, PathConfig, CONFIG_FILE};
pub use error::{Error, Result};
pub use fields::{
    load_base_settings, FieldKind, FormField, FormFieldSet, SettingsFieldProvider,
    ThemeSettingsFieldProvider,
};
pub use form::{ProfileForm, Submission};
pub use profile::{ProfileId, ScalarValue, Styles, StylingProfile};
pub use render::{normalize_styles, render, render_str, RenderOutcome, Rendered, Substitution};
pub use service::{CompilationTrigger, Materialized, NoCompilation, ProfileService, Saved};
pub use stage::{StageReport, Stager};
pub use store::{ProfileStore, SaveStatus};
