use crate::{
    fields::{FieldKind, FormField, FormFieldSet, ThemeSettingsFieldProvider},
    profile::{ProfileId, ScalarValue, Styles, StylingProfile},
    store::ProfileStore,
    Error, Result,
};

/// Submitted form values. `id` and `label` sit next to the style values,
/// the same way a form state would carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    values: Styles,
}

impl Submission {
    pub fn new(id: &str, label: &str) -> Self {
        Self::default().set("id", id).set("label", label)
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn values(&self) -> &Styles {
        &self.values
    }
}

impl From<Styles> for Submission {
    fn from(values: Styles) -> Self {
        Self { values }
    }
}

/// Create/edit form for a styling profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfileForm<'a> {
    existing: Option<&'a StylingProfile>,
}

impl<'a> ProfileForm<'a> {
    pub fn create() -> Self {
        Self { existing: None }
    }

    pub fn edit(profile: &'a StylingProfile) -> Self {
        Self {
            existing: Some(profile),
        }
    }

    pub fn existing(&self) -> Option<&'a StylingProfile> {
        self.existing
    }

    /// Label and machine name first, then the theme fields. An existing
    /// profile seeds the theme fields with its own styles, a new one with
    /// the theme's base settings.
    pub fn build(
        &self,
        base_settings: &Styles,
        provider: &dyn ThemeSettingsFieldProvider,
    ) -> FormFieldSet {
        let mut fields = FormFieldSet::new();

        fields.push(
            FormField::new("label", FieldKind::Textfield)
                .title("Label")
                .default_value(self.existing.map(|p| p.label.clone().into()))
                .required(),
        );
        fields.push(
            FormField::new("id", FieldKind::MachineName)
                .title("Machine name")
                .default_value(self.existing.map(|p| p.id.to_string().into()))
                .required()
                .disabled(self.existing.is_some()),
        );

        let current = match self.existing {
            Some(profile) => &profile.styles,
            None => base_settings,
        };
        fields.extend(provider.build_fields(current));

        fields
    }

    /// Turns a submission into the profile to persist.
    pub fn validate(&self, submission: Submission, store: &ProfileStore) -> Result<StylingProfile> {
        let mut styles = submission.values;

        let label = styles
            .remove("label")
            .map(|v| v.to_string())
            .unwrap_or_default();
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::validation("label", "Label field is required."));
        }

        let id = match styles.remove("id") {
            Some(id) => ProfileId::parse(&id.to_string())?,
            None => return Err(Error::validation("id", "Machine name field is required.")),
        };

        match self.existing {
            Some(existing) if existing.id != id => {
                return Err(Error::validation(
                    "id",
                    format!("The machine name of profile `{}` cannot be changed.", existing.id),
                ));
            }
            Some(_) => {}
            None if store.exists(&id) => {
                return Err(Error::validation(
                    "id",
                    format!("The machine name `{id}` is already in use. It must be unique."),
                ));
            }
            None => {}
        }

        Ok(StylingProfile::new(id, label, styles))
    }
}
