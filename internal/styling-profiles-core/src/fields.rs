use std::{collections::BTreeMap, fs, io, path::Path};

use tracing::debug;

use crate::{
    profile::{ScalarValue, Styles},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Textfield,
    MachineName,
    Color,
    Number,
    Checkbox,
}

impl FieldKind {
    fn infer(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Bool(_) => FieldKind::Checkbox,
            ScalarValue::Integer(_) | ScalarValue::Float(_) => FieldKind::Number,
            ScalarValue::String(s) if s.starts_with('#') => FieldKind::Color,
            ScalarValue::String(_) => FieldKind::Textfield,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub title: String,
    pub kind: FieldKind,
    pub default: Option<ScalarValue>,
    pub required: bool,
    pub disabled: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            title: title_for(&name),
            name,
            kind,
            default: None,
            required: false,
            disabled: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn default_value(mut self, value: Option<ScalarValue>) -> Self {
        self.default = value;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// `button_opacity` -> `Button opacity`
fn title_for(name: &str) -> String {
    let words = name.replace('_', " ");
    let mut chars = words.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered set of form fields, unique by name. Pushing a field with a name
/// already present replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFieldSet {
    fields: Vec<FormField>,
}

impl FormFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: FormField) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FormField> {
        self.fields.iter()
    }
}

impl Extend<FormField> for FormFieldSet {
    fn extend<T: IntoIterator<Item = FormField>>(&mut self, iter: T) {
        for field in iter {
            self.push(field);
        }
    }
}

impl IntoIterator for FormFieldSet {
    type Item = FormField;
    type IntoIter = std::vec::IntoIter<FormField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormFieldSet {
    type Item = &'a FormField;
    type IntoIter = std::slice::Iter<'a, FormField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Supplies the theme variable fields shown on the profile form.
pub trait ThemeSettingsFieldProvider {
    fn build_fields(&self, current: &Styles) -> FormFieldSet;
}

/// Builds one field per base theme setting.
#[derive(Debug, Clone, Default)]
pub struct SettingsFieldProvider {
    settings: Styles,
}

impl SettingsFieldProvider {
    pub fn new(settings: Styles) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Styles {
        &self.settings
    }
}

impl ThemeSettingsFieldProvider for SettingsFieldProvider {
    fn build_fields(&self, current: &Styles) -> FormFieldSet {
        let mut fields = FormFieldSet::new();

        for (name, base) in &self.settings {
            let value = current.get(name).unwrap_or(base);
            fields.push(FormField::new(name, FieldKind::infer(base)).default_value(Some(value.clone())));
        }

        // Values saved for settings the theme no longer declares stay editable.
        for (name, value) in current {
            if !self.settings.contains_key(name) {
                fields.push(FormField::new(name, FieldKind::Textfield).default_value(Some(value.clone())));
            }
        }

        fields
    }
}

/// Reads the theme's default settings. A missing file yields no settings;
/// non-scalar entries are skipped.
pub fn load_base_settings(path: &Path) -> Result<Styles> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No base settings at {}", path.display());
            return Ok(Styles::new());
        }
        Err(e) => return Err(Error::io(path)(e)),
    };

    let table: BTreeMap<String, toml::Value> = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

    Ok(table
        .into_iter()
        .filter_map(|(name, value)| match ScalarValue::from_toml(&value) {
            Some(value) => Some((name, value)),
            None => {
                debug!("Skipping non-scalar setting {name}");
                None
            }
        })
        .collect())
}
