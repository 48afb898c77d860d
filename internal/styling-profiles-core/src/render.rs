use std::{fs, path::Path};

use tracing::debug;

use crate::{
    parse::{self, TemplateFragment},
    profile::{ScalarValue, Styles},
    stage::create_parent_dirs,
    Error, Result,
};

/// What happened to a single `{{name}}` token.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    Substituted { name: String, value: String },
    /// No style with this name; the token was kept verbatim.
    LeftAsLiteral { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub contents: String,
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// The styles were empty; nothing was read or written.
    Skipped,
    Written { substitutions: Vec<Substitution> },
}

/// Copy of `styles` with every empty `*opacity*` value replaced by `1`.
pub fn normalize_styles(styles: &Styles) -> Styles {
    styles
        .iter()
        .map(|(name, value)| {
            let value = if name.contains("opacity") && value.is_empty() {
                ScalarValue::Integer(1)
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

pub fn render_str(styles: &Styles, template: &str) -> Result<Rendered> {
    let styles = normalize_styles(styles);
    let fragments = parse::parse_template(template).map_err(|e| Error::Template(e.to_string()))?;

    let mut contents = String::with_capacity(template.len());
    let mut substitutions = Vec::new();

    for fragment in fragments {
        match fragment {
            TemplateFragment::Text(text) => contents.push_str(text),
            TemplateFragment::Placeholder(placeholder) => match styles.get(placeholder.name) {
                Some(value) => {
                    let value = value.to_string();
                    contents.push_str(&value);
                    substitutions.push(Substitution::Substituted {
                        name: placeholder.name.to_owned(),
                        value,
                    });
                }
                None => {
                    contents.push_str(placeholder.token);
                    substitutions.push(Substitution::LeftAsLiteral {
                        name: placeholder.name.to_owned(),
                    });
                }
            },
        }
    }

    Ok(Rendered {
        contents,
        substitutions,
    })
}

/// Renders `template_path` with `styles` into `output_path`.
///
/// Empty `styles` is a no-op: `output_path` is neither created nor touched.
pub fn render(styles: &Styles, template_path: &Path, output_path: &Path) -> Result<RenderOutcome> {
    if styles.is_empty() {
        debug!("No styles set, skipping {}", output_path.display());
        return Ok(RenderOutcome::Skipped);
    }

    let template = fs::read_to_string(template_path).map_err(Error::io(template_path))?;
    let rendered = render_str(styles, &template)?;

    create_parent_dirs(output_path)?;
    fs::write(output_path, rendered.contents.as_bytes()).map_err(Error::io(output_path))?;

    debug!(
        "Rendered {} ({} placeholders)",
        output_path.display(),
        rendered.substitutions.len()
    );

    Ok(RenderOutcome::Written {
        substitutions: rendered.substitutions,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn styles(pairs: &[(&str, ScalarValue)]) -> Styles {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_str() {
        let r = render_str(
            &styles(&[("primary", "#fff".into()), ("btn_opacity", "".into())]),
            "color: {{primary}}; opacity: {{btn_opacity}};",
        )
        .expect("should render");

        assert_eq!(r.contents, "color: #fff; opacity: 1;");
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let r = render_str(
            &styles(&[("primary", "red".into())]),
            "$a: {{primary}}; $b: {{secondary}}; $c: {{ primary }};",
        )
        .expect("should render");

        assert_eq!(r.contents, "$a: red; $b: {{secondary}}; $c: {{ primary }};");
        assert_eq!(
            r.substitutions,
            vec![
                Substitution::Substituted {
                    name: "primary".into(),
                    value: "red".into()
                },
                Substitution::LeftAsLiteral {
                    name: "secondary".into()
                },
            ]
        );
    }

    #[test]
    fn test_opacity_normalization() {
        let input = styles(&[
            ("button_opacity", "".into()),
            ("overlay_opacity", false.into()),
            ("card_opacity", "0.8".into()),
            ("border_width", "".into()),
        ]);
        let normalized = normalize_styles(&input);

        assert_eq!(normalized["button_opacity"], ScalarValue::Integer(1));
        assert_eq!(normalized["overlay_opacity"], ScalarValue::Integer(1));
        assert_eq!(normalized["card_opacity"], ScalarValue::from("0.8"));
        assert_eq!(normalized["border_width"], ScalarValue::from(""));
        // The caller's map is untouched.
        assert_eq!(input["button_opacity"], ScalarValue::from(""));

        let r = render_str(&input, "a: {{button_opacity}};").expect("should render");
        assert_eq!(r.contents, "a: 1;");
    }

    #[test]
    fn test_render_writes_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("_template.scss.txt");
        let output = dir.path().join("out/resources/sass/_definitions.scss");
        fs::write(&template, "$primary: {{primary}};\n$gap: {{gap}}px;\n").unwrap();

        let input = styles(&[("primary", "#336699".into()), ("gap", 8i64.into())]);
        let outcome = render(&input, &template, &output).expect("should render");
        assert!(matches!(outcome, RenderOutcome::Written { ref substitutions } if substitutions.len() == 2));

        let first = fs::read(&output).unwrap();
        assert_eq!(first, b"$primary: #336699;\n$gap: 8px;\n");

        render(&input, &template, &output).expect("should render again");
        assert_eq!(fs::read(&output).unwrap(), first);
    }

    #[test]
    fn test_render_empty_styles_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("missing-template.txt");
        let output = dir.path().join("_definitions.scss");

        let outcome = render(&Styles::new(), &template, &output).expect("no-op");
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(!output.exists());

        fs::write(&output, "previous").unwrap();
        render(&Styles::new(), &template, &output).expect("no-op");
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
    }

    #[test]
    fn test_render_missing_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("missing-template.txt");
        let output = dir.path().join("_definitions.scss");

        let r = render(&styles(&[("a", "b".into())]), &template, &output);
        assert!(matches!(r, Err(Error::Io { ref path, .. }) if *path == template));
        assert!(!output.exists());
    }

    #[test]
    fn test_render_unwritable_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("_template.scss.txt");
        fs::write(&template, "$p: {{p}};").unwrap();
        let blocker = dir.path().join("sass");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let output = blocker.join("_definitions.scss");

        let r = render(&styles(&[("p", "1px".into())]), &template, &output);
        assert!(matches!(r, Err(Error::Io { ref path, .. }) if *path == blocker));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "a file, not a directory");
    }
}
