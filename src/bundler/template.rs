//! Control file rendering.
//!
//! Renders the package metadata record from Handlebars templates. The
//! dependency line is omitted when a package declares no dependencies.

use crate::bundler::{
    error::{Error, Result},
    settings::ControlFormat,
};
use handlebars::Handlebars;

/// Section written into every control file.
pub const SECTION: &str = "opt";

/// Priority written into every Debian control file.
pub const PRIORITY: &str = "optional";

const DEB_TEMPLATE: &str = "\
Package: {{name}}
Version: {{version}}
Section: {{section}}
Priority: {{priority}}
Architecture: {{arch}}
{{#if depends~}}
Depends: {{depends}}
{{/if~}}
Maintainer: {{maintainer}}
Description: {{description}}";

const IPK_TEMPLATE: &str = "\
Package: {{name}}
Version: {{version}}
Section: {{section}}
Architecture: {{arch}}
{{#if depends~}}
Depends: {{depends}}
{{/if~}}
Maintainer: {{maintainer}}
Description: {{description}}";

/// Values substituted into a control template.
#[derive(Debug, serde::Serialize)]
pub struct ControlFields<'a> {
    /// Package name
    pub name: &'a str,
    /// Package version
    pub version: &'a str,
    /// Section, normally [`SECTION`]
    pub section: &'a str,
    /// Priority, normally [`PRIORITY`]
    pub priority: &'a str,
    /// Distro-resolved architecture string
    pub arch: &'a str,
    /// Comma-joined dependency list, empty for none
    pub depends: String,
    /// Maintainer string
    pub maintainer: &'a str,
    /// Package description
    pub description: &'a str,
}

impl<'a> ControlFields<'a> {
    /// Builds the field set with the fixed section and priority.
    pub fn new(
        name: &'a str,
        version: &'a str,
        arch: &'a str,
        depends: &[String],
        maintainer: &'a str,
        description: &'a str,
    ) -> Self {
        Self {
            name,
            version,
            section: SECTION,
            priority: PRIORITY,
            arch,
            depends: depends.join(","),
            maintainer,
            description,
        }
    }
}

/// Renders the control record for a format.
///
/// # Errors
///
/// [`Error::TemplateRender`] carrying the Handlebars diagnostic.
pub fn render_control(format: ControlFormat, fields: &ControlFields<'_>) -> Result<String> {
    let (template_name, source) = match format {
        ControlFormat::Deb => ("control.deb", DEB_TEMPLATE),
        ControlFormat::Ipk => ("control.ipk", IPK_TEMPLATE),
    };
    render(template_name, source, fields)
}

fn render(template_name: &str, source: &str, fields: &ControlFields<'_>) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    let template_error = |reason: String| Error::TemplateRender {
        package: fields.name.to_string(),
        reason,
    };

    handlebars
        .register_template_string(template_name, source)
        .map_err(|e| template_error(format!("failed to register {template_name}: {e}")))?;

    handlebars
        .render(template_name, fields)
        .map_err(|e| template_error(format!("failed to render {template_name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(depends: &[String]) -> ControlFields<'_> {
        ControlFields::new(
            "bg-cloud",
            "0.0.1801010000-1",
            "amd64",
            depends,
            "Ops <ops@example.com>",
            "Cloud components.",
        )
    }

    #[test]
    fn test_deb_control() {
        let depends = vec!["libc6".to_string(), "iw".to_string()];
        let text = render_control(ControlFormat::Deb, &fields(&depends)).unwrap();
        assert_eq!(
            text,
            "Package: bg-cloud\n\
             Version: 0.0.1801010000-1\n\
             Section: opt\n\
             Priority: optional\n\
             Architecture: amd64\n\
             Depends: libc6,iw\n\
             Maintainer: Ops <ops@example.com>\n\
             Description: Cloud components."
        );
    }

    #[test]
    fn test_ipk_control_has_no_priority() {
        let depends = vec!["libgcc".to_string()];
        let text = render_control(ControlFormat::Ipk, &fields(&depends)).unwrap();
        assert!(!text.contains("Priority"));
        assert!(text.contains("Depends: libgcc\nMaintainer:"));
    }

    #[test]
    fn test_empty_depends_drops_line() {
        let text = render_control(ControlFormat::Deb, &fields(&[])).unwrap();
        assert!(!text.contains("Depends"));
        assert!(text.contains("Architecture: amd64\nMaintainer: Ops <ops@example.com>"));
    }

    #[test]
    fn test_values_are_not_html_escaped() {
        let text = render_control(ControlFormat::Deb, &fields(&[])).unwrap();
        assert!(text.contains("<ops@example.com>"));
    }

    #[test]
    fn test_missing_field_is_render_error() {
        let err = render("broken", "Package: {{nope}}", &fields(&[])).unwrap_err();
        match err {
            Error::TemplateRender { package, reason } => {
                assert_eq!(package, "bg-cloud");
                assert!(reason.contains("broken"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_template_is_error() {
        assert!(render("bad", "{{#if depends}}", &fields(&[])).is_err());
    }
}
