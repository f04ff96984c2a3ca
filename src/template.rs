use crate::errors::BoxError;
use miette::Diagnostic;
use std::io::Write;
use tera::Context;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("unable to convert template data into a render context")]
    #[diagnostic(
        code(slipway::template::data),
        help("Template data must serialize into a map-like value")
    )]
    Data {
        #[source]
        source: tera::Error,
    },

    #[error("error occurred attempting to render template")]
    #[diagnostic(code(slipway::template::render))]
    Render {
        #[source]
        source: tera::Error,
    },

    #[error("error writing rendered template output")]
    #[diagnostic(code(slipway::template::io))]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("template engine error")]
    #[diagnostic(code(slipway::template::engine))]
    Engine {
        #[source]
        source: BoxError,
    },
}

/// A template engine capability: given data, produce bytes or fail.
///
/// The generation engine never interprets templates itself; it only invokes
/// this at write time. Foreign engines can wrap their failures in
/// [`TemplateError::Engine`].
pub trait Template {
    fn execute(&self, writer: &mut dyn Write, data: &Context) -> Result<(), TemplateError>;
}

/// A raw tera template string, parsed and rendered on every execution.
#[derive(Debug, Clone)]
pub struct RawTemplate {
    source: String,
}

impl RawTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Template for RawTemplate {
    fn execute(&self, writer: &mut dyn Write, data: &Context) -> Result<(), TemplateError> {
        let rendered = tera::Tera::one_off(&self.source, data, false)
            .map_err(|source| TemplateError::Render { source })?;

        writer
            .write_all(rendered.as_bytes())
            .map_err(|source| TemplateError::Io { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_template_renders_with_context_data() {
        let mut data = Context::new();
        data.insert("name", "slipway");

        let template = RawTemplate::new("hello {{ name }}");
        let mut out = Vec::new();
        template.execute(&mut out, &data).unwrap();

        assert_eq!(out, b"hello slipway");
    }

    #[test]
    fn raw_template_fails_on_missing_variables() {
        let template = RawTemplate::new("hello {{ missing }}");
        let mut out = Vec::new();

        let err = template.execute(&mut out, &Context::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }
}
