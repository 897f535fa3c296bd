use regex::Regex;
use crate::error::{BqvError, Result};
use super::params::Params;
use super::parser::ViewConfig;

/// Substitutes `{{ name }}` placeholders in view SQL.
pub struct TemplateRenderer {
    placeholder_pattern: Regex,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            placeholder_pattern: Regex::new(r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap(),
        }
    }

    pub fn render(&self, config: &ViewConfig, params: &Params) -> Result<String> {
        self.render_str(&config.sql, params).map_err(|name| BqvError::Template {
            dataset: config.dataset.clone(),
            view: config.view.clone(),
            name,
        })
    }

    /// Renders `template`, or returns the first placeholder with no value.
    pub fn render_str(&self, template: &str, params: &Params) -> std::result::Result<String, String> {
        let mut result = String::with_capacity(template.len());
        let mut last_end = 0;

        for caps in self.placeholder_pattern.captures_iter(template) {
            let full_match = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str();

            let value = params.get(name).ok_or_else(|| name.to_string())?;

            result.push_str(&template[last_end..full_match.start()]);
            result.push_str(value);
            last_end = full_match.end();
        }

        result.push_str(&template[last_end..]);
        Ok(result)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_render_simple() {
        let renderer = TemplateRenderer::new();
        let config = ViewConfig::new("a", "v1", "SELECT {{x}}");
        assert_eq!(renderer.render(&config, &params(&[("x", "1")])).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_render_whitespace_and_dot() {
        let renderer = TemplateRenderer::new();
        let sql = "SELECT * FROM `{{ project }}.raw.events` WHERE env = '{{ .env }}'";
        let rendered = renderer
            .render_str(sql, &params(&[("project", "acme"), ("env", "prod")]))
            .unwrap();
        assert_eq!(rendered, "SELECT * FROM `acme.raw.events` WHERE env = 'prod'");
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render_str("{{d}}-{{d}}", &params(&[("d", "x")])).unwrap();
        assert_eq!(rendered, "x-x");
    }

    #[test]
    fn test_render_without_placeholders() {
        let renderer = TemplateRenderer::new();
        let sql = "SELECT '{not a placeholder}' AS s";
        assert_eq!(renderer.render_str(sql, &Params::new()).unwrap(), sql);
    }

    #[test]
    fn test_undefined_param() {
        let renderer = TemplateRenderer::new();
        let config = ViewConfig::new("a", "v1", "SELECT {{x}}, {{y}}");
        let err = renderer.render(&config, &params(&[("x", "1")])).unwrap_err();

        if let BqvError::Template { dataset, view, name } = err {
            assert_eq!(dataset, "a");
            assert_eq!(view, "v1");
            assert_eq!(name, "y");
        } else {
            panic!("Expected Template error, got {:?}", err);
        }
    }
}
