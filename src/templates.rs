//! Template renderer – maps (template name, context) to HTML text through
//! Tera.
//!
//! Every `.html` file under the configured directory is loaded once at
//! construction; lookups are by path relative to that directory. Rendered
//! `.html` output is autoescaped, so HTML-special characters in context
//! values never become markup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::error::RenderError;

/// Tera wrapper owning the template search directory and registered
/// filters. Immutable after startup; renders go through `&self`.
pub struct TemplateRenderer {
    tera: Tera,
    template_dir: PathBuf,
}

impl TemplateRenderer {
    /// Load every `*.html` template under `template_dir` (recursively).
    ///
    /// An unreadable or missing directory is not fatal here: it logs a
    /// warning and every subsequent render fails with `TemplateNotFound`.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        let template_dir = template_dir.into();
        let glob = template_dir.join("**").join("*.html");
        let tera = match Tera::new(&glob.to_string_lossy()) {
            Ok(tera) => {
                tracing::info!(
                    dir = %template_dir.display(),
                    templates = tera.get_template_names().count(),
                    "template renderer initialised"
                );
                tera
            }
            Err(e) => {
                tracing::warn!(
                    dir = %template_dir.display(),
                    "failed to load templates: {e}"
                );
                Tera::default()
            }
        };

        let mut renderer = Self { tera, template_dir };
        renderer.register_filter("currency", currency);
        renderer
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Register a named filter callable from template markup as
    /// `{{ value | name }}`. Available to every subsequent render.
    pub fn register_filter<F>(&mut self, name: &str, filter: F)
    where
        F: tera::Filter + 'static,
    {
        self.tera.register_filter(name, filter);
    }

    /// Render the named template against a context. The context must
    /// serialize to a JSON object; its keys become template variables.
    pub fn render<C: Serialize>(&self, template_name: &str, context: &C) -> Result<String, RenderError> {
        if !self
            .tera
            .get_template_names()
            .any(|n| n == template_name)
        {
            return Err(RenderError::TemplateNotFound {
                name: template_name.to_string(),
                dir: self.template_dir.clone(),
            });
        }

        let context = Context::from_serialize(context).map_err(RenderError::Context)?;
        let html = self
            .tera
            .render(template_name, &context)
            .map_err(|e| RenderError::Render {
                name: template_name.to_string(),
                source: e,
            })?;
        tracing::debug!(template = template_name, "template rendered");
        Ok(html)
    }
}

/// `currency` filter: formats a number with thousands separators and two
/// decimals, so `1234.5` renders as `1,234.50`.
pub fn currency(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let amount = value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .ok_or_else(|| tera::Error::msg("currency filter expects a number"))?;

    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let (units, rem) = (cents / 100, cents % 100);

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    Ok(Value::String(format!("{sign}{grouped}.{rem:02}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn renderer_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TemplateRenderer) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let renderer = TemplateRenderer::new(dir.path());
        (dir, renderer)
    }

    #[test]
    fn renders_variables_from_the_context() {
        let (_dir, renderer) = renderer_with(&[(
            "greeting.html",
            "<h1>{{ title }}</h1><p>{{ date }}</p>",
        )]);
        let html = renderer
            .render("greeting.html", &json!({"title": "Hello", "date": "2024-01"}))
            .unwrap();
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>2024-01</p>"));
    }

    #[test]
    fn renders_are_deterministic() {
        let (_dir, renderer) = renderer_with(&[("t.html", "{{ title }} / {{ date }}")]);
        let ctx = json!({"title": "Same", "date": "2024"});
        let a = renderer.render("t.html", &ctx).unwrap();
        let b = renderer.render("t.html", &ctx).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_template_is_a_distinct_error() {
        let (_dir, renderer) = renderer_with(&[("exists.html", "x")]);
        let err = renderer.render("nope.html", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound { .. }));
        assert!(err.to_string().contains("nope.html"));
    }

    #[test]
    fn missing_directory_degrades_to_not_found() {
        let renderer = TemplateRenderer::new("/definitely/not/here");
        let err = renderer.render("price_list.html", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound { .. }));
    }

    #[test]
    fn undefined_variable_is_a_render_error() {
        let (_dir, renderer) = renderer_with(&[("t.html", "{{ title }} {{ missing.field }}")]);
        let err = renderer.render("t.html", &json!({"title": "x"})).unwrap_err();
        assert!(matches!(err, RenderError::Render { .. }));
    }

    #[test]
    fn html_output_is_autoescaped() {
        let (_dir, renderer) = renderer_with(&[("t.html", "<p>{{ title }}</p>")]);
        let html = renderer
            .render("t.html", &json!({"title": "<script>alert(1)</script> & co"}))
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; co"));
    }

    #[test]
    fn iteration_over_items() {
        let (_dir, renderer) = renderer_with(&[(
            "list.html",
            "<ul>{% for item in items %}<li>{{ item.name }}: {{ item.price }}</li>{% endfor %}</ul>",
        )]);
        let html = renderer
            .render(
                "list.html",
                &json!({"items": [{"name": "Tea", "price": 3.5}, {"name": "Coffee", "price": 4.0}]}),
            )
            .unwrap();
        assert!(html.contains("<li>Tea: 3.5</li>"));
        assert!(html.contains("<li>Coffee: 4</li>"));
    }

    #[test]
    fn currency_filter_formats_amounts() {
        let (_dir, renderer) = renderer_with(&[("c.html", "{{ price | currency }}")]);
        let cases = [
            (json!({"price": 1234.5}), "1,234.50"),
            (json!({"price": 9.99}), "9.99"),
            (json!({"price": 1000000}), "1,000,000.00"),
            (json!({"price": 0}), "0.00"),
            (json!({"price": -42.1}), "-42.10"),
            (json!({"price": "19.995"}), "20.00"),
        ];
        for (ctx, expected) in cases {
            assert_eq!(renderer.render("c.html", &ctx).unwrap(), expected);
        }
    }

    #[test]
    fn custom_filters_are_usable_after_registration() {
        let (_dir, mut renderer) = renderer_with(&[("t.html", "{{ name | shout }}")]);
        renderer.register_filter("shout", |value: &Value, _: &HashMap<String, Value>| {
            let s = value
                .as_str()
                .ok_or_else(|| tera::Error::msg("shout filter expects a string"))?;
            Ok(Value::String(s.to_uppercase()))
        });
        let html = renderer.render("t.html", &json!({"name": "quiet"})).unwrap();
        assert_eq!(html, "QUIET");
    }

    #[test]
    fn non_object_context_is_rejected() {
        let (_dir, renderer) = renderer_with(&[("t.html", "static")]);
        let err = renderer.render("t.html", &json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, RenderError::Context(_)));
    }
}
