//! Template rendering.
//!
//! Built on `tera` rather than a hand-rolled substitution pass: Tera errors
//! on any undefined context variable by default, which gives us
//! strict-undefined semantics for free, and `autoescape_on` lets us force
//! HTML/XML escaping on every render regardless of template name.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use relay_common::Content;
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::TemplateError;

const SUBJECT_TEMPLATE: &str = "subject";
const BODY_TEMPLATE: &str = "body";

fn format_with_commas(value: f64, places: usize) -> String {
    let sign = if value.is_sign_negative() { "-" } else { "" };
    let formatted = format!("{:.*}", places, value.abs());
    let (int_part, frac_part) = formatted.split_once('.').map_or((formatted.as_str(), None), |(i, f)| (i, Some(f)));

    let mut grouped = String::new();
    let digits = int_part.as_bytes();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit as char);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn currency_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let symbol = args.get("symbol").and_then(Value::as_str).unwrap_or("$");
    let places = args
        .get("places")
        .and_then(Value::as_u64)
        .unwrap_or(2)
        .min(12) as usize;

    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };

    let rendered = match amount {
        Some(amount) => format!("{symbol}{}", format_with_commas(amount, places)),
        None => format!("{symbol}{}", value_display(value)),
    };
    Ok(Value::String(rendered))
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let fmt = args.get("fmt").and_then(Value::as_str).unwrap_or("%Y-%m-%d");

    if let Value::String(raw) = value {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Value::String(dt.format(fmt).to_string()));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Value::String(dt.format(fmt).to_string()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Value::String(date.format(fmt).to_string()));
        }
    }
    Ok(Value::String(value_display(value)))
}

fn build_engine() -> Tera {
    let mut tera = Tera::default();
    tera.register_filter("currency", currency_filter);
    tera.register_filter("format_date", format_date_filter);
    tera.autoescape_on(vec![SUBJECT_TEMPLATE, BODY_TEMPLATE]);
    tera
}

fn build_context(variables: &HashMap<String, Value>) -> Result<Context, TemplateError> {
    Context::from_serialize(variables)
        .map_err(|e| TemplateError::Render(format!("invalid variable map: {e}")))
}

/// Render `subject` (if present) and `body` against `variables`.
///
/// Does not itself enforce the required-variables list — callers validate
/// that separately so the "missing" error can list every
/// absent name in one pass rather than failing on the first one Tera hits.
pub fn render(subject: Option<&str>, body: &str, variables: &HashMap<String, Value>) -> Result<Content, TemplateError> {
    let mut tera = build_engine();
    let context = build_context(variables)?;

    let rendered_subject = match subject {
        Some(subject) => {
            tera.add_raw_template(SUBJECT_TEMPLATE, subject)
                .map_err(|e| TemplateError::Render(e.to_string()))?;
            Some(
                tera.render(SUBJECT_TEMPLATE, &context)
                    .map_err(|e| TemplateError::Render(e.to_string()))?,
            )
        }
        None => None,
    };

    tera.add_raw_template(BODY_TEMPLATE, body)
        .map_err(|e| TemplateError::Render(e.to_string()))?;
    let rendered_body = tera
        .render(BODY_TEMPLATE, &context)
        .map_err(|e| TemplateError::Render(e.to_string()))?;

    Ok(Content {
        subject: rendered_subject,
        body: rendered_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_basic_substitution() {
        let variables = vars(&[("name", Value::String("Ada".into()))]);
        let content = render(Some("Hi {{ name }}"), "Body for {{ name }}", &variables).unwrap();
        assert_eq!(content.subject.as_deref(), Some("Hi Ada"));
        assert_eq!(content.body, "Body for Ada");
    }

    #[test]
    fn test_undefined_variable_is_hard_error() {
        let variables = vars(&[]);
        let err = render(None, "Hello {{ missing }}", &variables).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn test_autoescape_html() {
        let variables = vars(&[("name", Value::String("<b>Ada</b>".into()))]);
        let content = render(None, "{{ name }}", &variables).unwrap();
        assert_eq!(content.body, "&lt;b&gt;Ada&lt;&#x2F;b&gt;");
    }

    #[test]
    fn test_currency_filter_default_args() {
        let variables = vars(&[("amount", Value::from(1234.5))]);
        let content = render(None, "{{ amount | currency }}", &variables).unwrap();
        assert_eq!(content.body, "$1,234.50");
    }

    #[test]
    fn test_currency_filter_custom_symbol_and_places() {
        let variables = vars(&[("amount", Value::from(99))]);
        let content = render(
            None,
            "{{ amount | currency(symbol=\"€\", places=0) }}",
            &variables,
        )
        .unwrap();
        assert_eq!(content.body, "€99");
    }

    #[test]
    fn test_currency_filter_unparseable_falls_back_to_raw() {
        let variables = vars(&[("amount", Value::String("not-a-number".into()))]);
        let content = render(None, "{{ amount | currency }}", &variables).unwrap();
        assert_eq!(content.body, "$not-a-number");
    }

    #[test]
    fn test_format_date_filter_parses_rfc3339() {
        let variables = vars(&[(
            "created",
            Value::String("2024-03-05T10:15:00Z".into()),
        )]);
        let content = render(None, "{{ created | format_date }}", &variables).unwrap();
        assert_eq!(content.body, "2024-03-05");
    }

    #[test]
    fn test_format_date_filter_custom_fmt() {
        let variables = vars(&[("created", Value::String("2024-03-05".into()))]);
        let content = render(
            None,
            "{{ created | format_date(fmt=\"%d/%m/%Y\") }}",
            &variables,
        )
        .unwrap();
        assert_eq!(content.body, "05/03/2024");
    }

    #[test]
    fn test_format_date_filter_non_date_passes_through() {
        let variables = vars(&[("label", Value::String("not-a-date".into()))]);
        let content = render(None, "{{ label | format_date }}", &variables).unwrap();
        assert_eq!(content.body, "not-a-date");
    }

    #[test]
    fn test_no_subject_template_yields_none() {
        let variables = vars(&[]);
        let content = render(None, "body only", &variables).unwrap();
        assert!(content.subject.is_none());
    }
}
