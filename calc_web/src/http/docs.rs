//! HTML documentation browser.
//!
//! Each calculator page shows its documentation block and a form generated
//! from the declared `[inputs]`. Submitting the form coerces every value by
//! its declared type, runs the calculator and renders the outcome under the
//! re-filled form.

use std::collections::HashMap;
use std::fmt::Write;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde_json::{Map, Value};

use calc_core::{CalcError, CalculationResponse, CalculatorSpec, FieldType, InputField};

use super::error::AppError;
use super::state::AppState;

const STYLE: &str = "body{font-family:sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem}\
pre{background:#f4f4f4;padding:1rem;overflow-x:auto}\
label{display:block;margin-top:.8rem;font-weight:bold}\
small{display:block;color:#555;font-weight:normal}\
.result{border-left:4px solid #2a7;padding:.5rem 1rem}\
.error{border-left:4px solid #c33;padding:.5rem 1rem;color:#900}";

/// GET /docs
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let mut items = String::new();
    for (name, title) in state.registry.available() {
        let _ = writeln!(
            items,
            "<li><a href=\"/docs/{name}\">{title}</a> <code>{name}</code></li>",
            name = escape(&name),
            title = escape(title.trim_start_matches('#').trim()),
        );
    }
    Html(layout(
        "Clinical Calculators",
        &format!("<h1>Clinical Calculators</h1>\n<ul>\n{}</ul>", items),
    ))
}

/// GET /docs/{name}
pub async fn page(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.registry.get_spec(&name) {
        Some(spec) => Html(render_page(&spec, &HashMap::new(), None)).into_response(),
        None => not_found(&name),
    }
}

/// POST /docs/{name}
pub async fn submit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let Some(spec) = state.registry.get_spec(&name) else {
        return not_found(&name);
    };

    let params = build_params(&spec.inputs(), &form);
    let outcome = state.calculate(name, params).await;
    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    (status, Html(render_page(&spec, &form, Some(&outcome)))).into_response()
}

/// Turn submitted form values into calculator params.
///
/// Declared fields are coerced by their type; undeclared keys are kept and
/// coerced loosely. Empty values are left out so the calculator reports
/// them as missing.
pub fn build_params(fields: &[InputField], form: &HashMap<String, String>) -> Value {
    let mut params = Map::new();
    for (key, raw) in form {
        let coerced = match fields.iter().find(|f| &f.name == key) {
            Some(field) => field.coerce(raw),
            None => InputField::new(key.as_str()).coerce(raw),
        };
        if let Some(value) = coerced {
            params.insert(key.clone(), value);
        }
    }
    Value::Object(params)
}

fn not_found(name: &str) -> Response {
    let message = CalcError::not_found(name).to_string();
    (
        StatusCode::NOT_FOUND,
        Html(layout(
            "Not found",
            &format!(
                "<p class=\"error\">{}</p>\n<p><a href=\"/docs\">All calculators</a></p>",
                escape(&message)
            ),
        )),
    )
        .into_response()
}

fn render_page(
    spec: &CalculatorSpec,
    values: &HashMap<String, String>,
    outcome: Option<&Result<CalculationResponse, AppError>>,
) -> String {
    let title = spec.title();
    let heading = title.trim_start_matches('#').trim();
    let mut body = format!(
        "<p><a href=\"/docs\">All calculators</a></p>\n<h1>{}</h1>\n",
        escape(heading)
    );

    if spec.doc_config.is_empty() {
        body.push_str("<p>No documentation available.</p>\n");
    } else {
        let _ = writeln!(body, "<pre>{}</pre>", escape(&spec.doc_config));
    }

    let _ = writeln!(
        body,
        "<h2>Try it</h2>\n<form method=\"post\" action=\"/docs/{}\">",
        escape(&spec.name)
    );
    for field in spec.inputs() {
        render_field(&mut body, &field, values.get(&field.name).map(String::as_str));
    }
    body.push_str("<p><button type=\"submit\">Calculate</button></p>\n</form>\n");

    match outcome {
        Some(Ok(response)) => render_response(&mut body, response),
        Some(Err(error)) => {
            let _ = writeln!(
                body,
                "<div class=\"error\"><strong>Error</strong><p>{}</p></div>",
                escape(&error.body().message)
            );
        }
        None => {}
    }

    layout(heading, &body)
}

fn render_field(out: &mut String, field: &InputField, value: Option<&str>) {
    let name = escape(&field.name);
    let required = if field.required { " required" } else { "" };
    let marker = if field.required { " *" } else { "" };

    let _ = write!(out, "<label for=\"{name}\">{name}{marker}");
    if let Some(unit) = &field.unit {
        let _ = write!(out, " <small>Unit: {}</small>", escape(unit));
    }
    if let Some(description) = &field.description {
        let _ = write!(out, " <small>{}</small>", escape(description));
    }
    out.push_str("</label>\n");

    let choices = match (&field.choices, field.field_type) {
        (Some(choices), _) => Some(choices.clone()),
        (None, Some(FieldType::Boolean)) => Some(vec!["true".to_string(), "false".to_string()]),
        _ => None,
    };

    if let Some(choices) = choices {
        let _ = writeln!(out, "<select id=\"{name}\" name=\"{name}\"{required}>");
        if !field.required {
            out.push_str("<option value=\"\"></option>\n");
        }
        for choice in &choices {
            let selected = if value == Some(choice.as_str()) { " selected" } else { "" };
            let choice = escape(choice);
            let _ = writeln!(out, "<option value=\"{choice}\"{selected}>{choice}</option>");
        }
        out.push_str("</select>\n");
        return;
    }

    let mut attrs = String::new();
    match field.field_type {
        Some(FieldType::Number) => attrs.push_str(" type=\"number\" step=\"any\""),
        Some(FieldType::Integer) => attrs.push_str(" type=\"number\" step=\"1\""),
        _ => attrs.push_str(" type=\"text\""),
    }
    if let Some(min) = field.min {
        let _ = write!(attrs, " min=\"{}\"", min);
    }
    if let Some(max) = field.max {
        let _ = write!(attrs, " max=\"{}\"", max);
    }
    let value = value.map(escape).unwrap_or_default();
    let _ = writeln!(
        out,
        "<input id=\"{name}\" name=\"{name}\"{attrs} value=\"{value}\"{required}>"
    );
}

fn render_response(out: &mut String, response: &CalculationResponse) {
    out.push_str("<div class=\"result\">\n<h2>Result</h2>\n");
    let _ = writeln!(out, "<p><strong>{}</strong></p>", escape(&display_value(&response.result)));
    if let Some(interpretation) = &response.interpretation {
        let _ = writeln!(out, "<p>{}</p>", escape(interpretation));
    }
    if let Some(working) = &response.working {
        out.push_str("<h3>Working</h3>\n<ul>\n");
        for (key, value) in working {
            let _ = writeln!(
                out,
                "<li><code>{}</code>: {}</li>",
                escape(key),
                escape(&display_value(value))
            );
        }
        out.push_str("</ul>\n");
    }
    if let Some(reference) = &response.reference {
        let _ = writeln!(out, "<p><small>Reference: {}</small></p>", escape(reference));
    }
    out.push_str("</div>\n");
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
