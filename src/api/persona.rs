//! Persona form handlers.
//!
//! `GET /` renders an empty form; `POST /` builds the fixed two-line
//! prompt from the submitted fields, runs the persona agent, and renders
//! the generated profile alongside the inputs.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Form;

use crate::agents::{AgentConfig, BaseAgent, LlmAgent};

use super::types::PersonaForm;
use super::{AppError, AppState};

const PERSONA_INSTRUCTION: &str = "Du bist ein Experte für Zielgruppenanalyse. \
Erstelle einen ausführlichen Steckbrief einer Userpersona auf Basis der folgenden Informationen: \
Branche und Produktbeschreibung. \
Der Steckbrief soll Name, Alter, Beruf, Interessen, Herausforderungen, Ziele und typische Verhaltensweisen enthalten.";

/// Build the persona generator agent.
pub(super) fn persona_agent() -> LlmAgent {
    LlmAgent::new(
        AgentConfig::new("persona_generator")
            .with_instruction(PERSONA_INSTRUCTION)
            .with_description("Generiert Userpersonas für Marketing und Produktentwicklung."),
    )
}

/// The fixed prompt template fed to the persona agent.
fn build_prompt(branche: &str, produktbeschreibung: &str) -> String {
    format!(
        "Branche: {}\nProduktbeschreibung: {}",
        branche, produktbeschreibung
    )
}

pub(super) async fn form_get() -> Html<String> {
    Html(render_page(None))
}

pub(super) async fn form_post(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PersonaForm>,
) -> Result<Html<String>, AppError> {
    let prompt = build_prompt(&form.branche, &form.produktbeschreibung);
    tracing::info!(branche = %form.branche, "generating persona");

    let output = state.agent.run(&prompt, &state.context).await?;

    Ok(Html(render_page(Some(&PersonaPage {
        branche: form.branche,
        produktbeschreibung: form.produktbeschreibung,
        persona: output.text,
    }))))
}

struct PersonaPage {
    branche: String,
    produktbeschreibung: String,
    persona: String,
}

const PAGE_STYLE: &str = "\
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }\n\
label { display: block; margin-top: 1rem; font-weight: bold; }\n\
input, textarea { width: 100%; padding: 0.5rem; margin-top: 0.25rem; }\n\
button { margin-top: 1rem; padding: 0.5rem 1.5rem; }\n\
pre { background: #f4f4f4; padding: 1rem; white-space: pre-wrap; }";

fn render_page(result: Option<&PersonaPage>) -> String {
    let (branche, produktbeschreibung) = match result {
        Some(page) => (
            html_escape(&page.branche),
            html_escape(&page.produktbeschreibung),
        ),
        None => (String::new(), String::new()),
    };

    let result_section = match result {
        Some(page) => format!(
            "<h2>Generierte Persona</h2>\n<pre>{}</pre>",
            html_escape(&page.persona)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="de">
<head>
<meta charset="utf-8">
<title>Persona Generator</title>
<style>
{style}
</style>
</head>
<body>
<h1>Persona Generator</h1>
<form method="post" action="/">
<label for="branche">Branche</label>
<input type="text" id="branche" name="branche" value="{branche}" required>
<label for="produktbeschreibung">Produktbeschreibung</label>
<textarea id="produktbeschreibung" name="produktbeschreibung" rows="4" required>{produktbeschreibung}</textarea>
<button type="submit">Persona erstellen</button>
</form>
{result_section}
</body>
</html>
"#,
        style = PAGE_STYLE,
        branche = branche,
        produktbeschreibung = produktbeschreibung,
        result_section = result_section
    )
}

/// Basic HTML entity escaping for user-supplied text.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
