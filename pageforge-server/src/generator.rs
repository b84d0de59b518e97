//! Content Generator: brief in, single self-contained HTML page out.

use std::sync::Arc;

use crate::error::BuildError;
use crate::llm::Generator;
use crate::model::ValidatedRequest;

/// Element id every generated page must carry.
pub const STATUS_ELEMENT_ID: &str = "app-status";

const SYSTEM_PROMPT: &str = r#"You build single-file web pages.

Output contract:
- Respond with ONE complete HTML document and nothing else. No commentary.
- Start with <!DOCTYPE html>.
- All CSS goes in a <style> tag and all JavaScript in a <script> tag. No external build step.
- Include <meta charset="utf-8"> and <meta name="viewport" content="width=device-width, initial-scale=1">.
- Include an element with id="app-status" that shows the page's current state.
- CDN links are allowed only when the brief needs a library."#;

pub struct PageGenerator {
    generator: Arc<dyn Generator>,
}

impl PageGenerator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Generate the page for a request and strip any code fence around it.
    pub async fn generate_page(&self, request: &ValidatedRequest) -> Result<String, BuildError> {
        let prompt = build_prompt(request);
        let raw = self
            .generator
            .generate(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| BuildError::Generation(e.to_string()))?;

        let html = clean_llm_html(&raw);
        if html.is_empty() {
            return Err(BuildError::Generation("model returned an empty page".into()));
        }
        if !html.contains(STATUS_ELEMENT_ID) {
            tracing::warn!(task = %request.task, "generated page has no #{STATUS_ELEMENT_ID} element");
        }
        Ok(html)
    }
}

fn build_prompt(request: &ValidatedRequest) -> String {
    format!(
        "Task: {task}\nRound: {round}\n\nBrief:\n{brief}\n\nReturn the complete index.html.",
        task = request.task,
        round = request.round,
        brief = request.brief,
    )
}

/// Extract page markup from a model response.
///
/// If the text contains a fenced block, returns the interior of the first one
/// (the info string after the opening fence is dropped). Otherwise returns the
/// whole text. Either way the result is trimmed.
pub fn clean_llm_html(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.trim().to_string();
    };
    let after_open = &text[open + 3..];
    let close = after_open.find("```");
    // Skip the info string ("html", "HTML", ...) when the fence opens its own line.
    let body_start = match (after_open.find('\n'), close) {
        (Some(nl), Some(c)) if nl < c => nl + 1,
        (Some(nl), None) => nl + 1,
        _ => 0,
    };
    let body_end = close.unwrap_or(after_open.len());
    after_open[body_start..body_end].trim().to_string()
}
