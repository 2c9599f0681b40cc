use super::Plan;
use crate::error::{OrchestrationError, Result};

pub struct PlanParser;

impl PlanParser {
    /// Parse and structurally validate a plan.
    pub fn parse(json: &str) -> Result<Plan> {
        let plan: Plan = serde_json::from_str(json)
            .map_err(|error| OrchestrationError::InvalidPlan(format!("invalid plan JSON: {error}")))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Extract a plan from free-form model output.
    pub fn parse_reply(text: &str) -> Result<Plan> {
        let json = extract_json(text).ok_or_else(|| {
            OrchestrationError::InvalidPlan("model reply contains no JSON object".into())
        })?;
        Self::parse(json)
    }
}

/// Locate the JSON object in model output: a ```json fence, a bare ``` fence
/// opening on `{`, or the outermost braces.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            let candidate = rest[..end].trim();
            if !candidate.is_empty() {
                return Some(candidate);
            }
        }
    }

    if let Some(start) = text.find("```\n{") {
        let rest = &text[start + "```\n".len()..];
        if let Some(end) = rest.find("```") {
            let candidate = rest[..end].trim();
            if !candidate.is_empty() {
                return Some(candidate);
            }
        }
    }

    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open..=close])
}
