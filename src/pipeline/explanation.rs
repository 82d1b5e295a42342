//! Plain-language explanation of a user's privacy settings.
//!
//! The generator is asked for a small markup subset and its answer is
//! reduced to exactly that subset (`<h3>`, `<span>`, `<br/>`) before it is
//! returned.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::models::FieldViolation;

/// Request body of the explanation endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettingsInput {
    pub profile_visibility: Option<String>,
    pub data_sharing: Option<String>,
    pub research_participation: bool,
}

/// Validated privacy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacySettings {
    pub profile_visibility: String,
    pub data_sharing: String,
    pub research_participation: bool,
}

impl PrivacySettingsInput {
    pub fn validate(self) -> Result<PrivacySettings, Vec<FieldViolation>> {
        let required = |value: Option<String>, field: &str, out: &mut Vec<FieldViolation>| {
            match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    out.push(FieldViolation::new(field, "is required"));
                    String::new()
                }
            }
        };

        let mut violations = Vec::new();
        let profile_visibility = required(self.profile_visibility, "profileVisibility", &mut violations);
        let data_sharing = required(self.data_sharing, "dataSharing", &mut violations);
        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(PrivacySettings {
            profile_visibility,
            data_sharing,
            research_participation: self.research_participation,
        })
    }
}

pub fn build_prompt(settings: &PrivacySettings) -> String {
    let research = if settings.research_participation {
        "Enabled"
    } else {
        "Disabled"
    };
    format!(
        "Explain the following privacy settings for a user of a medical application in simple, \
         easy-to-understand terms.\n\
         Keep the explanation concise and clear. Format the output using <h3> for headings and \
         <span> and <br/>. Do not use anything else.\n\n\
         - **Profile Visibility**: Currently set to \"{}\".\n\
         - **Data Sharing**: Currently set to \"{}\".\n\
         - **Research Participation**: Currently set to \"{research}\".\n",
        settings.profile_visibility, settings.data_sharing
    )
}

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("valid regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)\s*([A-Za-z][A-Za-z0-9]*)[^>]*>").expect("valid regex"));

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").expect("valid regex"));

/// Reduce generated text to the allowed markup subset.
pub fn sanitize_markup(raw: &str) -> String {
    let text = FENCE_RE.replace_all(raw, "");
    let text = SCRIPT_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, |caps: &Captures| {
        let closing = !caps[1].is_empty();
        match caps[2].to_ascii_lowercase().as_str() {
            "br" => "<br/>".to_string(),
            name @ ("h3" | "span") if closing => format!("</{name}>"),
            name @ ("h3" | "span") => format!("<{name}>"),
            _ => String::new(),
        }
    });
    text.trim().to_string()
}
