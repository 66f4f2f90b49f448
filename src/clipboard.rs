use regex::Regex;

/// What a clipboard pattern pulled out of copied text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardMatch {
    pub issue: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern {
    pub pattern: String,
    pub error: String,
}

/// Check that every pattern compiles. Returns all failures, not just the first.
pub fn validate_patterns(patterns: &[String]) -> Result<(), Vec<InvalidPattern>> {
    let invalid: Vec<InvalidPattern> = patterns
        .iter()
        .filter_map(|pattern| {
            Regex::new(pattern).err().map(|e| InvalidPattern {
                pattern: pattern.clone(),
                error: e.to_string(),
            })
        })
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(invalid)
    }
}

/// Try each pattern in order against `text` and return the first hit.
///
/// The issue comes from the `issue` named group, else the first capture
/// group, else the whole match. A `description` named group is optional.
/// Patterns that fail to compile are skipped.
pub fn parse_clipboard(text: &str, patterns: &[String]) -> Option<ClipboardMatch> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for pattern in patterns {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "skipping invalid clipboard pattern");
                continue;
            }
        };
        let Some(caps) = re.captures(text) else {
            continue;
        };

        let issue = caps
            .name("issue")
            .or_else(|| caps.get(1))
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        let Some(issue) = issue else {
            continue;
        };

        let description = caps
            .name("description")
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        return Some(ClipboardMatch { issue, description });
    }
    None
}

/// Read the system clipboard. Any failure reads as empty.
pub fn read_system_clipboard() -> Option<String> {
    match arboard::Clipboard::new().and_then(|mut cb| cb.get_text()) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!(error = %e, "clipboard unavailable");
            None
        }
    }
}

pub fn write_system_clipboard(text: &str) -> anyhow::Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    Ok(())
}
