//! Item name normalization.
//!
//! Two keys exist:
//! [`normalize_name`] is the shopping-list identity (dedup, checked state,
//! at-home membership); [`normalize_pending_name`] is a looser key used only to
//! count how many distinct things are still needed.

/// Words that open a parenthetical step marker, e.g. "(step 3)".
const STEP_MARKERS: &[&str] = &["step", "schritt", "étape", "paso"];

/// Phrases that start a trailing usage clause, e.g. "for the filling".
const TRAILING_PHRASES: &[&str] = &["for", "to serve", "für", "pour", "para"];

#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Shopping-list key with step markers and trailing usage clauses removed, so
/// "Sugar (step 2)" and "sugar for the filling" count as one needed item.
#[must_use]
pub fn normalize_pending_name(raw: &str) -> String {
    let mut name = normalize_name(raw);
    if let Some(stripped) = strip_step_marker(&name) {
        name = stripped;
    }
    if let Some(stripped) = strip_trailing_phrase(&name) {
        name = stripped;
    }
    name
}

fn strip_step_marker(name: &str) -> Option<String> {
    let body = name.strip_suffix(')')?;
    let open = body.rfind('(')?;
    let inner = body[open + 1..].trim();
    let is_step = STEP_MARKERS.iter().any(|marker| {
        inner.strip_prefix(marker).is_some_and(|rest| {
            let rest = rest.trim();
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
        })
    });
    let head = body[..open].trim_end();
    (is_step && !head.is_empty()).then(|| head.to_string())
}

fn strip_trailing_phrase(name: &str) -> Option<String> {
    let cut = TRAILING_PHRASES
        .iter()
        .filter_map(|phrase| {
            let needle = format!(" {phrase}");
            name.match_indices(&needle)
                .map(|(idx, _)| idx)
                .find(|&idx| {
                    let after = &name[idx + needle.len()..];
                    after.is_empty() || after.starts_with(' ')
                })
        })
        .min()?;
    let head = name[..cut].trim_end_matches([',', ';', ' ']);
    (!head.is_empty()).then(|| head.to_string())
}
