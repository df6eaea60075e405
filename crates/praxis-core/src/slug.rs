//! Public slugs for users, pages and indications.

use crate::errors::CoreError;

pub const MIN_LEN: usize = 3;
pub const MAX_LEN: usize = 64;

/// Slugs that would shadow application routes.
const RESERVED: &[&str] = &["api", "admin", "health", "static", "login", "logout", "new"];

/// Turn free text into a slug: lowercase ascii, digits and single dashes.
///
/// Common Latin accents are folded (`"Clínica São José"` → `"clinica-sao-jose"`).
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out.truncate(MAX_LEN);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Check a slug supplied by a client.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the slug has the wrong length, uses
/// characters outside `[a-z0-9-]`, starts or ends with a dash, contains a
/// double dash, or is reserved.
pub fn validate(slug: &str) -> Result<(), CoreError> {
    if slug.len() < MIN_LEN || slug.len() > MAX_LEN {
        return Err(CoreError::Validation(format!(
            "slug must be {MIN_LEN} to {MAX_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(
            "slug may only contain lowercase letters, digits and dashes".into(),
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(CoreError::Validation("slug has misplaced dashes".into()));
    }
    if RESERVED.contains(&slug) {
        return Err(CoreError::Validation(format!("slug '{slug}' is reserved")));
    }
    Ok(())
}

const fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}
