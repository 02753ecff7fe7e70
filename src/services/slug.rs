use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;

use crate::{error::AppResult, storage::Store};

const FALLBACK_SLUG: &str = "album";

/// Lowercase ASCII identifier made of `[a-z0-9]` runs joined by single hyphens.
///
/// Diacritics are stripped, whitespace/underscores/hyphens become separators,
/// and everything else is dropped. Empty or symbol-only input yields `""`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
    }

    slug
}

/// Picks a slug for `name` no other album uses, appending `-2`, `-3`, ...
pub async fn unique_slug(store: &dyn Store, name: &str, except: Option<Uuid>) -> AppResult<String> {
    let base = match slugify(name) {
        s if s.is_empty() => FALLBACK_SLUG.to_string(),
        s => s,
    };

    if !store.slug_taken(&base, except).await? {
        return Ok(base);
    }

    let mut suffix = 2u32;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !store.slug_taken(&candidate, except).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
