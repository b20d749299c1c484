//! Code-language tag table
//!
//! The service identifies code-block languages by fixed integers. The table
//! is bidirectional: fence hints resolve to tags on the write path and tags
//! resolve back to canonical fence names on the read path. Unrecognized or
//! empty hints fall back to plaintext.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Tag reserved for plaintext and unknown languages.
pub const PLAINTEXT: i32 = 1;

/// Canonical language names and their fixed wire tags.
const LANGUAGES: &[(&str, i32)] = &[
    ("plaintext", PLAINTEXT),
    ("abap", 2),
    ("ada", 3),
    ("apache", 4),
    ("apex", 5),
    ("assembly", 6),
    ("bash", 7),
    ("csharp", 8),
    ("cpp", 9),
    ("c", 10),
    ("cobol", 11),
    ("css", 12),
    ("coffeescript", 13),
    ("javascript", 14),
    ("java", 15),
    ("json", 16),
    ("kotlin", 17),
    ("latex", 18),
    ("lua", 19),
    ("markdown", 20),
    ("matlab", 21),
    ("objectivec", 22),
    ("php", 23),
    ("python", 24),
    ("r", 25),
    ("ruby", 26),
    ("rust", 27),
    ("scala", 28),
    ("shell", 29),
    ("sql", 30),
    ("swift", 31),
    ("typescript", 32),
    ("xml", 33),
    ("yaml", 34),
    ("go", 35),
];

/// Common fence-hint aliases mapped to canonical names.
const ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("py", "python"),
    ("rb", "ruby"),
    ("golang", "go"),
    ("c++", "cpp"),
    ("c#", "csharp"),
    ("objective-c", "objectivec"),
    ("yml", "yaml"),
    ("sh", "bash"),
    ("text", "plaintext"),
    ("txt", "plaintext"),
];

static NAME_TO_ID: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, i32> = LANGUAGES.iter().copied().collect();
    for (alias, canonical) in ALIASES {
        if let Some(id) = LANGUAGES.iter().find(|(name, _)| name == canonical) {
            map.insert(alias, id.1);
        }
    }
    map
});

static ID_TO_NAME: Lazy<HashMap<i32, &'static str>> =
    Lazy::new(|| LANGUAGES.iter().map(|(name, id)| (*id, *name)).collect());

/// Resolve a fence hint (e.g. `rust`, `py`) to its wire tag.
///
/// Matching is case-insensitive; unrecognized or empty hints resolve to
/// [`PLAINTEXT`].
pub fn id_for_hint(hint: &str) -> i32 {
    let normalized = hint.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return PLAINTEXT;
    }
    NAME_TO_ID.get(normalized.as_str()).copied().unwrap_or(PLAINTEXT)
}

/// Canonical fence name for a wire tag, falling back to `plaintext`.
pub fn name_for_id(id: i32) -> &'static str {
    ID_TO_NAME.get(&id).copied().unwrap_or("plaintext")
}
