// ─── Filename Heuristics ───
// Best-effort identity for archives without a usable descriptor.

use std::sync::LazyLock;

use regex::Regex;

use super::model::{LoaderKind, LocalModIdentity, SourceConfidence};

/// Extensions stripped from a filename before deriving a display name.
const KNOWN_ARCHIVE_EXTENSIONS: &[&str] = &[".jar", ".zip"];

/// Words that mark a platform/loader rather than part of the mod's name.
const MARKER_WORDS: &[&str] = &["mc", "minecraft", "forge", "fabric"];

static GAME_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9.])(?:(?:mc|minecraft|forge|fabric)[-_]?)?(1\.\d+(?:\.\d+)?)")
        .expect("valid game version regex")
});

/// Build a [`SourceConfidence::FilenameHeuristic`] identity. Never fails.
pub fn parse_filename(filename: &str) -> LocalModIdentity {
    let stem = strip_archive_extension(filename);
    let minecraft_version = game_version_token(filename);
    let mod_id = leading_identifier(stem);

    let display_name = match &mod_id {
        Some(id) => title_case(id),
        None => stem.to_string(),
    };

    LocalModIdentity {
        filename: filename.to_string(),
        mod_id,
        display_name,
        mod_version: None,
        minecraft_version,
        loader_kind: loader_hint(stem),
        source_confidence: SourceConfidence::FilenameHeuristic,
    }
}

/// First `1.<major>` / `1.<major>.<minor>` token, optionally after a marker.
pub fn game_version_token(filename: &str) -> Option<String> {
    GAME_VERSION_RE
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn strip_archive_extension(filename: &str) -> &str {
    let lower = filename.to_ascii_lowercase();
    KNOWN_ARCHIVE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &filename[..filename.len() - ext.len()])
        .unwrap_or(filename)
}

/// Leading run of `[a-z0-9]` words joined by `-`/`_`, stopping at the first
/// version-looking or marker word.
fn leading_identifier(stem: &str) -> Option<String> {
    let lower = stem.to_ascii_lowercase();
    let mut end = 0;

    for (index, piece) in lower.split_inclusive(['-', '_']).enumerate() {
        let word = piece.trim_end_matches(['-', '_']);
        let plain = !word.is_empty() && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !plain {
            break;
        }

        if index == 0 {
            if !word.chars().any(|c| c.is_ascii_lowercase()) {
                break;
            }
        } else if looks_like_version(word) || MARKER_WORDS.contains(&word) {
            break;
        }

        end += piece.len();
    }

    let id = lower[..end].trim_end_matches(['-', '_']);
    (!id.is_empty()).then(|| id.to_string())
}

fn looks_like_version(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('v') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn loader_hint(stem: &str) -> LoaderKind {
    stem.split(['-', '_', '+', ' '])
        .map(str::to_ascii_lowercase)
        .find_map(|word| match word.as_str() {
            "fabric" => Some(LoaderKind::Fabric),
            "forge" => Some(LoaderKind::Forge),
            _ => None,
        })
        .unwrap_or(LoaderKind::Unknown)
}

fn title_case(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
