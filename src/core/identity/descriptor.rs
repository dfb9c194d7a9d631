// ─── Archive Descriptor Reader ───
// Opens a mod archive in memory and normalizes the first known descriptor.
//
// Priority (first present wins, never merged):
//   1. fabric.mod.json       Fabric
//   2. META-INF/mods.toml    Forge (modern)
//   3. mcmod.info            Forge (legacy)

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use zip::result::ZipError;

use super::model::{LoaderKind, LocalModIdentity, SourceConfidence};
use crate::core::error::{ModsyncError, ModsyncResult};

pub const FABRIC_DESCRIPTOR: &str = "fabric.mod.json";
pub const FORGE_DESCRIPTOR: &str = "META-INF/mods.toml";
pub const LEGACY_FORGE_DESCRIPTOR: &str = "mcmod.info";

const DESCRIPTOR_PRIORITY: [&str; 3] = [FABRIC_DESCRIPTOR, FORGE_DESCRIPTOR, LEGACY_FORGE_DESCRIPTOR];

static BARE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").expect("valid bare version regex"));

static TOML_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*["']([^"']*)["']"#)
        .expect("valid toml assignment regex")
});

/// Extract a [`SourceConfidence::Descriptor`] identity from archive bytes.
///
/// Returns [`ModsyncError::NoDescriptorFound`] when none of the known entries
/// exist, [`ModsyncError::DescriptorParse`] when the matched entry is
/// unusable, and [`ModsyncError::Zip`] when the archive cannot be opened.
pub fn read_descriptor(filename: &str, bytes: &[u8]) -> ModsyncResult<LocalModIdentity> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for entry in DESCRIPTOR_PRIORITY {
        let raw = match archive.by_name(entry) {
            Ok(mut file) => {
                let mut buf = Vec::new();
                // A damaged entry is an archive problem, not a host IO failure.
                file.read_to_end(&mut buf)
                    .map_err(|e| ModsyncError::Zip(ZipError::Io(e)))?;
                String::from_utf8_lossy(&buf).trim_start_matches('\u{feff}').to_string()
            }
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(e.into()),
        };

        debug!("Found {} in {}", entry, filename);
        return parse_descriptor(entry, filename, &raw);
    }

    Err(ModsyncError::NoDescriptorFound)
}

/// Parse the text of a known descriptor entry.
pub fn parse_descriptor(entry: &str, filename: &str, raw: &str) -> ModsyncResult<LocalModIdentity> {
    let parsed = match entry {
        FABRIC_DESCRIPTOR => parse_fabric(raw),
        FORGE_DESCRIPTOR => parse_mods_toml(raw),
        LEGACY_FORGE_DESCRIPTOR => parse_mcmod_info(raw),
        other => Err(format!("unsupported descriptor entry {other}")),
    };

    let fields = parsed.map_err(|reason| ModsyncError::DescriptorParse {
        entry: entry.to_string(),
        reason,
        raw: raw.to_string(),
    })?;

    let loader_kind = if entry == FABRIC_DESCRIPTOR {
        LoaderKind::Fabric
    } else {
        LoaderKind::Forge
    };

    Ok(LocalModIdentity {
        filename: filename.to_string(),
        display_name: fields.name.unwrap_or_else(|| fields.id.clone()),
        mod_id: Some(fields.id),
        mod_version: fields.version,
        minecraft_version: fields.minecraft_version,
        loader_kind,
        source_confidence: SourceConfidence::Descriptor,
    })
}

/// First bare version token of a range expression (`"~1.20"` → `"1.20"`).
pub fn bare_version(range: &str) -> Option<String> {
    BARE_VERSION_RE.find(range).map(|m| m.as_str().to_string())
}

struct DescriptorFields {
    id: String,
    name: Option<String>,
    version: Option<String>,
    minecraft_version: Option<String>,
}

impl DescriptorFields {
    fn new(id: Option<String>, name: Option<String>, version: Option<String>, mc: Option<String>) -> Result<Self, String> {
        let id = id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "missing mod id".to_string())?;

        Ok(Self {
            id,
            name: name.filter(|s| !s.trim().is_empty()),
            version: version.filter(|v| !is_placeholder(v)),
            minecraft_version: mc.filter(|v| !is_placeholder(v)).as_deref().and_then(bare_version),
        })
    }
}

fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty() || value.contains("${")
}

// ── Fabric ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FabricModJson {
    id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    depends: HashMap<String, serde_json::Value>,
}

fn parse_fabric(raw: &str) -> Result<DescriptorFields, String> {
    let json: FabricModJson = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    let minecraft = json.depends.get("minecraft").and_then(|value| match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    });

    DescriptorFields::new(json.id, json.name, json.version, minecraft)
}

// ── Forge (mods.toml) ───────────────────────────────────

#[derive(Debug, PartialEq)]
enum TomlSection {
    Root,
    Mods,
    Dependency,
    Other,
}

/// Line-oriented scan of `key="value"` assignments. Not a TOML parser.
fn parse_mods_toml(raw: &str) -> Result<DescriptorFields, String> {
    let mut section = TomlSection::Root;
    let mut mods_blocks = 0usize;
    let mut in_multiline = false;

    let mut mod_id = None;
    let mut display_name = None;
    let mut version = None;
    let mut minecraft_direct = None;
    let mut minecraft_dependency = None;

    let mut dep_mod_id: Option<String> = None;
    let mut dep_range: Option<String> = None;

    for line in raw.lines() {
        let triple_quotes = line.matches("'''").count() + line.matches("\"\"\"").count();
        if in_multiline {
            if triple_quotes % 2 == 1 {
                in_multiline = false;
            }
            continue;
        }
        if triple_quotes % 2 == 1 {
            in_multiline = true;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if section == TomlSection::Dependency {
                take_minecraft_range(&mut dep_mod_id, &mut dep_range, &mut minecraft_dependency);
            }
            let header = trimmed.trim_matches(|c| c == '[' || c == ']').trim();
            section = if header == "mods" {
                mods_blocks += 1;
                TomlSection::Mods
            } else if header.starts_with("dependencies") {
                TomlSection::Dependency
            } else {
                TomlSection::Other
            };
            continue;
        }

        let Some(caps) = TOML_ASSIGNMENT_RE.captures(line) else {
            continue;
        };
        let key = &caps[1];
        let value = caps[2].to_string();

        match section {
            TomlSection::Dependency => match key {
                "modId" => dep_mod_id = Some(value),
                "versionRange" => dep_range = Some(value),
                _ => {}
            },
            TomlSection::Root | TomlSection::Mods if mods_blocks <= 1 => match key {
                "modId" if mod_id.is_none() => mod_id = Some(value),
                "displayName" if display_name.is_none() => display_name = Some(value),
                "version" if version.is_none() => version = Some(value),
                "minecraft" if minecraft_direct.is_none() => minecraft_direct = Some(value),
                _ => {}
            },
            _ => {
                if key == "minecraft" && minecraft_direct.is_none() {
                    minecraft_direct = Some(value);
                }
            }
        }
    }

    if section == TomlSection::Dependency {
        take_minecraft_range(&mut dep_mod_id, &mut dep_range, &mut minecraft_dependency);
    }

    DescriptorFields::new(
        mod_id,
        display_name,
        version,
        minecraft_direct.or(minecraft_dependency),
    )
}

fn take_minecraft_range(
    dep_mod_id: &mut Option<String>,
    dep_range: &mut Option<String>,
    minecraft: &mut Option<String>,
) {
    let id = dep_mod_id.take();
    let range = dep_range.take();
    if minecraft.is_none() && id.as_deref() == Some("minecraft") {
        *minecraft = range;
    }
}

// ── Forge legacy (mcmod.info) ───────────────────────────

fn parse_mcmod_info(raw: &str) -> Result<DescriptorFields, String> {
    let json: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    let list = match &json {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map
            .get("modList")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "expected a list of mods".to_string())?,
        _ => return Err("expected a list of mods".to_string()),
    };

    let first = list.first().ok_or_else(|| "empty mod list".to_string())?;
    let field = |key: &str| first.get(key).and_then(|v| v.as_str()).map(str::to_string);

    DescriptorFields::new(field("modid"), field("name"), field("version"), field("mcversion"))
}
