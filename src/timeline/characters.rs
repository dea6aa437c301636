//! Speaker identity -> renderer target resolution.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{VisemixError, VisemixResult};
use crate::viseme::envelope::WeightsProfile;

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CharacterMapDoc {
    pub characters: BTreeMap<String, CharacterDoc>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CharacterDoc {
    /// Part-based rigs: part name (`body`, `eyes`, ...) -> object id.
    pub parts: BTreeMap<String, String>,
    /// Legacy single-mesh rigs.
    pub mesh: Option<String>,
    pub profile: Option<WeightsProfile>,
}

/// How the renderer finds the deformable target for one character.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CharacterTarget {
    PartBased { parts: BTreeMap<String, String> },
    LegacyMesh { mesh: String },
}

impl CharacterTarget {
    /// Parts win over a legacy mesh name; neither is a configuration error.
    pub fn resolve(name: &str, doc: &CharacterDoc) -> VisemixResult<Self> {
        let parts: BTreeMap<String, String> = doc
            .parts
            .iter()
            .filter(|(_, id)| !id.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !parts.is_empty() {
            return Ok(Self::PartBased { parts });
        }
        match doc.mesh.as_deref().map(str::trim) {
            Some(mesh) if !mesh.is_empty() => Ok(Self::LegacyMesh {
                mesh: mesh.to_string(),
            }),
            _ => Err(VisemixError::unresolved(format!(
                "character '{name}' has neither parts nor a mesh mapping"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Character {
    pub name: String,
    pub target: CharacterTarget,
    pub profile: WeightsProfile,
}

#[derive(Clone, Debug, Default)]
pub struct CharacterMap {
    characters: BTreeMap<String, Character>,
}

impl CharacterMap {
    pub fn from_doc(doc: &CharacterMapDoc) -> VisemixResult<Self> {
        let mut characters = BTreeMap::new();
        for (name, c) in &doc.characters {
            let target = CharacterTarget::resolve(name, c)?;
            let profile = c.profile.clone().unwrap_or_default();
            profile.validate(name)?;
            characters.insert(
                name.clone(),
                Character {
                    name: name.clone(),
                    target,
                    profile,
                },
            );
        }
        Ok(Self { characters })
    }

    pub fn from_json_str(s: &str) -> VisemixResult<Self> {
        let doc: CharacterMapDoc = serde_json::from_str(s)
            .map_err(|e| VisemixError::serde(format!("character map json: {e}")))?;
        Self::from_doc(&doc)
    }

    pub fn from_path(path: &Path) -> VisemixResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read character map '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, name: &str) -> VisemixResult<&Character> {
        self.characters.get(name).ok_or_else(|| {
            VisemixError::unresolved(format!("no character mapping for speaker '{name}'"))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/characters.rs"]
mod tests;
