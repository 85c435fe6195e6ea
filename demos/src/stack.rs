use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Context as _;
use serde::Deserialize;
use stackstart_core::{BuiltImageRegistry, StartConfiguration};

/// On-disk stack definition: the containers to start, in order, plus any
/// image aliases produced by earlier build steps.
#[derive(Debug, Default, Deserialize)]
pub struct StackFile {
    #[serde(default)]
    pub containers: Vec<StartConfiguration>,
    #[serde(default)]
    pub built_images: BTreeMap<String, String>,
}

impl StackFile {
    pub fn registry(&self) -> BuiltImageRegistry {
        let mut registry = BuiltImageRegistry::new();
        for (alias, image_id) in &self.built_images {
            registry.register(alias, image_id);
        }
        registry
    }
}

/// Load and parse a YAML stack definition.
pub fn load_stack_file(path: &Path) -> anyhow::Result<StackFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading stack file {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing stack file {}", path.display()))
}
