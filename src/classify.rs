//! Category classification and type filtering

use crate::catalog::{CatalogEntry, ModelVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical download categories, also the top-level folder under a username
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Lora,
    Checkpoints,
    Embeddings,
    #[serde(rename = "Training_Data")]
    TrainingData,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Lora,
        Category::Checkpoints,
        Category::Embeddings,
        Category::TrainingData,
        Category::Other,
    ];

    /// Map a declared model type onto a bucket; unknown types land in `Other`
    pub fn from_declared_type(model_type: &str) -> Self {
        match model_type.trim().to_ascii_uppercase().as_str() {
            "LORA" => Self::Lora,
            "CHECKPOINT" => Self::Checkpoints,
            "TEXTUALINVERSION" => Self::Embeddings,
            "TRAINING_DATA" => Self::TrainingData,
            _ => Self::Other,
        }
    }

    /// Folder name on disk
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Lora => "Lora",
            Self::Checkpoints => "Checkpoints",
            Self::Embeddings => "Embeddings",
            Self::TrainingData => "Training_Data",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "");
        match normalized.as_str() {
            "lora" => Ok(Self::Lora),
            "checkpoint" | "checkpoints" => Ok(Self::Checkpoints),
            "embedding" | "embeddings" => Ok(Self::Embeddings),
            "trainingdata" => Ok(Self::TrainingData),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "unknown category '{}' (expected Lora, Checkpoints, Embeddings, Training_Data or Other)",
                s
            )),
        }
    }
}

/// Which categories a run downloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    #[default]
    All,
    Only(Category),
    Exclude(Category),
}

impl TypeFilter {
    pub fn admits(&self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == category,
            Self::Exclude(unwanted) => *unwanted != category,
        }
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(c) => write!(f, "only {}", c),
            Self::Exclude(c) => write!(f, "excluding {}", c),
        }
    }
}

/// Result of classifying one catalog entry
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    pub category: Category,
    pub base_models: BTreeSet<String>,
    /// Versions with something to fetch, in catalog order
    pub versions: Vec<&'a ModelVersion>,
}

pub fn classify(entry: &CatalogEntry) -> Classification<'_> {
    let versions = entry
        .model_versions
        .iter()
        .filter(|v| !v.files.is_empty() || !v.images.is_empty())
        .collect();

    Classification {
        category: Category::from_declared_type(&entry.model_type),
        base_models: entry.base_models(),
        versions,
    }
}

/// Names of files whose declared role is training data
pub fn training_data_files(entry: &CatalogEntry) -> Vec<String> {
    entry
        .model_versions
        .iter()
        .flat_map(|v| v.files.iter())
        .filter(|f| f.file_type.as_deref() == Some("Training Data"))
        .map(|f| f.name.clone().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(model_type: &str, versions: serde_json::Value) -> CatalogEntry {
        CatalogEntry::from_value(json!({
            "id": 1,
            "name": "m",
            "type": model_type,
            "modelVersions": versions
        }))
        .unwrap()
    }

    #[test]
    fn test_declared_type_mapping() {
        assert_eq!(Category::from_declared_type("LORA"), Category::Lora);
        assert_eq!(Category::from_declared_type("Checkpoint"), Category::Checkpoints);
        assert_eq!(
            Category::from_declared_type("TextualInversion"),
            Category::Embeddings
        );
        assert_eq!(
            Category::from_declared_type("Training_Data"),
            Category::TrainingData
        );
        assert_eq!(Category::from_declared_type("LoCon"), Category::Other);
        assert_eq!(Category::from_declared_type(""), Category::Other);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("lora".parse::<Category>().unwrap(), Category::Lora);
        assert_eq!(
            "Training_Data".parse::<Category>().unwrap(),
            Category::TrainingData
        );
        assert_eq!("Checkpoint".parse::<Category>().unwrap(), Category::Checkpoints);
        assert!("All".parse::<Category>().is_err());
    }

    #[test]
    fn test_filter_exclusivity() {
        let only = TypeFilter::Only(Category::Lora);
        let exclude = TypeFilter::Exclude(Category::Lora);
        for category in Category::ALL {
            assert_eq!(only.admits(category), category == Category::Lora);
            assert_eq!(exclude.admits(category), category != Category::Lora);
            assert!(TypeFilter::All.admits(category));
        }
    }

    #[test]
    fn test_versions_without_files_keep_images() {
        let e = entry(
            "LORA",
            json!([
                { "id": 1, "name": "files", "files": [{ "name": "a.safetensors", "downloadUrl": "u" }] },
                { "id": 2, "name": "images only", "images": [{ "url": "i" }] },
                { "id": 3, "name": "empty" }
            ]),
        );
        let c = classify(&e);
        let ids: Vec<u64> = c.versions.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_base_models_union() {
        let e = entry(
            "Checkpoint",
            json!([
                { "id": 1, "name": "a", "baseModel": "SDXL 1.0" },
                { "id": 2, "name": "b", "baseModel": "SD 1.5" },
                { "id": 3, "name": "c", "baseModel": "SD 1.5" }
            ]),
        );
        let c = classify(&e);
        assert_eq!(c.category, Category::Checkpoints);
        assert_eq!(c.base_models.len(), 2);
    }

    #[test]
    fn test_training_data_files() {
        let e = entry(
            "LORA",
            json!([{ "id": 1, "name": "v", "files": [
                { "name": "model.safetensors", "downloadUrl": "u", "type": "Model" },
                { "name": "dataset.zip", "downloadUrl": "u", "type": "Training Data" }
            ]}]),
        );
        assert_eq!(training_data_files(&e), vec!["dataset.zip".to_string()]);
    }

    #[test]
    fn test_filter_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: TypeFilter,
        }
        let w: Wrapper = toml::from_str("filter = { exclude = \"Training_Data\" }").unwrap();
        assert_eq!(w.filter, TypeFilter::Exclude(Category::TrainingData));
        let w: Wrapper = toml::from_str("filter = \"all\"").unwrap();
        assert_eq!(w.filter, TypeFilter::All);
    }
}
