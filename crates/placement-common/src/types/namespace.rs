//! Per-deployment naming rules
//!
//! A [`Namespace`] bundles the dataset and block name patterns and the
//! dataset data types accepted by one deployment. It is selected once when configuration is loaded and passed
//! to the entity constructors.

use crate::error::{PlacementError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Data types known to the default namespace, numbered from 1.
pub const DEFAULT_DATA_TYPES: &[&str] = &[
    "unknown", "align", "calib", "cosmic", "data", "lumi", "mc", "raw", "test",
];

/// Dataset type enumeration. Discriminants start at 1 to match stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Unknown = 1,
    Align = 2,
    Calib = 3,
    Cosmic = 4,
    Data = 5,
    Lumi = 6,
    Mc = 7,
    Raw = 8,
    Test = 9,
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::Unknown,
        DataType::Align,
        DataType::Calib,
        DataType::Cosmic,
        DataType::Data,
        DataType::Lumi,
        DataType::Mc,
        DataType::Raw,
        DataType::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Align => "align",
            DataType::Calib => "calib",
            DataType::Cosmic => "cosmic",
            DataType::Data => "data",
            DataType::Lumi => "lumi",
            DataType::Mc => "mc",
            DataType::Raw => "raw",
            DataType::Test => "test",
        }
    }

    /// Stored integer value
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or_else(|| PlacementError::format(format!("Invalid data type code {}", code)))
    }
}

impl std::str::FromStr for DataType {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlacementError::format(format!("Invalid data type {}", s)))
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming rules of one deployment
#[derive(Debug, Clone)]
pub struct Namespace {
    /// Short label of the deployment
    pub label: String,

    dataset_pattern: Regex,
    block_pattern: Regex,
    data_types: Vec<DataType>,
}

impl Namespace {
    /// Default rules: three-segment dataset paths and 8-4-4-4-12 hex block names
    pub fn standard() -> Result<Self> {
        let hex = "[0-9a-fA-F]";
        Ok(Self {
            label: "standard".to_string(),
            dataset_pattern: Regex::new(r"^/[^/]+/[^/]+/[^/]+$")?,
            block_pattern: Regex::new(&format!(
                "^{h}{{8}}-{h}{{4}}-{h}{{4}}-{h}{{4}}-{h}{{12}}$",
                h = hex
            ))?,
            data_types: DataType::ALL.to_vec(),
        })
    }

    /// Look a namespace up by its configured label.
    pub fn by_label(label: &str) -> Result<Self> {
        match label {
            "standard" | "" => Self::standard(),
            other => Err(PlacementError::config(format!("Unknown namespace {}", other))),
        }
    }

    pub fn validate_dataset_name(&self, name: &str) -> Result<()> {
        if self.dataset_pattern.is_match(name) {
            Ok(())
        } else {
            Err(PlacementError::format(format!("Invalid dataset name {}", name)))
        }
    }

    pub fn validate_block_name(&self, display_name: &str) -> Result<()> {
        if self.block_pattern.is_match(display_name) {
            Ok(())
        } else {
            Err(PlacementError::format(format!("Invalid block name {}", display_name)))
        }
    }

    /// Resolve a data type name against the types this deployment accepts.
    pub fn data_type(&self, name: &str) -> Result<DataType> {
        let data_type: DataType = name.parse()?;
        if self.data_types.contains(&data_type) {
            Ok(data_type)
        } else {
            Err(PlacementError::format(format!(
                "Data type {} is not used in namespace {}",
                name, self.label
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_pattern() {
        let ns = Namespace::standard().unwrap();
        assert!(ns.validate_dataset_name("/Primary/Processed-v1/AOD").is_ok());
        assert!(ns.validate_dataset_name("/Primary/Processed").is_err());
        assert!(ns.validate_dataset_name("Primary/Processed/AOD").is_err());
        assert!(ns.validate_dataset_name("/A/B/C/D").is_err());
    }

    #[test]
    fn test_block_pattern() {
        let ns = Namespace::standard().unwrap();
        assert!(ns
            .validate_block_name("0A1B2C3D-4e5f-6071-8293-a4b5c6d7e8f9")
            .is_ok());
        assert!(ns.validate_block_name("0a1b2c3d4e5f").is_err());
    }

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::Unknown.code(), 1);
        assert_eq!(DataType::Test.code(), 9);
        assert_eq!(DataType::from_code(7).unwrap(), DataType::Mc);
        assert!(DataType::from_code(0).is_err());
        assert_eq!("RAW".parse::<DataType>().unwrap(), DataType::Raw);

        let names: Vec<_> = DataType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, DEFAULT_DATA_TYPES);
    }

    #[test]
    fn test_data_type_lookup_is_restricted_to_namespace() {
        let mut ns = Namespace::standard().unwrap();
        assert_eq!(ns.data_type("mc").unwrap(), DataType::Mc);
        assert!(matches!(ns.data_type("bogus"), Err(PlacementError::Format(_))));

        ns.data_types = vec![DataType::Data, DataType::Mc];
        assert_eq!(ns.data_type("data").unwrap(), DataType::Data);
        assert!(matches!(ns.data_type("raw"), Err(PlacementError::Format(_))));
    }

    #[test]
    fn test_unknown_namespace() {
        assert!(matches!(
            Namespace::by_label("elsewhere"),
            Err(PlacementError::Config(_))
        ));
    }
}
