//! Label encoding of categorical columns.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use soil_core::{ensure_parent_dir, CategoricalColumn, Error, Result};

/// Bijection between the categories seen at fit time and codes `0..len`.
///
/// Codes follow the ascending order of the category strings. The vocabulary is
/// frozen once fitted; there is no way to add a category afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: CategoricalColumn,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fits on the distinct values of `values`
    pub fn fit<'a, I>(column: CategoricalColumn, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: Vec<String> = values
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        if classes.is_empty() {
            return Err(Error::Dataset(format!(
                "cannot fit {column} encoder on an empty column"
            )));
        }
        Ok(Self { column, classes })
    }

    pub fn column(&self) -> CategoricalColumn {
        self.column
    }

    /// Fitted categories in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Code of `value`; unseen values fail with [`Error::UnknownCategory`]
    pub fn encode(&self, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_err(|_| Error::UnknownCategory {
                column: self.column,
                value: value.to_string(),
            })
    }

    /// Category of `code`
    pub fn decode(&self, code: usize) -> Result<&str> {
        self.classes.get(code).map(String::as_str).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} code {code} out of range (vocabulary size {})",
                self.column,
                self.classes.len()
            ))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads an encoder and checks it belongs to `column`
    pub fn load(path: &Path, column: CategoricalColumn) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let encoder: LabelEncoder = serde_json::from_str(&json)?;

        if encoder.column != column {
            return Err(Error::Serialization(format!(
                "{} holds the {} encoder, expected {column}",
                path.display(),
                encoder.column
            )));
        }
        let sorted = encoder.classes.windows(2).all(|w| w[0] < w[1]);
        if encoder.classes.is_empty() || !sorted {
            return Err(Error::Serialization(format!(
                "{} is not a fitted encoder (classes must be non-empty, sorted and unique)",
                path.display()
            )));
        }
        Ok(encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seasons() -> LabelEncoder {
        LabelEncoder::fit(
            CategoricalColumn::Season,
            ["ฝน", "ร้อน", "หนาว", "ฝน", "ร้อน"],
        )
        .unwrap()
    }

    #[test]
    fn test_classes_sorted_and_unique() {
        let encoder = seasons();
        assert_eq!(encoder.len(), 3);
        let mut sorted = encoder.classes().to_vec();
        sorted.sort();
        assert_eq!(encoder.classes(), sorted.as_slice());
    }

    #[test]
    fn test_bijection_over_vocabulary() {
        let encoder = seasons();
        for (code, class) in encoder.classes().iter().enumerate() {
            assert_eq!(encoder.encode(class).unwrap(), code);
            assert_eq!(encoder.decode(code).unwrap(), class);
            assert_eq!(encoder.encode(encoder.decode(code).unwrap()).unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_category_fails() {
        let err = seasons().encode("มรสุม").unwrap_err();
        match err {
            Error::UnknownCategory { column, value } => {
                assert_eq!(column, CategoricalColumn::Season);
                assert_eq!(value, "มรสุม");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_out_of_range() {
        assert!(seasons().decode(3).is_err());
    }

    #[test]
    fn test_fit_empty_fails() {
        let empty: [&str; 0] = [];
        assert!(LabelEncoder::fit(CategoricalColumn::Region, empty).is_err());
    }

    #[test]
    fn test_order_independent_fit() {
        let a = LabelEncoder::fit(CategoricalColumn::SoilType, ["ข", "ก", "ค"]).unwrap();
        let b = LabelEncoder::fit(CategoricalColumn::SoilType, ["ค", "ข", "ก"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("season.json");
        let encoder = seasons();
        encoder.save(&path).unwrap();

        let loaded = LabelEncoder::load(&path, CategoricalColumn::Season).unwrap();
        assert_eq!(loaded, encoder);
        assert!(LabelEncoder::load(&path, CategoricalColumn::Plant).is_err());
    }

    #[test]
    fn test_load_rejects_unsorted_classes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"column":"region","classes":["b","a"]}"#).unwrap();
        assert!(LabelEncoder::load(&path, CategoricalColumn::Region).is_err());
    }
}
