//! Records served by the Photo-z Server API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// UCD marking the main right ascension column.
pub const UCD_RA: &str = "pos.eq.ra;meta.main";
/// UCD marking the main declination column.
pub const UCD_DEC: &str = "pos.eq.dec;meta.main";
/// UCD marking the redshift column.
pub const UCD_REDSHIFT: &str = "src.redshift";

/// List envelope returned by every collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Category of data product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Tagged version of the survey dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    /// Release tag, e.g. "dp0"
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Release {
    pub fn tag(&self) -> &str {
        &self.name
    }
}

/// Registered Photo-z Server user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// GitHub username
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl User {
    pub fn handle(&self) -> &str {
        &self.username
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Product identifier: numeric id or internal name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductId {
    Id(u64),
    InternalName(String),
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        ProductId::Id(id)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse() {
                return ProductId::Id(id);
            }
        }
        ProductId::InternalName(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        ProductId::from(s.as_str())
    }
}

impl From<&ProductId> for ProductId {
    fn from(id: &ProductId) -> Self {
        id.clone()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Id(id) => write!(f, "{id}"),
            ProductId::InternalName(name) => write!(f, "{name}"),
        }
    }
}

/// Product type classification across the server's naming schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKind {
    SpeczCatalog,
    TrainingSet,
    ValidationResults,
    TrainingResults,
    PhotozTable,
    Other(String),
}

impl ProductKind {
    pub fn from_type_name(name: &str) -> Self {
        match name.trim() {
            "redshift_catalog" | "specz_catalog" | "Spec-z Catalog" | "Redshift Catalog" => {
                ProductKind::SpeczCatalog
            }
            "training_set" | "Training Set" => ProductKind::TrainingSet,
            "validation_results" | "Validation Results" => ProductKind::ValidationResults,
            "training_results" | "Training Results" => ProductKind::TrainingResults,
            "photoz_table" | "Photo-z Table" => ProductKind::PhotozTable,
            other => ProductKind::Other(other.to_string()),
        }
    }

    /// Whether the main file is simple tabular data.
    pub fn is_tabular(&self) -> bool {
        !matches!(
            self,
            ProductKind::ValidationResults | ProductKind::TrainingResults | ProductKind::PhotozTable
        )
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKind::SpeczCatalog => write!(f, "Spec-z Catalog"),
            ProductKind::TrainingSet => write!(f, "Training Set"),
            ProductKind::ValidationResults => write!(f, "Validation Results"),
            ProductKind::TrainingResults => write!(f, "Training Results"),
            ProductKind::PhotozTable => write!(f, "Photo-z Table"),
            ProductKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Maps a catalog column to its UCD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAssociation {
    pub column_name: String,
    #[serde(default)]
    pub ucd: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Description of a product's main file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainFileInfo {
    pub name: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub n_rows: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub has_header: bool,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub columns_association: Vec<ColumnAssociation>,
}

impl MainFileInfo {
    /// Lower-case extension with leading dot, falling back to the file name.
    pub fn extension(&self) -> Option<String> {
        let ext = match &self.extension {
            Some(ext) if !ext.is_empty() => ext.clone(),
            _ => {
                let (_, ext) = self.name.rsplit_once('.')?;
                ext.to_string()
            }
        };
        let ext = ext.to_ascii_lowercase();
        Some(if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        })
    }

    /// Name of the column associated with `ucd`, if any.
    pub fn column_for_ucd(&self, ucd: &str) -> Option<&str> {
        self.columns_association
            .iter()
            .find(|assoc| assoc.ucd.as_deref() == Some(ucd))
            .map(|assoc| assoc.column_name.as_str())
    }
}

/// Metadata informed by a product owner.
///
/// Kept as the server's key/value record so fields added server-side are
/// still displayed; typed accessors cover the fields the client relies on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductMetadata {
    fields: Map<String, Value>,
}

impl ProductMetadata {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<u64> {
        self.fields.get("id").and_then(Value::as_u64)
    }

    pub fn internal_name(&self) -> Option<&str> {
        self.str_field("internal_name")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.str_field("display_name")
    }

    /// Product type, preferring the internal type name when present.
    pub fn product_type(&self) -> Option<&str> {
        self.str_field("product_type_internal_name")
            .or_else(|| self.str_field("product_type_name"))
    }

    pub fn kind(&self) -> Option<ProductKind> {
        self.product_type().map(ProductKind::from_type_name)
    }

    pub fn release_name(&self) -> Option<&str> {
        self.str_field("release_name")
    }

    pub fn uploaded_by(&self) -> Option<&str> {
        self.str_field("uploaded_by")
    }

    pub fn main_file(&self) -> Option<MainFileInfo> {
        let value = self.fields.get("main_file")?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub(crate) fn set_main_file(&mut self, info: &MainFileInfo) {
        if let Ok(value) = serde_json::to_value(info) {
            self.fields.insert("main_file".to_string(), value);
        }
    }

    /// Whether any of the name or type fields contains `pattern`, ignoring case.
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        [
            self.internal_name(),
            self.display_name(),
            self.str_field("product_type_name"),
            self.str_field("product_type_internal_name"),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_id_parsing() {
        assert_eq!(ProductId::from("42"), ProductId::Id(42));
        assert_eq!(ProductId::from(" 7 "), ProductId::Id(7));
        assert_eq!(
            ProductId::from("12_goldenspike"),
            ProductId::InternalName("12_goldenspike".to_string())
        );
        assert_eq!(
            ProductId::from("-3"),
            ProductId::InternalName("-3".to_string())
        );
    }

    #[test]
    fn test_product_kind_schemes() {
        assert_eq!(
            ProductKind::from_type_name("redshift_catalog"),
            ProductKind::SpeczCatalog
        );
        assert_eq!(
            ProductKind::from_type_name("Spec-z Catalog"),
            ProductKind::SpeczCatalog
        );
        assert!(!ProductKind::from_type_name("validation_results").is_tabular());
        assert!(!ProductKind::from_type_name("Photo-z Table").is_tabular());
        assert!(ProductKind::from_type_name("training_set").is_tabular());
        assert!(ProductKind::from_type_name("something new").is_tabular());
    }

    #[test]
    fn test_metadata_accessors() {
        let meta: ProductMetadata = serde_json::from_value(json!({
            "id": 3,
            "internal_name": "3_specz_dp0",
            "display_name": "Spec-z DP0",
            "product_type_name": "Spec-z Catalog",
            "product_type_internal_name": "redshift_catalog",
            "release_name": "LSST DP0",
            "uploaded_by": "gschwend",
        }))
        .unwrap();

        assert_eq!(meta.id(), Some(3));
        assert_eq!(meta.product_type(), Some("redshift_catalog"));
        assert_eq!(meta.kind(), Some(ProductKind::SpeczCatalog));
        assert_eq!(meta.release_name(), Some("LSST DP0"));
        assert!(meta.matches("SPEC"));
        assert!(!meta.matches("training"));
        assert!(meta.main_file().is_none());
    }

    #[test]
    fn test_main_file_round_trip_through_metadata() {
        let mut meta = ProductMetadata::default();
        let info = MainFileInfo {
            name: "cat.CSV".to_string(),
            extension: None,
            n_rows: Some(2),
            size: None,
            delimiter: Some(";".to_string()),
            has_header: true,
            columns: vec![],
            columns_association: vec![ColumnAssociation {
                column_name: "z_spec".to_string(),
                ucd: Some(UCD_REDSHIFT.to_string()),
                alias: None,
            }],
        };
        meta.set_main_file(&info);

        let back = meta.main_file().unwrap();
        assert_eq!(back, info);
        assert_eq!(back.extension().as_deref(), Some(".csv"));
        assert_eq!(back.column_for_ucd(UCD_REDSHIFT), Some("z_spec"));
        assert_eq!(back.column_for_ucd(UCD_RA), None);
    }
}
