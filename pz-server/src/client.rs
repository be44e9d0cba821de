//! User-facing client for the Photo-z Server.
//!
//! [`PzServer`] wraps [`PzServerApi`] with the operations a notebook or
//! script needs: browse reference data, look up product metadata, and fetch
//! products either into memory or onto disk. The `display_*` variants return
//! a [`Table`] ready to print.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::api::{DownloadedFile, PzServerApi};
use crate::catalog::{Catalog, SpeczCatalog, TrainingSet};
use crate::config::ClientConfig;
use crate::display::{cell_text, Table};
use crate::error::{PzError, Result};
use crate::filters::ProductFilters;
use crate::models::{
    MainFileInfo, ProductId, ProductKind, ProductMetadata, ProductType, Release, User,
};

/// Only completed products are listed.
const COMPLETED_STATUS: &str = "1";

/// Product listing columns, with the header shown for each.
const PRODUCT_LIST_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("internal_name", "internal_name"),
    ("display_name", "product_name"),
    ("product_type_name", "product_type"),
    ("release_name", "release"),
    ("uploaded_by", "uploaded_by"),
    ("official_product", "official_product"),
    ("description", "description"),
    ("created_at", "created_at"),
];

/// Metadata keys shown by `display_product_metadata`, with their display names.
const METADATA_KEYS: &[(&str, &str)] = &[
    ("id", "id"),
    ("internal_name", "internal_name"),
    ("display_name", "product_name"),
    ("product_type_name", "product_type"),
    ("release_name", "release"),
    ("uploaded_by", "uploaded_by"),
    ("official_product", "official_product"),
    ("pz_code", "pz_code"),
    ("description", "description"),
    ("created_at", "created_at"),
];

/// A product fetched into memory.
#[derive(Debug, Clone)]
pub struct ProductData {
    pub metadata: ProductMetadata,
    /// Raw main file as served
    pub file: DownloadedFile,
    /// Main file parsed as a table
    pub catalog: Catalog,
    /// Local copy written when requested
    pub saved_to: Option<PathBuf>,
}

impl ProductData {
    /// Raw bytes of the product file.
    pub fn bytes(&self) -> &[u8] {
        &self.file.content
    }
}

/// Client for the Photo-z Server.
///
/// Without a token only public data is reachable; calls the server refuses
/// fail with [`PzError::Access`].
#[derive(Debug)]
pub struct PzServer {
    api: PzServerApi,
    download_dir: PathBuf,
}

impl PzServer {
    /// Create a client; no request is sent.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            api: PzServerApi::new(&config),
            download_dir: config.download_dir,
        }
    }

    /// Create a client and, when a token is configured, check it against the server.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let server = Self::new(config);
        if server.has_token() {
            server.api.check_token()?;
            log::debug!("Token accepted by {}", server.api.base_url());
        }
        Ok(server)
    }

    pub fn has_token(&self) -> bool {
        self.api.has_token()
    }

    /// Low-level API access.
    pub fn api(&self) -> &PzServerApi {
        &self.api
    }

    // === Product types ===

    /// Valid product types with their descriptions.
    pub fn product_types(&self) -> Result<Vec<ProductType>> {
        self.api.get_all("product-types")
    }

    /// Product type name -> description.
    pub fn list_product_types(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .product_types()?
            .into_iter()
            .map(|t| (t.name, t.description.unwrap_or_default()))
            .collect())
    }

    pub fn display_product_types(&self) -> Result<Table> {
        let mut table = Table::new(["Product type", "Description"]);
        for product_type in self.product_types()? {
            table.push_row([
                product_type.display_name,
                product_type.description.unwrap_or_default(),
            ]);
        }
        Ok(table)
    }

    // === Users ===

    /// Registered users (names and GitHub usernames).
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.api.get_all("users")
    }

    /// User by GitHub username.
    pub fn get_user(&self, handle: &str) -> Result<User> {
        self.list_users()?
            .into_iter()
            .find(|user| user.username == handle)
            .ok_or_else(|| PzError::NotFound(format!("user '{handle}'")))
    }

    pub fn display_users(&self) -> Result<Table> {
        let mut table = Table::new(["GitHub username", "name"]);
        for user in self.list_users()? {
            let name = user.full_name();
            table.push_row([user.username, name]);
        }
        Ok(table)
    }

    // === Releases ===

    /// Data releases of the survey; the list grows over time.
    pub fn list_releases(&self) -> Result<Vec<Release>> {
        self.api.get_all("releases")
    }

    /// Release by tag or display name.
    pub fn get_release(&self, tag: &str) -> Result<Release> {
        self.list_releases()?
            .into_iter()
            .find(|release| release.name == tag || release.display_name == tag)
            .ok_or_else(|| PzError::NotFound(format!("release '{tag}'")))
    }

    pub fn display_releases(&self) -> Result<Table> {
        let mut table = Table::new(["Release", "Description"]);
        for release in self.list_releases()? {
            table.push_row([release.display_name, release.description.unwrap_or_default()]);
        }
        Ok(table)
    }

    // === Products ===

    /// Completed products, narrowed by `filters`.
    ///
    /// Filter keys are checked against the endpoint's options first, so an
    /// unknown key fails with [`PzError::InvalidFilter`] before listing.
    /// With a search pattern only products whose name or type contains it
    /// are kept, whatever else the server's search matched.
    pub fn list_products(&self, filters: &ProductFilters) -> Result<Vec<ProductMetadata>> {
        let mut query = vec![("status".to_string(), COMPLETED_STATUS.to_string())];
        if !filters.is_empty() {
            filters.validate(&self.api.options("products")?)?;
            query.extend(filters.to_query());
        }
        let mut products: Vec<ProductMetadata> = self.api.list("products", &query)?;

        let patterns = filters.search_patterns();
        if !patterns.is_empty() {
            let listed = products.len();
            products.retain(|product| patterns.iter().any(|pattern| product.matches(pattern)));
            if products.len() < listed {
                log::debug!(
                    "Dropped {} search results not matching {patterns:?} by name or type",
                    listed - products.len()
                );
            }
        }
        Ok(products)
    }

    pub fn display_products_list(&self, filters: &ProductFilters) -> Result<Table> {
        let mut table = Table::new(PRODUCT_LIST_COLUMNS.iter().map(|(_, header)| *header));
        for product in self.list_products(filters)? {
            table.push_row(PRODUCT_LIST_COLUMNS.iter().map(|(key, _)| {
                product.get(key).map(cell_text).unwrap_or_default()
            }));
        }
        Ok(table)
    }

    fn resolve_metadata(&self, product: &ProductId) -> Result<ProductMetadata> {
        match product {
            ProductId::Id(id) => self.api.get("products", *id).map_err(|e| match e {
                PzError::NotFound(_) => PzError::NotFound(format!("product {id}")),
                other => other,
            }),
            ProductId::InternalName(name) => {
                let filters = ProductFilters::new().with("internal_name", name.as_str());
                self.list_products(&filters)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| PzError::NotFound(format!("product '{name}'")))
            }
        }
    }

    /// Metadata informed by the product owner, with the main file record attached.
    pub fn get_product_metadata(&self, product: impl Into<ProductId>) -> Result<ProductMetadata> {
        let product = product.into();
        let mut metadata = self.resolve_metadata(&product)?;

        if let Some(id) = metadata.id() {
            match self.get_main_file_info(id) {
                Ok(Some(info)) => metadata.set_main_file(&info),
                Ok(None) => {}
                Err(PzError::NotFound(_)) => {
                    log::debug!("Product {product} has no main file information");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(metadata)
    }

    /// Main file description including its column associations.
    pub fn get_main_file_info(&self, id: u64) -> Result<Option<MainFileInfo>> {
        let Some(mut info) = self
            .api
            .get_member::<MainFileInfo>(&format!("products/{id}/main_file_info/"), "main_file")?
        else {
            return Ok(None);
        };

        // Column associations are optional; a refusal here leaves them empty
        match self
            .api
            .list("product-contents", &[("product".to_string(), id.to_string())])
        {
            Ok(associations) => info.columns_association = associations,
            Err(e) => log::warn!("No column associations for product {id}: {e}"),
        }
        Ok(Some(info))
    }

    pub fn display_product_metadata(&self, product: impl Into<ProductId>) -> Result<Table> {
        let metadata = self.get_product_metadata(product)?;
        Ok(metadata_table(&metadata))
    }

    fn numeric_id(metadata: &ProductMetadata, product: &ProductId) -> Result<u64> {
        metadata
            .id()
            .ok_or_else(|| PzError::Parse(format!("metadata for product {product} has no id")))
    }

    /// Fetch a tabular product into memory.
    ///
    /// With `save_file` the raw file is also written to the configured
    /// download directory.
    pub fn get_product(&self, product: impl Into<ProductId>, save_file: bool) -> Result<ProductData> {
        let product = product.into();
        let metadata = self.get_product_metadata(&product)?;
        self.fetch_product(&product, metadata, save_file)
    }

    fn fetch_product(
        &self,
        product: &ProductId,
        metadata: ProductMetadata,
        save_file: bool,
    ) -> Result<ProductData> {
        let product_type = metadata.product_type().unwrap_or_default().to_string();

        if !ProductKind::from_type_name(&product_type).is_tabular() {
            return Err(PzError::UnsupportedProduct {
                product: product.to_string(),
                product_type,
            });
        }

        let info = metadata
            .main_file()
            .ok_or_else(|| PzError::NotFound(format!("main file of product {product}")))?;
        let id = Self::numeric_id(&metadata, product)?;

        let file = self
            .api
            .fetch_file(&format!("products/{id}/download_main_file/"))?;
        let catalog = Catalog::from_main_file(&file.content, &info)?;
        log::debug!(
            "Product {product}: {} rows x {} columns",
            catalog.n_rows(),
            catalog.n_columns()
        );

        let saved_to = if save_file {
            Some(file.save_in(&self.download_dir)?)
        } else {
            None
        };

        Ok(ProductData {
            metadata,
            file,
            catalog,
            saved_to,
        })
    }

    /// Spec-z catalog with its metadata; other product types are refused.
    pub fn get_specz_catalog(&self, product: impl Into<ProductId>) -> Result<SpeczCatalog> {
        let data = self.get_typed(product.into(), ProductKind::SpeczCatalog)?;
        Ok(SpeczCatalog::new(data.catalog, data.metadata))
    }

    /// Training set with its metadata; other product types are refused.
    pub fn get_training_set(&self, product: impl Into<ProductId>) -> Result<TrainingSet> {
        let data = self.get_typed(product.into(), ProductKind::TrainingSet)?;
        Ok(TrainingSet::new(data.catalog, data.metadata))
    }

    /// Product of the `expected` kind; the type is checked before downloading.
    fn get_typed(&self, product: ProductId, expected: ProductKind) -> Result<ProductData> {
        let metadata = self.get_product_metadata(&product)?;
        match metadata.kind() {
            Some(kind) if kind == expected => self.fetch_product(&product, metadata, false),
            kind => Err(PzError::WrongProductType {
                product: product.to_string(),
                expected: expected.to_string(),
                actual: kind.map(|k| k.to_string()).unwrap_or_default(),
            }),
        }
    }

    /// Write the product's file into `save_in`, returning the written path.
    pub fn download_product(&self, product: impl Into<ProductId>, save_in: &Path) -> Result<PathBuf> {
        let product = product.into();
        let id = self.product_numeric_id(&product)?;
        self.api
            .download_to(&format!("products/{id}/download_main_file/"), save_in)
    }

    /// Write the compressed bundle of all product files and metadata into `save_in`.
    pub fn download_archive(&self, product: impl Into<ProductId>, save_in: &Path) -> Result<PathBuf> {
        let product = product.into();
        let id = self.product_numeric_id(&product)?;
        self.api
            .download_to(&format!("products/{id}/download/"), save_in)
    }

    fn product_numeric_id(&self, product: &ProductId) -> Result<u64> {
        match product {
            ProductId::Id(id) => Ok(*id),
            ProductId::InternalName(_) => {
                let metadata = self.resolve_metadata(product)?;
                Self::numeric_id(&metadata, product)
            }
        }
    }
}

/// Key/value table of product metadata with user-facing key names.
pub fn metadata_table(metadata: &ProductMetadata) -> Table {
    let mut table = Table::new(["key", "value"]);
    for (key, label) in METADATA_KEYS {
        if let Some(value) = metadata.get(key) {
            table.push_row([label.to_string(), cell_text(value)]);
        }
    }
    if let Some(info) = metadata.main_file() {
        if let Some(n_rows) = info.n_rows {
            table.push_row(["n_rows".to_string(), n_rows.to_string()]);
        }
        table.push_row(["main_file".to_string(), info.name]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_table_renames_keys() {
        let mut metadata: ProductMetadata = serde_json::from_value(json!({
            "id": 5,
            "display_name": "Goldenspike",
            "product_type_name": "Training Set",
            "release_name": "LSST DP0",
            "status": 1,
        }))
        .unwrap();
        metadata.set_main_file(&MainFileInfo {
            name: "goldenspike.csv".to_string(),
            extension: Some(".csv".to_string()),
            n_rows: Some(1000),
            size: None,
            delimiter: None,
            has_header: true,
            columns: vec![],
            columns_association: vec![],
        });

        let table = metadata_table(&metadata);
        let keys: Vec<&str> = table.rows().iter().map(|row| row[0].as_str()).collect();
        assert_eq!(
            keys,
            vec!["id", "product_name", "product_type", "release", "n_rows", "main_file"]
        );
        assert_eq!(table.rows()[4][1], "1000");
        assert_eq!(table.rows()[5][1], "goldenspike.csv");
    }

    #[test]
    fn test_new_does_not_touch_network() {
        let server = PzServer::new(ClientConfig::default());
        assert!(!server.has_token());
        assert_eq!(
            server.api().base_url(),
            "https://pz-server.linea.org.br/api/"
        );
    }
}
