//! Client library for the LIneA Photo-z Server.
//!
//! Browse the server's reference data (product types, users, releases),
//! look up product metadata, and fetch photo-z data products either into
//! memory as a [`Catalog`] or onto local disk. Everything is blocking and
//! request/response; nothing is cached besides endpoint filter options.
//!
//! ```no_run
//! use pz_server::{ClientConfig, ProductFilters, PzServer, ServerHost};
//!
//! let config = ClientConfig::new(ServerHost::Development).with_token("my-token");
//! let server = PzServer::connect(config)?;
//! println!("{}", server.display_products_list(&ProductFilters::search("spec"))?);
//! let product = server.get_product(3u64, false)?;
//! println!("{} rows", product.catalog.n_rows());
//! # Ok::<(), pz_server::PzError>(())
//! ```

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod display;
mod error;
pub mod filters;
pub mod models;

pub use api::{DownloadedFile, PzServerApi};
pub use catalog::{Catalog, CatalogError, DelimitedOptions, SpeczCatalog, TrainingSet};
pub use client::{metadata_table, ProductData, PzServer};
pub use config::{ClientConfig, ConfigError, ConfigStorage, ServerHost};
pub use display::Table;
pub use error::{PzError, Result};
pub use filters::{FilterOptions, ProductFilters};
pub use models::{
    ColumnAssociation, MainFileInfo, ProductId, ProductKind, ProductMetadata, ProductType, Release,
    User,
};
