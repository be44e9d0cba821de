//! Fixture server shared by the HTTP integration tests.

#![allow(dead_code)]

use pz_server::{ClientConfig, PzServer, ServerHost};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "abc";

pub const SPECZ_CSV: &str = "\
ra,dec,z
150.1,2.2,0.31
150.3,2.1,0.87
149.9,2.4,1.52
";

/// Matches requests that carry no header with the given name.
pub struct MissingHeader(pub &'static str);

impl Match for MissingHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key(self.0)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Client configuration pointing at the mock server's API root.
pub fn config(server: &MockServer, token: Option<&str>) -> ClientConfig {
    let mut config = ClientConfig::new(ServerHost::Custom(format!("{}/api/", server.uri())))
        .with_proxy_from_env(false);
    if let Some(token) = token {
        config = config.with_token(token);
    }
    config
}

pub fn client(server: &MockServer, token: Option<&str>) -> PzServer {
    PzServer::new(config(server, token))
}

/// Run blocking client code off the async test runtime.
pub async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

pub fn page(results: Value) -> Value {
    let count = results.as_array().map(|r| r.len()).unwrap_or(0);
    json!({"count": count, "next": null, "previous": null, "results": results})
}

pub fn specz_product() -> Value {
    json!({
        "id": 3,
        "internal_name": "3_specz_dp0",
        "display_name": "Spec-z DP0",
        "product_type_name": "Spec-z Catalog",
        "product_type_internal_name": "redshift_catalog",
        "release_name": "LSST DP0",
        "uploaded_by": "gschwend",
        "official_product": true,
        "description": "spec-z compilation",
        "created_at": "2023-05-04T12:00:00Z",
    })
}

pub fn training_product() -> Value {
    json!({
        "id": 4,
        "internal_name": "4_goldenspike",
        "display_name": "Goldenspike",
        "product_type_name": "Training Set",
        "product_type_internal_name": "training_set",
        "release_name": "LSST DP0",
        "uploaded_by": "jdoe",
        "official_product": false,
        "description": "training set",
        "created_at": "2023-06-01T12:00:00Z",
    })
}

pub fn validation_product() -> Value {
    json!({
        "id": 9,
        "internal_name": "9_validation",
        "display_name": "Validation results",
        "product_type_name": "Validation Results",
        "product_type_internal_name": "validation_results",
        "release_name": "LSST DP0",
        "uploaded_by": "jdoe",
    })
}

pub fn main_file_info(name: &str) -> Value {
    json!({
        "main_file": {
            "name": name,
            "extension": ".csv",
            "n_rows": 3,
            "size": SPECZ_CSV.len(),
            "delimiter": ",",
            "has_header": true,
            "columns": [],
        }
    })
}

pub fn column_associations() -> Value {
    page(json!([
        {"column_name": "ra", "ucd": "pos.eq.ra;meta.main", "alias": "RA"},
        {"column_name": "dec", "ucd": "pos.eq.dec;meta.main", "alias": "Dec"},
        {"column_name": "z", "ucd": "src.redshift", "alias": "z"},
    ]))
}

pub fn product_options() -> Value {
    json!({
        "name": "Product List",
        "filter_classes": [{"name": "release_name"}, {"name": "product_type_name"}],
        "filterset": ["internal_name", "uploaded_by", "product_type_name__or"],
        "search": ["display_name", "product_type__display_name"],
    })
}

/// Mount a GET endpoint that requires the fixture token and refuses anonymous calls.
pub async fn mount_protected_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("Authorization", format!("Token {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(MissingHeader("Authorization"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Authentication credentials were not provided."})),
        )
        .mount(server)
        .await;
}

/// Mount the metadata, main file info and column association endpoints of a product.
pub async fn mount_product(server: &MockServer, product: Value, filename: &str) {
    let id = product["id"].as_u64().expect("fixture product has an id");
    Mock::given(method("GET"))
        .and(path(format!("/api/products/{id}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(product))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/products/{id}/main_file_info/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(main_file_info(filename)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/product-contents/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(column_associations()))
        .mount(server)
        .await;
}

/// Mount the main file download of a product.
pub async fn mount_main_file(server: &MockServer, id: u64, filename: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/products/{id}/download_main_file/")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    format!("attachment; filename={filename}").as_str(),
                )
                .set_body_raw(content.as_bytes().to_vec(), "text/csv"),
        )
        .mount(server)
        .await;
}
