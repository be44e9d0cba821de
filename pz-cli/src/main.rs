//! Command-line access to the Photo-z Server.
//!
//! Subcommands:
//! - `types`, `users`, `releases`: reference data tables
//! - `products`: list completed products, optionally filtered
//! - `metadata`: one product's metadata
//! - `download`: save a product's main file or full archive
//! - `specz-plot`, `train-valid-plot`: diagnostic figures

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pz_plots::{specz_plots, train_valid_plots, SpeczFields, TrainValidFields};
use pz_server::{
    ClientConfig, ConfigStorage, ProductFilters, ProductId, PzServer, ServerHost,
};

/// Photo-z Server client
#[derive(Parser, Debug)]
#[command(name = "pz")]
#[command(about = "Browse and download Photo-z Server data products")]
#[command(version)]
struct Args {
    /// Server: pz, pz-dev, localhost, or an API URL
    #[arg(long, global = true)]
    host: Option<ServerHost>,

    /// API token from the server's web interface
    #[arg(long, global = true, env = "PZ_SERVER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Directory holding a stored client.json (default ~/.pz_config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List product types
    Types,

    /// List registered users
    Users,

    /// List data releases
    Releases,

    /// List completed products
    Products {
        /// Match product names and types containing this text
        #[arg(short, long)]
        search: Option<String>,

        /// Filter as key=value, e.g. release=dp0 (repeatable)
        #[arg(short, long, value_parser = parse_filter)]
        filter: Vec<(String, String)>,
    },

    /// Show a product's metadata
    Metadata {
        /// Product id or internal name
        product: String,
    },

    /// Save a product to disk
    Download {
        /// Product id or internal name
        product: String,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        save_in: PathBuf,

        /// Fetch the compressed archive of all files instead of the main file
        #[arg(long)]
        archive: bool,
    },

    /// Plot sky positions and redshift distribution of a spec-z catalog
    SpeczPlot {
        /// Product id or internal name
        product: String,

        /// Output image (.png or .svg)
        #[arg(short, long, default_value = "specz_catalog.png")]
        out: PathBuf,

        /// R.A. column (default from column associations)
        #[arg(long)]
        ra: Option<String>,

        /// Dec. column (default from column associations)
        #[arg(long)]
        dec: Option<String>,

        /// Redshift column (default from column associations)
        #[arg(long)]
        redshift: Option<String>,
    },

    /// Compare a training set with a validation set
    TrainValidPlot {
        /// Training set product
        #[arg(long)]
        train: Option<String>,

        /// Validation set product
        #[arg(long)]
        valid: Option<String>,

        /// Magnitude column
        #[arg(long, default_value = "mag_cModel_i")]
        magnitude: String,

        /// Redshift column
        #[arg(long, default_value = "z")]
        redshift: String,

        /// Output image (.png or .svg)
        #[arg(short, long, default_value = "train_valid_set.png")]
        out: PathBuf,
    },

    /// Store the effective host, token and timeout for later runs
    SaveConfig,
}

fn parse_filter(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn storage(args: &Args) -> Result<ConfigStorage> {
    match &args.config {
        Some(path) => Ok(ConfigStorage::with_path(path.clone())),
        None => ConfigStorage::new().context("Cannot locate the config directory"),
    }
}

/// Stored configuration overridden by command-line flags.
fn client_config(args: &Args) -> Result<ClientConfig> {
    // Without HOME there is simply no stored config to read
    let stored = match storage(args) {
        Ok(storage) => storage.load().with_context(|| {
            format!("Failed to load config from {}", storage.root_path().display())
        })?,
        Err(e) => {
            log::debug!("{e:#}");
            None
        }
    };

    let mut config = stored.unwrap_or_default();
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(token) = &args.token {
        config = config.with_token(token.clone());
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = client_config(&args)?;

    if let Command::SaveConfig = args.command {
        let path = storage(&args)?
            .save(&config)
            .context("Failed to save config")?;
        println!("Configuration saved to {}", path.display());
        return Ok(());
    }

    let host = config.host.clone();
    let server = PzServer::connect(config)
        .with_context(|| format!("Failed to connect to {}", host.api_url()))?;
    run(&server, args.command)
}

fn run(server: &PzServer, command: Command) -> Result<()> {
    match command {
        Command::Types => println!("{}", server.display_product_types()?),
        Command::Users => println!("{}", server.display_users()?),
        Command::Releases => println!("{}", server.display_releases()?),
        Command::Products { search, filter } => {
            let mut filters = match search {
                Some(pattern) => ProductFilters::search(pattern),
                None => ProductFilters::new(),
            };
            for (key, value) in filter {
                filters = filters.with(key, value);
            }
            println!("{}", server.display_products_list(&filters)?);
        }
        Command::Metadata { product } => {
            println!("{}", server.display_product_metadata(product)?);
        }
        Command::Download {
            product,
            save_in,
            archive,
        } => {
            let product = ProductId::from(product);
            let path = if archive {
                server.download_archive(&product, &save_in)
            } else {
                server.download_product(&product, &save_in)
            }
            .with_context(|| format!("Failed to download product {product}"))?;
            println!("File saved as: {}", path.display());
        }
        Command::SpeczPlot {
            product,
            out,
            ra,
            dec,
            redshift,
        } => {
            let catalog = server
                .get_specz_catalog(product.as_str())
                .with_context(|| format!("Failed to fetch spec-z catalog {product}"))?;
            let mut fields = SpeczFields::from_catalog(&catalog);
            if let Some(ra) = ra {
                fields.ra = ra;
            }
            if let Some(dec) = dec {
                fields.dec = dec;
            }
            if let Some(redshift) = redshift {
                fields.redshift = redshift;
            }
            let figure = specz_plots(&catalog.data, &fields, Some(&out))?;
            println!(
                "Figure saved as: {}",
                figure.saved_to.unwrap_or(out).display()
            );
        }
        Command::TrainValidPlot {
            train,
            valid,
            magnitude,
            redshift,
            out,
        } => {
            if train.is_none() && valid.is_none() {
                bail!("Give at least one of --train or --valid");
            }
            let fetch = |product: Option<String>| -> Result<_> {
                product
                    .map(|p| {
                        server
                            .get_product(p.as_str(), false)
                            .map(|data| data.catalog)
                            .with_context(|| format!("Failed to fetch product {p}"))
                    })
                    .transpose()
            };
            let train = fetch(train)?;
            let valid = fetch(valid)?;
            let fields = TrainValidFields::new(magnitude, redshift);
            let figure = train_valid_plots(train.as_ref(), valid.as_ref(), &fields, Some(&out))?;
            println!(
                "Figure saved as: {}",
                figure.saved_to.unwrap_or(out).display()
            );
        }
        Command::SaveConfig => bail!("save-config does not need a server connection"),
    }
    Ok(())
}
