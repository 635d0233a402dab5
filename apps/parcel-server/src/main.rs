//! Parcel server - direct-to-object-storage upload broker.
//!
//! Serves the upload actions under `/api/action/<name>`. With the memory
//! backend it also serves the presigned data plane, so a client can upload
//! end to end without any external store.
//!
//! # Usage
//!
//! ```text
//! PARCEL_API_TOKENS=dev-token=alice PARCEL_GRANTS=alice@pkg-1 parcel-server
//! PARCEL_API_TOKENS=dev-token=alice PARCEL_DEV_CATALOG=true parcel-server
//! PARCEL_BACKEND=s3 PARCEL_BUCKET_NAME=datasets parcel-server
//! ```
//!
//! See [`UploadConfig::from_env`] for every variable. `RUST_LOG` overrides
//! `LOG_LEVEL` when set.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use parcel_core::catalog::{MemoryCatalog, Permission, RecordCatalog};
use parcel_core::config::StoreBackend;
use parcel_core::gateway::{MemoryObjectStore, ObjectStoreGateway, S3ObjectStore};
use parcel_core::{ParcelHandler, UploadConfig, UploadCoordinator};
use parcel_http::{ActionHttpConfig, ActionHttpService, StaticTokenResolver};
use parcel_model::Principal;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the catalog from the configured grants, or the open development one.
fn build_catalog(config: &UploadConfig) -> MemoryCatalog {
    if config.dev_catalog {
        warn!("development catalog enabled, every token holder has every permission on every owner");
        return MemoryCatalog::development();
    }

    let catalog = MemoryCatalog::new();
    let grants = config.grant_table();
    for (user, owner) in &grants {
        catalog.insert_owner(owner.as_str(), owner.as_str());
        catalog.grant(&Principal::new(user.as_str()), owner, &Permission::ALL);
    }
    if grants.is_empty() {
        warn!("no catalog grants configured, every upload will be rejected");
    } else {
        info!(grants = grants.len(), "configured catalog grants");
    }
    catalog
}

/// Build the handler and the data plane mount point for the configured backend.
async fn build_handler(config: &UploadConfig) -> Result<(ParcelHandler, Option<String>)> {
    let catalog: Arc<dyn RecordCatalog> = Arc::new(build_catalog(config));

    let (store, data_plane): (Arc<dyn ObjectStoreGateway>, Option<Arc<MemoryObjectStore>>) =
        match config.backend {
            StoreBackend::Memory => {
                let store = Arc::new(
                    MemoryObjectStore::from_config(config)
                        .context("failed to build the in-memory store")?,
                );
                (Arc::clone(&store) as Arc<dyn ObjectStoreGateway>, Some(store))
            }
            StoreBackend::S3 => (Arc::new(S3ObjectStore::from_config(config).await), None),
        };

    let coordinator = Arc::new(UploadCoordinator::new(config, store, catalog));
    if config.check_access_on_startup {
        coordinator
            .check_store_access()
            .await
            .with_context(|| format!("bucket {} is not writable", config.bucket_name))?;
    }

    let handler = ParcelHandler::new(coordinator);
    Ok(match data_plane {
        Some(store) => {
            let prefix = store.endpoint_path().to_owned();
            (handler.with_data_plane(store), Some(prefix))
        }
        None => (handler, None),
    })
}

/// Build the [`ActionHttpConfig`] from the application [`UploadConfig`].
fn build_http_config(config: &UploadConfig, store_prefix: Option<String>) -> ActionHttpConfig {
    let resolver = StaticTokenResolver::new(config.api_token_table());
    if resolver.is_empty() {
        warn!("no API tokens configured, every action will be rejected");
    } else {
        info!(tokens = resolver.len(), "configured API tokens");
    }

    ActionHttpConfig {
        principal_resolver: Arc::new(resolver),
        store_prefix,
        version: VERSION.to_owned(),
        max_body_size: config.max_body_size,
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: ActionHttpService<ParcelHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let Ok((stream, peer)) = result.inspect_err(|e| warn!(error = %e, "accept failed")) else {
                    continue;
                };
                let conn = graceful.watch(
                    http.serve_connection(TokioIo::new(stream), service.clone())
                        .into_owned(),
                );
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(%peer, error = %e, "connection failed");
                    }
                });
            }

            _ = &mut shutdown => {
                info!("shutdown requested, draining connections");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("parcel server stopped");

    Ok(())
}

/// Request `/_health` and check the server reports itself running.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("health check could not reach {addr}"))?;
    stream
        .write_all(format!("GET /_health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n").as_bytes())
        .await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    let healthy = response.starts_with("HTTP/1.1 200") && response.contains("\"running\"");
    anyhow::ensure!(healthy, "{addr} did not report itself running");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = UploadConfig::from_env();

    // Container probe: exit status only, no logging.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;
    config.validate().context("invalid configuration")?;

    info!(
        gateway_listen = %config.gateway_listen,
        backend = ?config.backend,
        bucket = %config.bucket_name,
        region = %config.region,
        version = VERSION,
        "starting Parcel server",
    );

    let (handler, store_prefix) = build_handler(&config).await?;
    let http_config = build_http_config(&config, store_prefix);
    let service = ActionHttpService::new(Arc::new(handler), http_config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
