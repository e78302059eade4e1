mod entries;
mod report;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use app_config::Config;
use app_downloader::{BatchCoordinator, DownloadExecutor, FsStorage};
use app_extractor::{
    CredentialStore, Credentials, Endpoints, FileCredentialStore, MediaResolver,
    MemoryCredentialStore, ReqwestTransport, TransportOptions,
};

#[tokio::main]
async fn main() {
    app_logger::init();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            app_logger::error!("{e:?}");
            std::process::exit(1);
        }
    }
}

/// Returns whether everything was downloaded
async fn run() -> anyhow::Result<bool> {
    let config = Config::global();

    app_logger::debug!(?config, "Running with config");

    let urls = entries::collect_urls(&config.entries).await?;
    if urls.is_empty() {
        app_logger::warn!("No post links to download");
        return Ok(false);
    }
    app_logger::debug!(?urls, "Collected links");

    let transport = Arc::new(
        ReqwestTransport::new(TransportOptions {
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
        })
        .context("Failed to create HTTP client")?,
    );

    let resolver = MediaResolver::new(
        transport.clone(),
        credential_store(config),
        Endpoints::new(
            &config.endpoint.instagram_base_url,
            &config.endpoint.instagram_api_base_url,
        ),
    );

    let output_directory = &config.download.output_directory;
    app_logger::info!("Outputting to {:?}", output_directory);

    let executor = DownloadExecutor::new(
        transport,
        Arc::new(FsStorage::new(output_directory)),
        config.item_delay(),
    );

    let coordinator = BatchCoordinator::with_max_concurrent(
        Arc::new(resolver),
        executor,
        config.download.max_concurrent_tasks,
    );

    let reporter = tokio::spawn(report::log_events(coordinator.subscribe()));

    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                app_logger::warn!("Interrupted, cancelling downloads");
                coordinator.cancel_all();
            }
        });
    }

    app_logger::info!("Starting download of {} post(s)", urls.len());
    coordinator.submit_urls(urls);

    let state = coordinator.wait_until_done().await;
    report::join(reporter).await;

    app_logger::info!(
        "Download finished: {} completed, {} failed, {} total",
        state.completed,
        state.failed,
        state.total
    );

    Ok(!state.cancelled && state.failed == 0)
}

fn credential_store(config: &Config) -> Arc<dyn CredentialStore> {
    if let Some(cookie) = config.auth.cookie.as_deref() {
        let credentials = Credentials::from_cookie_blob(cookie);

        if credentials.is_valid() {
            app_logger::info!("Using session from the cookie option");
            return Arc::new(MemoryCredentialStore::new(Some(credentials)));
        }

        app_logger::warn!("Cookie option has no sessionid or csrftoken, ignoring it");
    }

    match config.credentials_file() {
        Some(path) => file_store(&path),
        None => Arc::new(MemoryCredentialStore::new(None)),
    }
}

fn file_store(path: &Path) -> Arc<dyn CredentialStore> {
    let store = FileCredentialStore::new(path);

    if store.valid().is_some() {
        app_logger::info!(?path, "Using saved session");
    } else {
        app_logger::debug!(?path, "No saved session, using public access");
    }

    Arc::new(store)
}
