//! Serve command: watch mode plus a static file server for the output tree.

use super::watch::{finish_pass, spawn_shutdown_signal, start_watcher};
use super::{build_context, load_config};
use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use rho_core::{BuildOptions, Scheduler};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Output URI -> input URI, refreshed after every build pass
type ContentMap = Arc<RwLock<BTreeMap<String, String>>>;

pub async fn serve_site(config_path: &Path, port: Option<u16>, no_cache: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let port = port.unwrap_or(config.server.port);
    let options = BuildOptions {
        use_cache: !no_cache,
        write: true,
    };

    let mut scheduler = Scheduler::new(build_context(&config, options)?);
    scheduler
        .enqueue_all()
        .context("Failed to scan content directory")?;

    let content_map: ContentMap = Arc::new(RwLock::new(
        scheduler
            .context()
            .content_map()
            .context("Failed to map content")?,
    ));

    let app = router(config.output_dir(), content_map.clone());
    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Starting server on http://localhost:{}", port);
    println!("\nServing at http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = start_watcher(&config, tx.clone())?;
    spawn_shutdown_signal(tx);

    let result = scheduler
        .run_cooperative(rx, |ctx, report| {
            finish_pass(ctx.config(), &report);
            match ctx.content_map() {
                Ok(map) => {
                    if let Ok(mut current) = content_map.write() {
                        *current = map;
                    }
                }
                Err(err) => tracing::warn!("Failed to refresh content map: {}", err),
            }
        })
        .await;

    server.abort();
    drop(watcher);
    result.context("Build aborted")?;
    tracing::info!("Server stopped");
    Ok(())
}

fn router(output_dir: PathBuf, content_map: ContentMap) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(output_dir))
        .layer(middleware::from_fn_with_state(content_map, log_request))
        .layer(TraceLayer::new_for_http())
}

/// Log each request next to the content file that produced the response
async fn log_request(State(map): State<ContentMap>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let source = map
        .read()
        .ok()
        .and_then(|map| source_for(&map, &path).map(String::from));

    let response = next.run(request).await;
    match source {
        Some(source) => tracing::info!("{} {} <- {}", response.status().as_u16(), path, source),
        None => tracing::info!("{} {}", response.status().as_u16(), path),
    }
    response
}

/// Input URI behind a request path, trying the `index.html` form too
fn source_for<'m>(map: &'m BTreeMap<String, String>, request_path: &str) -> Option<&'m str> {
    let key = request_path.trim_start_matches('/');
    if !key.is_empty() && !key.ends_with('/') {
        if let Some(source) = map.get(key) {
            return Some(source);
        }
    }

    let dir = key.trim_end_matches('/');
    let index = if dir.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}/index.html", dir)
    };
    map.get(&index).map(String::as_str)
}
