use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use miette::{Context, IntoDiagnostic, Result};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task;

use crate::config::{ConfigSource, SiteConfig};
use crate::data::{build_sitemap, resolve, ResolvedRoute};
use crate::notify::{Alert, NotFoundNotifier};
use crate::rendering::{RenderedPage, ResponseRenderer};

/// path that always serves the generated sitemap
pub const SITEMAP_PATH: &str = "/sitemap.xml";

/// request metadata extracted from the fastcgi parameters
#[derive(Clone, Debug, Serialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub query: String,
    pub host: Option<String>,
    pub remote_addr: Option<String>,
    #[serde(skip)]
    started: Instant,
}

impl RequestInfo {
    /// Builds the request metadata from the cgi parameters.
    ///
    /// The request path is `REQUEST_URI` with the query string stripped,
    /// which is the form the page tree stores.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let uri = lookup("REQUEST_URI").unwrap_or_else(|| "/".to_owned());
        let path = uri.split('?').next().unwrap_or("/").to_owned();

        Self {
            method: lookup("REQUEST_METHOD").unwrap_or_else(|| "GET".to_owned()),
            path,
            query: lookup("QUERY_STRING").unwrap_or_default(),
            host: lookup("HTTP_HOST"),
            remote_addr: lookup("REMOTE_ADDR"),
            started: Instant::now(),
        }
    }

    /// milliseconds spent on this request so far
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// a finished cgi-style response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn page(page: RenderedPage) -> Self {
        Self {
            status: page.status.code(),
            reason: page.status.reason(),
            content_type: "text/html; charset=utf-8",
            body: page.body,
        }
    }

    fn sitemap(body: String) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type: "application/xml",
            body,
        }
    }

    fn internal_error() -> Self {
        Self {
            status: 500,
            reason: "Internal Server Error",
            content_type: "text/plain; charset=utf-8",
            body: "Internal Server Error\n".to_owned(),
        }
    }

    fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        write!(
            out,
            "Status: {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            self.status,
            self.reason,
            self.content_type,
            self.body.len()
        )?;
        out.write_all(self.body.as_bytes())
    }
}

/// fastcgi worker answering requests from the page tree
pub struct Server {
    config: Arc<dyn ConfigSource>,
    renderer: Arc<ResponseRenderer>,
    notifier: Arc<dyn NotFoundNotifier>,
}

impl Server {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        renderer: Arc<ResponseRenderer>,
        notifier: Arc<dyn NotFoundNotifier>,
    ) -> Self {
        Self {
            config,
            renderer,
            notifier,
        }
    }

    /// Runs the accept loop until the listening socket is closed.
    ///
    /// The fastcgi library drives one worker thread per in-flight
    /// request, so the blocking loop runs off the async runtime and
    /// every request is bridged back in through a runtime handle.
    pub async fn serve(self, socket: Option<PathBuf>, pid_file: Option<PathBuf>) -> Result<()> {
        if let Some(path) = &pid_file {
            tokio::fs::write(path, std::process::id().to_string())
                .await
                .into_diagnostic()
                .context("writing pid file")?;
        }

        let handle = Handle::current();
        let server = Arc::new(self);
        let worker = task::spawn_blocking(move || -> Result<()> {
            let handler = move |mut req: fastcgi::Request| {
                let info = RequestInfo::from_lookup(|name| req.param(name));
                let response = handle.block_on(server.respond(&info)).unwrap_or_else(|error| {
                    tracing::error!("request for {} failed: {error:?}", info.path);
                    HttpResponse::internal_error()
                });

                let mut stdout = req.stdout();
                if let Err(error) = response.write_to(&mut stdout) {
                    tracing::error!("writing the response for {} failed: {error}", info.path);
                    return;
                }

                tracing::info!(
                    "{} {} -> {} ({:.1} ms)",
                    info.method,
                    info.path,
                    response.status,
                    info.elapsed_ms()
                );
            };

            match socket {
                Some(path) => {
                    // a previous worker may have left its socket file behind
                    if std::fs::metadata(&path).is_ok() {
                        std::fs::remove_file(&path).into_diagnostic()?;
                    }
                    let listener = UnixListener::bind(&path)
                        .into_diagnostic()
                        .context("binding the fastcgi socket")?;
                    tracing::info!("listening on {}", path.display());
                    fastcgi::run_raw(handler, listener.as_raw_fd());
                }
                None => {
                    tracing::info!("serving on the inherited listen socket");
                    fastcgi::run_raw(handler, std::io::stdin().as_raw_fd());
                }
            }

            Ok(())
        });

        let result = worker.await.into_diagnostic()?;

        if let Some(path) = &pid_file {
            // stale pid files only confuse the next start
            let _ = tokio::fs::remove_file(path).await;
        }

        result
    }

    /// Produces the response for a single request.
    ///
    /// The configuration is loaded fresh for every request, a snapshot
    /// no other request sees. Errors bubble up to the caller which
    /// answers with an internal error response.
    #[tracing::instrument(level = "trace", skip(self))]
    async fn respond(&self, request: &RequestInfo) -> Result<HttpResponse> {
        let config = self.config.load().await?;

        if request.path == SITEMAP_PATH {
            let base_url = config
                .base_url
                .clone()
                .or_else(|| request.host.as_ref().map(|host| format!("http://{host}")))
                .unwrap_or_default();
            return Ok(HttpResponse::sitemap(build_sitemap(&config.pages, &base_url)));
        }

        let route = resolve(&config.pages, &request.path);
        let unresolved = matches!(route, ResolvedRoute::NotFound);
        let page = self.renderer.render(&config, route, request)?;

        if unresolved {
            self.send_alert(&config, request).await;
        }

        Ok(HttpResponse::page(page))
    }

    /// Sends the not-found alert when both addresses are configured.
    ///
    /// Failures are logged only, a broken mail setup must not break
    /// the response.
    async fn send_alert(&self, config: &SiteConfig, request: &RequestInfo) {
        let Some((from, to)) = config.alert_addresses() else {
            return;
        };

        let alert = Alert {
            from,
            to,
            missing_path: &request.path,
            request,
        };
        if let Err(error) = self.notifier.notify(alert).await {
            tracing::warn!("sending the not-found alert for {} failed: {error}", request.path);
        }
    }
}
