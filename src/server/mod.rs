//! HTTP server for short-link redirection.
//!
//! Routes: `/` renders the home page, `/<short>` answers a permanent
//! redirect from the record map, `/static/` serves bundled files, anything
//! deeper renders the not-found page. Only GET and HEAD are accepted.
//! With target verification enabled the server probes every redirect
//! target once before binding and logs the counts.

mod router;

pub use router::{resolve, Route};

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE, LOCATION};
use http_body_util::Full;
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::assets::{self, AssetError, AssetStore};
use crate::checker::{Summary, UrlChecker};
use crate::config::Config;
use crate::records;
use crate::templates::{Template, TemplateError};

/// The redirect server: record map, asset stores and templates, bound
/// together by the configuration they were loaded from.
pub struct Server {
    config: Config,
    redirects: HashMap<String, String>,
    statics: AssetStore,
    home_tpl: Template,
    not_found_tpl: Template,
}

impl Server {
    /// Mount the asset stores, load both templates and parse the record
    /// file. Any failure here means the deployment is broken and the
    /// process should not come up.
    pub async fn new(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let templates = AssetStore::mount(config.dev_mode, &config.template_dir, assets::TEMPLATES)
            .map_err(|e| format!("could not mount template store: {}", e))?;
        let statics = AssetStore::mount(config.dev_mode, &config.static_dir, assets::STATIC)
            .map_err(|e| format!("could not mount static store: {}", e))?;
        let data = AssetStore::mount(config.dev_mode, &config.data_dir, assets::DATA)
            .map_err(|e| format!("could not mount data store: {}", e))?;

        let home_tpl = Template::load(templates.clone(), "home.html")
            .await
            .map_err(|e| format!("could not load home template: {}", e))?;
        let not_found_tpl = Template::load(templates, "404.html")
            .await
            .map_err(|e| format!("could not load 404 template: {}", e))?;

        let records = data
            .read("short-urls.csv")
            .await
            .map_err(|e| format!("could not open record file: {}", e))?;
        let redirects =
            records::parse(&records[..]).map_err(|e| format!("could not load records: {}", e))?;

        Ok(Self {
            config,
            redirects,
            statics,
            home_tpl,
            not_found_tpl,
        })
    }

    /// Number of loaded redirect records.
    pub fn record_count(&self) -> usize {
        self.redirects.len()
    }

    /// Verify targets when configured, then bind and serve forever.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.config.verify_targets {
            self.verify_targets().await;
        }

        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!("Running server on {}", self.config.listen_addr);
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let server = Arc::new(self);
        loop {
            let (stream, _) = listener.accept().await?;
            let _ = stream.set_nodelay(true);
            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle(req).await }
                });

                let io = TokioIo::new(stream);
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    }

    /// Probe every redirect target once, logging the counts. A broken
    /// target is an operator concern, never a startup failure; the
    /// summary comes back for callers that want the numbers.
    pub async fn verify_targets(&self) -> Summary {
        let checker = match UrlChecker::new(self.config.check_workers, self.config.check_timeout) {
            Ok(checker) => checker,
            Err(e) => {
                warn!("skipping target check, probe client failed to build: {}", e);
                return Summary::default();
            }
        };

        let targets: Vec<String> = self.redirects.values().cloned().collect();
        info!(
            "checking {} targets with {} workers, timeout {:?}",
            targets.len(),
            checker.workers(),
            checker.timeout()
        );
        let summary = checker.run(&targets).await;
        info!(
            "url check reported {} errors in {} url checks",
            summary.failed, summary.processed
        );
        summary
    }

    async fn handle(&self, req: Request<IncomingBody>) -> Result<Response<Full<Bytes>>, Infallible> {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = if method != Method::GET && method != Method::HEAD {
            method_not_allowed()
        } else {
            match resolve(&path) {
                Route::Home => self.home().await,
                Route::Redirect(short) => self.redirect(short).await,
                Route::Static(rest) => self.static_file(rest).await,
                Route::Invalid(rest) => self.invalid(rest).await,
            }
        };

        info!(
            target: "access",
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "{} {} {}",
            method,
            path,
            response.status().as_u16()
        );

        Ok(response)
    }

    async fn home(&self) -> Response<Full<Bytes>> {
        match self.home_tpl.render(&[("title", "Home")]).await {
            Ok(body) => html_response(StatusCode::OK, body),
            Err(e) => render_failure("home", e),
        }
    }

    /// The main handler: hit answers a permanent redirect, miss falls
    /// through to the not-found page.
    async fn redirect(&self, short: &str) -> Response<Full<Bytes>> {
        let short = percent_decode_str(short).decode_utf8_lossy();
        if let Some(target) = self.redirects.get(short.as_ref()) {
            return redirect_response(target);
        }
        self.not_found(
            "Redirection not found",
            &format!("The short link {} was not found.", short),
        )
        .await
    }

    async fn invalid(&self, rest: &str) -> Response<Full<Bytes>> {
        let shown = percent_decode_str(rest).decode_utf8_lossy();
        self.not_found("Invalid Path", &format!("The path {} is an invalid path.", shown))
            .await
    }

    async fn not_found(&self, title: &str, message: &str) -> Response<Full<Bytes>> {
        match self
            .not_found_tpl
            .render(&[("title", title), ("message", message)])
            .await
        {
            Ok(body) => html_response(StatusCode::NOT_FOUND, body),
            Err(e) => render_failure("not found", e),
        }
    }

    async fn static_file(&self, rest: &str) -> Response<Full<Bytes>> {
        let name = percent_decode_str(rest).decode_utf8_lossy();
        match self.statics.read(&name).await {
            Ok(contents) => {
                let mime = mime_guess::from_path(name.as_ref())
                    .first_or_octet_stream()
                    .to_string();
                Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, mime)
                    .body(Full::new(contents))
                    .unwrap()
            }
            Err(e) => {
                if let AssetError::Io { .. } = e {
                    warn!("static file read failed: {}", e);
                }
                plain_response(StatusCode::NOT_FOUND, "404 page not found")
            }
        }
    }
}

fn html_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

fn method_not_allowed() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, "GET, HEAD")
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(b"Method Not Allowed")))
        .unwrap()
}

/// Build the 301. The target is operator data, not compile-time constant,
/// so a value the header layer rejects turns into a 500 instead of a panic.
fn redirect_response(target: &str) -> Response<Full<Bytes>> {
    match Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, target)
        .body(Full::new(Bytes::new()))
    {
        Ok(resp) => resp,
        Err(e) => {
            error!("redirect target rejected by header encoding: {}", e);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn render_failure(source: &str, err: TemplateError) -> Response<Full<Bytes>> {
    error!("{} template error {}", source, err);
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(format!(
            "template writing problem at {}: {}",
            source, err
        ))))
        .unwrap()
}
