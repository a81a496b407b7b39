//! One run of the client: discover, shape, authenticate, dispatch.
//!
//! User-facing output goes to `out`; degraded-but-not-fatal conditions (a
//! failed discovery fetch) are reported on `err`. Fatal conditions are
//! returned as [`RunError`] and reported by `main`.

use std::fmt;
use std::io::{self, Write};

use crate::catalog::Catalog;
use crate::client::{ClientError, ControlClient, ResponseBody};
use crate::config::Cli;
use crate::request::{build_body, resolve_method, BodyError, MethodFlags};

/// Exit code for rejected input (clap uses the same code for usage errors).
///
/// A data argument that can't be shaped is a mistake on the command line,
/// so scripts see it the same way as a bad flag.
pub const EXIT_USAGE: i32 = 2;
/// Exit code when the server refused or failed a load-bearing request.
pub const EXIT_REQUEST_FAILED: i32 = 3;

/// Reasons a run stops before printing a response.
#[derive(Debug)]
pub enum RunError {
    /// The data argument could not be shaped; nothing was sent.
    Payload(BodyError),
    /// Authentication failed; the request was not dispatched.
    Auth(ClientError),
    /// The dispatched request failed.
    Dispatch(ClientError),
    /// Writing to stdout failed (e.g. closed pipe).
    Output(io::Error),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Payload(_) => EXIT_USAGE,
            RunError::Auth(_) | RunError::Dispatch(_) => EXIT_REQUEST_FAILED,
            RunError::Output(_) => 1,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Payload(e) => write!(f, "{e}"),
            RunError::Auth(e) | RunError::Dispatch(e) => write!(f, "{e}"),
            RunError::Output(e) => write!(f, "Failed to write output: {e}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        RunError::Output(e)
    }
}

/// Execute the invocation described by `cli`.
///
/// With `--list` the catalog is printed; otherwise the endpoint request is
/// shaped and sent. A missing endpoint without `--list` is a no-op (the
/// caller prints the help text).
pub async fn run(
    cli: &Cli,
    client: &ControlClient,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    if cli.list {
        let catalog = fetch_catalog(client, cli.verbose, cli.verbose, out, err).await?;
        writeln!(out, "{}", catalog.render_listing())?;
        return Ok(());
    }

    let Some(endpoint) = cli.endpoint.as_deref() else {
        return Ok(());
    };
    let endpoint = endpoint.trim_start_matches('/');

    let catalog = fetch_catalog(client, cli.verbose, false, out, err).await?;

    let flags = MethodFlags {
        patch: cli.patch,
        delete: cli.delete,
    };
    let method = resolve_method(flags, cli.data.is_some(), endpoint, &catalog);
    let body =
        build_body(&method, cli.data.as_deref(), endpoint, &catalog).map_err(RunError::Payload)?;
    tracing::debug!(%endpoint, %method, "request resolved");

    let (token, auth_status) = client
        .authenticate(&cli.user)
        .await
        .map_err(RunError::Auth)?;
    if cli.verbose {
        writeln!(
            out,
            "POST {} {}",
            client.auth_url(&cli.user),
            auth_status.as_u16()
        )?;
        if let Some(body) = &body {
            writeln!(out, "{}", pretty(body))?;
        }
    }

    let resp = client
        .dispatch(&token, endpoint, method.clone(), body.as_ref())
        .await
        .map_err(RunError::Dispatch)?;

    if cli.verbose {
        writeln!(out, "{} {} {}", method, resp.url, resp.status.as_u16())?;
    }
    if let Some(text) = resp.body.render() {
        writeln!(out, "{text}")?;
    }
    Ok(())
}

/// Fetch and parse the discovery document.
///
/// A failed fetch is reported on `err` and yields an empty catalog.
async fn fetch_catalog(
    client: &ControlClient,
    verbose: bool,
    print_doc: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<Catalog, RunError> {
    let doc = match client.fetch_doc().await {
        Ok(doc) => doc,
        Err(e) => {
            writeln!(err, "{e}")?;
            return Ok(Catalog::default());
        }
    };

    if verbose {
        writeln!(out, "GET {} {}", doc.url, doc.status.as_u16())?;
    }
    if print_doc {
        if let Some(text) = doc.body.render() {
            writeln!(out, "{text}")?;
        }
    }

    let catalog = match &doc.body {
        ResponseBody::Json(value) => Catalog::from_document(value, client.api()),
        _ => {
            tracing::warn!(url = %doc.url, "discovery document is not JSON");
            Catalog::default()
        }
    };
    tracing::debug!(endpoints = catalog.len(), "catalog built");
    Ok(catalog)
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
