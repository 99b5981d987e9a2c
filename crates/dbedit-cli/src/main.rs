//! `dbedit` - serve one table editor request as a CGI program
//!
//! The editor is described by a TOML file (see `config.rs`). Each invocation
//! reads the CGI environment and body, restores or creates the editor of the
//! browser session and writes the resulting page or redirect to stdout.

mod cgi;
mod config;
mod logging;

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use dbedit_services::{EditorCache, FileStore, InitOutcome, ServiceError, SessionStore};
use uuid::Uuid;

use crate::cgi::{CgiEnv, CgiResponse};
use crate::config::RunnerConfig;
use crate::logging::LoggingConfig;

/// Largest request body read from stdin
const MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Parser, Debug)]
#[command(name = "dbedit", version, about = "Generic server-side table editor (CGI)")]
struct Cli {
    /// Editor configuration file
    #[arg(short, long, env = "DBEDIT_CONFIG", default_value = "dbedit.toml")]
    config: PathBuf,

    /// Directory holding one session file per browser session
    #[arg(long, env = "DBEDIT_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    /// Also write JSON logs to this directory
    #[arg(long, env = "DBEDIT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "DBEDIT_LOG")]
    log_filter: Option<String>,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        let mut config = LoggingConfig::default();
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
            config.enable_json_logs = true;
        }
        if let Some(filter) = &self.log_filter {
            config.default_filter = filter.clone();
        }
        config
    }

    fn session_dir(&self) -> PathBuf {
        self.session_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("dbedit")
                .join("sessions")
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = match logging::init(&cli.logging_config()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("dbedit: failed to initialize logging: {:#}", err);
            None
        }
    };

    let vars: HashMap<String, String> = std::env::vars().collect();
    let cgi = CgiEnv::new(&vars);

    let response = match handle(&cli, &cgi).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "request failed");
            CgiResponse::server_error(cgi.is_local_host().then(|| error_details(&err)).as_deref())
        }
    };

    let mut stdout = std::io::stdout().lock();
    match response.write_to(&mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "failed to write response");
            ExitCode::FAILURE
        }
    }
}

#[tracing::instrument(skip_all, fields(uri = %cgi.uri()))]
async fn handle(cli: &Cli, cgi: &CgiEnv<'_>) -> anyhow::Result<CgiResponse> {
    let config = RunnerConfig::load(&cli.config)?;
    let request = cgi.request(&read_body(cgi.content_length())?);

    let (session_id, new_session) = match cgi.session_id() {
        Some(id) => (id, false),
        None => (Uuid::new_v4().simple().to_string(), true),
    };
    let store = FileStore::open(cli.session_dir(), &session_id)
        .context("Failed to open session store")?;

    let connection = dbedit_drivers::connect(&config.database.driver, &config.database.path)?;
    let cache = EditorCache::new(
        Arc::new(store) as Arc<dyn SessionStore>,
        config.settings.clone(),
    )?;

    let response = match cache.init(connection, &request, config.editor_config()?)? {
        InitOutcome::Restart { location } => CgiResponse::redirect(&location),
        InitOutcome::Ready(mut editor) => {
            editor.set_other_columns(config.other_columns.clone());
            let response = editor.execute(&request, &config.editor.prefix).await?;
            CgiResponse::from_editor(response, &config.editor.table, &config.settings.charset)
        }
    };

    Ok(if new_session {
        response.with_session_cookie(&session_id)
    } else {
        response
    })
}

fn read_body(length: usize) -> anyhow::Result<String> {
    if length == 0 {
        return Ok(String::new());
    }
    let mut body = Vec::with_capacity(length.min(MAX_BODY_BYTES));
    std::io::stdin()
        .take(length.min(MAX_BODY_BYTES) as u64)
        .read_to_end(&mut body)
        .context("Failed to read request body")?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Text shown to local hosts: the failed statement when there is one
fn error_details(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ServiceError>() {
        Some(ServiceError::Query { sql, message }) => format!("{}\n\n{}", message, sql),
        _ => format!("{:#}", err),
    }
}
