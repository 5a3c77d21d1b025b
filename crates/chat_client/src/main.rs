use std::io::{self, BufRead, Write};

use chat_client::app::App;
use chat_client::providers;
use chat_client::render::TerminalSink;
use tracing_subscriber::EnvFilter;
use transcript_store::{TranscriptAppender, TranscriptStore};

fn main() -> io::Result<()> {
    init_tracing();

    let backend = providers::backend_from_env().map_err(io::Error::other)?;
    let profile = backend.profile();
    tracing::info!(
        backend = %profile.backend_id,
        endpoint = %profile.endpoint,
        "starting ragchat client"
    );

    match backend.login() {
        Ok(session_id) => tracing::info!(%session_id, "logged in"),
        Err(error) if error.contains("not supported") => {
            tracing::debug!(%error, "backend has no login surface");
        }
        Err(error) => return Err(io::Error::other(error)),
    }

    let cwd = std::env::current_dir()?;
    let appender = match TranscriptStore::create_new(&cwd, &profile.backend_id) {
        Ok(store) => {
            tracing::info!(path = %store.path().display(), "transcript file created");
            TranscriptAppender::with_store(store)
        }
        Err(error) => {
            tracing::warn!(%error, "transcript persistence unavailable, keeping history in memory");
            TranscriptAppender::new()
        }
    };

    let sink = TerminalSink::new(cwd.join(".ragchat").join("images"));
    let mut app = App::new(backend, Box::new(sink), appender, Some(cwd));

    println!("ragchat: type a message, or /help for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !app.should_exit {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        app.handle_line(&line?);
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
