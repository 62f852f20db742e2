use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use exam_client::{AuthContext, HttpExamApi};
use exam_session::{
    load_session, ControllerOptions, ExamSessionController, LoadFailureView, SessionDeps,
    SessionInput, SessionRuntime, TokioCountdownScheduler,
};
use shared::domain::{ExamId, Role};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;

use terminal::{Command, TerminalHost};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    exam_id: String,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    enforce_time_limit: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(args));
    // A pending stdin read never completes on its own.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> Result<()> {
    let mut settings = config::load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(token) = args.token {
        settings.token = Some(token);
    }
    if let Some(role) = args.role {
        settings.role = role;
    }
    settings.enforce_time_limit |= args.enforce_time_limit;

    let token = settings
        .token
        .clone()
        .context("no auth token; pass --token or set EXAM_TOKEN")?;
    let api = Arc::new(
        HttpExamApi::with_timeout(&settings.api_url, settings.request_timeout())
            .context("invalid api url")?,
    );
    let auth = AuthContext::new(token, settings.role);
    let exam_id = ExamId::new(args.exam_id);

    let session = match load_session(api.as_ref(), &auth, &exam_id).await {
        Ok(session) => session,
        Err(err) => {
            let view = LoadFailureView::from(&err);
            println!("{}", terminal::render_load_failure(&view));
            tokio::time::sleep(view.redirect_after).await;
            println!("-> results");
            return Ok(());
        }
    };

    let host = TerminalHost::default();
    let (scheduler, ticks) = TokioCountdownScheduler::new();
    let controller = ExamSessionController::new(
        session,
        auth,
        SessionDeps {
            host: Box::new(host.clone()),
            scheduler: Box::new(scheduler),
            gateway: api,
        },
        ControllerOptions {
            enforce_time_limit: settings.enforce_time_limit,
        },
    );
    let (inputs, input_rx) = mpsc::channel(32);
    let (runtime, mut views) = SessionRuntime::new(controller, input_rx, ticks);
    let session_task = tokio::spawn(runtime.run());

    let renderer = tokio::spawn(async move {
        let mut last = String::new();
        loop {
            let frame = terminal::render_view(&views.borrow_and_update());
            if frame != last {
                println!("{frame}");
                last = frame;
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    println!("{}", terminal::HELP);
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(line) = line else { break };
                let line = line.context("failed to read stdin")?;
                match terminal::parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Help)) => println!("{}", terminal::HELP),
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Input(input))) => {
                        if let SessionInput::Signal(signal) = &input {
                            if host.blocks(signal) {
                                println!("(blocked)");
                            }
                        }
                        if inputs.send(input).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            _ = inputs.closed() => break,
        }
    }

    drop(inputs);
    let exit = session_task.await.context("session task failed")?;
    renderer.await.context("renderer task failed")?;
    info!(state = exit.state.as_str(), "session finished");
    println!("{}", terminal::render_exit(&exit));
    Ok(())
}
