//! ember - terminal chat client for a local streaming generation server

mod commands;
mod config;
mod ui;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ember_chat::{Dispatcher, Error, ExchangeReport, TranscriptStore};
use ember_stream::HttpTransport;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use commands::{CommandResult, StatusCommand, TranscriptCommand};

/// ember - chat with a local streaming generation server
#[derive(Parser, Debug)]
#[command(name = "ember")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address (default: http://localhost:8000)
    #[arg(short, long)]
    url: Option<String>,

    /// Directory for saved transcripts
    #[arg(long)]
    transcripts_dir: Option<String>,

    /// Send a single prompt, print the answer and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Start from a saved transcript
    #[arg(long)]
    load: Option<String>,

    /// List saved transcripts and exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(
                "ember_stream=debug,ember_chat=debug,ember_cli=debug",
            ))
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI args take precedence over the config file
    let server_url = args
        .url
        .or(cfg.server_url.clone())
        .unwrap_or_else(|| HttpTransport::DEFAULT_URL.to_string());
    let store = match args.transcripts_dir {
        Some(dir) => TranscriptStore::new(dir),
        None => TranscriptStore::new(cfg.transcripts_dir()),
    };

    if args.list {
        println!("{}", TranscriptCommand::list(&store));
        return Ok(());
    }

    let transport = match cfg.connect_timeout_secs {
        Some(secs) => HttpTransport::with_connect_timeout(&server_url, Duration::from_secs(secs))?,
        None => HttpTransport::new(&server_url)?,
    };
    let mut dispatcher = Dispatcher::new(Arc::new(transport));

    if let Some(ref name) = args.load {
        match store.load(name) {
            Ok(messages) => {
                print!("{}", ui::render_transcript(&messages));
                dispatcher.conversation_mut().replace_transcript(messages)?;
            }
            Err(e) => {
                eprintln!("Error loading transcript: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        return run_command(&mut dispatcher, &command, &server_url).await;
    }

    run_interactive(&mut dispatcher, &store, &server_url).await
}

/// Send one prompt while the renderer prints it, then wait for the renderer to catch up.
async fn send_and_render(
    dispatcher: &mut Dispatcher,
    done: &mut mpsc::UnboundedReceiver<()>,
    prompt: &str,
) -> Result<ExchangeReport, Error> {
    let report = dispatcher.send(prompt).await?;
    done.recv().await;
    Ok(report)
}

/// Hint shown when the server could not take the request
fn unavailable_hint(report: &ExchangeReport, server_url: &str) -> Option<String> {
    report.server_unavailable.then(|| {
        format!(
            "The server at {} is not ready. Check that it is running and has finished loading.",
            server_url
        )
    })
}

async fn run_command(
    dispatcher: &mut Dispatcher,
    command: &str,
    server_url: &str,
) -> anyhow::Result<()> {
    let (renderer, mut done) = ui::spawn_renderer(dispatcher.subscribe());

    let result = send_and_render(dispatcher, &mut done, command).await;
    renderer.abort();

    match result {
        Ok(report) if report.termination.is_success() => Ok(()),
        Ok(report) => {
            if let Some(hint) = unavailable_hint(&report, server_url) {
                eprintln!("{}", hint);
            }
            std::process::exit(1)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(if e.is_usage_error() { 2 } else { 1 });
        }
    }
}

async fn run_interactive(
    dispatcher: &mut Dispatcher,
    store: &TranscriptStore,
    server_url: &str,
) -> anyhow::Result<()> {
    let (renderer, mut done) = ui::spawn_renderer(dispatcher.subscribe());

    // Show minimal startup info (only if TTY)
    if io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("ember ({}) - /help for commands", server_url);
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::parse_command(input) {
            match result {
                CommandResult::New => {
                    dispatcher.conversation_mut().reset();
                    println!("Started a new conversation.");
                }
                CommandResult::Save(name) => {
                    println!(
                        "{}",
                        TranscriptCommand::save(store, dispatcher.conversation(), name.as_deref())
                    );
                }
                CommandResult::Load(name) => {
                    println!(
                        "{}",
                        TranscriptCommand::load(store, dispatcher.conversation_mut(), &name)
                    );
                }
                CommandResult::List => println!("{}", TranscriptCommand::list(store)),
                CommandResult::Delete(name) => {
                    println!("{}", TranscriptCommand::delete(store, &name));
                }
                CommandResult::Status => {
                    println!(
                        "{}",
                        StatusCommand::execute(dispatcher.conversation(), store, server_url)
                    );
                }
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::Exit => break,
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        match send_and_render(dispatcher, &mut done, input).await {
            Ok(report) => {
                if let Some(hint) = unavailable_hint(&report, server_url) {
                    eprintln!("{}", hint);
                }
                eprintln!(
                    "[{} fragments in {:.1}s]",
                    report.fragments,
                    report.elapsed.as_secs_f64()
                );
            }
            Err(e) if e.is_usage_error() => eprintln!("{}", e),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    renderer.abort();
    Ok(())
}
