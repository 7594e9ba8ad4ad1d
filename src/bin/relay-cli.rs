use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Follow an operation stream from ops-relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "ws://localhost:9090")]
    url: String,

    /// Print each message on one line instead of pretty-printing.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace calls
    Trace {
        /// Comma-separated call kinds: s3, internal, storage, os, all
        #[arg(long)]
        calls: Option<String>,
        #[arg(long)]
        threshold: Option<String>,
        #[arg(long)]
        only_errors: bool,
        #[arg(long)]
        status_code: Option<u16>,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        funcname: Option<String>,
        #[arg(long)]
        path: Option<String>,
    },
    /// Tail server logs
    Console {
        #[arg(long)]
        node: Option<String>,
        #[arg(long)]
        lines: Option<u32>,
        /// all, minio or application
        #[arg(long)]
        log_type: Option<String>,
    },
    /// Heal a bucket and follow its progress
    Heal {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        recursive: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        remove: bool,
        #[arg(long)]
        deep: bool,
        #[arg(long, conflicts_with = "force_stop")]
        force_start: bool,
        #[arg(long)]
        force_stop: bool,
    },
    /// Collect cluster health diagnostics
    HealthInfo {
        #[arg(long, default_value = "1m")]
        deadline: String,
    },
    /// Watch bucket notifications
    Watch {
        bucket: String,
        /// Comma-separated events: put, get, delete
        #[arg(long)]
        events: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        suffix: Option<String>,
    },
}

impl Commands {
    /// Operation path and query pairs.
    fn endpoint(&self) -> (String, Vec<(&'static str, String)>) {
        let mut query = Vec::new();
        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                query.push((name, value));
            }
        };
        let flag = |set: bool| set.then(|| "true".to_string());

        let path = match self {
            Commands::Trace {
                calls,
                threshold,
                only_errors,
                status_code,
                method,
                funcname,
                path,
            } => {
                push("calls", calls.clone());
                push("threshold", threshold.clone());
                push("onlyErrors", flag(*only_errors));
                push("statusCode", status_code.map(|c| c.to_string()));
                push("method", method.clone());
                push("funcname", funcname.clone());
                push("path", path.clone());
                "trace".to_string()
            }
            Commands::Console { node, lines, log_type } => {
                push("node", node.clone());
                push("lines", lines.map(|l| l.to_string()));
                push("logType", log_type.clone());
                "console".to_string()
            }
            Commands::Heal {
                bucket,
                prefix,
                recursive,
                dry_run,
                remove,
                deep,
                force_start,
                force_stop,
            } => {
                push("prefix", prefix.clone());
                push("recursive", flag(*recursive));
                push("dry-run", flag(*dry_run));
                push("remove", flag(*remove));
                push("scan", deep.then(|| "deep".to_string()));
                push("force-start", flag(*force_start));
                push("force-stop", flag(*force_stop));
                format!("heal/{bucket}")
            }
            Commands::HealthInfo { deadline } => {
                push("deadline", Some(deadline.clone()));
                "health-info".to_string()
            }
            Commands::Watch {
                bucket,
                events,
                prefix,
                suffix,
            } => {
                push("events", events.clone());
                push("prefix", prefix.clone());
                push("suffix", suffix.clone());
                format!("watch/{bucket}")
            }
        };
        (path, query)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (path, query) = cli.command.endpoint();
    let mut url = Url::parse(&cli.url)?.join(&format!("/ws/{path}"))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let (mut socket, _) = match connect_async(url.as_str()).await {
        Ok(connected) => connected,
        Err(WsError::Http(response)) => {
            eprintln!("Error: relay returned status {}", response.status());
            if let Some(body) = response.body().as_deref() {
                eprintln!("Response: {}", String::from_utf8_lossy(body));
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let mut closing = false;
    loop {
        let message = tokio::select! {
            _ = tokio::signal::ctrl_c(), if !closing => {
                closing = true;
                socket
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    })))
                    .await?;
                continue;
            }
            message = socket.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => print_message(text.as_str(), cli.compact)?,
            Some(Ok(Message::Close(frame))) => return Ok(report_close(frame.as_ref())),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                eprintln!("Error: connection failed: {e}");
                return Ok(ExitCode::FAILURE);
            }
            None => {
                eprintln!("Error: connection dropped without close frame");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
}

fn print_message(text: &str, compact: bool) -> Result<(), serde_json::Error> {
    if compact {
        println!("{text}");
        return Ok(());
    }
    let json: Value = serde_json::from_str(text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn report_close(frame: Option<&CloseFrame>) -> ExitCode {
    match frame {
        Some(frame) if matches!(frame.code, CloseCode::Normal | CloseCode::Away) => ExitCode::SUCCESS,
        Some(frame) => {
            eprintln!("Error: stream closed with {} ({})", u16::from(frame.code), frame.reason.as_str());
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}
