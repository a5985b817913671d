use anyhow::Context;
use riverstone::config::{parse_args, Config, ConfigError, Invocation, TransportKind};
use riverstone::protocol::{Dispatcher, Response};
use riverstone::service::CharacterService;
use riverstone::store::CharacterStore;
use riverstone::transport::{
    serve_endpoint, shutdown_channel, Channel, FileDropChannel, FileDropConfig, FileDropEndpoint,
    SocketChannel, SocketServer,
};
use riverstone::utils::logging::init_tracing;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const USAGE: &str = "\
Riverstone - character progression service

Usage: riverstone <command> [options]

Commands:
  serve                 Run the character service
  send <request>        Send one request and print the reply
  client                Send requests read from stdin, one per line
  --version             Show version information
  --help                Show this help message

Options (also read from RIVERSTONE_* environment variables):
  --data-dir <path>     Data directory (default ~/.riverstone)
  --transport <kind>    file or socket (default socket)
  --addr <host:port>    Socket address (default 127.0.0.1:5554)
  --poll-ms <ms>        File-drop poll interval (default 250)
  --timeout-secs <s>    Client reply timeout (default 10)

Requests are `command key=value ...` lines or JSON envelopes, e.g.
  riverstone send create_new_character name=Aria job=Mage";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = |key: &str| std::env::var(key).ok();
    let invocation = match parse_args(std::env::args().skip(1), &env) {
        Ok(invocation) => invocation,
        Err(e) => usage_error(e),
    };

    match invocation {
        Invocation::Help => println!("{}", USAGE),
        Invocation::Version => println!("riverstone {}", env!("CARGO_PKG_VERSION")),
        Invocation::Serve(config) => serve(config).await?,
        Invocation::Send(config, line) => {
            let reply = send(&config, &line).await?;
            let ok = Response::decode(&reply).map(|r| r.is_success()).unwrap_or(false);
            println!("{}", pretty(&reply));
            if !ok {
                std::process::exit(1);
            }
        }
        Invocation::Client(config) => client(&config).await?,
    }

    Ok(())
}

fn usage_error(e: ConfigError) -> ! {
    eprintln!("{}", e);
    eprintln!("Run 'riverstone --help' for usage.");
    std::process::exit(2);
}

async fn serve(config: Config) -> anyhow::Result<()> {
    init_tracing();

    let data_dir = config.data_dir().context("could not prepare data directory")?;
    let store = CharacterStore::open(&data_dir)
        .with_context(|| format!("could not open store in {}", data_dir.display()))?;
    let service = CharacterService::new(store);
    info!(
        store = %service.store().path().display(),
        transport = %config.transport,
        "riverstone starting"
    );

    let (stop_tx, stop_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = stop_tx.send(true);
        }
    });

    match config.transport {
        TransportKind::FileDrop => {
            let drop_config =
                FileDropConfig::new(&data_dir).with_poll_interval(config.poll_interval);
            let mut endpoint = FileDropEndpoint::new(drop_config).await?;
            let mut dispatcher = Dispatcher::new(service);
            info!(dir = %data_dir.display(), "watching for request files");
            let handled = serve_endpoint(&mut endpoint, &mut dispatcher, stop_rx).await?;
            info!(handled, "file-drop service stopped");
        }
        TransportKind::Socket => {
            let server = SocketServer::bind(config.addr)
                .await
                .with_context(|| format!("could not listen on {}", config.addr))?;
            info!(addr = %server.local_addr()?, "listening");
            server.run(&service, stop_rx).await?;
        }
    }

    Ok(())
}

async fn send(config: &Config, line: &str) -> anyhow::Result<String> {
    let reply = match config.transport {
        TransportKind::FileDrop => file_channel(config)?.round_trip(line).await?,
        TransportKind::Socket => socket_channel(config).await?.round_trip(line).await?,
    };
    Ok(reply)
}

async fn client(config: &Config) -> anyhow::Result<()> {
    match config.transport {
        TransportKind::FileDrop => repl(&mut file_channel(config)?).await,
        TransportKind::Socket => repl(&mut socket_channel(config).await?).await,
    }
}

/// One session for the whole of stdin.
async fn repl<C: Channel>(channel: &mut C) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        match channel.round_trip(line).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

fn file_channel(config: &Config) -> anyhow::Result<FileDropChannel> {
    let dir = config.data_dir().context("could not prepare data directory")?;
    Ok(FileDropChannel::new(
        FileDropConfig::new(dir)
            .with_poll_interval(config.poll_interval)
            .with_reply_timeout(config.reply_timeout),
    ))
}

async fn socket_channel(config: &Config) -> anyhow::Result<SocketChannel> {
    SocketChannel::connect(config.addr, config.reply_timeout)
        .await
        .with_context(|| format!("could not reach service at {}", config.addr))
}

fn pretty(reply: &str) -> String {
    serde_json::from_str::<serde_json::Value>(reply)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| reply.to_string())
}
