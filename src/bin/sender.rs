//! UFT 송신자
//!
//! 디렉터리의 최상위 파일을 요청받는 대로 전송
//!
//! 사용법:
//!   uft-sender <DIR> [-p PORT] [--block-size N] [--preset default|low-latency|bulk]
//!
//! 예시:
//!   RUST_LOG=debug uft-sender ./share -p 6000

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::{value_parser, Arg, Command};
use tracing::{error, info};

use uft::{Config, DirStore, Sender, Shutdown, UdpTransport, DEFAULT_PORT};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn preset(name: Option<&String>) -> Config {
    match name.map(String::as_str) {
        Some("low-latency") => Config::low_latency(),
        Some("bulk") => Config::bulk(),
        _ => Config::default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let matches = Command::new("uft-sender")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serves files from a directory over UDP")
        .arg(Arg::new("dir").value_name("DIR").required(true).help("Directory to serve"))
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .default_value("6000")
                .help("UDP port to listen on"),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .help("Maximum block size"),
        )
        .arg(
            Arg::new("preset")
                .long("preset")
                .value_name("PRESET")
                .value_parser(["default", "low-latency", "bulk"])
                .default_value("default")
                .help("Configuration preset"),
        )
        .get_matches();

    let dir = matches.get_one::<String>("dir").ok_or("directory argument required")?;
    let port = matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT);

    let mut config = preset(matches.get_one::<String>("preset"));
    if let Some(block_size) = matches.get_one::<usize>("block-size") {
        config = config.with_max_block_size(*block_size);
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let transport = UdpTransport::bind(bind_addr, config.recv_buffer_size).await?;
    info!("Listening on {}", bind_addr);

    let store = Arc::new(DirStore::new(dir));
    info!("Serving files from {}", store.root().display());
    let mut sender = Sender::new(transport, store, config)?;

    let shutdown = Shutdown::new();
    shutdown.install_ctrl_c();

    if let Err(e) = sender.serve(&shutdown).await {
        error!("Sender failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
