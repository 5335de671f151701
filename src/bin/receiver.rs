//! UFT 수신자
//!
//! 송신자에게 파일 하나를 요청해서 저장
//!
//! 사용법:
//!   uft-receiver <FILENAME> [--host HOST] [-p PORT] [-o PATH] [--preset default|low-latency|bulk]
//!
//! 예시:
//!   uft-receiver data.bin --host 192.168.0.10 -o received.bin

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{value_parser, Arg, Command};
use tracing::{error, info, warn};

use uft::{Config, Receiver, Shutdown, TransferOutcome, UdpTransport, DEFAULT_PORT};

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

    let matches = Command::new("uft-receiver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Downloads a single file from a UFT sender")
        .arg(Arg::new("filename").value_name("FILENAME").required(true).help("File to request"))
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .default_value("localhost")
                .help("Sender host"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .default_value("6000")
                .help("Sender port"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .help("Where to write the file (defaults to FILENAME)"),
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

    let filename = matches
        .get_one::<String>("filename")
        .ok_or("filename argument required")?;
    let host = matches
        .get_one::<String>("host")
        .map(String::as_str)
        .unwrap_or("localhost");
    let port = matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT);
    let output = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(filename));

    let server_addr = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| format!("could not resolve {}", host))?;

    let config = preset(matches.get_one::<String>("preset"));
    let bind_addr: SocketAddr = if server_addr.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let transport = UdpTransport::bind(bind_addr, config.recv_buffer_size).await?;

    let mut receiver = Receiver::new(transport, server_addr, config)?;

    let shutdown = Shutdown::new();
    shutdown.install_ctrl_c();

    match receiver.get_file(filename, &output, &shutdown).await {
        Ok(TransferOutcome::Completed(report)) => {
            info!(
                "Wrote {} bytes to {} ({} blocks, {:.1}% request success).",
                report.bytes_written,
                report.destination.display(),
                report.block_count,
                report.success_ratio() * 100.0
            );
            Ok(())
        }
        Ok(TransferOutcome::PeerAborted) => {
            warn!("Sender aborted the transfer.");
            std::process::exit(2);
        }
        Ok(TransferOutcome::UserCanceled) => {
            warn!("Transfer canceled.");
            std::process::exit(130);
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            Err(e.into())
        }
    }
}
