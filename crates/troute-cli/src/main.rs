//! CLI for troute.

mod print;
mod runner;

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use troute_core::{IpFamily, Protocol, TracerConfig, TrouteError};

/// troute - concurrent traceroute.
#[derive(Parser, Debug)]
#[command(name = "troute")]
#[command(version)]
#[command(about = "Discover the network path to a host")]
pub struct Args {
    /// Hostname or address to trace.
    #[arg(required = true)]
    pub host: String,

    /// Use IPv4 (default).
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Use IPv6.
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: bool,

    /// Use ICMP Echo Requests for probes.
    #[arg(short = 'I', long = "icmp", conflicts_with_all = ["tcp", "udp"])]
    pub icmp: bool,

    /// Use TCP SYN for probes (accepted, not implemented).
    #[arg(short = 'T', long = "tcp", conflicts_with = "udp")]
    pub tcp: bool,

    /// Use UDP datagrams for probes (default).
    #[arg(short = 'U', long = "udp")]
    pub udp: bool,

    /// First TTL to probe.
    #[arg(long = "start-ttl", default_value_t = 1)]
    pub start_ttl: u8,

    /// Maximum number of hops (max TTL value).
    #[arg(short = 'm', long = "max-ttl", default_value_t = 30)]
    pub max_ttl: u8,

    /// First UDP destination port (defaults 33434, or 80 for TCP).
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Number of probes per hop.
    #[arg(short = 'n', long = "probes", default_value_t = 3)]
    pub probes: usize,

    /// Number of concurrent probes per hop.
    #[arg(long = "concurrent-probes", visible_alias = "cp", default_value_t = 3)]
    pub concurrent_probes: usize,

    /// Number of concurrent hops.
    #[arg(long = "concurrent-hops", visible_alias = "ch", default_value_t = 1)]
    pub concurrent_hops: usize,

    /// Probe timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value_t = 3)]
    pub timeout: u64,

    /// Enable probe debug logging.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Args {
    /// Converts CLI args to a [`TracerConfig`].
    fn to_config(&self) -> Result<TracerConfig, TrouteError> {
        let family = if self.ipv6 { IpFamily::V6 } else { IpFamily::V4 };
        let protocol = if self.icmp {
            Protocol::Icmp
        } else if self.tcp {
            Protocol::Tcp
        } else {
            Protocol::Udp
        };
        let base_port = self.port.unwrap_or(match protocol {
            Protocol::Tcp => 80,
            _ => 33434,
        });

        let cfg = TracerConfig {
            family,
            protocol,
            start_ttl: self.start_ttl,
            max_ttl: self.max_ttl,
            base_port,
            nprobes: self.probes,
            cprobes: self.concurrent_probes,
            chops: self.concurrent_hops,
            probe_timeout: Duration::from_secs(self.timeout),
            debug: self.debug,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = match args.to_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("troute: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runner::run(&cfg, &args.host).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("troute: {e}");
            ExitCode::FAILURE
        }
    }
}
