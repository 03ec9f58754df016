//! mspoof: list interfaces and change their hardware address
//!
//! Usage:
//!   mspoof -l [-u]             list interfaces with current and burned-in address
//!   mspoof IFACE MAC           set a specific address
//!   mspoof IFACE -r            set a random unicast address
//!   mspoof IFACE --rset        restore the burned-in address

use clap::{CommandFactory, Parser};
use spark_net::HwAddr;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mspoof")]
#[command(version, about = "Spoof MAC address", long_about = None)]
struct Cli {
    /// Print every network interface with name and MAC
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Combined with -l, filter on interfaces that are up instead of running
    #[arg(short = 'u', requires = "list")]
    up: bool,

    /// Build and set a random MAC
    #[arg(short = 'r', long = "random", requires = "iface", conflicts_with_all = ["rset", "mac"])]
    random: bool,

    /// Restore the burned-in MAC
    #[arg(long = "rset", requires = "iface", conflicts_with = "mac")]
    rset: bool,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Interface to modify
    #[arg(value_name = "IFACE")]
    iface: Option<String>,

    /// New address in the form XX:XX:XX:XX:XX:XX
    #[arg(value_name = "MAC", value_parser = parse_mac)]
    mac: Option<HwAddr>,
}

fn parse_mac(text: &str) -> Result<HwAddr, spark_net::Error> {
    HwAddr::parse(text, false)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(unix)]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list {
        return unix::show_interfaces(cli.up);
    }

    match cli.iface.as_deref() {
        Some(iface) => unix::spoof(iface, &cli),
        // Nothing to do: same as --help
        None => match usage(&mut io::stdout()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("mspoof: cannot print usage: {}", err);
                ExitCode::FAILURE
            }
        },
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
fn usage(out: &mut impl Write) -> io::Result<()> {
    Cli::command().write_help(out)?;
    out.flush()
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    eprintln!("mspoof: interface control is only available on Unix systems");
    ExitCode::FAILURE
}

#[cfg(unix)]
mod unix {
    use super::Cli;
    use spark_net::iface::{self, flags};
    use spark_net::{Error, HwAddr};
    use std::process::ExitCode;
    use tracing::{info, warn};

    pub(super) fn show_interfaces(up: bool) -> ExitCode {
        let filter = if up { flags::UP } else { flags::RUNNING };
        let list = match iface::interfaces(filter) {
            Ok(list) => list,
            Err(err) => {
                eprintln!("mspoof: unable to list interfaces: {}", err);
                return ExitCode::FAILURE;
            }
        };

        let total = list.len();
        let mut failed = 0;
        for rec in &list {
            let mac = match iface::hw_addr(&rec.name) {
                Ok(mac) => mac,
                Err(err) => {
                    warn!(iface = %rec.name, error = %err, "cannot read hardware address");
                    failed += 1;
                    continue;
                }
            };

            match iface::burned_in_addr(&rec.name) {
                Ok(burned_in) => println!(
                    "{}\t\t{} - burnin: {}\t{}",
                    rec.name,
                    mac,
                    burned_in,
                    if burned_in == mac { "" } else { "[spoofed]" }
                ),
                Err(Error::Unsupported(_)) => println!("{}\t\t{}", rec.name, mac),
                Err(err) => {
                    info!(iface = %rec.name, error = %err, "no burned-in address");
                    println!("{}\t\t{} - burnin: Err", rec.name, mac);
                }
            }
        }
        list.release();

        if total > 0 && failed == total {
            eprintln!("mspoof: no interface could be read");
            return ExitCode::FAILURE;
        }
        ExitCode::SUCCESS
    }

    pub(super) fn spoof(name: &str, cli: &Cli) -> ExitCode {
        if !cli.random && !cli.rset && cli.mac.is_none() {
            eprintln!("Usage: mspoof IFACE [MAC | -r | --rset]");
            return ExitCode::FAILURE;
        }

        // SAFETY: geteuid has no preconditions.
        if unsafe { libc::geteuid() } != 0 {
            eprintln!("mspoof: elevated privileges required");
            return ExitCode::FAILURE;
        }

        let addr = if cli.random {
            HwAddr::random()
        } else if cli.rset {
            match iface::burned_in_addr(name) {
                Ok(addr) => addr,
                Err(err) => {
                    eprintln!("mspoof: {}", err);
                    return ExitCode::FAILURE;
                }
            }
        } else {
            match cli.mac {
                Some(addr) => addr,
                None => return ExitCode::FAILURE,
            }
        };

        match iface::set_hw_addr(name, addr) {
            Ok(()) => {
                println!("{}\t\t{}", name, addr);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("mspoof: unable to set MAC address: {}", err);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_usage_reports_write_errors() {
        let mut out = Vec::new();
        usage(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Usage: mspoof"));

        let err = usage(&mut ClosedPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_parse_spoof_with_mac() {
        let cli = Cli::try_parse_from(["mspoof", "eth0", "00:11:22:33:44:55"]).unwrap();
        assert_eq!(cli.iface.as_deref(), Some("eth0"));
        assert_eq!(cli.mac, Some(HwAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])));
    }

    #[test]
    fn test_broadcast_mac_rejected() {
        assert!(Cli::try_parse_from(["mspoof", "eth0", "ff:ff:ff:ff:ff:ff"]).is_err());
        assert!(Cli::try_parse_from(["mspoof", "eth0", "00:11:22"]).is_err());
    }

    #[test]
    fn test_list_flags() {
        let cli = Cli::try_parse_from(["mspoof", "-l", "-u", "-vv"]).unwrap();
        assert!(cli.list && cli.up);
        assert_eq!(cli.verbose, 2);
        assert!(Cli::try_parse_from(["mspoof", "-u"]).is_err());
    }

    #[test]
    fn test_random_conflicts_with_mac() {
        assert!(Cli::try_parse_from(["mspoof", "eth0", "-r"]).unwrap().random);
        assert!(Cli::try_parse_from(["mspoof", "eth0", "02:00:00:00:00:01", "-r"]).is_err());
        assert!(Cli::try_parse_from(["mspoof", "--rset"]).is_err());
    }
}
