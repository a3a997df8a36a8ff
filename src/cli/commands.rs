use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "phantomid", about = "Anonymous account daemon")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "serve", about = "Run the PhantomID account daemon")]
    Serve {
        #[arg(short, long, help = "Port to listen on (default: 8888)")]
        port: Option<u16>,
        #[arg(short, long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long = "max-clients", help = "Maximum simultaneous client connections")]
        max_clients: Option<usize>,
        #[arg(long = "max-accounts", help = "Maximum number of live accounts")]
        max_accounts: Option<usize>,
        #[arg(
            long = "initial-accounts",
            help = "Create this many accounts at startup and print them"
        )]
        initial_accounts: Option<usize>,
    },
    #[command(
        name = "monitor",
        about = "Accept connections and log received traffic without replying"
    )]
    Monitor {
        #[arg(short, long, default_value_t = crate::network::DEFAULT_MONITOR_PORT)]
        port: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags() {
        let opt = Opt::try_parse_from(["phantomid", "serve", "-p", "9000", "--initial-accounts", "1"])
            .unwrap();
        match opt.command {
            Command::Serve {
                port,
                initial_accounts,
                config,
                ..
            } => {
                assert_eq!(port, Some(9000));
                assert_eq!(initial_accounts, Some(1));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_monitor_default_port() {
        let opt = Opt::try_parse_from(["phantomid", "monitor"]).unwrap();
        assert!(matches!(opt.command, Command::Monitor { port: 8080 }));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Opt::try_parse_from(["phantomid", "serve", "--port", "70000"]).is_err());
    }
}
