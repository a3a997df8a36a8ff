// This is the entry point for the PhantomID daemon binary
// The core lives in the library; here I only parse arguments, set up logging and signals
use clap::Parser;
use log::{error, info, LevelFilter};
use phantomid::cli::{Command, Opt};
use phantomid::network::{EventLoop, LoopSettings, ShutdownHandle, TrafficLogger};
use phantomid::{Config, PhantomDaemon};
use std::net::{Ipv4Addr, SocketAddr};
use std::process;

fn main() {
    // I initialize logging at Info so connections and commands show up by default
    // RUST_LOG still wins when it is set
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Serve {
            port,
            config,
            max_clients,
            max_accounts,
            initial_accounts,
        } => {
            // File and environment first, then command-line flags on top
            let mut settings = Config::load(config.as_deref())?;
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(max_clients) = max_clients {
                settings.max_clients = max_clients;
            }
            if let Some(max_accounts) = max_accounts {
                settings.max_accounts = max_accounts;
            }
            if let Some(initial_accounts) = initial_accounts {
                settings.initial_accounts = initial_accounts;
            }

            // init fails before any client can connect if the socket or the RNG is unusable
            let mut daemon = PhantomDaemon::init(&settings)?;
            install_signal_handler(daemon.shutdown_handle())?;

            for account in daemon.create_initial_accounts(settings.initial_accounts)? {
                println!("Created anonymous account:");
                println!("ID: {}", account.get_id());
                println!("Creation Time: {}", account.get_created_at());
                println!("Expiry Time: {}", account.get_expires_at());
            }

            daemon.run();
            daemon.cleanup();
        }
        Command::Monitor { port } => {
            // The bare multiplexer: same loop, a handler that only logs
            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
            let mut server = EventLoop::bind(addr, &LoopSettings::default(), TrafficLogger::new())?;
            install_signal_handler(server.shutdown_handle())?;

            info!("Server running on port {port}...");
            server.run();

            let logger = server.handler();
            info!(
                "Monitor stopped after {} connections and {} bytes",
                logger.connections(),
                logger.bytes_received()
            );
        }
    }
    Ok(())
}

// Ctrl-C and SIGTERM only flip the running flag; the loop notices on its next turn
fn install_signal_handler(handle: ShutdownHandle) -> Result<(), Box<dyn std::error::Error>> {
    ctrlc::set_handler(move || handle.shutdown())
        .map_err(|e| format!("Failed to install signal handler: {e}"))?;
    Ok(())
}
