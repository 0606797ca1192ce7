//! CLI entry point for the OTR client.
//!
//! Builds client registration and key maintenance requests for a device
//! record kept in a JSON state file and prints them as JSON. Nothing is
//! sent; with `--ack` a successful backend response is assumed and the
//! resulting key state is written back.
//!
//! Prekeys come from a throwaway in-memory key store: only the public halves
//! are printed, and the private halves are dropped when the command exits.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use otr_client::{
    client::{ClientRequestFactory, DeviceClass, DeviceRecord, DeviceType, LoginCredentials},
    crypto::SoftwareKeyStore,
    transport::{OutboundRequest, Outcome},
    utils::{ClientConfig, DEFAULT_CONFIG_FILE},
};
use std::path::{Path, PathBuf};

/// OTR client - device registration and key maintenance requests
#[derive(Parser)]
#[command(name = "otr-client")]
#[command(about = "Builds client registration and prekey maintenance requests")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Device state file
    #[arg(short, long, value_name = "FILE", default_value = "device.json")]
    state: PathBuf,

    /// Verbose logging (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and inspect the device state file
    Device {
        #[command(subcommand)]
        action: DeviceCommands,
    },
    /// Build the client registration request
    ///
    /// Prekey private keys are generated in memory and not kept.
    Register {
        /// Account password sent along with the registration
        #[arg(long)]
        password: Option<String>,
        /// Cookie label of the current login
        #[arg(long)]
        cookie: Option<String>,
        /// Record the request as accepted and save the new key state
        #[arg(long)]
        ack: bool,
    },
    /// Build a prekey upload starting at the stored watermark
    ///
    /// Prekey private keys are generated in memory and not kept.
    Replenish {
        /// Record the request as accepted and save the new key state
        #[arg(long)]
        ack: bool,
    },
    /// Build a signaling key rotation request
    RotateSigkeys {
        /// Record the request as accepted and save the new key state
        #[arg(long)]
        ack: bool,
    },
    /// Build the client deletion request
    Delete {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Build the client list request
    FetchClients,
    /// Generate and validate configuration files
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// Create a new, unregistered device record
    Init {
        /// Device label (defaults to the configured one)
        #[arg(long)]
        label: Option<String>,
        /// Device model (defaults to the configured one)
        #[arg(long)]
        model: Option<String>,
        /// Device class: phone, tablet, desktop, legalhold
        #[arg(long)]
        class: Option<DeviceClass>,
        /// Device type: permanent, temporary, legalhold
        #[arg(long = "type")]
        device_type: Option<DeviceType>,
        /// Backend client id, for devices registered elsewhere
        #[arg(long)]
        remote_id: Option<String>,
        /// Overwrite an existing state file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the device record
    Show,
    /// Set the backend-assigned client id
    SetRemoteId {
        /// Client id returned by the registration
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        file: Option<PathBuf>,
    },
    /// Show current configuration
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?;

    setup_logging(&config, cli.verbose, cli.quiet);

    let factory = ClientRequestFactory::from_config(&config.keys);

    match cli.command {
        Commands::Device { action } => handle_device_commands(action, &cli.state, &config),
        Commands::Register {
            password,
            cookie,
            ack,
        } => {
            let mut device = DeviceRecord::load(&cli.state).context("loading device state")?;
            let credentials = LoginCredentials {
                email: None,
                password,
            };
            let request = factory.register_client_request(
                &mut SoftwareKeyStore::new(),
                &device,
                Some(&credentials),
                cookie.as_deref(),
            )?;
            emit(&request, ack, &mut device, &cli.state)
        }
        Commands::Replenish { ack } => {
            let mut device = DeviceRecord::load(&cli.state).context("loading device state")?;
            let request = factory.update_prekeys_request(&mut SoftwareKeyStore::new(), &device)?;
            emit(&request, ack, &mut device, &cli.state)
        }
        Commands::RotateSigkeys { ack } => {
            let mut device = DeviceRecord::load(&cli.state).context("loading device state")?;
            let request =
                factory.update_signaling_keys_request(&mut SoftwareKeyStore::new(), &device)?;
            emit(&request, ack, &mut device, &cli.state)
        }
        Commands::Delete { email, password } => {
            let device = DeviceRecord::load(&cli.state).context("loading device state")?;
            let credentials = LoginCredentials::new(email, password)
                .for_deletion()
                .context("deletion needs both email and password")?;
            print_request(&factory.delete_client_request(&device, &credentials)?)
        }
        Commands::FetchClients => print_request(&factory.fetch_clients_request()),
        Commands::Config { action } => handle_config_commands(action, &config),
    }
}

fn setup_logging(config: &ClientConfig, verbose: u8, quiet: bool) {
    let log_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();
}

fn handle_device_commands(
    action: DeviceCommands,
    state: &Path,
    config: &ClientConfig,
) -> Result<()> {
    match action {
        DeviceCommands::Init {
            label,
            model,
            class,
            device_type,
            remote_id,
            force,
        } => {
            if state.exists() && !force {
                return Err(anyhow::anyhow!(
                    "Device state {} already exists. Use --force to overwrite.",
                    state.display()
                ));
            }

            let device = DeviceRecord {
                remote_identifier: remote_id,
                device_type: device_type.unwrap_or(config.device.device_type),
                label: label.or_else(|| config.device.label.clone()),
                model: model.or_else(|| config.device.model.clone()),
                device_class: class.unwrap_or(config.device.class),
                ..DeviceRecord::default()
            };
            device.save(state)?;
            info!("Created device state at {}", state.display());
        }
        DeviceCommands::Show => {
            let device = DeviceRecord::load(state).context("loading device state")?;
            println!("{}", serde_json::to_string_pretty(&device)?);
        }
        DeviceCommands::SetRemoteId { id } => {
            let mut device = DeviceRecord::load(state).context("loading device state")?;
            if let Some(previous) = &device.remote_identifier {
                warn!("Replacing client id {previous}");
            }
            device.remote_identifier = Some(id);
            device.save(state)?;
        }
    }
    Ok(())
}

fn handle_config_commands(action: ConfigCommands, config: &ClientConfig) -> Result<()> {
    match action {
        ConfigCommands::Generate { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            ClientConfig::default().save(&path)?;
            println!("✓ Configuration written to: {}", path.display());
        }
        ConfigCommands::Validate { file } => {
            let path = file.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            ClientConfig::from_file(&path)?;
            println!("✓ Configuration is valid: {}", path.display());
        }
        ConfigCommands::Show => println!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn print_request(request: &OutboundRequest) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(request)?);
    Ok(())
}

fn emit(
    request: &OutboundRequest,
    ack: bool,
    device: &mut DeviceRecord,
    state: &Path,
) -> Result<()> {
    print_request(request)?;

    let effects: Vec<&str> = request.completion_effects().iter().map(|e| e.name()).collect();
    info!("Completion effects: {}", effects.join(", "));

    if ack {
        request.complete(&Outcome::success(200, None), &mut device.key_state);
        device.save(state)?;
        let has_signaling_keys = device.key_state.signaling_keys.is_some();
        let signaling = if has_signaling_keys { "present" } else { "absent" };
        info!(
            "Saved key state: watermark {}, signaling keys {signaling}",
            device.key_state.prekey_watermark
        );
    }
    Ok(())
}
