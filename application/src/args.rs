//! [`Args`] definitions.

use clap::{Parser, Subcommand};
use secrecy::SecretBox;
use service::{
    command::{self, create_user, Command as _},
    domain::user::{self, Role},
};
use tracing as log;

use crate::Service;

/// Server of the restaurant back-office.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// [`Command`] to run instead of serving the HTTP API.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

/// One-off maintenance command.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Creates an administrator account and exits.
    SeedAdmin {
        /// Email of the administrator.
        #[arg(long)]
        email: String,

        /// Password of the administrator.
        #[arg(long, env = "SEED_ADMIN_PASSWORD")]
        password: String,

        /// First name of the administrator.
        #[arg(long, default_value = "Admin")]
        first_name: String,
    },
}

impl Command {
    /// Runs this [`Command`] upon the provided [`Service`].
    ///
    /// Seeding an administrator is idempotent: an already registered email
    /// is left untouched and reported as success.
    ///
    /// # Errors
    ///
    /// If the arguments are invalid or the [`Service`] fails. The cause is
    /// logged.
    pub async fn run(self, service: &Service) -> Result<(), ()> {
        match self {
            Self::SeedAdmin {
                email,
                password,
                first_name,
            } => {
                let email = email.parse::<user::Email>().map_err(|e| {
                    log::error!("invalid administrator email: {e}");
                })?;
                let password =
                    password.parse::<user::Password>().map_err(|e| {
                        log::error!("invalid administrator password: {e}");
                    })?;
                let first_name =
                    first_name.parse::<user::Name>().map_err(|e| {
                        log::error!("invalid administrator first name: {e}");
                    })?;

                let created = service
                    .execute(command::CreateUser {
                        email,
                        password: SecretBox::init_with(move || password),
                        first_name,
                        last_name: None,
                        phone: None,
                        role: Role::Admin,
                    })
                    .await;
                match created {
                    Ok(admin) => {
                        log::info!(
                            user.id = %admin.id,
                            "administrator created",
                        );
                        Ok(())
                    }
                    Err(e) => {
                        if let create_user::ExecutionError::EmailOccupied(
                            email,
                        ) = e.as_ref()
                        {
                            log::info!(%email, "administrator already present");
                            return Ok(());
                        }
                        log::error!("failed to create administrator: {e}");
                        Err(())
                    }
                }
            }
        }
    }
}
