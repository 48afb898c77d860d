use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use styling_profiles_cli::{errors::Result, load_config, tracing::install_tracing, PathConfig};
use styling_profiles_core::{ProfileId, ScalarValue};
use tokio::task::spawn_blocking;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// The site root containing `themes/custom` and `sites/default/files`
    app_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the stored styling profiles
    List,

    /// Print a profile and its style values
    Show { id: String },

    /// Print the fields of the create form, or of the edit form for `id`
    Form { id: Option<String> },

    /// Create a profile, then stage and render it
    Create {
        #[arg(long)]
        label: String,

        /// Machine name. Derived from the label when omitted.
        #[arg(long)]
        id: Option<String>,

        /// Override a style value, as `name=value`
        #[arg(short, long = "set", value_parser = styling_profiles_cli::parse_key_value)]
        set: Vec<(String, ScalarValue)>,
    },

    /// Update an existing profile, then stage and render it
    Update {
        id: String,

        #[arg(long)]
        label: Option<String>,

        /// Override a style value, as `name=value`
        #[arg(short, long = "set", value_parser = styling_profiles_cli::parse_key_value)]
        set: Vec<(String, ScalarValue)>,
    },

    /// Copy the theme sources into the profile's staging directory
    Stage { id: String },

    /// Render the profile's definitions file
    Render { id: String },

    /// Stage and render one profile, or every profile
    Rebuild { id: Option<String> },

    /// Delete a profile and its staged files
    Delete { id: String },

    /// Rebuild profiles whenever theme sources, profile records or the config change
    Watch,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    install_tracing()?;

    let cli = Cli::parse();
    let config = make_config(&cli.app_root).await?;
    let service = styling_profiles_cli::open(config.clone());

    match cli.command {
        Command::List => {
            for profile in service.store().list()? {
                println!("{}\t{}", profile.id, profile.label);
            }
        }
        Command::Show { id } => {
            styling_profiles_cli::print_profile(&styling_profiles_cli::load(&service, &id)?);
        }
        Command::Form { id } => {
            styling_profiles_cli::print_form(&styling_profiles_cli::form_fields(
                &service,
                id.as_deref(),
            )?);
        }
        Command::Create { label, id, set } => {
            styling_profiles_cli::create(&service, id.as_deref(), &label, set)?;
        }
        Command::Update { id, label, set } => {
            styling_profiles_cli::update(&service, &id, label.as_deref(), set)?;
        }
        Command::Stage { id } => {
            let profile = styling_profiles_cli::load(&service, &id)?;
            styling_profiles_core::Stager::new(service.config()).stage(&profile.id)?;
        }
        Command::Render { id } => {
            let profile = styling_profiles_cli::load(&service, &id)?;
            let outcome = styling_profiles_core::render(
                &profile.styles,
                &service.config().template_path(),
                &service.config().definitions_path(&profile.id),
            )?;
            info!("{outcome:?}");
        }
        Command::Rebuild { id: Some(id) } => {
            let profile = styling_profiles_cli::load(&service, &id)?;
            service.materialize(&profile)?;
        }
        Command::Rebuild { id: None } => {
            service.materialize_all()?;
        }
        Command::Delete { id } => {
            let id = ProfileId::parse(&id)?;
            if !service.delete(&id)? {
                info!("Styling profile {id} did not exist");
            }
        }
        Command::Watch => {
            styling_profiles_cli::watch::run(cli.app_root, config).await?;
        }
    }

    Ok(())
}

async fn make_config(app_root: &Path) -> Result<PathConfig> {
    let app_root = app_root.to_owned();
    Ok(spawn_blocking(move || load_config(&app_root)).await??)
}
