mod cli;
mod logging;
mod tui;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use grovr::backend::{Api, Backend, ProcessBackend};
use grovr::config::Config;
use grovr::deep_link::{self, DeepLinkRequest, DeepLinkRoute};
use grovr::use_cases;
use cli::{Cli, Commands, GithubAction, JiraAction};
use tui::run_tui;

fn main() -> Result<()> {
    better_panic::install();

    let config = Config::load()?;

    logging::rotate_log(&config);
    logging::setup_logging(&config)?;

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Link {
            route,
            project,
            issue,
            description,
            branch,
        }) => {
            let route: DeepLinkRoute = route.parse()?;
            let request = DeepLinkRequest {
                route,
                project,
                issue,
                description,
                branch,
            };
            println!("{}", deep_link::generate_deep_link(&request));
            Ok(())
        }

        Some(Commands::Init { force }) => {
            if config.init_default_file(force)? {
                println!("grovr initialized at {}", config.base_dir.display());
            } else {
                println!(
                    "{} already exists (use --force to overwrite)",
                    config.config_path().display()
                );
            }
            Ok(())
        }

        Some(Commands::Open { uri }) => {
            let request = deep_link::parse_deep_link(&uri)?;
            tracing::info!(route = %request.route, "opening with deep link");
            launch_ui(config, Some(request))
        }

        Some(Commands::Github { action }) => with_backend(&config, |api| async move {
            match action {
                GithubAction::Set {
                    token,
                    name,
                    enterprise_host,
                } => {
                    let username = use_cases::configure_github(
                        &api,
                        &name,
                        &token,
                        enterprise_host.as_deref(),
                    )
                    .await?;
                    match username {
                        Some(user) => println!("GitHub configured for {}", user),
                        None => println!("GitHub configured"),
                    }
                }
                GithubAction::Remove => {
                    use_cases::remove_github(&api).await?;
                    println!("GitHub configuration removed");
                }
            }
            Ok(())
        }),

        Some(Commands::Jira { action }) => with_backend(&config, |api| async move {
            match action {
                JiraAction::Set { host, email, token } => {
                    let display_name =
                        use_cases::configure_jira(&api, &host, &email, &token).await?;
                    match display_name {
                        Some(name) => println!("Jira configured for {}", name),
                        None => println!("Jira configured"),
                    }
                }
                JiraAction::Remove => {
                    use_cases::remove_jira(&api).await?;
                    println!("Jira configuration removed");
                }
            }
            Ok(())
        }),

        None => launch_ui(config, None),
    }
}

fn launch_ui(config: Config, pending_link: Option<DeepLinkRequest>) -> Result<()> {
    config.ensure_dirs()?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let _guard = runtime.enter();

    let backend = Arc::new(spawn_backend(&config)?);
    let result = run_tui(config, Arc::clone(&backend) as Arc<dyn Backend>, pending_link);

    runtime.block_on(backend.shutdown());
    result
}

/// Run one backend-bound CLI command to completion.
fn with_backend<F, Fut>(config: &Config, f: F) -> Result<()>
where
    F: FnOnce(Api) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let backend = Arc::new(spawn_backend(config)?);
        let api = Api::new(Arc::clone(&backend) as Arc<dyn Backend>);
        let result = f(api).await;
        backend.shutdown().await;
        result
    })
}

fn spawn_backend(config: &Config) -> Result<ProcessBackend> {
    ProcessBackend::spawn(
        &config.file.backend_command,
        &config.file.backend_args,
        config.request_timeout(),
    )
    .with_context(|| {
        format!(
            "Could not start backend '{}' (set backend_command in {})",
            config.file.backend_command,
            config.config_path().display()
        )
    })
}
