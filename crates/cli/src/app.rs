//! Wiring between the command line and the session manager.

use crate::cli::{Cli, Command, ParamsAction};
use crate::render::{paint_status, print_events, render_graph, render_snapshot};
use color_eyre::eyre::{bail, Result};
use colored::Colorize;
use cr_core::backend::{BackendFactory, BackendKind};
use cr_core::config::{load_config, AppConfig};
use cr_core::engine::{EngineSettings, ExecutionEngine};
use cr_core::init::{generate_control_room_structure, InitOptions};
use cr_core::state::manager::SessionManager;
use cr_core::store::FileStore;
use cr_protocol::ipc::Op;
use cr_protocol::process_models::{NodeStatus, RunParameters};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Buffered events between the engine and the printer.
const EVENT_BUFFER: usize = 256;

/// Run one command to completion.
pub async fn execute(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Init { force, minimal } => init(&cli.root, *force, *minimal).await,
        Command::Graph { list } => {
            let config = load_config(&cli.root).await?;
            if *list {
                for name in config.pipeline_names() {
                    println!("{name}");
                }
            } else {
                println!("{}", render_graph(config.pipeline(&cli.pipeline)?));
            }
            Ok(())
        }
        _ => {
            let config = load_config(&cli.root).await?;
            let workspace = Workspace::open(&cli, &config)?;
            workspace.dispatch(cli.command).await
        }
    }
}

async fn init(root: &Path, force: bool, minimal: bool) -> Result<()> {
    let written = generate_control_room_structure(InitOptions {
        target_dir: root.to_path_buf(),
        force,
        minimal,
    })
    .await?;

    println!("{}", "Initialized .control-room/".green());
    for path in written {
        println!("  {path}");
    }
    Ok(())
}

/// A session over one pipeline, with its events printed as they arrive.
struct Workspace {
    manager: SessionManager,
    printer: JoinHandle<usize>,
}

impl Workspace {
    fn open(cli: &Cli, config: &AppConfig) -> Result<Self> {
        let pipeline = config.pipeline(&cli.pipeline)?.clone();
        let kind = if cli.mock {
            BackendKind::Mock
        } else {
            BackendKind::Http
        };
        let backend = BackendFactory::create(kind, &config.global.backend)?;

        // Mock runs keep their own state so they never mix with real ones.
        let mut state_dir = cli.root.join(&config.global.storage.state_dir);
        if cli.mock {
            state_dir.push("mock");
        }
        debug!(state_dir = %state_dir.display(), ?kind, "Opening session");

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let engine = ExecutionEngine::new(
            pipeline,
            backend,
            EngineSettings::from(&config.global.execution),
            events_tx.clone(),
        )
        .with_store(Arc::new(FileStore::new(state_dir)));

        Ok(Self {
            manager: SessionManager::new(Arc::new(engine), events_tx),
            printer: tokio::spawn(print_events(events_rx)),
        })
    }

    fn engine(&self) -> &Arc<ExecutionEngine> {
        self.manager.engine()
    }

    async fn dispatch(self, command: Command) -> Result<()> {
        match command {
            Command::Status => {
                let parameters = self.engine().parameters().await;
                println!(
                    "{} ({})",
                    self.engine().pipeline().name.bold(),
                    if parameters.is_some() {
                        "parameters applied".green()
                    } else {
                        "no parameters".yellow()
                    }
                );
                println!("{}", render_snapshot(&self.engine().snapshot().await));
            }
            Command::Params { action } => match action {
                ParamsAction::Show => match self.engine().parameters().await {
                    Some(parameters) => println!("{}", serde_json::to_string_pretty(&parameters)?),
                    None => println!("No parameters applied"),
                },
                ParamsAction::Set(args) => {
                    self.manager
                        .handle_op(Op::ApplyParameters {
                            parameters: RunParameters::from(args),
                        })
                        .await;
                }
            },
            Command::Run { node_id } => {
                self.manager.handle_op(Op::RunNode { node_id: node_id.clone() }).await;
                self.wait_for_runs().await;
                let status = self.engine().status(&node_id).await;
                println!("{} is {}", node_id.bold(), paint_status(status));
                if status != NodeStatus::Completed {
                    return self.finish(true).await;
                }
            }
            Command::RunAll => {
                self.manager.handle_op(Op::RunAll).await;
                self.wait_for_runs().await;
            }
            Command::Stop { node_id } => {
                self.manager.handle_op(Op::StopNode { node_id }).await;
            }
            Command::Reset { node_id } => {
                self.manager.handle_op(Op::ResetNode { node_id }).await;
            }
            Command::ResetAll => {
                self.manager.handle_op(Op::ResetAll).await;
            }
            Command::Resume => {
                let resumed = self.manager.resume_pending().await;
                if resumed.is_empty() {
                    println!("No runs to resume");
                } else {
                    println!("Resuming {}", resumed.join(", "));
                }
                self.wait_for_runs().await;
            }
            Command::Health => {
                let health = self.engine().health().await?;
                println!("Backend is {}", health.status.green());
            }
            Command::Init { .. } | Command::Graph { .. } => {}
        }
        self.finish(false).await
    }

    /// Wait for background runs, or abandon them on Ctrl-C. Abandoned runs
    /// stay pending in the state file.
    async fn wait_for_runs(&self) {
        tokio::select! {
            _ = self.manager.wait_idle() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, abandoning in-flight polls");
                eprintln!("Interrupted. Runs continue on the backend; `control-room resume` follows them again.");
                self.manager.handle_op(Op::Shutdown).await;
            }
        }
    }

    /// Close the event channel, drain the printer and turn reported errors
    /// into a failing exit status.
    async fn finish(self, failed: bool) -> Result<()> {
        let Self { manager, printer } = self;
        drop(manager);
        let errors = printer.await?;
        if errors > 0 {
            bail!("{errors} error(s) reported");
        }
        if failed {
            bail!("node did not complete");
        }
        Ok(())
    }
}
