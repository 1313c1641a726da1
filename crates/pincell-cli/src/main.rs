//! pincell command-line driver.
//!
//! Loads an `.ipynb` notebook into an in-memory host, mirrors one cell, plays
//! a short session, and prints the resulting mirror state as JSON.
//!
//! Usage:
//!   pincell cells notebook.ipynb
//!   pincell mirror notebook.ipynb --cell 2
//!   pincell mirror notebook.ipynb --cell 2 --run-others --float --config mirror.ron
//!   RUST_LOG=pincell=debug pincell mirror notebook.ipynb --cell 0 --tree

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use pincell::{MirrorConfig, PanelManager, ToolbarAction, UiEvent};
use pincell_host::{DocumentHost, MemoryNotebook, RunOrigin};

/// Live, dockable mirrors of notebook cells.
#[derive(Parser, Debug)]
#[command(name = "pincell")]
#[command(about = "Mirror a notebook cell and print the mirror state")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the notebook's cells
    Cells {
        /// Notebook file (.ipynb JSON)
        notebook: PathBuf,
    },
    /// Mirror one cell and replay a session against it
    Mirror {
        /// Notebook file (.ipynb JSON)
        notebook: PathBuf,

        /// Index of the cell to mirror
        #[arg(long)]
        cell: usize,

        /// Run every other code cell, so an auto-running mirror re-runs once
        #[arg(long)]
        run_others: bool,

        /// Float the mirror instead of leaving it docked
        #[arg(long)]
        float: bool,

        /// Collapse the mirror's input region
        #[arg(long)]
        collapse: bool,

        /// Enable auto-run regardless of config
        #[arg(long)]
        auto_run: bool,

        /// RON mirror config
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also print the mirror's render tree
        #[arg(long)]
        tree: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Cells { notebook } => list_cells(&notebook),
        Command::Mirror {
            notebook,
            cell,
            run_others,
            float,
            collapse,
            auto_run,
            config,
            tree,
        } => {
            let mut config = match config {
                Some(path) => MirrorConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => MirrorConfig::default(),
            };
            config.auto_run |= auto_run;
            let opts = MirrorOpts {
                cell,
                run_others,
                float,
                collapse,
                tree,
            };
            mirror(&notebook, config, opts).await
        }
    }
}

fn load_notebook(path: &Path, capacity: usize) -> Result<MemoryNotebook> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading notebook {}", path.display()))?;
    let nb = MemoryNotebook::from_json(&json, capacity)
        .with_context(|| format!("parsing notebook {}", path.display()))?;
    tracing::info!(path = %path.display(), cells = nb.len(), "notebook loaded");
    Ok(nb)
}

fn list_cells(path: &Path) -> Result<()> {
    let nb = load_notebook(path, pincell_host::DEFAULT_FLOW_CAPACITY)?;
    for (index, id) in nb.cell_ids().into_iter().enumerate() {
        let cell = nb.cell(id)?;
        let first_line = cell.source.lines().next().unwrap_or_default();
        println!("{index:>3}  {:<8} {:>5}  {first_line}", cell.kind, cell.execution_count.to_string());
    }
    Ok(())
}

struct MirrorOpts {
    cell: usize,
    run_others: bool,
    float: bool,
    collapse: bool,
    tree: bool,
}

async fn mirror(path: &Path, config: MirrorConfig, opts: MirrorOpts) -> Result<()> {
    let nb = load_notebook(path, config.event_capacity)?;
    let ids = nb.cell_ids();
    let Some(&target) = ids.get(opts.cell) else {
        bail!("cell index {} out of range ({} cells)", opts.cell, ids.len());
    };

    let mut panel = PanelManager::new(nb, config);
    let mirror = panel.create_from_existing(target)?;

    if opts.collapse {
        panel.dispatch(mirror, ToolbarAction::CollapseInput, &mut UiEvent::new())?;
    }
    if opts.float {
        panel.dispatch(mirror, ToolbarAction::Float, &mut UiEvent::new())?;
    }
    if opts.run_others {
        for &id in ids.iter().filter(|&&id| id != target) {
            panel.host_mut().run_cell(id, RunOrigin::User)?;
        }
    }

    drive(&mut panel).await?;

    let summaries = panel.summaries()?;
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    if opts.tree {
        if let Some(view) = panel.view(mirror) {
            eprint!("{}", view.tree().outline());
        }
    }
    tracing::info!(panel = ?panel.panel_state(), "done");
    Ok(())
}

/// Complete queued runs and fire auto-runs until the session goes quiet.
async fn drive(panel: &mut PanelManager<MemoryNotebook>) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_millis(10));
    loop {
        interval.tick().await;
        let now = Instant::now();
        panel.pump(now)?;
        let completed = panel.host_mut().complete_all();
        panel.pump(now)?;
        let fired = panel.tick(now)?;
        if !fired.is_empty() {
            tracing::info!(count = fired.len(), "auto-run fired");
        }

        let idle = completed == 0
            && fired.is_empty()
            && panel.host().pending_runs() == 0
            && panel.next_deadline().is_none();
        if idle {
            return Ok(());
        }
    }
}
