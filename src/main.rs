use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pagefig::config::{ConfigPaths, default_user_config_path};
use pagefig::error::AppResult;
use pagefig::{Aspect, FigsizeParams, JsonBackend, PageBoxConfig, SubplotsArgs, subplots};

#[derive(Debug, Parser)]
#[command(name = "pagefig", version, about = "Size plot figures for a typeset page box")]
struct Cli {
    /// Directory to start the project manifest search from.
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Show the page box, or persist a new one with --set.
    Size {
        #[arg(long, num_args = 2, value_names = ["WIDTH_PT", "HEIGHT_PT"])]
        set: Option<Vec<f64>>,
    },
    /// Print the figure size in inches as "WIDTH HEIGHT".
    Figsize(GridArgs),
    /// Print the resolved subplots request as JSON.
    Subplots(GridArgs),
}

#[derive(Debug, Args)]
struct GridArgs {
    #[arg(long, default_value_t = 1)]
    nrows: usize,
    #[arg(long, default_value_t = 1)]
    ncols: usize,
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
    /// A number, "equal" or "auto".
    #[arg(long)]
    aspect: Option<Aspect>,
    #[arg(long, value_delimiter = ',')]
    width_ratios: Option<Vec<f64>>,
    #[arg(long, value_delimiter = ',')]
    height_ratios: Option<Vec<f64>>,
    /// Use this page box instead of the configured one.
    #[arg(long, num_args = 2, value_names = ["WIDTH_PT", "HEIGHT_PT"])]
    page: Option<Vec<f64>>,
}

impl GridArgs {
    fn figsize_params(&self) -> FigsizeParams {
        FigsizeParams {
            nrows: self.nrows,
            ncols: self.ncols,
            scale: self.scale,
            aspect: self.aspect.unwrap_or_default(),
            height_ratios: self.height_ratios.clone(),
            width_ratios: self.width_ratios.clone(),
        }
    }

    fn subplots_args(&self) -> SubplotsArgs {
        let mut args = SubplotsArgs::new()
            .nrows(self.nrows)
            .ncols(self.ncols)
            .scale(self.scale);
        if let Some(aspect) = self.aspect {
            args = args.aspect(aspect);
        }
        if let Some(ratios) = &self.width_ratios {
            args = args.width_ratios(ratios.clone());
        }
        if let Some(ratios) = &self.height_ratios {
            args = args.height_ratios(ratios.clone());
        }
        args
    }
}

fn main() {
    init_tracing();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", env!("CARGO_PKG_NAME")))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> AppResult<()> {
    let paths = match cli.project_dir {
        Some(dir) => ConfigPaths::new(dir, default_user_config_path()),
        None => ConfigPaths::discover()?,
    };
    let mut page = PageBoxConfig::load_from(paths)?;

    match cli.command {
        CliCommand::Size { set } => {
            if let Some((width, height)) = pair(set.as_deref()) {
                page.set(width, height)?;
            }
            println!("{page} ({})", page.origin());
            Ok(())
        }
        CliCommand::Figsize(grid) => {
            let params = grid.figsize_params();
            let size = with_page(&mut page, pair(grid.page.as_deref()), |page| {
                page.figsize(&params)
            })?;
            println!("{size}");
            Ok(())
        }
        CliCommand::Subplots(grid) => {
            let args = grid.subplots_args();
            let mut backend = JsonBackend::new(io::stdout().lock());
            with_page(&mut page, pair(grid.page.as_deref()), |page| {
                subplots(page, &mut backend, args)
            })
        }
    }
}

fn pair(values: Option<&[f64]>) -> Option<(f64, f64)> {
    match values? {
        [width, height] => Some((*width, *height)),
        _ => None,
    }
}

fn with_page<R>(
    page: &mut PageBoxConfig,
    dims: Option<(f64, f64)>,
    f: impl FnOnce(&PageBoxConfig) -> AppResult<R>,
) -> AppResult<R> {
    match dims {
        Some((width, height)) => page.with_context(width, height, |scoped| f(scoped))?,
        None => f(page),
    }
}
