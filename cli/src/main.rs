use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use jtagdb::{Config, Database, Injector, Outcome};
use simple_error::bail;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "jtagdb", about = "Registers BSDL files into the UrJTAG part database")]
struct Args {
    /// Verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Registers every file in a directory.
    Inject {
        src: PathBuf,
        dst: Option<PathBuf>,
        /// Manufacturer id → name table.
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Skips the external syntax check.
        #[arg(long)]
        no_validate: bool,
    },
    /// Shows where a single file would go, without touching the database.
    Lookup {
        file: PathBuf,
        dst: Option<PathBuf>,
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// Removes index records whose folder or part file is gone.
    Clean { dst: Option<PathBuf> },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, dst: Option<PathBuf>) -> Result<Config, Box<dyn Error>> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dst) = dst {
        config.db_root = dst;
    }
    Ok(config)
}

fn report(path: &Path, outcome: &Outcome) {
    let path = path.display();
    match outcome {
        Outcome::Added {
            record,
            artifact,
            steppings,
        } => println!(
            "{path}: added {n} stepping(s) to {m}/{p} [{s}] -> {a}",
            n = steppings.len(),
            m = record.manufacturer.folder,
            p = record.part.folder,
            s = steppings.join(" "),
            a = artifact.display(),
        ),
        Outcome::AlreadyPresent { record } => println!(
            "{path}: already present as {m}/{p}",
            m = record.manufacturer.folder,
            p = record.part.folder,
        ),
        Outcome::Skipped { stage, reason } => println!("{path}: skipped while {stage}: {reason}"),
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);
    match args.command {
        Command::Inject {
            src,
            dst,
            reference,
            no_validate,
        } => {
            if !src.is_dir() {
                bail!("{}: not a readable directory", src.display());
            }
            let mut config = load_config(args.config.as_deref(), dst)?;
            if let Some(reference) = reference {
                config.reference_table = reference;
            }
            if no_validate {
                config.validate = false;
            }
            info!(
                root = %config.db_root.display(),
                reference = %config.reference_table.display(),
                validate = config.validate,
                "injecting"
            );
            let injector = Injector::new(config);
            let summary = injector.inject_dir(&src, report)?;
            println!(
                "{n} file(s): {a} added ({s} stepping(s)), {p} already present, {k} skipped",
                n = summary.processed,
                a = summary.added,
                s = summary.steppings,
                p = summary.present,
                k = summary.skipped,
            );
        }
        Command::Lookup {
            file,
            dst,
            reference,
        } => {
            let mut config = load_config(args.config.as_deref(), dst)?;
            if let Some(reference) = reference {
                config.reference_table = reference;
            }
            let injector = Injector::new(config);
            let (record, steppings) = injector.lookup_file(&file)?;
            let known = |existing: bool| if existing { "database" } else { "new" };
            println!("IDCODE {}", record.idcode);
            println!(
                "MANUFACTURER {c} {f} \"{d}\" ({k})",
                c = record.idcode.manufacturer,
                f = record.manufacturer.folder,
                d = record.manufacturer.display,
                k = known(record.manufacturer.existing),
            );
            println!(
                "PART {c} {f} \"{d}\" ({k})",
                c = record.idcode.part,
                f = record.part.folder,
                d = record.part.display,
                k = known(record.part.existing),
            );
            println!("STEPPINGS {}", steppings.join(" "));
        }
        Command::Clean { dst } => {
            let config = load_config(args.config.as_deref(), dst)?;
            let removed = Database::new(&config.db_root).clean_all()?;
            println!("removed {removed} dangling record(s)");
        }
    }
    Ok(())
}
