use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use libcommon::Mapping;
use libforge::DataCore;
use libp4k::{NeverCancel, P4kArchive, DEFAULT_KEY};
use log::LevelFilter;

trait CliCommand {
    fn run(&self) -> Result<()>;
}

fn parse_key(hex: &str) -> Result<[u8; 16]> {
    let hex = hex.trim();
    if hex.len() != 32 {
        return Err(anyhow!("AES key must be exactly 32 hex characters (16 bytes), got {}", hex.len()));
    }
    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .with_context(|| format!("invalid hex byte at position {i}"))?;
    }
    Ok(key)
}

#[derive(Parser)]
struct ForgeDump {
    /// Path to a DataCore Binary (.dcb) file.
    path: PathBuf,

    /// Only dump records whose filename matches this glob.
    #[arg(long)]
    filter: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Abort on the first record that fails to decode, instead of logging
    /// it and continuing with the rest of the table.
    #[arg(long)]
    abort_on_error: bool,
}

impl CliCommand for ForgeDump {
    fn run(&self) -> Result<()> {
        let mapping = Mapping::open(&self.path)?;
        let dcb = DataCore::load(mapping.view())?;

        let wanted: Option<Vec<_>> = self
            .filter
            .as_deref()
            .map(|pattern| dcb.records().find_by_filename(pattern).into_iter().map(|r| r.id).collect());

        let mut failures = 0usize;
        for (record, result) in dcb.iter_record_dumps() {
            if let Some(ids) = &wanted {
                if !ids.contains(&record.id) {
                    continue;
                }
            }
            match result {
                Ok(value) => {
                    let rendered = if self.pretty {
                        serde_json::to_string_pretty(&value)?
                    } else {
                        serde_json::to_string(&value)?
                    };
                    println!("{}: {rendered}", record.display_name());
                }
                Err(err) => {
                    failures += 1;
                    eprintln!("failed to dump {}: {err}", record.display_name());
                    if self.abort_on_error {
                        return Err(err.into());
                    }
                }
            }
        }

        if failures > 0 {
            eprintln!("{failures} record(s) failed to decode");
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum ForgeCommand {
    /// Dump one or more records as JSON.
    Dump(ForgeDump),
}

#[derive(Parser)]
struct ForgeArgs {
    #[command(subcommand)]
    command: ForgeCommand,
}

#[derive(Parser)]
struct P4kSearch {
    /// Path to a P4K archive.
    archive: PathBuf,

    /// Glob pattern to match entry filenames against.
    pattern: String,

    /// AES-CBC key, as 32 hex characters. Defaults to the archive's own
    /// well-known key.
    #[arg(long)]
    key: Option<String>,
}

impl CliCommand for P4kSearch {
    fn run(&self) -> Result<()> {
        let mapping = Mapping::open(&self.archive)?;
        let key = self.key.as_deref().map(parse_key).transpose()?.unwrap_or(DEFAULT_KEY);
        let archive = P4kArchive::load(mapping.view(), key)?;
        for entry in archive.search(&self.pattern) {
            println!(
                "{} ({} bytes, {})",
                entry.name,
                entry.file_size,
                if entry.is_encrypted() { "encrypted" } else { "plain" }
            );
        }
        Ok(())
    }
}

#[derive(Parser)]
struct P4kExtract {
    /// Path to a P4K archive.
    archive: PathBuf,

    /// Glob pattern matching the entries to extract. Use `*` to extract
    /// everything.
    pattern: String,

    /// Directory entries are written under, preserving their archive path.
    dest: PathBuf,

    /// AES-CBC key, as 32 hex characters. Defaults to the archive's own
    /// well-known key.
    #[arg(long)]
    key: Option<String>,
}

impl CliCommand for P4kExtract {
    fn run(&self) -> Result<()> {
        let mapping = Mapping::open(&self.archive)?;
        let key = self.key.as_deref().map(parse_key).transpose()?.unwrap_or(DEFAULT_KEY);
        let archive = P4kArchive::load(mapping.view(), key)?;
        let summary = archive.extract_all(&self.pattern, &self.dest, &NeverCancel)?;

        for name in &summary.extracted {
            println!("extracted {name}");
        }
        for (name, reason) in &summary.skipped {
            eprintln!("skipped {name}: {reason}");
        }
        println!("{} extracted, {} skipped", summary.extracted.len(), summary.skipped.len());

        Ok(())
    }
}

#[derive(Subcommand)]
enum P4kCommand {
    /// List entries matching a glob pattern.
    Search(P4kSearch),
    /// Extract entries matching a glob pattern to disk.
    Extract(P4kExtract),
}

#[derive(Parser)]
struct P4kArgs {
    #[command(subcommand)]
    command: P4kCommand,
}

#[derive(Parser)]
struct CryxmlToXml {
    /// Path to a CryXmlB (or plain XML) file.
    path: PathBuf,

    /// Write the XML to this path instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl CliCommand for CryxmlToXml {
    fn run(&self) -> Result<()> {
        let data = fs::read(&self.path)?;
        let tree = libcryxml::parse_to_tree(&data)?;
        let xml = libcryxml::to_xml_string(&tree)?;
        match &self.output {
            Some(path) => write_output(path, &xml)?,
            None => println!("{xml}"),
        }
        Ok(())
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

#[derive(Subcommand)]
enum CryxmlCommand {
    /// Decode to plain XML.
    Toxml(CryxmlToXml),
}

#[derive(Parser)]
struct CryxmlArgs {
    #[command(subcommand)]
    command: CryxmlCommand,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with DataCore Binary files.
    Forge(ForgeArgs),
    /// Work with P4K archives.
    P4k(P4kArgs),
    /// Work with CryXmlB files.
    Cryxml(CryxmlArgs),
}

impl Commands {
    fn as_cli_command(&self) -> &dyn CliCommand {
        match self {
            Self::Forge(args) => match &args.command {
                ForgeCommand::Dump(c) => c,
            },
            Self::P4k(args) => match &args.command {
                P4kCommand::Search(c) => c,
                P4kCommand::Extract(c) => c,
            },
            Self::Cryxml(args) => match &args.command {
                CryxmlCommand::Toxml(c) => c,
            },
        }
    }
}

#[derive(Parser)]
#[command(name = "scdt", about = "Decode DataCore Binary, P4K, and CryXmlB files")]
struct Cli {
    /// Increase logging verbosity. Can be specified multiple times.
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn run() -> Result<()> {
        let cli = Self::parse();

        let log_level = match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level.as_str())).init();

        cli.command.as_cli_command().run()
    }
}

fn main() {
    let exit_code = match Cli::run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    std::process::exit(exit_code);
}
