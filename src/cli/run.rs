use std::{
    env, fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};
use colored::Colorize;
use glob::Pattern;
use walkdir::WalkDir;

use super::args::{Arguments, BuildCommand, Command};
use super::exit_status::ExitStatus;
use crate::analysis::{SourceFile, normalize_path};
use crate::config::{CONFIG_FILE_NAME, default_config_json, find_config_file, load_config};
use crate::graph::DependencyGraph;

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Build(cmd)) => build(cmd),
        Some(Command::Init) => {
            init()?;
            Ok(ExitStatus::Success)
        }
        None => anyhow::bail!("No command provided. Use --help to see available commands."),
    }
}

fn build(cmd: BuildCommand) -> Result<ExitStatus> {
    let config_path = match cmd.config {
        Some(path) => path,
        None => find_config_file(&env::current_dir()?)
            .with_context(|| format!("No {CONFIG_FILE_NAME} found. Run 'ngbuild init' first."))?,
    };
    let mut config = load_config(&config_path)?;
    config.verbose |= cmd.verbose || cmd.debug;
    config.debug |= cmd.debug;

    let source_root = config.source_root.clone();
    let verbose = config.verbose;
    let files = scan_files(&source_root, &config.includes, verbose);
    if verbose {
        eprintln!("Scanned {} file(s)", files.len().to_string().magenta());
    }

    let mut graph = DependencyGraph::new(config);
    for path in files {
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                eprintln!(
                    "{} skipping unreadable file {}: {}",
                    "warning:".bold().yellow(),
                    path.display(),
                    err
                );
                continue;
            }
        };
        let mtime = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let relative = normalize_path(&path.to_string_lossy());

        if let Err(err) = graph.add(SourceFile::new(relative, contents, mtime)) {
            eprintln!("{} {}", "error:".bold().red(), err);
            return Ok(ExitStatus::Failure);
        }
    }

    let output = match graph.build() {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{} {}", "error:".bold().red(), err);
            return Ok(ExitStatus::Failure);
        }
    };

    match &cmd.bundle {
        Some(bundle_path) => {
            let mut bundle = String::new();
            for file in &output {
                bundle.push_str(&file.contents);
                if !file.contents.ends_with('\n') {
                    bundle.push('\n');
                }
            }
            fs::write(bundle_path, bundle)
                .with_context(|| format!("Failed to write bundle: {}", bundle_path.display()))?;
            eprintln!(
                "{} wrote {} file(s) to {}",
                "✓".green(),
                output.len(),
                bundle_path.display()
            );
        }
        None => {
            for file in &output {
                println!("{}", file.path);
            }
        }
    }

    Ok(ExitStatus::Success)
}

/// Collect candidate files under `source_root` matching the include
/// patterns. Relative patterns match anywhere below the root.
fn scan_files(source_root: &str, includes: &[String], verbose: bool) -> Vec<PathBuf> {
    let mut patterns = Vec::new();
    for include in includes {
        match (
            Pattern::new(include),
            Pattern::new(&format!("**/{include}")),
        ) {
            (Ok(exact), Ok(anywhere)) => patterns.push((exact, anywhere)),
            (Err(err), _) | (_, Err(err)) => {
                if verbose {
                    eprintln!(
                        "{} Invalid include pattern '{}': {}",
                        "warning:".bold().yellow(),
                        include,
                        err
                    );
                }
            }
        }
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = normalize_path(&entry.path().to_string_lossy());
        if patterns
            .iter()
            .any(|(exact, anywhere)| exact.matches(&relative) || anywhere.matches(&relative))
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files
}

fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILE_NAME);
    if config_path.exists() {
        anyhow::bail!("{} already exists", CONFIG_FILE_NAME);
    }

    fs::write(config_path, default_config_json()?)?;
    Ok(())
}
