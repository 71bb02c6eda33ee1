use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use requmancer_core::{
    Diagnostic, DiagnosticKind, DiagnosticSink, GeneratorConfig, HostEnvironment,
    RequirementsGenerator, ScanConfig, Severity, SitePackagesRegistry, DEFAULT_OUTPUT,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "requmancer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate requirements file from Python project")]
#[command(long_about = "Scans a Python project for the third-party modules it imports, \
    looks up the version of each one installed for the selected interpreter and writes \
    either a pip requirements.txt or a Poetry [tool.poetry.dependencies] table.\n\n\
    Standard library modules and relative imports are never reported. Modules with no \
    installed metadata are written without a version.")]
pub struct Args {
    /// Path to the project directory
    pub directory: PathBuf,

    /// Output file name
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Output format (pip or poetry)
    #[arg(short, long, default_value = "pip")]
    pub format: String,

    /// Interpreter queried for its standard library and installed packages
    #[arg(long, default_value = "python3")]
    pub python: String,

    /// Look up installed packages in these directories instead of the interpreter's path
    #[arg(long = "site-packages", action = clap::ArgAction::Append)]
    pub site_packages: Vec<PathBuf>,

    /// Additional ignore patterns (glob style)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Gitignore-style file listing paths to skip
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Skip virtualenvs, caches and build output
    #[arg(long)]
    pub skip_vendored: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    pub follow_links: bool,

    /// Leave out modules defined inside the project itself
    #[arg(long)]
    pub exclude_local: bool,

    /// Parallel threads (0 = auto)
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Show progress and a run summary
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Prints diagnostics to stderr as `LEVEL: message`
struct ConsoleReporter {
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    fn print(&self, diagnostic: &Diagnostic) {
        let label = match diagnostic.severity {
            Severity::Info => "INFO".green(),
            Severity::Warning => "WARNING".yellow(),
            Severity::Error => "ERROR".red().bold(),
        };
        let line = format!("{}: {}", label, diagnostic.message);
        match self.spinner {
            Some(ref pb) => pb.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl DiagnosticSink for ConsoleReporter {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if self.quiet && diagnostic.severity != Severity::Error {
            return;
        }
        self.print(&diagnostic);
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Show progress if verbose
    let spinner = if args.verbose {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Probing {}...", args.python));
        Some(pb)
    } else {
        None
    };

    let mut reporter = ConsoleReporter {
        quiet: args.quiet,
        spinner: spinner.clone(),
    };

    let host = match HostEnvironment::probe(&args.python) {
        Ok(host) => host,
        Err(err) => {
            reporter.emit(Diagnostic::warning(
                DiagnosticKind::ProbeFailed,
                format!("{}; using the built-in standard library list", err),
            ));
            HostEnvironment::fallback()
        }
    };

    let search_path = if args.site_packages.is_empty() {
        host.search_path.clone()
    } else {
        args.site_packages.clone()
    };
    let registry = SitePackagesRegistry::from_dirs(&search_path);

    if let Some(ref pb) = spinner {
        pb.set_message(format!(
            "Scanning {} ({} installed packages)...",
            args.directory.display(),
            registry.len()
        ));
    }

    let scan = ScanConfig::new(args.directory.clone())
        .with_ignore_patterns(args.ignore.clone())
        .with_skip_vendored(args.skip_vendored)
        .with_follow_links(args.follow_links)
        .with_exclude_local(args.exclude_local)
        .with_threads(args.threads);
    let scan = match args.ignore_file {
        Some(ref path) => scan.with_ignore_file(path.clone()),
        None => scan,
    };

    let config = GeneratorConfig::new(scan)
        .with_output(args.output.clone())
        .with_format(args.format.clone());

    let report = RequirementsGenerator::new(config, &host.stdlib, &registry).generate(&mut reporter);

    if let Some(ref pb) = spinner {
        match report {
            Some(ref report) => pb.finish_with_message(format!(
                "Scanned {} files ({} skipped), {} dependencies ({} unresolved) in {}ms",
                report.files_scanned,
                report.files_skipped,
                report.dependencies,
                report.unresolved,
                report.duration_ms
            )),
            None => pb.finish_and_clear(),
        }
    }

    Ok(if report.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
