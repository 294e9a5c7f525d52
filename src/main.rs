//! fleet-labeler CLI
//!
//! Command line tool for keeping labels consistent across repositories

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::{Color, Colorize};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use url::Url;

use fleet_labeler::{
    config::{DEFAULT_LABELS_FILE, DEFAULT_TEMPLATES_DIR},
    modules::DEFAULT_MODULES_URL,
    sync::SyncOperation,
    Error, GitHubClient, LabelConfig, LabelSyncer, RateLimitInfo, Result, SupportedModuleFilter,
    SupportedModuleLoader, SyncProgress, SyncResult, TemplateLoader,
};

/// Environment variable holding the GitHub token
const ACCESS_TOKEN_ENV: &str = "GITHUB_ACCESS_TOKEN";

/// fleet-labeler CLI
#[derive(Parser)]
#[command(
    name = "fleet-labeler",
    version,
    about = "Keep GitHub issue labels consistent across a fleet of repositories",
    long_about = "Renames, recolors and removes GitHub issue labels on every repository of a \
    published module list, and reports GitHub API rate limit status."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub access token (defaults to GITHUB_ACCESS_TOKEN)
    #[arg(short = 't', long, global = true)]
    access_token: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync GitHub labels to all supported modules
    #[command(alias = "sync:labels")]
    SyncLabels {
        /// Directory holding the label template
        #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
        templates_dir: PathBuf,

        /// Label template file name
        #[arg(long, default_value = DEFAULT_LABELS_FILE)]
        labels_file: String,

        /// URL of the module list
        #[arg(long, default_value = DEFAULT_MODULES_URL)]
        modules_url: Url,

        /// Process every listed module, not only supported ones
        #[arg(long)]
        all_modules: bool,

        /// Skip confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show the current status of the GitHub API rate limit
    #[command(alias = "github:ratelimit")]
    RateLimit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::SyncLabels {
            templates_dir,
            labels_file,
            modules_url,
            all_modules,
            yes,
        } => {
            let token = get_access_token(cli.access_token)?;

            let mut module_loader = SupportedModuleLoader::new(reqwest::Client::new())?
                .with_data_url(modules_url);
            if !all_modules {
                module_loader = module_loader.with_filter(Box::new(SupportedModuleFilter));
            }
            let template_loader = TemplateLoader::new(templates_dir);

            let options = SyncOptions {
                token,
                labels_file,
                assume_yes: yes,
            };
            run_sync_labels(&module_loader, &template_loader, options).await
        }

        Commands::RateLimit => {
            let token = get_access_token(cli.access_token)?;
            run_rate_limit(&token).await
        }
    }
}

/// Install the tracing subscriber
///
/// The interactive report goes to stdout, so logs stay on stderr and are
/// quiet unless asked for.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "fleet_labeler=debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct SyncOptions {
    token: String,
    labels_file: String,
    assume_yes: bool,
}

/// Execute the sync-labels command
async fn run_sync_labels(
    module_loader: &SupportedModuleLoader,
    template_loader: &TemplateLoader,
    options: SyncOptions,
) -> anyhow::Result<()> {
    println!("{}", "Loading supported modules".bold());
    let modules = module_loader.get_modules().await;
    if modules.is_empty() {
        println!(
            "{} No modules loaded from {}",
            "!".yellow(),
            module_loader.data_url().as_str().cyan()
        );
        return Ok(());
    }
    display_modules(&modules);
    if !confirm("Continue with sync?", options.assume_yes)? {
        return Ok(());
    }

    let label_config = template_loader
        .load_label_config(&options.labels_file)
        .with_context(|| {
            format!(
                "loading {} from {}",
                options.labels_file,
                template_loader.templates_dir().display()
            )
        })?;
    display_label_config(&label_config);
    if !confirm("Continue with sync?", options.assume_yes)? {
        return Ok(());
    }

    let client = GitHubClient::new(&options.token)?;
    let progress = CliProgress::new(label_config.operation_count());
    let tally = LabelSyncer::new(&client, &label_config)
        .sync_all(modules.values(), &progress)
        .await;

    println!(
        "\n{} Finished! {}/{} succeeded.",
        "✓".green(),
        tally.success.to_string().green(),
        tally.total()
    );

    if tally.error > 0 {
        eprintln!(
            "{} {} repositories failed",
            "✗".red(),
            tally.error.to_string().red()
        );
        std::process::exit(1);
    }

    Ok(())
}

/// Execute the rate-limit command
async fn run_rate_limit(access_token: &str) -> anyhow::Result<()> {
    let client = GitHubClient::new(access_token)?;
    let info = client
        .get_rate_limit()
        .await
        .context("Failed to get rate limiting data!")?;

    for line in format_rate_limit(&info, Utc::now()) {
        println!("{}", line);
    }

    Ok(())
}

/// Red once the budget is spent, green otherwise
fn remaining_color(info: &RateLimitInfo) -> Color {
    if info.is_exhausted() {
        Color::Red
    } else {
        Color::Green
    }
}

/// Render the rate limit report
fn format_rate_limit(info: &RateLimitInfo, now: DateTime<Utc>) -> Vec<String> {
    let remaining = info.remaining.to_string().color(remaining_color(info));

    vec![
        format!("Limit: {}", info.limit.to_string().yellow()),
        format!("Remaining: {}", remaining),
        format!(
            "Resets in: {}",
            format!("{} mins", info.minutes_until_reset(now)).yellow()
        ),
    ]
}

/// Show the repositories about to be processed
fn display_modules(modules: &BTreeMap<String, String>) {
    println!("{:<50} {:<50}", "Composer package".cyan(), "GitHub repo".cyan());
    println!("{}", "─".repeat(100));
    for (composer, github) in modules {
        println!("{:<50} {:<50}", composer, github);
    }
    println!();
}

/// Show the labels about to be pushed, renamed and deleted
fn display_label_config(config: &LabelConfig) {
    println!("The following labels will be pushed to each repository:");
    println!("{:<40} {:<10}", "Label".cyan(), "Hex code".cyan());
    println!("{}", "─".repeat(50));
    for (label, color) in &config.default_labels {
        println!("{:<40} {:<10}", label, color);
    }
    println!();

    println!("The following labels will be renamed:");
    for (old, new) in &config.rename_labels {
        println!(" * {} => {}", old.yellow(), new.green());
    }
    println!();

    println!("The following labels will be deleted:");
    for label in &config.remove_labels {
        println!(" * {}", label.red());
    }
    println!();
}

/// Ask the operator to go on
fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    let proceed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact()?;

    if !proceed {
        println!("{}", "Sync cancelled.".yellow());
    }
    Ok(proceed)
}

/// Per-repository progress bar and status lines
struct CliProgress {
    operations: u64,
    bar: RefCell<Option<ProgressBar>>,
}

impl CliProgress {
    fn new(operations: usize) -> Self {
        Self {
            operations: operations as u64,
            bar: RefCell::new(None),
        }
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.borrow_mut().take()
    }
}

impl SyncProgress for CliProgress {
    fn repository_started(&self, index: usize, total: usize, slug: &str) {
        println!("{}/{}: Processing {}...", index, total, slug.yellow());

        let bar = ProgressBar::new(self.operations);
        bar.set_style(
            ProgressStyle::with_template("  [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        *self.bar.borrow_mut() = Some(bar);
    }

    fn step(&self) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            bar.inc(1);
        }
    }

    fn repository_finished(&self, _slug: &str, result: &SyncResult) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        for line in describe_sync_result(result) {
            println!("  {}", line);
        }
        for error in &result.errors {
            eprintln!("  {} {}", "✗".red(), error.red());
        }
    }

    fn repository_failed(&self, slug: &str, error: &Error) {
        if let Some(bar) = self.take_bar() {
            bar.abandon();
        }
        eprintln!(
            "  {} Error updating {}: {}",
            "✗".red(),
            slug.cyan(),
            error.to_string().red()
        );
    }
}

/// One-line summaries of what changed on a repository
fn describe_sync_result(result: &SyncResult) -> Vec<String> {
    if !result.has_changes() {
        return vec![format!("{} No changes required", "✓".green())];
    }

    let mut lines = vec![format!(
        "{} created {}, updated {}, renamed {}, deleted {}",
        "✓".green(),
        result.created.to_string().green(),
        result.updated.to_string().yellow(),
        result.renamed.to_string().blue(),
        result.deleted.to_string().red()
    )];

    for operation in &result.operations {
        match operation {
            SyncOperation::Rename {
                current_name,
                new_name,
            } => lines.push(format!(
                "  renamed {} -> {}",
                current_name.cyan(),
                new_name.cyan()
            )),
            SyncOperation::Create { name, color } => {
                lines.push(format!("  created {} (#{})", name.cyan(), color))
            }
            SyncOperation::Delete { name } => lines.push(format!("  deleted {}", name.red())),
            SyncOperation::Update { .. } | SyncOperation::Skipped { .. } => {}
        }
    }

    lines
}

/// Get access token
fn get_access_token(arg_token: Option<String>) -> Result<String> {
    arg_token
        .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
        .filter(|token| !token.trim().is_empty())
        .ok_or(Error::MissingAccessToken)
}
