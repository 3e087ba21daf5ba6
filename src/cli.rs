use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use nu_plugin_folders::config::{self, Config};
use nu_plugin_folders::ops;
use nu_plugin_folders::plan::ModelContext;

#[derive(Parser)]
#[command(
    name = "folders",
    version,
    about = "Sort a directory of documents into topic-named folders"
)]
struct Cli {
    /// Path to a JSON config file (default: $FOLDERS_CONFIG, then
    /// $XDG_CONFIG_HOME/folders/config.json, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone, Copy)]
struct PlanArgs {
    /// Similarity threshold in percent
    #[arg(short, long)]
    threshold: Option<u32>,
    /// Words read from each file
    #[arg(short, long)]
    reading_limit: Option<usize>,
    /// Words per folder name
    #[arg(short = 'w', long)]
    folder_words: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan folders, show the tree, and move files after confirmation
    Organize {
        /// Directory to organize
        dir: String,
        #[command(flatten)]
        args: PlanArgs,
        /// Apply without asking
        #[arg(short, long)]
        yes: bool,
        /// Print the plan as JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Flatten and plan a directory without sorting it; prints the tree
    Plan {
        /// Directory to plan
        dir: String,
        #[command(flatten)]
        args: PlanArgs,
        /// Print `{root, tree, plan}` as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a JSON plan (from `folders plan --json`) read from a file or stdin
    Apply {
        /// Directory the plan was built for (default: the plan's root)
        dir: Option<String>,
        /// Plan file; stdin when omitted
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },
    /// Bucket filenames by extension category
    Misc {
        /// Filenames to bucket
        files: Vec<String>,
    },
    /// Group JSON records from stdin by text similarity
    Group {
        /// JSON field containing text
        #[arg(short, long, default_value = "content")]
        field: String,
        /// JSON field naming each record
        #[arg(short, long, default_value = "name")]
        name_field: String,
        /// Similarity threshold in percent
        #[arg(short, long)]
        threshold: Option<u32>,
    },
    /// Print the effective configuration
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Organize {
            dir,
            args,
            yes,
            json,
        } => cmd_organize(&dir, with_args(config, args), yes, json),
        Commands::Plan { dir, args, json } => cmd_plan(&dir, with_args(config, args), json),
        Commands::Apply { dir, plan } => cmd_apply(dir.as_deref(), plan.as_deref()),
        Commands::Misc { files } => cmd_misc(&files, &config),
        Commands::Group {
            field,
            name_field,
            threshold,
        } => cmd_group(&field, &name_field, threshold, &config),
        Commands::Config { default } => cmd_config(&config, default),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("warn,nu_plugin_folders={level}"))),
        )
        .with_writer(io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => config::load_config(path).unwrap_or_else(|e| fail(e)),
        None => config::default_config(),
    }
}

fn with_args(mut config: Config, args: PlanArgs) -> Config {
    if let Some(t) = args.threshold {
        config.parameters.similarity_threshold = t;
    }
    if let Some(r) = args.reading_limit {
        config.parameters.reading_word_limit = r;
    }
    if let Some(w) = args.folder_words {
        config.parameters.folder_word_limit = w;
    }
    if let Err(e) = config.parameters.validate() {
        fail(e);
    }
    config
}

fn load_models(config: &Config) -> ModelContext {
    ModelContext::from_settings(config.model.clone()).unwrap_or_else(|e| fail(e))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(e),
    }
}

fn build(dir: &str, config: &Config) -> Value {
    let models = load_models(config);
    ops::op_plan(dir, config, &models).unwrap_or_else(|e| fail(e))
}

fn cmd_plan(dir: &str, config: Config, json: bool) {
    let result = build(dir, &config);
    if json {
        print_json(&result);
    } else {
        print!("{}", ops::get_text(&result, "tree"));
    }
}

fn cmd_organize(dir: &str, config: Config, yes: bool, json: bool) {
    let result = build(dir, &config);
    if json {
        print_json(&result["plan"]);
    } else {
        println!("Organized Folder:");
        print!("{}", ops::get_text(&result, "tree"));
    }

    if !yes && !confirm("Do you want to continue? [y/n]: ") {
        println!("Aborted, no files were moved.");
        return;
    }

    let report = ops::op_apply(dir, &result).unwrap_or_else(|e| fail(e));
    println!(
        "Moved {} files into {} new folders.",
        report["moved"], report["created_dirs"]
    );
    if let Some(conflicts) = report["conflicts"].as_array().filter(|c| !c.is_empty()) {
        eprintln!("{} files left in place because the destination exists.", conflicts.len());
    }
}

/// Ask on stdout, read a line from stdin. An empty answer means yes.
fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

fn cmd_apply(dir: Option<&str>, plan_file: Option<&Path>) {
    let raw = match plan_file {
        Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| fail(format!("{}: {e}", path.display()))),
        None => {
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                fail(format!("failed to read stdin: {e}"));
            }
            buf
        }
    };
    let plan: Value = serde_json::from_str(&raw).unwrap_or_else(|e| fail(format!("invalid JSON plan: {e}")));

    let root = match dir {
        Some(d) => d.to_string(),
        None => match plan.get("root").and_then(|v| v.as_str()) {
            Some(r) => r.to_string(),
            None => fail("No directory given and the plan has no 'root'"),
        },
    };
    print_json(&ops::op_apply(&root, &plan).unwrap_or_else(|e| fail(e)));
}

fn cmd_misc(files: &[String], config: &Config) {
    print_json(&ops::op_classify_misc(files, &config.extension_map));
}

fn cmd_group(field: &str, name_field: &str, threshold: Option<u32>, config: &Config) {
    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        fail(format!("failed to read stdin: {e}"));
    }
    let rows = match serde_json::from_str::<Value>(&buf).unwrap_or_else(|e| fail(format!("invalid JSON on stdin: {e}"))) {
        Value::Array(arr) => arr,
        single => vec![single],
    };

    let models = load_models(config);
    let threshold = threshold.unwrap_or(config.parameters.similarity_threshold);
    let groups = ops::op_group(&rows, name_field, field, threshold, config, &models).unwrap_or_else(|e| fail(e));
    print_json(&groups);
}

fn cmd_config(config: &Config, default: bool) {
    if default {
        print!("{}", config::embedded_default_json());
    } else {
        print_json(&ops::op_config(config));
    }
}
