//! rhcl CLI - evaluate configuration expressions from the command line
//!
//! # Usage
//!
//! ```text
//! rhcl eval '<expr>'                     Evaluate and output as JSON
//! rhcl eval '<expr>' -f yaml             Evaluate and output as YAML
//! rhcl eval '<expr>' --var name='"x"'    Bind a variable from JSON
//! rhcl parse '<expr>'                    Show the AST (for debugging)
//! rhcl functions                         List the function catalog
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rhcl_parser::parse_expression;
use rhcl_runtime::{Diagnostics, Scope, ScopeOptions, Type, Value};
use rhcl_stdlib::stdlib_registry;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod vars;

#[derive(Parser)]
#[command(name = "rhcl")]
#[command(author, version, about = "Configuration expression evaluator", long_about = None)]
struct Cli {
    /// Log evaluation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        /// The expression to evaluate
        expression: String,

        /// Directory that relative file paths resolve against
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,

        /// Bind a variable, as NAME=JSON
        #[arg(long = "var", value_name = "NAME=JSON")]
        vars: Vec<String>,

        /// JSON or YAML file with variable bindings
        #[arg(long)]
        vars_file: Option<PathBuf>,

        /// Type the result must convert to, e.g. `list(string)`
        #[arg(long = "type", default_value = "any")]
        ty: String,

        /// Skip functions that touch the filesystem
        #[arg(long)]
        pure: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Parse an expression and show the AST (for debugging)
    Parse {
        /// The expression to parse
        expression: String,
    },

    /// List the available functions with their signatures
    Functions,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Hcl,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Returns `false` when evaluation produced error diagnostics
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Eval {
            expression,
            base_dir,
            vars,
            vars_file,
            ty,
            pure,
            format,
        } => {
            let want: Type = ty.parse().map_err(|e| format!("invalid --type: {}", e))?;
            let data = vars::load(vars_file.as_deref(), &vars)?;
            debug!(variables = data.len(), ty = %want, "evaluating expression");
            let registry = stdlib_registry()?;
            let options = ScopeOptions::new().base_dir(base_dir).pure_only(pure);
            let scope = Scope::new(&registry, &data).with_options(options);

            let (value, diags) = scope.eval_source(&expression, &want);
            report(&diags, &expression);
            if diags.has_errors() {
                return Ok(false);
            }

            let output = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&value)?,
                OutputFormat::Yaml => serde_yaml::to_string(&value)?,
                OutputFormat::Hcl => render_hcl(&value),
            };
            println!("{}", output.trim_end());
        }

        Commands::Parse { expression } => {
            let expr =
                parse_expression(&expression).map_err(|e| format!("Parse error: {}", e))?;
            println!("{:#?}", expr);
        }

        Commands::Functions => {
            let registry = stdlib_registry()?;
            for function in registry.iter() {
                let marker = if function.impure { " (impure)" } else { "" };
                println!("{}{}", function.signature(), marker);
            }
        }
    }

    Ok(true)
}

fn report(diags: &Diagnostics, source: &str) {
    for diag in diags.prioritized() {
        eprintln!("{}\n", diag.render(source));
    }
}

/// Render a value in expression syntax. Unknown values have no literal form.
fn render_hcl(value: &Value) -> String {
    if value.is_wholly_known() {
        value.to_string()
    } else {
        format!("{} # contains values known only after apply", value)
    }
}
