use binding_expr::cli::{self, CliError, EvalOptions};
use clap::{Parser as ClapParser, Subcommand};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "bindexpr")]
#[command(about = "bindexpr - Compile, inspect and evaluate template binding expressions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a JSON scope
    Eval {
        /// The expression to evaluate
        expression: String,

        /// JSON scope (reads from stdin if not provided)
        #[arg(short, long)]
        scope: Option<String>,

        /// JSON locals shadowing the scope
        #[arg(short, long)]
        locals: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Reject function calls
        #[arg(long)]
        no_calls: bool,

        /// Also print the scope after evaluation
        #[arg(long)]
        show_scope: bool,
    },

    /// Compile an expression and report its flags
    Check {
        /// The expression to compile
        expression: String,

        /// Reject function calls
        #[arg(long)]
        no_calls: bool,
    },

    /// Show the tokens of an expression
    Tokens {
        /// The expression to lex
        expression: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Split binding-attribute text into key/value pairs
    Bindings {
        /// Attribute text, e.g. "text: name, visible: shown"
        text: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval {
            expression,
            scope,
            locals,
            pretty,
            no_calls,
            show_scope,
        } => run_eval(expression, scope, locals, pretty, no_calls, show_scope),
        Commands::Check {
            expression,
            no_calls,
        } => run_check(&expression, no_calls),
        Commands::Tokens { expression, pretty } => {
            cli::describe_tokens(&expression).and_then(|tokens| print_json(&tokens, pretty))
        }
        Commands::Bindings { text, pretty } => print_json(&cli::describe_bindings(&text), pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(CliError::Output)?;
    println!("{}", json);
    Ok(())
}

fn run_eval(
    expression: String,
    scope: Option<String>,
    locals: Option<String>,
    pretty: bool,
    no_calls: bool,
    show_scope: bool,
) -> Result<(), CliError> {
    let scope = match scope {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer).filter(|b| !b.trim().is_empty())
        }
        None => None,
    };

    let options = EvalOptions {
        expression,
        scope,
        locals,
        disallow_function_calls: no_calls,
    };

    let outcome = cli::execute_eval(&options)?;
    print_json(&outcome.value, pretty)?;
    if show_scope {
        print_json(&outcome.scope, pretty)?;
    }
    Ok(())
}

fn run_check(expression: &str, no_calls: bool) -> Result<(), CliError> {
    let report = cli::execute_check(expression, no_calls)?;
    println!(
        "Expression is valid (constant: {}, literal: {}, assignable: {})",
        report.constant, report.literal, report.assignable
    );
    Ok(())
}
