use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ft_ast::{ErrorPolicy, PythonVersion, RewriteOptions};
use ft_codec::charset::decode_bytes;
use ft_codec::CodecRegistry;

#[derive(Parser)]
#[command(name = "ft", about = "future-typing: run new-style annotations on older Pythons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a source file and emit the rewritten Python.
    Decode {
        /// Input .py file.
        input: PathBuf,
        /// Output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Rewrite even without a `coding: future_typing` declaration.
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        rewrite: RewriteArgs,
    },
    /// Rewrite the file and check that the result tokenizes.
    Check {
        input: PathBuf,
        #[command(flatten)]
        rewrite: RewriteArgs,
    },
    /// Dump the token stream.
    Tokens {
        input: PathBuf,
        /// Print tokens as JSON.
        #[arg(long)]
        json: bool,
        /// Tokenize the rewritten source instead of the input.
        #[arg(long)]
        rewritten: bool,
        #[command(flatten)]
        rewrite: RewriteArgs,
    },
}

#[derive(Args)]
struct RewriteArgs {
    /// Interpreter version the output must run on.
    #[arg(long)]
    target: Option<PythonVersion>,
    /// Alias bound by the injected import.
    #[arg(long)]
    typing_module: Option<String>,
    /// Module imported under the alias.
    #[arg(long)]
    compat_module: Option<String>,
    /// How undecodable bytes are handled: strict, replace or ignore.
    #[arg(long, default_value_t = ErrorPolicy::Strict)]
    errors: ErrorPolicy,
    /// JSON file with rewrite options; flags override it.
    #[arg(long)]
    options: Option<PathBuf>,
}

impl RewriteArgs {
    fn resolve(&self) -> Result<RewriteOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("invalid options in {}", path.display()))?
            }
            None => RewriteOptions::default(),
        };
        if let Some(target) = self.target {
            options.target = target;
        }
        if let Some(alias) = &self.typing_module {
            options.typing_module = alias.clone();
        }
        if let Some(module) = &self.compat_module {
            options.compat_module = module.clone();
        }
        if !ft_lexer::is_identifier(&options.typing_module) {
            anyhow::bail!("typing module alias {:?} is not an identifier", options.typing_module);
        }
        Ok(options)
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn rewrite(bytes: &[u8], rewrite: &RewriteArgs) -> Result<String> {
    let options = rewrite.resolve()?;
    let (text, _) = ft_codec::decode(bytes, rewrite.errors, &options)?;
    Ok(text)
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(EnvFilter::from_default_env())
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            input,
            output,
            force,
            rewrite: args,
        } => {
            let bytes = read(&input)?;
            let text = if force {
                rewrite(&bytes, &args)?
            } else {
                let mut registry = CodecRegistry::with_standard();
                ft_codec::register(&mut registry, args.resolve()?);
                ft_codec::load_source(&registry, &bytes, args.errors)
                    .with_context(|| format!("failed to load {}", input.display()))?
            };

            match &output {
                Some(path) => std::fs::write(path, &text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{text}"),
            }
        }
        Commands::Check {
            input,
            rewrite: args,
        } => {
            let filename = input.display().to_string();
            let text = rewrite(&read(&input)?, &args)
                .with_context(|| format!("failed to rewrite {filename}"))?;
            let tokens = ft_lexer::tokenize(&text)
                .with_context(|| format!("rewritten {filename} does not tokenize"))?;
            tracing::info!(tokens = tokens.len(), "rewritten source tokenizes");
            eprintln!("OK: {filename}");
        }
        Commands::Tokens {
            input,
            json,
            rewritten,
            rewrite: args,
        } => {
            let bytes = read(&input)?;
            let source = if rewritten {
                rewrite(&bytes, &args)?
            } else {
                decode_bytes(&bytes, args.errors)?.into_owned()
            };
            let tokens = ft_lexer::tokenize(&source)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in &tokens {
                    println!(
                        "{}:{}\t{}\t{:?}",
                        token.pos.line, token.pos.col, token.kind, token.text
                    );
                }
            }
        }
    }

    Ok(())
}
