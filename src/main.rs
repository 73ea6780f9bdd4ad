use std::fs;
use std::io::{self, BufRead, Read, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use balancing_lexer::command_line;
use balancing_lexer::lexer::{BalancingLexer, LexerConfig, Preset, Token, TokenKind};

#[derive(ClapParser)]
#[command(name = "balex")]
#[command(version = balancing_lexer::VERSION)]
#[command(about = "Quote-balancing lexer and command line splitter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex files (or stdin) and print the tokens
    Lex {
        /// The files to lex; stdin when empty
        files: Vec<String>,

        #[command(flatten)]
        lexer: LexerArgs,

        /// Highlight token kinds with colors
        #[arg(short, long)]
        color: bool,

        /// Show token numbers in output
        #[arg(short = 'n', long)]
        line_numbers: bool,
    },
    /// Split a command line into pipelines and commands
    Split {
        /// The command line; read from stdin when absent
        line: Option<String>,
    },
    /// Lex lines interactively
    Repl {
        #[command(flatten)]
        lexer: LexerArgs,
    },
}

#[derive(Args, Clone)]
struct LexerArgs {
    /// Escape character
    #[arg(short, long, default_value_t = '\\')]
    escape: char,

    /// Disable escaping altogether
    #[arg(long)]
    no_escape: bool,

    /// Quote pairs to register
    #[arg(short, long, value_enum, default_value_t = PresetArg::ThreeQuote)]
    preset: PresetArg,

    /// Additional keyword (repeatable)
    #[arg(short = 'k', long = "keyword")]
    keywords: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Whitespace,
    TwoQuote,
    ThreeQuote,
    TwoQuoteDollarCurly,
    ThreeQuoteDollarCurly,
}

impl From<PresetArg> for Preset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Whitespace => Preset::Whitespace,
            PresetArg::TwoQuote => Preset::TwoQuote,
            PresetArg::ThreeQuote => Preset::ThreeQuote,
            PresetArg::TwoQuoteDollarCurly => Preset::TwoQuoteDollarCurly,
            PresetArg::ThreeQuoteDollarCurly => Preset::ThreeQuoteDollarCurly,
        }
    }
}

impl From<&LexerArgs> for LexerConfig {
    fn from(args: &LexerArgs) -> Self {
        LexerConfig {
            escape: (!args.no_escape).then_some(args.escape),
            preset: args.preset.into(),
            keywords: args.keywords.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Respects RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lex { files, lexer, color, line_numbers } => {
            lex_files(&files, &(&lexer).into(), color, line_numbers)?;
        }
        Commands::Split { line } => {
            split_line(line)?;
        }
        Commands::Repl { lexer } => {
            run_repl(&(&lexer).into())?;
        }
    }

    Ok(())
}

fn lex_source(source: &str, config: &LexerConfig) -> Result<Vec<Token>> {
    let mut lexer = BalancingLexer::with_config(source.chars(), config.clone())
        .context("Invalid lexer configuration")?;
    Ok(lexer.tokenize())
}

fn lex_files(files: &[String], config: &LexerConfig, use_color: bool, line_numbers: bool) -> Result<()> {
    if files.is_empty() {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        let tokens = lex_source(&source, config)?;
        print_tokens(&tokens, use_color, line_numbers);
        return Ok(());
    }

    // Each file gets its own lexer, so they can be scanned in parallel.
    let results: Vec<Result<(String, Vec<Token>)>> = files
        .par_iter()
        .map(|filename| {
            let source = fs::read_to_string(filename)
                .with_context(|| format!("Failed to read file: {}", filename))?;
            let tokens = lex_source(&source, config)?;
            tracing::debug!(file = %filename, tokens = tokens.len(), "lexed file");
            Ok((filename.clone(), tokens))
        })
        .collect();

    for result in results {
        let (filename, tokens) = result?;
        println!("Tokens from file '{}':", filename);
        print_tokens(&tokens, use_color, line_numbers);
    }

    Ok(())
}

fn print_tokens(tokens: &[Token], use_color: bool, line_numbers: bool) {
    for (i, token) in tokens.iter().enumerate() {
        if line_numbers {
            print!("{:4}: ", i);
        }
        println!("{}", format_token(token, use_color));
    }
}

fn format_token(token: &Token, use_color: bool) -> String {
    let text = format!("{}", token);
    if !use_color {
        return text;
    }

    match token.kind {
        TokenKind::Quoted => text.bright_green().to_string(),
        TokenKind::Keyword => text.bright_blue().to_string(),
        TokenKind::Normal => text.bright_yellow().to_string(),
        TokenKind::None | TokenKind::End => text,
    }
}

fn split_line(line: Option<String>) -> Result<()> {
    let line = match line {
        Some(line) => line,
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            input
        }
    };

    let parsed = command_line::split(&line).context("Failed to split command line")?;
    for (p, pipeline) in parsed.pipelines.iter().enumerate() {
        println!("{}", format!("pipeline {}:", p).bright_magenta());
        for (c, command) in pipeline.commands.iter().enumerate() {
            let args: Vec<String> = command.args.iter().map(|arg| format!("{:?}", arg)).collect();
            println!("  [{}] {}", c, args.join(" "));
        }
    }

    Ok(())
}

fn run_repl(config: &LexerConfig) -> Result<()> {
    println!("{}", "Balancing lexer REPL".bright_green());
    println!("Type 'exit' or press Ctrl+D to exit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", ">>> ".bright_green());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim() == "exit" {
            break;
        }

        match lex_source(&line, config) {
            Ok(tokens) => print_tokens(&tokens, true, false),
            Err(e) => eprintln!("{}", format!("{:#}", e).bright_red()),
        }
    }

    Ok(())
}
