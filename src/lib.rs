pub mod command_line;
pub mod lexer;

pub use command_line::{Command, CommandLine, CommandLineError, Pipeline};
pub use lexer::{BalancingLexer, LexerConfig, LexerError, Preset, State, Token, TokenKind};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
