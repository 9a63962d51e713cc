use anyhow::Context as _;
use clap::{Parser, Subcommand};
use magpie::{
    cst::CstNode,
    lexer::{Lexer, TokenClasses},
    table::ReduceMap,
    token::{Token, TokenKind},
};
use magpie_automata::automaton::Automaton;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Union automaton descriptions and persist the subset-constructed DFA.
    CompileDfa {
        /// The automaton description files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Specify the path of the written DFA description.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Tokenize a source file and print the token stream.
    Lex {
        /// The source file.
        input: PathBuf,

        /// Token-class automaton files, named after the class they lex.
        #[arg(long = "class", required = true)]
        classes: Vec<PathBuf>,
    },

    /// Parse a source file and print its concrete syntax tree.
    Parse {
        /// The source file.
        input: PathBuf,

        /// Token-class automaton files, named after the class they lex.
        #[arg(long = "class", required = true)]
        classes: Vec<PathBuf>,

        /// The parse-table description file.
        #[arg(long)]
        table: PathBuf,

        /// The grammar's start nonterminal.
        #[arg(long)]
        start: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    match args.command {
        Command::CompileDfa { inputs, output } => compile_dfa(&inputs, &output),
        Command::Lex { input, classes } => {
            let tokens = lex(&input, &classes)?;
            for token in tokens {
                println!("{}", token);
            }
            Ok(())
        }
        Command::Parse {
            input,
            classes,
            table,
            start,
        } => {
            let cst = parse(&input, &classes, &table, &start)?;
            print!("{}", cst);
            Ok(())
        }
    }
}

fn load_union(paths: &[PathBuf]) -> anyhow::Result<Automaton<()>> {
    let mut union: Option<Automaton<()>> = None;
    for path in paths {
        let automaton = Automaton::<()>::from_file(path)
            .with_context(|| anyhow::anyhow!("failed to load {}", path.display()))?;
        union = Some(match union {
            Some(all) => all.or(&automaton),
            None => automaton,
        });
    }
    union.context("at least one automaton description is required")
}

fn compile_dfa(inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let dfa = load_union(inputs)?
        .to_dfa()
        .context("subset construction failed")?;
    fs::write(output, dfa.serialize())
        .with_context(|| anyhow::anyhow!("failed to write {}", output.display()))?;
    tracing::info!(states = dfa.len(), "wrote {}", output.display());
    Ok(())
}

fn lex(input: &Path, class_files: &[PathBuf]) -> anyhow::Result<Vec<Token>> {
    let mut classes = TokenClasses::new();
    let mut union: Option<Automaton<()>> = None;
    for path in class_files {
        let class = Automaton::<()>::from_file(path)
            .with_context(|| anyhow::anyhow!("failed to load {}", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let kind = TokenKind::from_class_name(stem)
            .with_context(|| anyhow::anyhow!("`{}' does not name a token class", stem))?;
        classes.register(&class, kind);
        union = Some(match union {
            Some(all) => all.or(&class),
            None => class,
        });
    }
    let union = union.context("at least one token class is required")?;
    let dfa = union.to_dfa().context("subset construction failed")?;

    let source = fs::read_to_string(input)
        .with_context(|| anyhow::anyhow!("failed to read {}", input.display()))?;
    let tokens = Lexer::new(&dfa, classes).tokenize(&source)?;
    Ok(tokens)
}

fn parse(
    input: &Path,
    class_files: &[PathBuf],
    table_file: &Path,
    start: &str,
) -> anyhow::Result<CstNode> {
    let tokens = lex(input, class_files)?;
    let table = Automaton::<ReduceMap>::from_file(table_file)
        .with_context(|| anyhow::anyhow!("failed to load {}", table_file.display()))?;
    let cst = magpie::parser::Parser::new(&table, start).parse(&tokens)?;
    Ok(cst)
}
