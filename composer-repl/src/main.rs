mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use crossbeam_channel::Receiver;
use query_composer::{
    ComposerFile, FilterSchema, InputController, Reaction, StaticLoader, Token,
};
use std::{io::Write, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

enum Command {
    Text(String),
    Select(usize),
    Enter,
    Confirm,
    Cancel,
    Backspace,
    Reset,
    Tokens,
    Bye,
}

fn parse_command(line: &str) -> Option<Command> {
    let command = match line {
        "/bye" => Command::Bye,
        ":enter" => Command::Enter,
        ":confirm" => Command::Confirm,
        ":cancel" => Command::Cancel,
        ":bs" => Command::Backspace,
        ":reset" => Command::Reset,
        ":tokens" => Command::Tokens,
        _ => match line.strip_prefix(":sel ") {
            Some(index) => Command::Select(index.trim().parse().ok()?),
            None => Command::Text(line.to_string()),
        },
    };
    Some(command)
}

/// Swaps every static option list for a loader that answers after `latency`.
fn slow_down(schema: &mut FilterSchema, latency: Duration) -> Result<()> {
    let lists: Vec<_> = schema
        .fields
        .iter()
        .filter_map(|f| Some((f.name.clone(), f.options.clone()?)))
        .collect();
    for (name, options) in lists {
        let loader = StaticLoader::new(options).with_latency(latency);
        schema
            .attach_loader(&name, Arc::new(loader))
            .with_context(|| format!("attach loader to `{name}` failed"))?;
    }
    Ok(())
}

/// Runs `reaction` to completion: in a line-based driver every line is a
/// pause, so searches resolve right away and lookups are awaited inline.
async fn settle(builder: &mut InputController, mut reaction: Reaction) {
    loop {
        reaction = match reaction {
            Reaction::Search(_) => builder.refresh(),
            Reaction::Lookup(request) => {
                info!(field = %request.field, search = %request.search, "waiting for options");
                let response = request.run().await;
                builder.apply_lookup(response)
            }
            Reaction::Refused(refusal) => {
                println!("refused: {refusal:?}");
                return;
            }
            Reaction::Unchanged | Reaction::Applied => return,
        };
    }
}

fn print_view(builder: &InputController, queries: &Receiver<String>) {
    for query in queries.try_iter() {
        println!("query: {query}");
    }
    for (i, suggestion) in builder.suggestions().iter().enumerate() {
        let mark = if suggestion.selected { "*" } else { " " };
        println!("[{i}]{mark} {} ({:?})", suggestion.label, suggestion.kind);
    }
    println!("{:?} {:?}", builder.phase(), builder.completeness());
}

fn print_tokens(tokens: &[Token]) {
    for (i, token) in tokens.iter().enumerate() {
        println!("{i:>3} {:<10} {}", format!("{:?}", token.kind()), token.display());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let file = ComposerFile::load(&cli.config)?;
    let mut schema = file.schema;
    if let Some(latency) = cli.latency_ms {
        slow_down(&mut schema, Duration::from_millis(latency))?;
    }
    let mut builder = InputController::new(schema, file.composer);
    let queries = builder.subscribe();
    print_view(&builder, &queries);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush().context("stdout is closed")?;
        let Some(line) = lines.next_line().await.context("read stdin failed")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(command) = parse_command(line) else {
            warn!(%line, "unrecognized command");
            continue;
        };
        let reaction = match command {
            Command::Bye => break,
            Command::Tokens => {
                print_tokens(builder.tokens());
                continue;
            }
            Command::Text(text) => builder.set_input(text),
            Command::Select(index) => builder.select(index),
            Command::Enter => builder.commit(),
            Command::Confirm => builder.confirm(),
            Command::Cancel => builder.cancel(),
            Command::Backspace => builder.backspace(),
            Command::Reset => builder.reset(),
        };
        settle(&mut builder, reaction).await;
        print_view(&builder, &queries);
    }

    println!("{}", builder.query());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert!(matches!(parse_command(":sel 2"), Some(Command::Select(2))));
        assert!(matches!(parse_command(":sel x"), None));
        assert!(matches!(parse_command("/bye"), Some(Command::Bye)));
        assert!(matches!(parse_command("age"), Some(Command::Text(t)) if t == "age"));
    }
}
