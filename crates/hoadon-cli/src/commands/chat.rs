//! Chat command - talk to the invoice assistant.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::debug;

use hoadon_core::chat::{ChatHandler, HybridReply, HybridRouter};
use hoadon_core::store::InvoiceStore;

use super::config;

const EXIT_WORDS: [&str; 4] = ["exit", "quit", "thoát", "/q"];

/// Arguments for the chat command.
#[derive(Args)]
pub struct ChatArgs {
    /// Send one message and exit (default: interactive session on stdin)
    #[arg(short, long)]
    message: Option<String>,

    /// Conversation user id
    #[arg(short, long, default_value = "cli")]
    user: String,

    /// Print full JSON responses
    #[arg(long)]
    json: bool,

    /// Show detected intent, confidence and routing decision
    #[arg(long)]
    explain: bool,
}

pub async fn run(args: ChatArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let store = Arc::new(InvoiceStore::open(&config.storage.invoices_path)?);

    let handler = ChatHandler::new(config.chat.clone()).with_store(store);
    let router = HybridRouter::new(handler);

    if let Some(message) = &args.message {
        return answer(&router, &args, message);
    }

    let bot_name = &config.chat.bot_name;
    println!(
        "{} {} - type 'exit' to quit, '/history' or '/clear' for the conversation",
        style("ℹ").blue(),
        style(bot_name).bold()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", style(">").cyan());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let message = line.trim();

        if message.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&message.to_lowercase().as_str()) {
            break;
        }

        match message {
            "/history" => show_history(&router, &args.user),
            "/clear" => {
                if router.handler().history().clear(&args.user) {
                    println!("{} Conversation cleared", style("✓").green());
                }
            }
            "/stats" => {
                let stats = router.handler().history().statistics();
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            _ => answer(&router, &args, message)?,
        }
    }

    println!();
    Ok(())
}

fn answer(router: &HybridRouter, args: &ChatArgs, message: &str) -> anyhow::Result<()> {
    if args.explain {
        let decision = router.decide(message, &args.user);
        debug!("Routing decision: {:?}", decision);
        println!(
            "{} decision: {:?} ({:.2}){}",
            style("ℹ").blue(),
            decision.source,
            decision.confidence,
            decision
                .intent
                .as_deref()
                .map(|i| format!(", intent {}", i))
                .unwrap_or_default()
        );
    }

    let reply = router.route(message, &args.user);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        print_reply(&reply, args.explain);
    }

    Ok(())
}

fn print_reply(reply: &HybridReply, explain: bool) {
    let response = &reply.response;
    println!("{}", response.message);

    if !response.suggestions.is_empty() {
        println!();
        for suggestion in &response.suggestions {
            println!("  {} {}", style("›").dim(), suggestion);
        }
    }

    if explain {
        println!(
            "{} intent: {} ({:.2}), source: {}",
            style("ℹ").blue(),
            response.intent,
            response.confidence,
            reply.source.as_str()
        );
    }
}

fn show_history(router: &HybridRouter, user: &str) {
    let context = router.handler().history().context(user);
    if context.messages.is_empty() {
        println!("{} No messages yet", style("ℹ").blue());
        return;
    }

    for exchange in &context.messages {
        println!(
            "[{}] {} {}",
            exchange.timestamp.format("%H:%M:%S"),
            style("you:").cyan(),
            exchange.user
        );
        println!("           {} {}", style("bot:").green(), exchange.bot);
    }
}
