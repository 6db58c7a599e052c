//! # salon-server binary
//!
//! Scripted demonstration of the Salon mediation core.
//!
//! The run walks one full exchange:
//! - **Fan-out delivery** of five messages between three users
//! - **Sender-filtered replay** of one user's history
//! - **Undo** that retracts a message from every recipient history
//! - **Blocking**, after which the blocked sender silently skips one recipient
//! - **Search cursor** walk over the messages involving one user

use tracing::info;
use tracing_subscriber::EnvFilter;

use salon_server::{ChatServer, ServerConfig, User};
use salon_shared::{Message, Username};

fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,salon_server=debug")),
        )
        .init();

    info!("Starting Salon chat simulation v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    let dump_json = std::env::var("SALON_DUMP_JSON").is_ok_and(|v| v == "1" || v == "true");

    let server = ChatServer::with_config(config);
    info!(instance = %server.instance_name(), "Server ready");

    // -----------------------------------------------------------------------
    // 3. Register users
    // -----------------------------------------------------------------------
    let alice = User::new("Alice");
    let bob = User::new("Bob");
    let charlie = User::new("Charlie");
    for user in [&alice, &bob, &charlie] {
        server.register(user)?;
    }

    // -----------------------------------------------------------------------
    // 4. Exchange messages through the server
    // -----------------------------------------------------------------------
    alice.send(&server, &[bob.clone(), charlie.clone()], "Hello everyone!")?;
    bob.send(&server, &[alice.clone()], "Hi Alice!")?;
    charlie.send_to(&server, &bob, "Hey Bob!")?;
    charlie.send(&server, &[bob.clone(), alice.clone()], "Hi Alice and Bob!")?;
    charlie.send_to(&server, &alice, "How are you Alice?")?;

    println!("\nBob's chat history of Alice before Alice undoes:");
    print_history(&bob, Some(alice.username()))?;

    // -----------------------------------------------------------------------
    // 5. Undo, then block
    // -----------------------------------------------------------------------
    server.undo(&alice, &[bob.clone(), charlie.clone()])?;

    server.block(&alice, &bob)?;
    println!();
    // Bob's message reaches Charlie but silently skips Alice.
    bob.send(&server, &[alice.clone(), charlie.clone()], "How's it going?")?;

    // -----------------------------------------------------------------------
    // 6. Replay views and a search cursor walk
    // -----------------------------------------------------------------------
    println!("\nAlice's chat history of Bob:");
    print_history(&alice, Some(bob.username()))?;

    println!("\nBob's chat history of Alice:");
    print_history(&bob, Some(alice.username()))?;

    println!("\nCharlie's chat history of all:");
    print_history(&charlie, None)?;

    println!("\nIterating through Charlie's messages that involve Bob:");
    let mut cursor = charlie.search(bob.username())?;
    while cursor.has_next() {
        println!("{}", cursor.next()?);
    }

    if dump_json {
        println!("\nCharlie's history as JSON:");
        println!("{}", history_json(&charlie)?);
    }

    info!("Simulation finished");
    Ok(())
}

/// Print a user's history view, optionally filtered to a single author.
fn print_history(user: &User, author: Option<&Username>) -> anyhow::Result<()> {
    for message in user.replay(author)? {
        println!("{message}");
    }
    Ok(())
}

/// Render a user's full history as pretty-printed JSON.
fn history_json(user: &User) -> anyhow::Result<String> {
    let messages: Vec<Message> = user
        .replay(None)?
        .iter()
        .map(|m| m.as_ref().clone())
        .collect();
    Ok(serde_json::to_string_pretty(&messages)?)
}
