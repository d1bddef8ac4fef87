//! Example printing the UID of every card presented to any attached reader
//!
//! Usage: `cargo run --example print_uids [seconds]`. Serves until Ctrl-C,
//! or until the given number of seconds has elapsed, then releases the
//! PC/SC session.

use std::thread;
use std::time::Duration;

use acr122u::{CancellationToken, Card, Config, Context, LogLevel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seconds = std::env::args().nth(1).map(|s| s.parse::<u64>()).transpose()?;

    // Establish a PC/SC session and enumerate readers
    let mut context = Context::establish(Config::new().with_log_level(LogLevel::Warn))?;

    println!("Found {} readers:", context.readers().len());
    for (i, reader) in context.readers().iter().enumerate() {
        println!("  {}. {}", i + 1, reader);
    }

    // Stop serving on Ctrl-C
    let token = CancellationToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || token.cancel())?;
    }

    // Or after the timeout, if any
    if let Some(seconds) = seconds {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            token.cancel();
        });
    }

    println!("Waiting for cards, press Ctrl-C to stop...");
    context.serve_fn(&token, |card: &Card| {
        println!("{}: {}", card.reader(), card);
    })?;

    context.release()?;
    println!("Released PC/SC context");
    Ok(())
}
