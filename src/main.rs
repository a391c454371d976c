use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use benchrelay::config::SuiteConfig;
use benchrelay::util::format_duration;
use benchrelay::{run_batch, run_live, subscribe, Event, Result, Suite};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("benchrelay=info")),
        )
        .init();

    let config = SuiteConfig::quick();

    // Live run: subscribe first, then start broadcasting
    let (done_tx, mut done_rx) = mpsc::channel(1);
    let listener = subscribe(move |envelope| {
        let done = done_tx.clone();
        async move {
            println!("{}", envelope.event);
            if envelope.event == Event::Finished {
                let _ = done.send(()).await;
            }
        }
    });

    let run = run_live(vec![formatting_suite(config.clone())?]);
    println!("Live run {} started", run);
    done_rx.recv().await;
    listener.unsubscribe();

    // Batch run: collect everything, then summarize
    let started = Instant::now();
    let events = run_batch(vec![sorting_suite(config)?]).await?;
    for event in &events {
        println!("{}", event);
    }
    println!(
        "\nCollected {} events in {}",
        events.len(),
        format_duration(started.elapsed())
    );
    println!("{}", serde_json::to_string_pretty(&events)?);

    Ok(())
}

fn formatting_suite(config: SuiteConfig) -> Result<Suite> {
    Suite::builder("string building")
        .config(config)
        .bench("format macro", || {
            let s = format!("{}-{}", 42, "payload");
            std::hint::black_box(s);
        })
        .bench("push_str", || {
            let mut s = String::with_capacity(16);
            s.push_str("42");
            s.push('-');
            s.push_str("payload");
            std::hint::black_box(s);
        })
        .build()
}

fn sorting_suite(config: SuiteConfig) -> Result<Suite> {
    let mut rng = SmallRng::seed_from_u64(42);
    let values: Vec<u64> = (0..512).map(|_| rng.gen()).collect();
    let unstable = values.clone();

    Suite::builder("vector sorting")
        .config(config)
        .bench("stable sort", move || {
            let mut copy = values.clone();
            copy.sort();
            std::hint::black_box(copy);
        })
        .bench("unstable sort", move || {
            let mut copy = unstable.clone();
            copy.sort_unstable();
            std::hint::black_box(copy);
        })
        .build()
}
