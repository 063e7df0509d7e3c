//! Kestrel CLI
//!
//! Load generator and admin tool for a Kestrel queue server.

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam::channel;
use kestrel_client::{Client, Config, GetOptions, KestrelError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Kestrel CLI
#[derive(Parser, Debug)]
#[command(name = "kestrel-cli")]
#[command(about = "CLI for Kestrel work queues")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "22133")]
    port: u16,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "2000")]
    connect_timeout_ms: u64,

    /// Read timeout in milliseconds
    #[arg(long, default_value = "2000")]
    read_timeout_ms: u64,

    /// Disable TCP keepalive
    #[arg(long)]
    no_keepalive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Put fixed-size items onto a queue
    Produce {
        #[arg(short, long, default_value = "testing")]
        queue: String,

        /// How many items to put
        #[arg(short, long, default_value = "1000")]
        count: usize,

        /// Item size in bytes
        #[arg(short, long, default_value = "1024")]
        length: usize,

        /// Parallel connections
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },

    /// Take items off a queue
    Consume {
        #[arg(short, long, default_value = "testing")]
        queue: String,

        /// How many fetches to issue
        #[arg(short, long, default_value = "1000")]
        count: usize,

        /// Parallel connections
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Server-side wait per fetch, in milliseconds
        #[arg(long, default_value = "0")]
        wait_ms: u64,
    },

    /// Flush all items from a queue
    Clear {
        #[arg(short, long, default_value = "testing")]
        queue: String,
    },

    /// Print server stats as JSON
    Stats {
        /// Only this queue
        #[arg(short, long)]
        queue: Option<String>,
    },

    /// Print the server version
    Version,

    /// Check the server answers
    Ping,

    /// Fetch one item
    Get {
        queue: String,

        /// Do not remove the item
        #[arg(long)]
        peek: bool,
    },

    /// Put one item
    Set {
        queue: String,

        value: String,

        /// Expiration in seconds, 0 for never
        #[arg(short, long, default_value = "0")]
        expiration: u64,
    },

    /// Delete a queue
    Delete { queue: String },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kestrel_client=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .connect_timeout(Duration::from_millis(args.connect_timeout_ms))
        .read_timeout(Duration::from_millis(args.read_timeout_ms))
        .keepalive(!args.no_keepalive)
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> Result<()> {
    match command {
        Commands::Produce {
            queue,
            count,
            length,
            workers,
        } => {
            tracing::info!(
                "Inserting {} items into '{}' at {}",
                count,
                queue,
                config.addr()
            );
            let item = vec![b'x'; length];
            let report = run_workers(&config, count, workers, |client| {
                client.set(&queue, item.clone(), Duration::ZERO).map(|_| ())
            })?;
            report.print();
        }

        Commands::Consume {
            queue,
            count,
            workers,
            wait_ms,
        } => {
            tracing::info!(
                "Consuming {} items from '{}' at {}",
                count,
                queue,
                config.addr()
            );
            let options = if wait_ms > 0 {
                GetOptions::new().wait_for(Duration::from_millis(wait_ms))
            } else {
                GetOptions::new()
            };
            let report = run_workers(&config, count, workers, |client| {
                client.get(&queue, options.clone()).map(|_| ())
            })?;
            report.print();
        }

        Commands::Clear { queue } => {
            let mut client = Client::new(config)?;
            let flushed = client.flush(&queue)?;
            println!("flushed '{}': {}", queue, flushed);
        }

        Commands::Stats { queue } => {
            let mut client = Client::new(config)?;
            let stats = client.stats()?;
            let json = match queue {
                Some(name) => serde_json::to_string_pretty(&stats.queue(&name)),
                None => serde_json::to_string_pretty(&stats),
            }
            .map_err(|e| KestrelError::Protocol(format!("cannot render stats: {}", e)))?;
            println!("{}", json);
        }

        Commands::Version => {
            let mut client = Client::new(config)?;
            println!("{}", client.version()?);
        }

        Commands::Ping => {
            let mut client = Client::new(config)?;
            let up = client.ping();
            println!("{}", if up { "up" } else { "down" });
            if !up {
                std::process::exit(2);
            }
        }

        Commands::Get { queue, peek } => {
            let mut client = Client::new(config)?;
            let item = if peek {
                client.peek(&queue)?
            } else {
                client.get(&queue, GetOptions::new())?
            };
            match item {
                Some(data) => println!("{}", String::from_utf8_lossy(&data)),
                None => println!("(empty)"),
            }
        }

        Commands::Set {
            queue,
            value,
            expiration,
        } => {
            let mut client = Client::new(config)?;
            let stored = client.set(&queue, value.into_bytes(), Duration::from_secs(expiration))?;
            println!("{}", if stored { "STORED" } else { "NOT_STORED" });
        }

        Commands::Delete { queue } => {
            let mut client = Client::new(config)?;
            let deleted = client.delete(&queue)?;
            println!("{}", if deleted { "DELETED" } else { "NOT_FOUND" });
        }
    }

    Ok(())
}

// =============================================================================
// Load Generation
// =============================================================================

/// Latency summary of a load run
struct Report {
    samples: Vec<Duration>,
    errors: usize,
    wall: Duration,
}

impl Report {
    fn print(&self) {
        if self.samples.is_empty() {
            println!("no successful operations ({} errors)", self.errors);
            return;
        }

        let total: Duration = self.samples.iter().sum();
        let min = self.samples.iter().min().copied().unwrap_or_default();
        let max = self.samples.iter().max().copied().unwrap_or_default();
        let mean = total / self.samples.len() as u32;
        let rate = self.samples.len() as f64 / self.wall.as_secs_f64().max(f64::EPSILON);

        println!(
            "ops={} errors={} min={:?} mean={:?} max={:?} wall={:?} rate={:.1}/s",
            self.samples.len(),
            self.errors,
            min,
            mean,
            max,
            self.wall,
            rate
        );
    }
}

/// Run `op` `count` times spread over `workers` connections.
///
/// Each worker owns its own client; latencies flow back over a channel.
fn run_workers<F>(config: &Config, count: usize, workers: usize, op: F) -> Result<Report>
where
    F: Fn(&mut Client) -> Result<()> + Sync,
{
    let workers = workers.max(1);
    let (tx, rx) = channel::unbounded::<std::result::Result<Duration, KestrelError>>();
    let started = Instant::now();

    let outcome = crossbeam::thread::scope(|scope| -> Result<()> {
        for worker in 0..workers {
            let share = count / workers + usize::from(worker < count % workers);
            let mut client = Client::new(config.clone())?;
            let tx = tx.clone();
            let op = &op;

            scope.spawn(move |_| {
                for _ in 0..share {
                    let at = Instant::now();
                    let sample = op(&mut client).map(|_| at.elapsed());
                    if tx.send(sample).is_err() {
                        break;
                    }
                }
            });
        }
        Ok(())
    });

    match outcome {
        Ok(result) => result?,
        Err(_) => {
            return Err(KestrelError::Protocol("a worker thread panicked".to_string()));
        }
    }
    drop(tx);

    let mut report = Report {
        samples: Vec::with_capacity(count),
        errors: 0,
        wall: started.elapsed(),
    };
    for sample in rx {
        match sample {
            Ok(latency) => report.samples.push(latency),
            Err(e) => {
                tracing::warn!("Operation failed: {}", e);
                report.errors += 1;
            }
        }
    }

    Ok(report)
}
