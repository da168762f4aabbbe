//! Debug CLI for poking a HyperQ segment from the shell: create one,
//! push/pop a message, or print its current occupancy.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyperq::Queue;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hyperq-cli", about = "Inspect and poke HyperQ shared-memory queues")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct QueueArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value_t = 1 << 20)]
    capacity: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Create a queue with the given byte capacity, then exit.
    Create {
        #[command(flatten)]
        queue: QueueArgs,
    },
    /// Enqueue DATA, or the bytes read from stdin if --stdin is given.
    Put {
        #[command(flatten)]
        queue: QueueArgs,
        data: Option<String>,
        #[arg(long)]
        stdin: bool,
    },
    /// Dequeue and print the oldest message as UTF-8 (lossy) to stdout.
    Get {
        #[command(flatten)]
        queue: QueueArgs,
    },
    /// Print name, capacity, occupancy, empty/full state.
    Info {
        #[command(flatten)]
        queue: QueueArgs,
    },
    /// Discard all queued messages.
    Clear {
        #[command(flatten)]
        queue: QueueArgs,
    },
}

fn open(queue: &QueueArgs) -> Result<Queue> {
    Queue::open(&queue.name, queue.capacity).context("opening queue")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Create { queue } => {
            let queue = open(&queue)?;
            println!("created {} (capacity {} bytes)", queue.name(), queue.capacity());
        }
        Command::Put { queue, data, stdin } => {
            let queue = open(&queue)?;
            let payload = if stdin {
                use std::io::Read;
                let mut buf = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buf)
                    .context("reading message from stdin")?;
                buf
            } else {
                data.context("DATA is required unless --stdin is given")?
                    .into_bytes()
            };
            queue.put(&payload).context("enqueueing message")?;
        }
        Command::Get { queue } => {
            let queue = open(&queue)?;
            let payload = queue.get().context("dequeueing message")?;
            print!("{}", String::from_utf8_lossy(&payload));
        }
        Command::Info { queue } => {
            let queue = open(&queue)?;
            println!("name:     {}", queue.name());
            println!("capacity: {} bytes", queue.capacity());
            println!("size:     {} bytes", queue.len()?);
            println!("empty:    {}", queue.is_empty()?);
            println!("full:     {}", queue.is_full()?);
        }
        Command::Clear { queue } => {
            let queue = open(&queue)?;
            queue.clear().context("clearing queue")?;
        }
    }

    Ok(())
}
