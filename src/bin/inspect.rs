//! pageheap Inspector
//!
//! Prints the heap header of a store file and, optionally, walks a free chain.

use std::path::PathBuf;

use clap::Parser;
use pageheap::freeset::chain;
use pageheap::heap::read_header;
use pageheap::{BumpHeap, Config, FileMedium, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// pageheap store inspector
#[derive(Parser, Debug)]
#[command(name = "pageheap-inspect")]
#[command(about = "Inspect the header and free chain of a pageheap store")]
#[command(version)]
struct Args {
    /// Store file
    path: PathBuf,

    /// Address of a free chain root to walk
    #[arg(short, long)]
    root: Option<u64>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pageheap=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        tracing::error!("Inspection failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> pageheap::Result<()> {
    let medium = FileMedium::open(&args.path, SyncStrategy::OnClose)?;

    let Some(header) = read_header(&medium)? else {
        println!("{}: not an initialized pageheap store", args.path.display());
        return Ok(());
    };

    let page_length = header.page_length as usize;
    println!("store:        {}", args.path.display());
    println!("page length:  {}", header.page_length);
    println!("heap size:    {}", header.heap_size);
    println!("pages:        {}", header.heap_size / header.page_length.max(1));
    println!("created at:   {}", header.created_at);
    println!("metadata:     {} bytes", header.metadata_length);

    let Some(root) = args.root else {
        return Ok(());
    };

    // One block per page: any block length that yields the stored page length reopens
    let config = Config::builder()
        .block_length(page_length)
        .page_span(1)
        .metadata_length(header.metadata_length as usize)
        .build();
    let mut heap = BumpHeap::open(medium, &config)?;

    let nodes = chain::walk(&mut heap, root)?;
    let total: usize = nodes.iter().map(|node| node.count).sum();
    println!("free chain @ {}: {} nodes, {} addresses", root, nodes.len(), total);
    for node in &nodes {
        println!(
            "  node {:>12}  count {:>6}  next {}",
            node.address,
            node.count,
            node.next
                .map(|next| next.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}
