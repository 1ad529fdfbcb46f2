use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bwstats::{
    ByteStream, Config,
    bbi::{FileHeader, choose_zoom_level},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Opening {}", config.resource);
    let mut stream = ByteStream::open(&config.resource, &config.stream).await?;
    let header = FileHeader::read(&mut stream).await?;

    let mut report = json!({
        "resource": &config.resource,
        "transport": stream.kind(),
        "length": stream.resource_len(),
        "header": &header,
    });

    if let Some(bases_per_bin) = config.bases_per_bin {
        let levels: Vec<u32> = header
            .zoom_headers
            .iter()
            .map(|z| z.reduction_level)
            .collect();
        report["chosen_zoom_level"] = json!(choose_zoom_level(&levels, bases_per_bin));
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(length) = config.length {
        tracing::info!("Reading {} bytes at offset {}", length, config.offset);
        let bytes = stream.read_at(config.offset, length).await?;
        print!("{}", hex_dump(config.offset, &bytes));
    }

    Ok(())
}

fn hex_dump(offset: u64, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
        out.push_str(&format!("{:08x}  {}\n", offset + (i * 16) as u64, hex.join(" ")));
    }
    out
}
