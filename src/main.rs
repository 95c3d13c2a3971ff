use anyhow::Context;
use tracing::debug;

use novelty::cli::parse_args;
use novelty::{App, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Only show warnings and errors by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = Config::load().context("failed to load configuration")?;
    let app = App::new(&config)
        .await
        .context("failed to open the news store")?;

    // Ctrl-C stops in-flight refreshes before they write anything
    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted, cancelling refresh");
            cancel.cancel();
        }
    });

    let output = app.execute(command).await?;
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }

    Ok(())
}
