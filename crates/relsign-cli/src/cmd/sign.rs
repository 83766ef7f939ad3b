//! Sign command

use anyhow::{Context, Result};
use relsign_core::{Cancellation, MsBuildSigner, Pipeline};

use crate::SignArgs;

/// Run the full signing pipeline.
///
/// The pipeline is blocking, so it runs on the blocking pool while Ctrl-C
/// trips the shared cancellation signal.
pub async fn sign(args: &SignArgs) -> Result<()> {
    let config = args.to_config();
    let cancel = Cancellation::with_timeout(config.timeout);
    let signer = MsBuildSigner::from_config(&config).context("failed to configure signer")?;
    let pipeline = Pipeline::new(config, signer);

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            interrupt.cancel();
        }
    });

    let report = tokio::task::spawn_blocking(move || pipeline.run(&cancel))
        .await
        .context("signing task panicked")?
        .context("signing failed")?;

    for published in &report.published {
        println!("{}  {}", published.digest, published.archive.display());
    }
    Ok(())
}
