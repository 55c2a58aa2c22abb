//! Current command - show the active kube context.

use anyhow::Result;
use kpfm_core::adapters::KubeconfigContextSource;
use kpfm_core::ContextSource;

pub async fn run() -> Result<()> {
    let source = KubeconfigContextSource::new()?;
    println!("{}", source.current().await?);
    Ok(())
}
