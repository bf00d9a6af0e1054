//! Connect command - open a realtime session with a diagnostic device

use anyhow::{Context, Result};
use x431_client::{Credentials, X431Client};

use crate::output::OutputContext;

/// Log in, run the device handshake, report it and close the transport
pub async fn connect(
    client: &X431Client,
    credentials: Credentials,
    serial: &str,
    ctx: &OutputContext,
) -> Result<()> {
    let mut client = client.login(credentials).await?;

    let device = client
        .connect(serial)
        .await
        .with_context(|| format!("Failed to connect to device {}", serial))?;

    let pairs = vec![
        ("Serial", device.serial().to_string()),
        ("SID", device.sid().unwrap_or("-").to_string()),
        ("State", device.state().to_string()),
    ];

    ctx.success(&format!("Connected to device {}", serial));
    ctx.print_kv(&pairs);

    client.disconnect().await?;
    Ok(())
}
