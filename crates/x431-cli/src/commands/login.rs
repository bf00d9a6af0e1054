//! Login command - authenticate and show the account record

use anyhow::Result;
use x431_client::{Credentials, X431Client};

use crate::output::{display_value, OutputContext};

/// Log in and print every field of the returned user record
pub async fn login(client: &X431Client, credentials: Credentials, ctx: &OutputContext) -> Result<()> {
    let client = client.login(credentials).await?;

    ctx.success("Login successful");

    let pairs: Vec<(&str, String)> = client
        .session()
        .user()
        .iter()
        .map(|(key, value)| (key.as_str(), display_value(value)))
        .collect();
    ctx.print_kv(&pairs);
    Ok(())
}
