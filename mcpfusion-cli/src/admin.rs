//! Admin command handlers ("CLI (startup & admin)"). Each handler
//! talks to the `Store` directly rather than through `GatewayService` — these
//! are operator-facing CRUD operations on the Persistent Store, not tool
//! invocations, so they skip the Tool Catalog and the request/command
//! pipelines entirely.

use std::sync::Arc;

use anyhow::{Context, Result};
use mcpfusion_interfaces::Store;

use crate::cli::AdminAction;

pub async fn run(store: Arc<dyn Store>, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::TokenAdd { description } => token_add(&store, &description).await,
        AdminAction::TokenList => token_list(&store).await,
        AdminAction::TokenDel { prefix_or_hash } => token_del(&store, &prefix_or_hash).await,
        AdminAction::UserAdd => user_add(&store).await,
        AdminAction::UserList => user_list(&store).await,
        AdminAction::UserDel { user_id } => user_del(&store, &user_id).await,
        AdminAction::UserLink { user_id, hash } => user_link(&store, &user_id, &hash).await,
        AdminAction::UserUnlink { hash } => user_unlink(&store, &hash).await,
        AdminAction::AuthCode { service, url, token_prefix } => auth_code(&store, &service, url, token_prefix).await,
    }
}

async fn token_add(store: &Arc<dyn Store>, description: &str) -> Result<()> {
    let (plaintext, hash) = store.add_api_token(description).await.context("adding API token")?;
    println!("token:  {plaintext}");
    println!("hash:   {hash}");
    Ok(())
}

async fn token_list(store: &Arc<dyn Store>) -> Result<()> {
    let tokens = store.list_api_tokens().await.context("listing API tokens")?;
    if tokens.is_empty() {
        println!("no API tokens");
        return Ok(());
    }
    for token in tokens {
        let last_used = token.last_used.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string());
        println!("{}  {}  created {}  last used {}  {}", token.prefix, token.hash, token.created_at.to_rfc3339(), last_used, token.description);
    }
    Ok(())
}

async fn token_del(store: &Arc<dyn Store>, prefix_or_hash: &str) -> Result<()> {
    let hash = store.resolve_api_token(prefix_or_hash).await.context("resolving token prefix")?;
    store.delete_api_token(&hash).await.context("deleting API token")?;
    println!("deleted {hash}");
    Ok(())
}

async fn user_add(store: &Arc<dyn Store>) -> Result<()> {
    let user = store.create_user(None).await.context("creating user")?;
    println!("user:   {}", user.id);
    Ok(())
}

async fn user_list(store: &Arc<dyn Store>) -> Result<()> {
    let users = store.list_users().await.context("listing users")?;
    if users.is_empty() {
        println!("no users");
        return Ok(());
    }
    for user in users {
        let name = user.display_name.unwrap_or_else(|| "(unnamed)".to_string());
        println!("{}  {}  created {}", user.id, name, user.created_at.to_rfc3339());
    }
    Ok(())
}

async fn user_del(store: &Arc<dyn Store>, user_id: &str) -> Result<()> {
    let id = uuid::Uuid::parse_str(user_id).context("parsing user ID")?;
    store.delete_user(id).await.context("deleting user")?;
    println!("deleted {id}");
    Ok(())
}

async fn user_link(store: &Arc<dyn Store>, user_id: &str, hash: &str) -> Result<()> {
    let id = uuid::Uuid::parse_str(user_id).context("parsing user ID")?;
    store.link_api_key(id, hash).await.context("linking API key")?;
    println!("linked {hash} to {id}");
    Ok(())
}

async fn user_unlink(store: &Arc<dyn Store>, hash: &str) -> Result<()> {
    store.unlink_api_key(hash).await.context("unlinking API key")?;
    println!("unlinked {hash}");
    Ok(())
}

async fn auth_code(store: &Arc<dyn Store>, service: &str, url: Option<String>, token_prefix: String) -> Result<()> {
    let tenant = store.resolve_api_token(&token_prefix).await.context("resolving token prefix")?;
    let server_url = url.unwrap_or_else(|| "http://localhost".to_string());
    let blob = mcpfusion_auth::create_auth_code(store, &tenant, service, &server_url)
        .await
        .map_err(anyhow::Error::from)
        .context("creating auth code")?;
    println!("{blob}");
    Ok(())
}
