//! CLI argument parsing. The admin surface is a `clap::Subcommand` tree
//! rather than hand-rolled `-flag value` parsing: `mcpfusion token add`,
//! `mcpfusion user add`, and so on. Running with no subcommand starts the
//! gateway.

use clap::{Args, Subcommand};

#[derive(clap::Parser)]
#[command(author, version, about = "MCPFusion gateway", long_about = None)]
pub struct Cli {
    /// Comma-separated configuration files; overrides MCP_FUSION_CONFIGS /
    /// the legacy MCP_FUSION_CONFIG.
    #[arg(long, value_name = "CSV")]
    pub config: Option<String>,

    /// Listen port override (host:port is read from MCP_FUSION_LISTEN).
    #[arg(long, value_name = "N")]
    pub port: Option<u16>,

    /// Verbose debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Install the insecure NOAUTH tenant and skip API-token validation.
    #[arg(long = "no-auth")]
    pub no_auth: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// API token administration.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },
    /// User administration and API-key linkage.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Mint a base64url auth-code handoff blob for an external OAuth helper.
    AuthCode(AuthCodeArgs),
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Mint a new API token.
    Add { description: String },
    /// List all API tokens.
    List,
    /// Delete an API token by prefix or full hash.
    Del { prefix_or_hash: String },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a new user.
    Add,
    /// List all users.
    List,
    /// Delete a user by ID.
    Del { user_id: String },
    /// Link an API token hash to a user.
    Link {
        user_id: String,
        hash: String,
    },
    /// Unlink an API token hash from its user.
    Unlink { hash: String },
}

#[derive(Args)]
pub struct AuthCodeArgs {
    /// Service the code is minted for.
    pub service: String,
    /// Authorization URL embedded in the blob.
    #[arg(long = "auth-url", value_name = "URL")]
    pub url: Option<String>,
    /// API token prefix the code is minted on behalf of.
    #[arg(long = "auth-token", value_name = "PREFIX", required = true)]
    pub token_prefix: String,
}

/// One resolved admin action, shared by every subcommand so `admin::run`
/// only has one shape to dispatch on.
pub enum AdminAction {
    TokenAdd { description: String },
    TokenList,
    TokenDel { prefix_or_hash: String },
    UserAdd,
    UserList,
    UserDel { user_id: String },
    UserLink { user_id: String, hash: String },
    UserUnlink { hash: String },
    AuthCode { service: String, url: Option<String>, token_prefix: String },
}

impl From<Commands> for AdminAction {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Token { action } => match action {
                TokenCommand::Add { description } => AdminAction::TokenAdd { description },
                TokenCommand::List => AdminAction::TokenList,
                TokenCommand::Del { prefix_or_hash } => AdminAction::TokenDel { prefix_or_hash },
            },
            Commands::User { action } => match action {
                UserCommand::Add => AdminAction::UserAdd,
                UserCommand::List => AdminAction::UserList,
                UserCommand::Del { user_id } => AdminAction::UserDel { user_id },
                UserCommand::Link { user_id, hash } => AdminAction::UserLink { user_id, hash },
                UserCommand::Unlink { hash } => AdminAction::UserUnlink { hash },
            },
            Commands::AuthCode(args) => {
                AdminAction::AuthCode { service: args.service, url: args.url, token_prefix: args.token_prefix }
            }
        }
    }
}
