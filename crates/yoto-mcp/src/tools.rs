//! The Yoto tool menu exposed over MCP.
//!
//! Each tool executor translates its invocation into authenticated HTTP
//! calls against the content API. Failures are converted to
//! human-readable error strings at this boundary; nothing throws past it.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use yoto_mcp_api::{card, ApiClient, Card, CardSummary};
use yoto_mcp_auth::{current_time_ms, AuthConfig, DeviceAuthorizer, TokenProvider};
use yoto_mcp_protocol::{McpServer, ServerTool, ToolExecutor};

/// Shared state behind all tool executors.
struct ToolDeps {
    auth: AuthConfig,
    tokens: TokenProvider,
    api: ApiClient,
}

/// Build the MCP server with the full Yoto tool menu registered.
pub fn build_server(auth: AuthConfig, api: ApiClient) -> McpServer {
    let deps = Arc::new(ToolDeps {
        tokens: TokenProvider::new(auth.clone()),
        auth,
        api,
    });

    let mut server = McpServer::new("yoto-mcp-server", env!("CARGO_PKG_VERSION"));

    server.register(ServerTool {
        name: "yoto-auth".to_string(),
        description: "Authenticate with the Yoto API using the device authorization flow"
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {},
        }),
        executor: Arc::new(AuthTool { deps: deps.clone() }),
    });

    server.register(ServerTool {
        name: "yoto-check-auth".to_string(),
        description: "Check if authenticated with the Yoto API".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {},
        }),
        executor: Arc::new(CheckAuthTool { deps: deps.clone() }),
    });

    server.register(ServerTool {
        name: "yoto-upload-audio".to_string(),
        description: "Upload an audio file to Yoto and create a new MYO card".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "audioFilePath": {
                    "type": "string",
                    "description": "Absolute path to the audio file (MP3)",
                },
                "title": {
                    "type": "string",
                    "description": "Title for the MYO card",
                },
            },
            "required": ["audioFilePath", "title"],
        }),
        executor: Arc::new(UploadAudioTool { deps: deps.clone() }),
    });

    server.register(ServerTool {
        name: "yoto-add-track".to_string(),
        description: "Add a track to an existing Yoto MYO card".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "cardId": {
                    "type": "string",
                    "description": "The card ID to add the track to",
                },
                "audioFilePath": {
                    "type": "string",
                    "description": "Absolute path to the audio file (MP3)",
                },
                "trackTitle": {
                    "type": "string",
                    "description": "Title for the track",
                },
            },
            "required": ["cardId", "audioFilePath", "trackTitle"],
        }),
        executor: Arc::new(AddTrackTool { deps: deps.clone() }),
    });

    server.register(ServerTool {
        name: "yoto-list-cards".to_string(),
        description: "List all MYO cards in your Yoto library".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {},
        }),
        executor: Arc::new(ListCardsTool { deps: deps.clone() }),
    });

    server.register(ServerTool {
        name: "yoto-get-card".to_string(),
        description: "Get details of a specific Yoto MYO card".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "cardId": {
                    "type": "string",
                    "description": "The card ID to retrieve",
                },
            },
            "required": ["cardId"],
        }),
        executor: Arc::new(GetCardTool { deps }),
    });

    server
}

/// Parse tool arguments against their schema type.
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {e}"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadAudioArgs {
    audio_file_path: String,
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTrackArgs {
    card_id: String,
    audio_file_path: String,
    track_title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetCardArgs {
    card_id: String,
}

/// Run the interactive device flow and persist the credential.
struct AuthTool {
    deps: Arc<ToolDeps>,
}

#[async_trait::async_trait]
impl ToolExecutor for AuthTool {
    async fn execute(&self, _args: Value) -> Result<String, String> {
        let credential = DeviceAuthorizer::new(self.deps.auth.clone())
            .run()
            .await
            .map_err(|e| e.to_string())?;
        self.deps
            .tokens
            .store()
            .save(&credential)
            .await
            .map_err(|e| e.to_string())?;

        Ok("Successfully authenticated with the Yoto API.".to_string())
    }
}

/// Report whether a usable credential is stored.
struct CheckAuthTool {
    deps: Arc<ToolDeps>,
}

#[async_trait::async_trait]
impl ToolExecutor for CheckAuthTool {
    async fn execute(&self, _args: Value) -> Result<String, String> {
        let credential = self.deps.tokens.store().load().await;
        if credential.usable_access_token(current_time_ms()).is_some() {
            Ok("Authenticated with the Yoto API.".to_string())
        } else {
            Ok("Not authenticated. Please run the yoto-auth tool.".to_string())
        }
    }
}

/// Upload an audio file and create a new single-track card.
struct UploadAudioTool {
    deps: Arc<ToolDeps>,
}

#[async_trait::async_trait]
impl ToolExecutor for UploadAudioTool {
    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UploadAudioArgs = parse_args(args)?;

        // One token per logical call, reused for every request below.
        let token = self.deps.tokens.access_token().await.map_err(|e| e.to_string())?;

        let bytes = tokio::fs::read(&args.audio_file_path)
            .await
            .map_err(|e| format!("Failed to read audio file {}: {e}", args.audio_file_path))?;

        let audio = self
            .deps
            .api
            .upload_and_transcode(&token, bytes)
            .await
            .map_err(|e| e.to_string())?;

        let document = card::new_card_document(&args.title, &audio);
        let created = self
            .deps
            .api
            .create_card(&token, &document)
            .await
            .map_err(|e| format!("Failed to create card: {e}"))?;

        Ok(format!(
            "Successfully uploaded audio to Yoto!\n\n\
             Card ID: {}\n\
             Title: {}\n\n\
             You can now link this card to a physical MYO card using the Yoto app or player.",
            created.card_id, created.title
        ))
    }
}

/// Append a track to an existing card.
struct AddTrackTool {
    deps: Arc<ToolDeps>,
}

#[async_trait::async_trait]
impl ToolExecutor for AddTrackTool {
    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: AddTrackArgs = parse_args(args)?;

        let token = self.deps.tokens.access_token().await.map_err(|e| e.to_string())?;

        // Fetch fresh so the append sees the current chapter sequence.
        let existing = self
            .deps
            .api
            .get_card(&token, &args.card_id)
            .await
            .map_err(|e| format!("Failed to get card: {e}"))?;

        let bytes = tokio::fs::read(&args.audio_file_path)
            .await
            .map_err(|e| format!("Failed to read audio file {}: {e}", args.audio_file_path))?;

        let audio = self
            .deps
            .api
            .upload_and_transcode(&token, bytes)
            .await
            .map_err(|e| e.to_string())?;

        let document = card::append_track(&existing, &args.track_title, &audio);
        let updated = self
            .deps
            .api
            .update_card(&token, &args.card_id, &document)
            .await
            .map_err(|e| format!("Failed to update card: {e}"))?;

        Ok(format!(
            "Successfully added track to card!\n\n\
             Card ID: {}\n\
             Card Title: {}\n\
             Track: {}",
            updated.card_id, updated.title, args.track_title
        ))
    }
}

/// List the MYO cards in the operator's library.
struct ListCardsTool {
    deps: Arc<ToolDeps>,
}

#[async_trait::async_trait]
impl ToolExecutor for ListCardsTool {
    async fn execute(&self, _args: Value) -> Result<String, String> {
        let token = self.deps.tokens.access_token().await.map_err(|e| e.to_string())?;
        let cards = self
            .deps
            .api
            .list_cards(&token)
            .await
            .map_err(|e| format!("Failed to list cards: {e}"))?;

        Ok(render_card_list(&cards))
    }
}

/// Show details of one card.
struct GetCardTool {
    deps: Arc<ToolDeps>,
}

#[async_trait::async_trait]
impl ToolExecutor for GetCardTool {
    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: GetCardArgs = parse_args(args)?;

        let token = self.deps.tokens.access_token().await.map_err(|e| e.to_string())?;
        let card = self
            .deps
            .api
            .get_card(&token, &args.card_id)
            .await
            .map_err(|e| format!("Failed to get card: {e}"))?;

        Ok(render_card_details(&card))
    }
}

/// Render the library listing.
fn render_card_list(cards: &[CardSummary]) -> String {
    if cards.is_empty() {
        return "No MYO cards found in your library.".to_string();
    }

    let lines: Vec<String> = cards
        .iter()
        .map(|card| format!("- {} (ID: {})", card.title, card.card_id))
        .collect();

    format!("Your MYO cards:\n\n{}", lines.join("\n"))
}

/// Render one card's details.
fn render_card_details(card: &Card) -> String {
    let mut text = format!(
        "Card details:\n\n\
         Title: {}\n\
         Card ID: {}\n\
         Chapters: {}\n\
         Tracks: {}",
        card.title,
        card.card_id,
        card.chapters().len(),
        card.track_count(),
    );

    if let Some(created_at) = &card.created_at {
        text.push_str(&format!("\nCreated: {}", format_created(created_at)));
    }

    text
}

/// Render a creation timestamp, falling back to the raw value.
fn format_created(created_at: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(created_at) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        Err(_) => created_at.to_string(),
    }
}
