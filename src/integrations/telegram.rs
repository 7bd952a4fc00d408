//! Telegram Bot API messaging.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::credentials::{Credential, CredentialResolver, ServiceKey};
use crate::error::{FailureCategory, Result, ToolkitError};
use crate::schema::Schema;
use crate::tools::{ParamError, ToolAdapter, ToolDescriptor, Toolkit, ToolkitCategory, TypedTool, Validate};
use crate::transport::{self, DynTransport, UpstreamRequest};

use super::{normalize_base_url, primary, require};

pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
    #[serde(rename = "Markdown")]
    Markdown,
    #[serde(rename = "HTML")]
    Html,
}

impl ParseMode {
    /// Escapes `text` so it renders literally under this mode.
    pub fn escape(&self, text: &str) -> String {
        match self {
            ParseMode::MarkdownV2 => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    if MARKDOWN_V2_SPECIAL.contains(&c) {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out
            }
            ParseMode::Html => text
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;"),
            ParseMode::Markdown => text.to_string(),
        }
    }
}

/// Numeric chat id or `@channel` username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

#[derive(Debug, Deserialize)]
pub struct SendMessageParams {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(default)]
    pub parse_mode: Option<ParseMode>,
    #[serde(default)]
    pub disable_web_page_preview: Option<bool>,
    #[serde(default)]
    pub disable_notification: Option<bool>,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
}

impl Validate for SendMessageParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        if let ChatId::Username(name) = &self.chat_id {
            let numeric = name.parse::<i64>().is_ok();
            if !numeric && !name.starts_with('@') {
                return Err(ParamError::new(
                    "chat_id",
                    "must be a numeric id or an @username",
                ));
            }
        }
        if self.text.trim().is_empty() {
            return Err(ParamError::new("text", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a ChatId,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_web_page_preview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_notification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramClient {
    transport: DynTransport,
    base_url: String,
}

impl TelegramClient {
    pub fn new(transport: DynTransport) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub async fn send_message(
        &self,
        credential: &Credential,
        params: &SendMessageParams,
    ) -> Result<TelegramMessage> {
        let token = primary(credential)?;
        let body = SendMessageBody {
            chat_id: &params.chat_id,
            text: match params.parse_mode {
                Some(mode) => mode.escape(&params.text),
                None => params.text.clone(),
            },
            parse_mode: params.parse_mode,
            disable_web_page_preview: params.disable_web_page_preview,
            disable_notification: params.disable_notification,
            reply_to_message_id: params.reply_to_message_id,
        };
        let body = serde_json::to_value(&body).map_err(|err| ToolkitError::Other(err.into()))?;
        let request = UpstreamRequest::post(
            ServiceKey::Telegram,
            "sendMessage",
            format!("{}/bot{token}/sendMessage", self.base_url),
        )
        .json(body);
        let response = transport::execute(self.transport.as_ref(), request).await?;
        let envelope: BotResponse<TelegramMessage> = response.json(ServiceKey::Telegram)?;
        match envelope {
            BotResponse {
                ok: true,
                result: Some(message),
                ..
            } => Ok(message),
            BotResponse { description, .. } => Err(ToolkitError::execution(
                ServiceKey::Telegram,
                FailureCategory::Upstream,
                Some(response.status),
                description.unwrap_or_else(|| "request was not ok".to_string()),
            )),
        }
    }
}

static SEND_MESSAGE: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("telegram_send_message", ServiceKey::Telegram)
        .description("Send a text message to a Telegram chat")
        .instructions("Text is escaped for the chosen parse mode")
        .parameters(
            Schema::object()
                .required_property(
                    "chat_id",
                    Schema::any().with_description("Numeric chat id or @channel username"),
                )
                .required_property("text", Schema::string())
                .property(
                    "parse_mode",
                    Schema::one_of(["MarkdownV2", "Markdown", "HTML"]).optional(),
                )
                .property("disable_web_page_preview", Schema::boolean().optional())
                .property("disable_notification", Schema::boolean().optional())
                .property("reply_to_message_id", Schema::integer().optional())
                .deny_additional(),
        )
        .result(
            Schema::object()
                .required_property("message_id", Schema::integer())
                .required_property("chat", Schema::object()),
        )
        .tag("messaging")
        .build()
});

pub struct TelegramSendMessage {
    client: TelegramClient,
}

#[async_trait]
impl TypedTool for TelegramSendMessage {
    type Params = SendMessageParams;
    type Output = TelegramMessage;

    fn descriptor(&self) -> &ToolDescriptor {
        &SEND_MESSAGE
    }

    async fn execute(
        &self,
        params: SendMessageParams,
        credential: Option<&Credential>,
    ) -> Result<TelegramMessage> {
        self.client
            .send_message(require(ServiceKey::Telegram, credential)?, &params)
            .await
    }
}

pub fn toolkit(client: TelegramClient, resolver: &CredentialResolver) -> Result<Toolkit> {
    Toolkit::builder("telegram_toolkit", "Telegram Toolkit")
        .description("Tools for sending messages through a Telegram bot")
        .service(ServiceKey::Telegram)
        .category(ToolkitCategory::Channel)
        .requires_config(true)
        .tool(ToolAdapter::new(TelegramSendMessage { client }, resolver.clone()).into_dyn())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::context::{self, InvocationContext};
    use crate::transport::HttpTransport;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn telegram(server: &MockServer) -> Toolkit {
        let resolver = CredentialResolver::new(Arc::new(ProviderSettings::default()));
        let transport: DynTransport = Arc::new(HttpTransport::new().unwrap());
        toolkit(TelegramClient::new(transport).with_base_url(&server.uri()), &resolver).unwrap()
    }

    fn bot(token: &str) -> Arc<InvocationContext> {
        Arc::new(
            InvocationContext::builder()
                .auth("telegram_bot_token", json!({ "bot_token": token }))
                .build(),
        )
    }

    #[test]
    fn escapes_for_parse_mode() {
        assert_eq!(ParseMode::MarkdownV2.escape("1+1=2."), "1\\+1\\=2\\.");
        assert_eq!(ParseMode::Html.escape("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(ParseMode::Markdown.escape("*x*"), "*x*");
    }

    #[tokio::test]
    async fn token_goes_in_the_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "@news", "text": "hi\\!", "parse_mode": "MarkdownV2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 9, "chat": {"id": -100, "type": "channel"}, "date": 1700000000, "text": "hi!"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = context::scope(
            bot("123:ABC"),
            telegram(&server).run_tool(
                "telegram_send_message",
                json!({"chat_id": "@news", "text": "hi!", "parse_mode": "MarkdownV2"}),
            ),
        )
        .await
        .unwrap();
        assert_eq!(out["message_id"], 9);
        assert_eq!(out["chat"]["type"], "channel");
    }

    #[tokio::test]
    async fn not_ok_is_an_upstream_failure_without_the_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = context::scope(
            bot("999:SECRET"),
            telegram(&server).run_tool("telegram_send_message", json!({"chat_id": 5, "text": "x"})),
        )
        .await
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("chat not found"), "{text}");
        assert!(!text.contains("SECRET"), "{text}");
    }

    #[tokio::test]
    async fn ok_without_result_is_an_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = context::scope(
            bot("1:A"),
            telegram(&server).run_tool("telegram_send_message", json!({"chat_id": 5, "text": "x"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ToolkitError::ToolExecution {
                category: FailureCategory::Upstream,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn bad_chat_id_is_rejected() {
        let server = MockServer::start().await;
        let err = context::scope(
            bot("1:A"),
            telegram(&server).run_tool("telegram_send_message", json!({"chat_id": "news", "text": "x"})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
