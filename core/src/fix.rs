use std::io;
use std::path::Path;
use std::process::Command;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

/// Environment variable holding the API key for the fix-generation service.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const SYSTEM_PROMPT: &str =
    "You are an expert Python programmer. Help resolve code errors efficiently.";

/// The payload shape handed to the fix-generation service. Exactly one
/// request is in flight per invocation, synchronously, with no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    pub error_text: String,
    pub output_text: String,
    pub file_contents: String,
    pub instruction: Option<String>,
}

#[derive(Debug, Error)]
pub enum FixError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("fix request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fix service returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("fix service returned no text content")]
    EmptyResponse,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<TextBlock>,
}

#[derive(Serialize)]
struct TextBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl TextBlock {
    fn text(text: String) -> Self {
        Self { kind: "text", text }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the external fix-generation service.
pub struct FixClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl FixClient {
    /// Build from `ANTHROPIC_API_KEY`, targeting the production endpoint.
    pub fn from_env() -> Result<Self, FixError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| FixError::MissingApiKey)?;
        Ok(Self::new(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL))
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Send one fix request and return the service's free-form text reply.
    pub async fn generate_fix(&self, request: &FixRequest) -> Result<String, FixError> {
        let mut content = vec![
            TextBlock::text(format!(
                "I encountered the following error:\n\n{}",
                request.error_text
            )),
            TextBlock::text(format!(
                "Here is the most recent console output:\n\n{}",
                request.output_text
            )),
            TextBlock::text(format!(
                "Here are the contents of some recent Python files:\n\n{}",
                request.file_contents
            )),
        ];
        if let Some(instruction) = &request.instruction {
            content.push(TextBlock::text(format!(
                "Additional instruction: {instruction}"
            )));
        }

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FixError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or(FixError::EmptyResponse)
    }
}

/// The service's reply, split into code and commentary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFix {
    /// True when the reply embedded a Python code fence; the caller saves the
    /// text as a runnable solution file. Otherwise the text is prose to show
    /// verbatim.
    pub has_code: bool,
    pub text: String,
}

/// Split a reply on ```` ```python ```` fences: fenced lines pass through as
/// code, prose lines become `#` comments ahead of it. A reply with no fence
/// comes back verbatim.
pub fn parse_fix_output(output: &str) -> ParsedFix {
    let mut code_lines: Vec<&str> = Vec::new();
    let mut comment_lines: Vec<String> = Vec::new();
    let mut inside_code_block = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed == "```python" {
            inside_code_block = true;
            continue;
        }
        if trimmed == "```" {
            inside_code_block = false;
            continue;
        }
        if inside_code_block {
            code_lines.push(line);
        } else if !trimmed.is_empty() {
            comment_lines.push(format!("# {line}"));
        }
    }

    if code_lines.is_empty() {
        return ParsedFix {
            has_code: false,
            text: output.to_string(),
        };
    }

    let mut text = comment_lines.join("\n");
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(&code_lines.join("\n"));
    ParsedFix {
        has_code: true,
        text,
    }
}

/// Write the generated solution to its fixed location, creating the parent
/// directory as needed.
pub fn save_solution(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

/// Open the solution in VS Code when its CLI is available. Failure is logged
/// and never fatal; the solution file already exists on disk.
pub fn open_in_editor(path: &Path) {
    let code = match which::which("code") {
        Ok(code) => code,
        Err(_) => {
            warn!("VS Code CLI 'code' not found on PATH; skipping editor open");
            return;
        }
    };
    match Command::new(code).arg(path).status() {
        Ok(status) if status.success() => {
            info!("opened {} in VS Code", path.display());
        }
        Ok(status) => {
            warn!("'code {}' exited with {status}", path.display());
        }
        Err(error) => {
            warn!("failed to launch VS Code for {}: {error}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_string_contains;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    fn sample_request() -> FixRequest {
        FixRequest {
            error_text: "NameError: name 'x' is not defined".to_string(),
            output_text: "running step 3".to_string(),
            file_contents: "\n--- /d/app.py ---\nprint(x)\n".to_string(),
            instruction: Some("keep it short".to_string()),
        }
    }

    #[tokio::test]
    async fn generate_fix_posts_context_and_returns_reply_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_string_contains("NameError"))
            .and(body_string_contains("running step 3"))
            .and(body_string_contains("Additional instruction: keep it short"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "Define x before use."}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FixClient::new("test-key", server.uri(), DEFAULT_MODEL);
        let reply = client.generate_fix(&sample_request()).await.expect("fix");
        assert_eq!(reply, "Define x before use.");
    }

    #[tokio::test]
    async fn non_success_status_is_a_terminal_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let client = FixClient::new("test-key", server.uri(), DEFAULT_MODEL);
        let err = client
            .generate_fix(&sample_request())
            .await
            .expect_err("should fail");
        assert!(matches!(err, FixError::Api { status: 429, .. }));
    }

    #[test]
    fn fenced_reply_becomes_comments_then_code() {
        let reply = "The variable is undefined.\n```python\nx = 1\nprint(x)\n```\nThat should do it.";
        let parsed = parse_fix_output(reply);
        assert!(parsed.has_code);
        assert_eq!(
            parsed.text,
            "# The variable is undefined.\n# That should do it.\n\nx = 1\nprint(x)"
        );
    }

    #[test]
    fn prose_only_reply_is_returned_verbatim() {
        let reply = "Your script looks fine; rerun it with python3.";
        let parsed = parse_fix_output(reply);
        assert!(!parsed.has_code);
        assert_eq!(parsed.text, reply);
    }

    #[test]
    fn save_solution_creates_parent_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let target = tmp.path().join("nested/.cw/solution.py");
        save_solution(&target, "x = 1\n").expect("save");
        assert_eq!(
            std::fs::read_to_string(&target).expect("read"),
            "x = 1\n"
        );
    }
}
