//! GitHub REST: repository contents and issues.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::credentials::{Credential, CredentialResolver, ServiceKey};
use crate::error::{FailureCategory, Result, ToolkitError};
use crate::schema::Schema;
use crate::tools::{ParamError, ToolAdapter, ToolDescriptor, Toolkit, ToolkitCategory, TypedTool, Validate};
use crate::transport::{self, DynTransport, UpstreamRequest};
use crate::utils::ConfigValidator;

use super::{bearer, endpoint, normalize_base_url, require};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct RawContent {
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContents {
    File(RawContent),
    Directory(Vec<RawContent>),
}

#[derive(Clone, Debug, Serialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    /// `utf-8` when the blob decoded to text, otherwise `base64`.
    pub encoding: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Contents {
    File(FileContent),
    Directory { entries: Vec<DirectoryEntry> },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn decode_file(raw: RawContent) -> Result<FileContent> {
    let packed: String = raw
        .content
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let (encoding, content) = match raw.encoding.as_deref() {
        Some("base64") => {
            let bytes = STANDARD.decode(packed.as_bytes()).map_err(|err| {
                ToolkitError::execution(
                    ServiceKey::Github,
                    FailureCategory::Decode,
                    None,
                    format!("invalid base64 content for {}: {err}", raw.path),
                )
            })?;
            match String::from_utf8(bytes) {
                Ok(text) => ("utf-8", text),
                Err(_) => ("base64", packed),
            }
        }
        _ => ("utf-8", packed),
    };
    Ok(FileContent {
        name: raw.name,
        path: raw.path,
        sha: raw.sha,
        size: raw.size,
        encoding,
        content,
        html_url: raw.html_url,
        download_url: raw.download_url,
    })
}

#[derive(Clone)]
pub struct GithubClient {
    transport: DynTransport,
    base_url: String,
}

impl GithubClient {
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

    fn request(
        &self,
        credential: &Credential,
        request: UpstreamRequest,
    ) -> Result<UpstreamRequest> {
        Ok(request
            .header("Authorization", bearer(credential)?)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    pub async fn get_file_contents(
        &self,
        credential: &Credential,
        owner: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Contents> {
        let mut segments = vec!["repos", owner, repo, "contents"];
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        let url = endpoint(&self.base_url, &segments)?;
        let mut request =
            self.request(credential, UpstreamRequest::get(ServiceKey::Github, "contents", url))?;
        if let Some(branch) = branch {
            request = request.query("ref", branch);
        }
        let raw: RawContents = transport::execute(self.transport.as_ref(), request)
            .await?
            .json(ServiceKey::Github)?;
        match raw {
            RawContents::File(file) => decode_file(file).map(Contents::File),
            RawContents::Directory(entries) => Ok(Contents::Directory {
                entries: entries
                    .into_iter()
                    .map(|entry| DirectoryEntry {
                        name: entry.name,
                        path: entry.path,
                        sha: entry.sha,
                        size: entry.size,
                        kind: entry.kind,
                    })
                    .collect(),
            }),
        }
    }

    pub async fn create_issue(
        &self,
        credential: &Credential,
        owner: &str,
        repo: &str,
        issue: &CreateIssueParams,
    ) -> Result<Issue> {
        let url = endpoint(&self.base_url, &["repos", owner, repo, "issues"])?;
        let mut body = json!({ "title": issue.title });
        if let Some(text) = &issue.body {
            body["body"] = json!(text);
        }
        if let Some(assignees) = &issue.assignees {
            body["assignees"] = json!(assignees);
        }
        if let Some(labels) = &issue.labels {
            body["labels"] = json!(labels);
        }
        if let Some(milestone) = issue.milestone {
            body["milestone"] = json!(milestone);
        }
        let request = self.request(
            credential,
            UpstreamRequest::post(ServiceKey::Github, "issues", url).json(body),
        )?;
        transport::execute(self.transport.as_ref(), request)
            .await?
            .json(ServiceKey::Github)
    }
}

fn check_repo(owner: &str, repo: &str) -> std::result::Result<(), ParamError> {
    if let Some(problem) = ConfigValidator::check_slug(owner) {
        return Err(ParamError::new("owner", problem));
    }
    if let Some(problem) = ConfigValidator::check_slug(repo) {
        return Err(ParamError::new("repo", problem));
    }
    Ok(())
}

/// Segments are encoded when the URL is built; `%` is refused outright so a
/// pre-encoded `%2e%2e` cannot reach the upstream as a parent segment.
fn check_repo_path(path: &str) -> std::result::Result<(), ParamError> {
    if path.contains(['%', '?', '#', '\\']) {
        return Err(ParamError::new("path", "must not contain `%`, `?`, `#` or `\\`"));
    }
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(ParamError::new("path", "must not contain `.` or `..` segments"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct GetFileContentsParams {
    pub owner: String,
    pub repo: String,
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Validate for GetFileContentsParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        check_repo(&self.owner, &self.repo)?;
        check_repo_path(&self.path)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueParams {
    pub owner: String,
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assignees: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub milestone: Option<u64>,
}

impl Validate for CreateIssueParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        check_repo(&self.owner, &self.repo)?;
        match ConfigValidator::check_non_empty(&self.title) {
            Some(problem) => Err(ParamError::new("title", problem)),
            None => Ok(()),
        }
    }
}

fn repo_schema() -> Schema {
    Schema::object()
        .required_property("owner", Schema::string().with_description("Repository owner"))
        .required_property("repo", Schema::string().with_description("Repository name"))
}

static GET_FILE_CONTENTS: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("github_get_file_contents", ServiceKey::Github)
        .description("Get the contents of a file or directory from a GitHub repository")
        .instructions("File contents are returned decoded; binary files stay base64")
        .parameters(
            repo_schema()
                .required_property("path", Schema::string().with_description("Path inside the repository"))
                .property("branch", Schema::string().optional())
                .deny_additional(),
        )
        .result(
            Schema::object()
                .required_property("kind", Schema::one_of(["file", "directory"]))
                .property("content", Schema::string())
                .property("entries", Schema::array(Schema::object())),
        )
        .tag("code")
        .build()
});

static CREATE_ISSUE: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("github_create_issue", ServiceKey::Github)
        .description("Create a new issue in a GitHub repository")
        .instructions("Only the fields given are sent; labels and assignees must already exist")
        .parameters(
            repo_schema()
                .required_property("title", Schema::string())
                .property("body", Schema::string().optional())
                .property("assignees", Schema::array(Schema::string()).optional())
                .property("labels", Schema::array(Schema::string()).optional())
                .property("milestone", Schema::integer().optional())
                .deny_additional(),
        )
        .result(
            Schema::object()
                .required_property("number", Schema::integer())
                .required_property("html_url", Schema::string()),
        )
        .tag("code")
        .build()
});

pub struct GithubGetFileContents {
    client: GithubClient,
}

#[async_trait]
impl TypedTool for GithubGetFileContents {
    type Params = GetFileContentsParams;
    type Output = Contents;

    fn descriptor(&self) -> &ToolDescriptor {
        &GET_FILE_CONTENTS
    }

    async fn execute(
        &self,
        params: GetFileContentsParams,
        credential: Option<&Credential>,
    ) -> Result<Contents> {
        self.client
            .get_file_contents(
                require(ServiceKey::Github, credential)?,
                &params.owner,
                &params.repo,
                &params.path,
                params.branch.as_deref(),
            )
            .await
    }
}

pub struct GithubCreateIssue {
    client: GithubClient,
}

#[async_trait]
impl TypedTool for GithubCreateIssue {
    type Params = CreateIssueParams;
    type Output = Issue;

    fn descriptor(&self) -> &ToolDescriptor {
        &CREATE_ISSUE
    }

    async fn execute(&self, params: CreateIssueParams, credential: Option<&Credential>) -> Result<Issue> {
        self.client
            .create_issue(
                require(ServiceKey::Github, credential)?,
                &params.owner,
                &params.repo,
                &params,
            )
            .await
    }
}

pub fn toolkit(client: GithubClient, resolver: &CredentialResolver) -> Result<Toolkit> {
    Toolkit::builder("github_toolkit", "GitHub Toolkit")
        .description("Tools for reading repositories and managing issues on GitHub")
        .service(ServiceKey::Github)
        .category(ToolkitCategory::Tool)
        .requires_config(true)
        .tool(
            ToolAdapter::new(
                GithubGetFileContents {
                    client: client.clone(),
                },
                resolver.clone(),
            )
            .into_dyn(),
        )
        .tool(ToolAdapter::new(GithubCreateIssue { client }, resolver.clone()).into_dyn())
        .build()
}
