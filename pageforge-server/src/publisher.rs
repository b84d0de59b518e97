//! Publisher: materialize a build into a fresh working copy and push it.
//!
//! Each publish gets its own temporary directory, removed when the publish
//! returns on any path. Round 1 (or a repository that did not exist yet)
//! writes every file from scratch. Later rounds on an existing repository
//! never replace the published page: `index.html` gets an annotation comment,
//! the new page lands in `round{N}.html`, and the README grows a section.

use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;

use crate::error::BuildError;
use crate::git::{self, Vcs};
use crate::model::{PublishMode, PublishResult, RepositoryTarget, ValidatedRequest};

/// Identity and credentials used for every publish.
#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub owner: String,
    pub token: String,
    pub committer_name: String,
    pub committer_email: String,
}

pub struct Publisher {
    vcs: Arc<dyn Vcs>,
    settings: PublisherSettings,
}

impl Publisher {
    pub fn new(vcs: Arc<dyn Vcs>, settings: PublisherSettings) -> Self {
        Self { vcs, settings }
    }

    pub async fn publish(
        &self,
        target: &RepositoryTarget,
        page: &str,
        request: &ValidatedRequest,
    ) -> Result<PublishResult, BuildError> {
        let mode = PublishMode::for_target(target.exists, request.round);
        let commit_message = mode.commit_message(request.round);

        let tmp = tempfile::Builder::new()
            .prefix("pageforge-")
            .tempdir()
            .map_err(|e| BuildError::Publish(format!("could not create working directory: {e}")))?;
        let workdir = tmp.path().join("repo");

        let url = git::authenticated_url(&target.clone_url, &self.settings.owner, &self.settings.token)
            .map_err(publish_error)?;
        self.vcs.clone_repo(&url, &workdir).await.map_err(publish_error)?;
        self.vcs
            .set_identity(&workdir, &self.settings.committer_name, &self.settings.committer_email)
            .await
            .map_err(publish_error)?;

        write_files(&workdir, mode, target, page, request, &self.settings.owner)
            .await
            .map_err(|e| BuildError::Publish(format!("could not write files: {e}")))?;

        let commit_sha = self
            .vcs
            .commit_all(&workdir, &commit_message)
            .await
            .map_err(publish_error)?;
        self.vcs.push(&workdir).await.map_err(publish_error)?;

        tracing::info!(
            repo = %target.name,
            round = request.round,
            commit = %commit_sha,
            message = %commit_message,
            "pushed"
        );

        Ok(PublishResult {
            repo_url: target.html_url.clone(),
            clone_url: target.clone_url.clone(),
            mode,
            commit_message,
            commit_sha,
        })
    }
}

fn publish_error(e: git::GitError) -> BuildError {
    BuildError::Publish(e.to_string())
}

async fn write_files(
    dir: &Path,
    mode: PublishMode,
    target: &RepositoryTarget,
    page: &str,
    request: &ValidatedRequest,
    owner: &str,
) -> std::io::Result<()> {
    let index = dir.join("index.html");
    let readme = dir.join("README.md");

    match mode {
        PublishMode::Initial => {
            tokio::fs::write(&index, page).await?;
            tokio::fs::write(&readme, render_readme(target, request)).await?;
        }
        PublishMode::Update => {
            let current = read_or_empty(&index).await?;
            let base = if current.trim().is_empty() { page.to_string() } else { current };
            tokio::fs::write(&index, annotate_page(&base, request.round, &request.brief)).await?;
            tokio::fs::write(dir.join(format!("round{}.html", request.round)), page).await?;

            let current = read_or_empty(&readme).await?;
            let base = if current.trim().is_empty() {
                render_readme(target, request)
            } else {
                current
            };
            tokio::fs::write(&readme, append_round_section(&base, request.round, &request.brief)).await?;
        }
    }

    tokio::fs::write(dir.join("LICENSE"), mit_license(chrono::Utc::now().year(), owner)).await
}

async fn read_or_empty(path: &Path) -> std::io::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

pub fn render_readme(target: &RepositoryTarget, request: &ValidatedRequest) -> String {
    format!(
        "# {name}\n\n\
         Auto-generated for **{task}** round **{round}**.\n\n\
         ## Brief\n\n\
         {brief}\n\n\
         ## Live site\n\n\
         {pages}\n\n\
         ## License\n\n\
         MIT, see [LICENSE](LICENSE).\n",
        name = target.name,
        task = request.task,
        round = request.round,
        brief = request.brief,
        pages = target.pages_url,
    )
}

/// Append a "Round N Updates" section after the existing README content.
pub fn append_round_section(readme: &str, round: u32, brief: &str) -> String {
    format!("{}\n\n## Round {round} Updates\n\n{brief}\n", readme.trim_end())
}

/// Append an HTML comment recording a later round's brief.
pub fn annotate_page(page: &str, round: u32, brief: &str) -> String {
    let mut text = brief.replace('\n', " ");
    // "--" is not allowed inside an HTML comment.
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    format!(
        "{}\n<!-- Round {round} update: {text} (see round{round}.html) -->\n",
        page.trim_end()
    )
}

pub fn mit_license(year: i32, holder: &str) -> String {
    format!(
        "MIT License

Copyright (c) {year} {holder}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"
    )
}
