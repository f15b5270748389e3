//! Backend commands queued from UI to backend worker.

use shared::domain::GitRepoUrl;

pub enum BackendCommand {
    /// Trigger a deployment and follow its log stream. The worker reuses the
    /// slug from an earlier acceptance automatically, so redeploy is the same
    /// command.
    Deploy { repo: GitRepoUrl },
}
