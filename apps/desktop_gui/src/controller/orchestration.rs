//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::Deploy { .. } => "deploy",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use shared::domain::GitRepoUrl;

    fn deploy_cmd() -> BackendCommand {
        BackendCommand::Deploy {
            repo: GitRepoUrl::parse("github.com/rust-lang/cargo").expect("valid repo url"),
        }
    }

    #[test]
    fn full_queue_surfaces_a_status_message() {
        let (cmd_tx, _cmd_rx) = bounded::<BackendCommand>(1);
        cmd_tx.try_send(deploy_cmd()).expect("fill the queue");

        let mut status = "Idle".to_string();
        dispatch_backend_command(&cmd_tx, deploy_cmd(), &mut status);
        assert!(status.contains("queue is full"), "{status}");
    }

    #[test]
    fn disconnected_backend_surfaces_a_status_message() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(1);
        drop(cmd_rx);

        let mut status = "Idle".to_string();
        dispatch_backend_command(&cmd_tx, deploy_cmd(), &mut status);
        assert!(status.contains("disconnected"), "{status}");
    }

    #[test]
    fn successful_dispatch_queues_without_touching_status() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(4);

        let mut status = "Idle".to_string();
        dispatch_backend_command(&cmd_tx, deploy_cmd(), &mut status);
        assert_eq!(status, "Idle");
        assert!(cmd_rx.try_recv().is_ok());
    }
}
