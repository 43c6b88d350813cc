use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum AutoSaveError {
    #[error("save failed: {message}")]
    Save { message: String },
    #[error("autosave watcher stopped")]
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutoSaveStatus {
    pub is_saving: bool,
    pub has_unsaved_changes: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AutoSaveOptions {
    pub delay: Duration,
    pub enabled: bool,
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DEBOUNCE,
            enabled: true,
        }
    }
}

enum Command {
    SaveNow(oneshot::Sender<Result<(), AutoSaveError>>),
    SetEnabled(bool),
}

/// Trailing-debounce persistence over a watched value.
///
/// Every change restarts the timer; rapid edits collapse into one save of
/// the final value per quiet period. Saves run inside the watcher task, so
/// they are serialized by construction: a `save_now` issued mid-flight
/// queues behind the running save and re-evaluates afterwards instead of
/// launching a duplicate. A save only happens when the value differs from
/// the last successfully saved one; a failed save keeps the unsaved flag
/// set so a later edit or manual save retries.
///
/// Dropping the handle aborts the watcher, cancelling any pending timer.
pub struct AutoSave {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<AutoSaveStatus>,
    task: tokio::task::JoinHandle<()>,
}

impl AutoSave {
    pub fn spawn<F, Fut, E>(
        mut value: watch::Receiver<String>,
        options: AutoSaveOptions,
        mut save: F,
    ) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send,
        E: std::fmt::Display + Send + 'static,
    {
        let (status_tx, status_rx) = watch::channel(AutoSaveStatus::default());
        let (command_tx, mut command_rx) = mpsc::channel::<Command>(16);

        // The baseline is captured before the watcher task first runs, so
        // an edit landing between spawn and the first poll still counts as
        // unsaved instead of becoming the baseline itself.
        let initial = value.borrow().clone();
        let task = tokio::spawn(async move {
            let mut enabled = options.enabled;
            let mut last_saved = initial;
            let mut deadline: Option<Instant> = None;

            loop {
                tokio::select! {
                    changed = value.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if !enabled {
                            continue;
                        }
                        if *value.borrow() == last_saved {
                            // edited back to the saved value inside the window
                            status_tx.send_modify(|status| status.has_unsaved_changes = false);
                            deadline = None;
                        } else {
                            status_tx.send_modify(|status| status.has_unsaved_changes = true);
                            deadline = Some(Instant::now() + options.delay);
                        }
                    }
                    () = sleep_until_deadline(deadline), if deadline.is_some() => {
                        deadline = None;
                        let _ = perform_save(&mut save, &value, &mut last_saved, &status_tx).await;
                    }
                    command = command_rx.recv() => match command {
                        Some(Command::SaveNow(ack)) => {
                            deadline = None;
                            let result =
                                perform_save(&mut save, &value, &mut last_saved, &status_tx).await;
                            let _ = ack.send(result);
                        }
                        Some(Command::SetEnabled(on)) => {
                            enabled = on;
                            if !enabled {
                                deadline = None;
                            }
                        }
                        None => break,
                    }
                }
            }
        });

        Self {
            commands: command_tx,
            status: status_rx,
            task,
        }
    }

    pub fn status(&self) -> AutoSaveStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<AutoSaveStatus> {
        self.status.clone()
    }

    /// Cancels any pending timer and saves the current value immediately,
    /// waiting for the result.
    pub async fn save_now(&self) -> Result<(), AutoSaveError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::SaveNow(ack_tx))
            .await
            .map_err(|_| AutoSaveError::Stopped)?;
        ack_rx.await.map_err(|_| AutoSaveError::Stopped)?
    }

    /// While disabled, value changes never schedule a save. Used to keep
    /// autosave out of the way of streamed generation writes.
    pub async fn set_enabled(&self, enabled: bool) {
        let _ = self.commands.send(Command::SetEnabled(enabled)).await;
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn perform_save<F, Fut, E>(
    save: &mut F,
    value: &watch::Receiver<String>,
    last_saved: &mut String,
    status: &watch::Sender<AutoSaveStatus>,
) -> Result<(), AutoSaveError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let current = value.borrow().clone();
    if current == *last_saved {
        status.send_modify(|status| status.has_unsaved_changes = false);
        return Ok(());
    }
    status.send_modify(|status| status.is_saving = true);
    match save(current.clone()).await {
        Ok(()) => {
            *last_saved = current;
            status.send_modify(|status| {
                status.is_saving = false;
                status.has_unsaved_changes = false;
                status.last_saved_at = Some(Utc::now());
                status.last_error = None;
            });
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(error = %message, "autosave failed");
            status.send_modify(|status| {
                status.is_saving = false;
                status.last_error = Some(message.clone());
            });
            Err(AutoSaveError::Save { message })
        }
    }
}
