use std::collections::HashMap;

use sf_api::{ApiClient, ApiError};
use sf_core::{ProjectId, Stage, StageNavigator, StageType, VersionId};
use sf_stream::{GenerateRequest, GenerationSession, SessionEvent};
use tokio::sync::{broadcast, watch};

use crate::autosave::{AutoSave, AutoSaveOptions, AutoSaveStatus};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::versions::VersionStore;

/// How a generation run ended, from the editor's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed { content: String },
    Failed { message: String },
    Cancelled,
    AlreadyRunning,
}

/// One project open for editing: the stage selection, the cached stage
/// records, the live content value, the stage-scoped autosave watcher and
/// the streaming generation session, wired together.
///
/// The server stays the source of truth for statuses and version numbers;
/// this session only holds the latest content it has seen. The streamed
/// buffer and the autosaved value are the same watched channel, with
/// autosave torn down for the duration of a generation so the two writers
/// never interleave.
pub struct EditorSession {
    api: ApiClient,
    project: ProjectId,
    navigator: StageNavigator,
    stages: HashMap<StageType, Stage>,
    content: watch::Sender<String>,
    // absent while a generation is streaming into the content channel
    autosave: Option<AutoSave>,
    generation: GenerationSession,
    events: EventBus,
}

impl EditorSession {
    /// Loads every stage the server knows about, selects the first stage
    /// and arms autosave for it.
    pub async fn open(api: ApiClient, project: ProjectId) -> Result<Self, EngineError> {
        let stages = api.stages().fetch_all(project).await?;
        let generation = GenerationSession::from_endpoint(&format!(
            "{}/ai/ws/generate",
            api.config().ws_base_url()
        ))?;
        let events = EventBus::new(64);

        let navigator = StageNavigator::default();
        let initial = stages
            .get(&navigator.current())
            .map(|stage| stage.content.clone())
            .unwrap_or_default();
        let (content, autosave) = arm_autosave(
            &api,
            &events,
            project,
            navigator.current(),
            initial,
        );

        Ok(Self {
            api,
            project,
            navigator,
            stages,
            content,
            autosave: Some(autosave),
            generation,
            events,
        })
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn current_stage(&self) -> StageType {
        self.navigator.current()
    }

    pub fn navigator(&self) -> &StageNavigator {
        &self.navigator
    }

    pub fn stage(&self, stage: StageType) -> Option<&Stage> {
        self.stages.get(&stage)
    }

    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    pub fn watch_content(&self) -> watch::Receiver<String> {
        self.content.subscribe()
    }

    pub fn set_content(&self, text: impl Into<String>) {
        self.content.send_replace(text.into());
    }

    pub fn autosave_status(&self) -> AutoSaveStatus {
        self.autosave
            .as_ref()
            .map(AutoSave::status)
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn generation(&self) -> &GenerationSession {
        &self.generation
    }

    /// Version history access for the currently selected stage.
    pub fn version_store(&self) -> VersionStore {
        VersionStore::new(self.api.clone(), self.project, self.navigator.current())
    }

    /// Saves the current content right now, skipping the debounce window.
    /// A no-op while a generation is streaming; the server persists the
    /// result of that itself.
    pub async fn save_now(&self) -> Result<(), EngineError> {
        if let Some(autosave) = &self.autosave {
            autosave.save_now().await?;
        }
        Ok(())
    }

    /// Selects a stage. Any pending save is flushed first; a flush failure
    /// is reported through the event bus but does not block the switch,
    /// since the unsent content stays cached locally. A generation still
    /// running for the old stage is stopped.
    pub async fn navigate_to(&mut self, stage: StageType) -> Result<(), EngineError> {
        if stage == self.navigator.current() {
            return Ok(());
        }
        if self.generation.is_generating() {
            self.generation.stop();
        }
        if let Some(autosave) = &self.autosave {
            if let Err(err) = autosave.save_now().await {
                tracing::warn!(error = %err, "pending save failed during stage switch");
            }
        }
        self.stash_current_content();

        self.navigator.navigate_to(stage);
        let initial = self.ensure_cached(stage).await?;
        self.rearm(initial, None);
        Ok(())
    }

    /// Advances to the next stage; `false` at the last stage.
    pub async fn next(&mut self) -> Result<bool, EngineError> {
        match self.navigator.current().next() {
            Some(stage) => {
                self.navigate_to(stage).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Steps back to the previous stage; `false` at the first stage.
    pub async fn prev(&mut self) -> Result<bool, EngineError> {
        match self.navigator.current().prev() {
            Some(stage) => {
                self.navigate_to(stage).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs a streamed generation for the current stage to completion,
    /// forwarding tokens into the live content value as they arrive.
    ///
    /// Autosave is torn down for the duration; the server persists the
    /// result itself, so on completion the stage is re-fetched and autosave
    /// re-armed against the persisted content. On failure or an early close
    /// the partial content stays in the editor, marked unsaved so the
    /// ordinary debounce path picks it up.
    pub async fn generate(
        &mut self,
        settings_id: Option<i64>,
        custom_prompt: Option<String>,
    ) -> Result<GenerationOutcome, EngineError> {
        if self.generation.is_generating() {
            return Ok(GenerationOutcome::AlreadyRunning);
        }
        let stage = self.navigator.current();
        let saved = self
            .stages
            .get(&stage)
            .map(|record| record.content.clone())
            .unwrap_or_default();

        let mut session_events = self.generation.subscribe();
        let mut request = GenerateRequest::new(self.project, stage);
        request.settings_id = settings_id;
        request.custom_prompt = custom_prompt;
        if !self.generation.generate(request) {
            return Ok(GenerationOutcome::AlreadyRunning);
        }

        // Drop the autosave watcher and stream into a bare channel so
        // streamed writes cannot race a debounced save of a half-built
        // buffer; the session is the content's only writer until rearm.
        let (bare, _) = watch::channel(String::new());
        self.content = bare;
        self.autosave = None;

        let outcome = loop {
            match session_events.recv().await {
                Ok(SessionEvent::Token(token)) => {
                    self.content.send_modify(|buffer| buffer.push_str(&token));
                }
                Ok(SessionEvent::Completed { .. }) => {
                    let record = match self.api.stages().get(self.project, stage).await {
                        Ok(record) => record,
                        Err(err) => {
                            // keep the streamed text editable even when the
                            // re-fetch of the persisted result fails
                            let partial = self.generation.content();
                            self.rearm(saved, Some(partial));
                            return Err(err.into());
                        }
                    };
                    let persisted = record.content.clone();
                    self.stages.insert(stage, record);
                    let _ = self.events.publish(EngineEvent::GenerationCompleted { stage });
                    self.rearm(persisted.clone(), None);
                    break GenerationOutcome::Completed { content: persisted };
                }
                Ok(SessionEvent::Failed { message }) => {
                    let _ = self.events.publish(EngineEvent::GenerationFailed {
                        stage,
                        message: message.clone(),
                    });
                    let partial = self.generation.content();
                    self.rearm(saved, Some(partial));
                    break GenerationOutcome::Failed { message };
                }
                Ok(SessionEvent::Closed) => {
                    let partial = self.generation.content();
                    self.rearm(saved, Some(partial));
                    break GenerationOutcome::Cancelled;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // resync the buffer and keep listening
                    let snapshot = self.generation.content();
                    self.content.send_replace(snapshot);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let partial = self.generation.content();
                    self.rearm(saved, Some(partial));
                    break GenerationOutcome::Cancelled;
                }
            }
        };
        Ok(outcome)
    }

    /// Stops a running generation; the partial buffer stays in the editor.
    pub fn stop_generation(&self) {
        self.generation.stop();
    }

    /// Restores a historical version into the live stage and refreshes the
    /// editor content from the server's answer.
    pub async fn restore(&mut self, version: VersionId) -> Result<Stage, EngineError> {
        let stage = self.navigator.current();
        let record = self.api.stages().restore(self.project, stage, version).await?;
        self.stages.insert(stage, record.clone());
        self.rearm(record.content.clone(), None);
        let _ = self
            .events
            .publish(EngineEvent::VersionRestored { stage, version });
        Ok(record)
    }

    /// Keeps the latest local text visible when the user comes back to
    /// this stage, even if the flush save did not land.
    fn stash_current_content(&mut self) {
        let current = self.navigator.current();
        if let Some(record) = self.stages.get_mut(&current) {
            record.content = self.content.borrow().clone();
        }
    }

    async fn ensure_cached(&mut self, stage: StageType) -> Result<String, EngineError> {
        if let Some(record) = self.stages.get(&stage) {
            return Ok(record.content.clone());
        }
        match self.api.stages().get(self.project, stage).await {
            Ok(record) => {
                let content = record.content.clone();
                self.stages.insert(stage, record);
                Ok(content)
            }
            // the server creates the record on first write
            Err(ApiError::NotFound) => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Rebuilds the content channel and its autosave watcher. `saved` seeds
    /// the channel as the last-saved baseline; passing `current` on top of
    /// it leaves the editor holding `current` with the unsaved flag set.
    fn rearm(&mut self, saved: String, current: Option<String>) {
        let (content, autosave) = arm_autosave(
            &self.api,
            &self.events,
            self.project,
            self.navigator.current(),
            saved,
        );
        if let Some(current) = current {
            content.send_replace(current);
        }
        self.content = content;
        self.autosave = Some(autosave);
    }
}

fn arm_autosave(
    api: &ApiClient,
    events: &EventBus,
    project: ProjectId,
    stage: StageType,
    saved: String,
) -> (watch::Sender<String>, AutoSave) {
    let (content, content_rx) = watch::channel(saved);
    let api = api.clone();
    let events = events.clone();
    let autosave = AutoSave::spawn(content_rx, AutoSaveOptions::default(), move |text| {
        let api = api.clone();
        let events = events.clone();
        async move {
            match api.stages().update(project, stage, &text).await {
                Ok(record) => {
                    let _ = events.publish(EngineEvent::StageSaved {
                        stage,
                        at: record.updated_at,
                    });
                    Ok(())
                }
                Err(err) => {
                    let _ = events.publish(EngineEvent::SaveFailed {
                        stage,
                        message: err.to_string(),
                    });
                    Err(err)
                }
            }
        }
    });
    (content, autosave)
}
