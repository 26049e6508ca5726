//! crates/translation_workflow_core/src/workflow.rs
//!
//! The workflow state machine. It owns the legality of every stage transition and
//! orchestrates the document reader, the oracle and the document writer through
//! the prompt builder.
//!
//! Every action takes the session's `Project` by mutable reference and only writes
//! to it once all fallible work has succeeded, so a failed action leaves the
//! project exactly as it was.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::domain::{
    base_name, Deliverable, Feedback, GoldExample, Identity, Language, Project, ProjectView,
    PromptKind, SourceDocument, Stage,
};
use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::{DocumentReader, DocumentWriter, EventLog, PortError, TranslationOracle};
use crate::prompts;

/// The upper bound on a single oracle round-trip unless configured otherwise.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Everything the user confirms at the inquiry stage.
#[derive(Debug, Clone)]
pub struct StartProject {
    pub source: SourceDocument,
    pub gold_source: Vec<SourceDocument>,
    pub gold_target: Vec<SourceDocument>,
    pub source_lang: Language,
    pub target_lang: Language,
}

/// The result of a successful `start_project`.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub view: ProjectView,
    /// Non-fatal issues the user should see, such as mismatched gold-standard lists.
    pub warnings: Vec<String>,
}

/// Orchestrates the stage transitions of a project.
#[derive(Clone)]
pub struct TranslationWorkflow {
    oracle: Option<Arc<dyn TranslationOracle>>,
    reader: Arc<dyn DocumentReader>,
    writer: Arc<dyn DocumentWriter>,
    events: Arc<dyn EventLog>,
    oracle_timeout: Duration,
}

impl TranslationWorkflow {
    /// Creates a new workflow. A `None` oracle means no credential is configured;
    /// every oracle-driven action then fails with `MissingCredential`.
    pub fn new(
        oracle: Option<Arc<dyn TranslationOracle>>,
        reader: Arc<dyn DocumentReader>,
        writer: Arc<dyn DocumentWriter>,
        events: Arc<dyn EventLog>,
    ) -> Self {
        Self {
            oracle,
            reader,
            writer,
            events,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.oracle.is_some()
    }

    //=====================================================================================
    // Stage 1-2: Inquiry and Preparation
    //=====================================================================================

    /// Extracts the source and gold-standard texts and moves the project to `Prepared`.
    pub async fn start_project(
        &self,
        project: &mut Project,
        identity: &Identity,
        request: StartProject,
    ) -> WorkflowResult<StartOutcome> {
        if project.stage != Stage::Inquiry {
            return Err(WorkflowError::ProjectInProgress);
        }
        if self.oracle.is_none() {
            return Err(WorkflowError::MissingCredential);
        }

        let source_text = self.extract(&request.source).await?;
        if source_text.trim().is_empty() {
            return Err(WorkflowError::EmptySource);
        }

        let mut warnings = Vec::new();
        let gold_examples = self
            .read_gold_examples(&request.gold_source, &request.gold_target, &mut warnings)
            .await?;

        let word_count = source_text.split_whitespace().count();
        let translate_prompt = prompts::translate_prompt(
            request.source_lang,
            request.target_lang,
            &gold_examples,
            &source_text,
        );

        *project = Project {
            stage: Stage::Prepared,
            source_file_name: Some(request.source.file_name.clone()),
            source_text: Some(source_text),
            word_count,
            gold_examples,
            source_lang: request.source_lang,
            target_lang: request.target_lang,
            model: project.model.take(),
            ..Project::default()
        };
        project.prompts.translate = Some(translate_prompt);

        info!(
            "Project {} prepared: {} words, {} gold examples.",
            project.id,
            word_count,
            project.gold_examples.len()
        );
        self.record(
            identity,
            &format!(
                "Started project {} ({}->{})",
                request.source.file_name, request.source_lang, request.target_lang
            ),
        )
        .await;

        Ok(StartOutcome {
            view: project.view(),
            warnings,
        })
    }

    /// Pairs the i-th source exemplar with the i-th target exemplar.
    async fn read_gold_examples(
        &self,
        sources: &[SourceDocument],
        targets: &[SourceDocument],
        warnings: &mut Vec<String>,
    ) -> WorkflowResult<Vec<GoldExample>> {
        if sources.is_empty() || targets.is_empty() {
            return Ok(Vec::new());
        }
        if sources.len() != targets.len() {
            let warning = format!(
                "The number of English ({}) and Portuguese ({}) gold standard files does not match. Using the minimum common number.",
                sources.len(),
                targets.len()
            );
            warn!("{}", warning);
            warnings.push(warning);
        }

        let mut examples = Vec::with_capacity(sources.len().min(targets.len()));
        for (source, target) in sources.iter().zip(targets.iter()) {
            examples.push(GoldExample {
                source: self.extract(source).await?,
                target: self.extract(target).await?,
            });
        }
        Ok(examples)
    }

    /// Runs the document reader on the blocking pool; PDF and DOCX parsing is CPU-bound.
    async fn extract(&self, document: &SourceDocument) -> WorkflowResult<String> {
        let reader = self.reader.clone();
        let owned = document.clone();
        tokio::task::spawn_blocking(move || reader.extract_text(&owned))
            .await
            .map_err(|e| WorkflowError::ExtractionFailed {
                file_name: document.file_name.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| WorkflowError::from_reader(&document.file_name, e))
    }

    //=====================================================================================
    // Stage 4: Translation
    //=====================================================================================

    /// Produces a new draft. Re-running replaces the previous draft.
    pub async fn run_translate(&self, project: &mut Project) -> WorkflowResult<ProjectView> {
        let source_text = project
            .source_text
            .as_deref()
            .ok_or(WorkflowError::StageNotReached {
                required: Stage::Prepared,
                current: project.stage,
            })?;
        let prompt = match project.prompts.get(PromptKind::Translate) {
            Some(pending) => pending.to_string(),
            None => prompts::translate_prompt(
                project.source_lang,
                project.target_lang,
                &project.gold_examples,
                source_text,
            ),
        };

        let translation = self
            .consult(PromptKind::Translate, &prompt, project.model.as_deref())
            .await?;

        let edit_prompt = prompts::edit_prompt(
            project.source_lang,
            project.target_lang,
            &project.gold_examples,
            source_text,
            &translation,
        );
        project.prompts.edit = Some(edit_prompt);
        project.draft_translation = Some(translation.clone());
        project.final_text = Some(translation);
        project.stage = Stage::Translated;

        info!("Project {} translated.", project.id);
        Ok(project.view())
    }

    //=====================================================================================
    // Stage 5: Editing
    //=====================================================================================

    /// Asks the oracle to review the draft against the source text.
    pub async fn run_edit(&self, project: &mut Project) -> WorkflowResult<ProjectView> {
        let (source_text, draft) = match (&project.source_text, &project.draft_translation) {
            (Some(source), Some(draft)) => (source.as_str(), draft.as_str()),
            _ => {
                return Err(WorkflowError::StageNotReached {
                    required: Stage::Translated,
                    current: project.stage,
                })
            }
        };
        let prompt = match project.prompts.get(PromptKind::Edit) {
            Some(pending) => pending.to_string(),
            None => prompts::edit_prompt(
                project.source_lang,
                project.target_lang,
                &project.gold_examples,
                source_text,
                draft,
            ),
        };

        let reviewed = self
            .consult(PromptKind::Edit, &prompt, project.model.as_deref())
            .await?;

        self.store_review(project, reviewed);
        info!("Project {} edited by the oracle.", project.id);
        Ok(project.view())
    }

    /// Replaces the reviewed translation with the user's own text.
    pub fn manual_edit(&self, project: &mut Project, text: String) -> WorkflowResult<ProjectView> {
        if project.draft_translation.is_none() {
            return Err(WorkflowError::StageNotReached {
                required: Stage::Translated,
                current: project.stage,
            });
        }

        self.store_review(project, text);
        info!("Manual edit saved for project {}.", project.id);
        Ok(project.view())
    }

    /// Last write wins between oracle and manual edits; the proofread prompt follows.
    fn store_review(&self, project: &mut Project, reviewed: String) {
        project.prompts.proofread = Some(prompts::proofread_prompt(project.target_lang, &reviewed));
        project.reviewed_translation = Some(reviewed.clone());
        project.final_text = Some(reviewed);
        project.stage = Stage::Edited;
    }

    //=====================================================================================
    // Stage 6: Proofreading
    //=====================================================================================

    /// Runs a correctness pass over the reviewed text, or the draft when editing was skipped.
    pub async fn run_proofread(&self, project: &mut Project) -> WorkflowResult<ProjectView> {
        let input = project
            .proofread_input()
            .ok_or(WorkflowError::StageNotReached {
                required: Stage::Translated,
                current: project.stage,
            })?;
        let prompt = match project.prompts.get(PromptKind::Proofread) {
            Some(pending) => pending.to_string(),
            None => prompts::proofread_prompt(project.target_lang, input),
        };

        let proofread = self
            .consult(PromptKind::Proofread, &prompt, project.model.as_deref())
            .await?;

        project.proofread_translation = Some(proofread.clone());
        project.final_text = Some(proofread);
        project.stage = Stage::Proofread;

        info!("Project {} proofread.", project.id);
        Ok(project.view())
    }

    //=====================================================================================
    // Prompt and model overrides
    //=====================================================================================

    /// Replaces a pending prompt. The override is used by the next run of that stage
    /// and is discarded when its upstream text changes.
    pub fn override_prompt(
        &self,
        project: &mut Project,
        kind: PromptKind,
        prompt: String,
    ) -> WorkflowResult<ProjectView> {
        let (reachable, required) = match kind {
            PromptKind::Translate => (project.source_text.is_some(), Stage::Prepared),
            PromptKind::Edit | PromptKind::Proofread => {
                (project.draft_translation.is_some(), Stage::Translated)
            }
        };
        if !reachable {
            return Err(WorkflowError::StageNotReached {
                required,
                current: project.stage,
            });
        }

        project.prompts.set(kind, prompt);
        info!("Pending {} prompt overridden for project {}.", kind, project.id);
        Ok(project.view())
    }

    /// Selects the oracle model for this project; `None` or blank restores the default.
    pub fn select_model(&self, project: &mut Project, model: Option<String>) -> ProjectView {
        project.model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        project.view()
    }

    //=====================================================================================
    // Stages 7-9: Publishing, QC and Delivery
    //=====================================================================================

    /// Renders the final text into a downloadable document.
    pub async fn prepare_download(
        &self,
        project: &mut Project,
        identity: &Identity,
    ) -> WorkflowResult<Deliverable> {
        let final_text = project
            .final_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .ok_or(WorkflowError::NoFinalText)?;

        let bytes = self.writer.render_document(final_text).map_err(|e| {
            error!("Failed to render deliverable for project {}: {}", project.id, e);
            WorkflowError::RenderFailure(e.to_string())
        })?;

        let base = project
            .source_file_name
            .as_deref()
            .map(base_name)
            .unwrap_or("document");
        let deliverable = Deliverable {
            file_name: format!("translated_{}.{}", base, self.writer.file_extension()),
            content_type: self.writer.content_type(),
            bytes,
        };

        project.stage = Stage::Delivered;
        if !project.delivered {
            project.delivered = true;
            self.record(
                identity,
                &format!(
                    "Completed translation {}->{}",
                    project.source_lang, project.target_lang
                ),
            )
            .await;
        }

        info!(
            "Deliverable {} prepared for project {}.",
            deliverable.file_name, project.id
        );
        Ok(deliverable)
    }

    //=====================================================================================
    // Stage 10: Feedback and Archiving
    //=====================================================================================

    /// Clears the project back to an empty inquiry. The caller keeps the identity and
    /// the oracle credential.
    pub async fn archive_project(
        &self,
        project: &mut Project,
        identity: &Identity,
        feedback: Option<Feedback>,
    ) -> WorkflowResult<ProjectView> {
        let event = match &feedback {
            Some(fb) if !(1..=5).contains(&fb.rating) => {
                return Err(WorkflowError::InvalidFeedback(fb.rating))
            }
            Some(fb) => {
                let comment = fb
                    .comment
                    .as_deref()
                    .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
                    .filter(|c| !c.is_empty());
                match comment {
                    Some(comment) => format!(
                        "Submitted feedback (rating {}/5, comment: {}) and archived project.",
                        fb.rating, comment
                    ),
                    None => format!(
                        "Submitted feedback (rating {}/5) and archived project.",
                        fb.rating
                    ),
                }
            }
            None => "Archived project without feedback.".to_string(),
        };

        info!("Archiving project {} at stage {:?}.", project.id, project.stage);
        *project = Project::default();
        self.record(identity, &event).await;

        Ok(project.view())
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    /// One bounded oracle round-trip. Blank completions count as failures so that no
    /// artifact is ever overwritten with nothing.
    async fn consult(
        &self,
        kind: PromptKind,
        prompt: &str,
        model: Option<&str>,
    ) -> WorkflowResult<String> {
        let oracle = self
            .oracle
            .as_ref()
            .ok_or(WorkflowError::MissingCredential)?;

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.oracle_timeout, oracle.complete(prompt, model)).await;

        match outcome {
            Err(_) => {
                warn!(
                    "Oracle {} call exceeded {:?}; leaving the project unchanged.",
                    kind, self.oracle_timeout
                );
                Err(WorkflowError::from_oracle(PortError::Timeout))
            }
            Ok(Err(e)) => {
                error!("Oracle {} call failed: {}", kind, e);
                Err(WorkflowError::from_oracle(e))
            }
            Ok(Ok(text)) if text.trim().is_empty() => Err(WorkflowError::OracleUnavailable(
                "the oracle returned an empty response".to_string(),
            )),
            Ok(Ok(text)) => {
                info!("Oracle {} call took {:?}.", kind, started.elapsed());
                Ok(text)
            }
        }
    }

    /// Access events are bookkeeping; a failed append never fails the action.
    async fn record(&self, identity: &Identity, event: &str) {
        if let Err(e) = self.events.record_event(&identity.username, event).await {
            error!("Failed to record access event for {}: {}", identity.username, e);
        }
    }
}
