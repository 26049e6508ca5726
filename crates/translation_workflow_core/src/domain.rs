//! crates/translation_workflow_core/src/domain.rs
//!
//! Defines the pure, core data structures for the translation workflow.
//! These structs are independent of any storage, transport or UI layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Languages and Stages
//=========================================================================================

/// The languages a project can be translated from or into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Portuguese,
    Spanish,
    French,
    German,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::Portuguese,
        Language::Spanish,
        Language::French,
        Language::German,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Portuguese => "Portuguese",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("'{}' is not a supported language", s))
    }
}

/// The ordered checkpoints of the translation workflow.
///
/// `TranslatorAssigned`, `Published` and `QualityChecked` carry no data of their
/// own; they are reported as milestones once a later stage implies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inquiry,
    Prepared,
    TranslatorAssigned,
    Translated,
    Edited,
    Proofread,
    Published,
    QualityChecked,
    Delivered,
    Archived,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Inquiry,
        Stage::Prepared,
        Stage::TranslatorAssigned,
        Stage::Translated,
        Stage::Edited,
        Stage::Proofread,
        Stage::Published,
        Stage::QualityChecked,
        Stage::Delivered,
        Stage::Archived,
    ];

    /// The step title shown for this stage.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Inquiry => "1. Client Inquiry & Project Analysis",
            Stage::Prepared => "2. Project Preparation",
            Stage::TranslatorAssigned => "3. Translator Selection",
            Stage::Translated => "4. Translation Phase",
            Stage::Edited => "5. Editing (Second Linguist Review)",
            Stage::Proofread => "6. Proofreading / QA",
            Stage::Published => "7. Desktop Publishing (DTP)",
            Stage::QualityChecked => "8. Final Quality Control",
            Stage::Delivered => "9. Delivery",
            Stage::Archived => "10. Client Feedback & Archiving",
        }
    }

    /// The status message reported once this stage has been reached.
    pub fn status_message(&self) -> &'static str {
        match self {
            Stage::Inquiry => "Awaiting a source document and language pair.",
            Stage::Prepared => "Files prepared. Project Manager assigned.",
            Stage::TranslatorAssigned => {
                "Qualified native linguist has been assigned based on subject matter."
            }
            Stage::Translated => "Translation complete.",
            Stage::Edited => "Edit complete.",
            Stage::Proofread => "Proofreading complete.",
            Stage::Published => {
                "DTP would occur here. A clean .docx file is delivered; complex layouts need manual adjustment."
            }
            Stage::QualityChecked => {
                "PM final check complete. Files, naming conventions, and deliverables match client specifications."
            }
            Stage::Delivered => "Final deliverable ready.",
            Stage::Archived => "Project archived. Ready for a new project.",
        }
    }
}

//=========================================================================================
// Project
//=========================================================================================

/// A paired source/target exemplar used as few-shot guidance for the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoldExample {
    pub source: String,
    pub target: String,
}

/// The three prompts a project keeps pending for its oracle-driven stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Translate,
    Edit,
    Proofread,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptKind::Translate => f.write_str("translate"),
            PromptKind::Edit => f.write_str("edit"),
            PromptKind::Proofread => f.write_str("proofread"),
        }
    }
}

/// Prompts regenerated whenever their upstream text changes.
///
/// A user override stays in place until the next regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingPrompts {
    pub translate: Option<String>,
    pub edit: Option<String>,
    pub proofread: Option<String>,
}

impl PendingPrompts {
    pub fn get(&self, kind: PromptKind) -> Option<&str> {
        match kind {
            PromptKind::Translate => self.translate.as_deref(),
            PromptKind::Edit => self.edit.as_deref(),
            PromptKind::Proofread => self.proofread.as_deref(),
        }
    }

    pub fn set(&mut self, kind: PromptKind, prompt: String) {
        match kind {
            PromptKind::Translate => self.translate = Some(prompt),
            PromptKind::Edit => self.edit = Some(prompt),
            PromptKind::Proofread => self.proofread = Some(prompt),
        }
    }
}

/// The unit of work for one document translation.
///
/// A project is private to the session that owns it. `Project::default()` is the
/// empty `Inquiry` state that a session starts in and returns to on archive.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub stage: Stage,
    pub source_file_name: Option<String>,
    pub source_text: Option<String>,
    pub word_count: usize,
    pub gold_examples: Vec<GoldExample>,
    pub source_lang: Language,
    pub target_lang: Language,
    pub draft_translation: Option<String>,
    pub reviewed_translation: Option<String>,
    pub proofread_translation: Option<String>,
    pub final_text: Option<String>,
    pub prompts: PendingPrompts,
    pub model: Option<String>,
    pub delivered: bool,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Inquiry,
            source_file_name: None,
            source_text: None,
            word_count: 0,
            gold_examples: Vec::new(),
            source_lang: Language::English,
            target_lang: Language::Portuguese,
            draft_translation: None,
            reviewed_translation: None,
            proofread_translation: None,
            final_text: None,
            prompts: PendingPrompts::default(),
            model: None,
            delivered: false,
        }
    }
}

impl Project {
    /// The text a proofreading pass works on: the reviewed translation if there is
    /// one, otherwise the draft.
    pub fn proofread_input(&self) -> Option<&str> {
        self.reviewed_translation
            .as_deref()
            .or(self.draft_translation.as_deref())
    }

    /// Snapshot of the project for whatever rendering layer consumes it.
    pub fn view(&self) -> ProjectView {
        let milestones = Stage::ALL
            .iter()
            .filter(|stage| **stage != Stage::Archived)
            .map(|stage| Milestone {
                stage: *stage,
                title: stage.title(),
                reached: self.has_reached(*stage),
                message: stage.status_message(),
            })
            .collect();

        let gold_status = if self.gold_examples.is_empty() {
            "No gold standard samples loaded."
        } else {
            "Gold standard samples have been loaded and will be used."
        };

        ProjectView {
            id: self.id,
            stage: self.stage,
            status: self.stage.status_message(),
            milestones,
            source_file_name: self.source_file_name.clone(),
            source_lang: self.source_lang,
            target_lang: self.target_lang,
            word_count: self.word_count,
            gold_example_count: self.gold_examples.len(),
            gold_status,
            source_text: self.source_text.clone(),
            draft_translation: self.draft_translation.clone(),
            reviewed_translation: self.reviewed_translation.clone(),
            proofread_translation: self.proofread_translation.clone(),
            final_text: self.final_text.clone(),
            prompts: self.prompts.clone(),
            model: self.model.clone(),
        }
    }

    /// Whether `stage` has been passed, counting the informational checkpoints
    /// implied by later stages.
    fn has_reached(&self, stage: Stage) -> bool {
        match stage {
            Stage::Inquiry => true,
            Stage::Prepared | Stage::TranslatorAssigned => self.source_text.is_some(),
            Stage::Translated => self.draft_translation.is_some(),
            Stage::Edited => self.reviewed_translation.is_some(),
            Stage::Proofread => self.proofread_translation.is_some(),
            Stage::Published | Stage::QualityChecked | Stage::Delivered => self.delivered,
            Stage::Archived => false,
        }
    }
}

//=========================================================================================
// Views
//=========================================================================================

/// One step of the workflow as presented to the user.
#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub stage: Stage,
    pub title: &'static str,
    pub reached: bool,
    pub message: &'static str,
}

/// A declarative snapshot of a project, emitted after every workflow action.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub stage: Stage,
    pub status: &'static str,
    pub milestones: Vec<Milestone>,
    pub source_file_name: Option<String>,
    pub source_lang: Language,
    pub target_lang: Language,
    pub word_count: usize,
    pub gold_example_count: usize,
    pub gold_status: &'static str,
    pub source_text: Option<String>,
    pub draft_translation: Option<String>,
    pub reviewed_translation: Option<String>,
    pub proofread_translation: Option<String>,
    pub final_text: Option<String>,
    pub prompts: PendingPrompts,
    pub model: Option<String>,
}

//=========================================================================================
// Documents
//=========================================================================================

/// An uploaded artifact as received from the user.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The file name without directories or its final extension.
    pub fn base_name(&self) -> &str {
        base_name(&self.file_name)
    }
}

/// Strips any directory components and the final extension from a file name.
pub fn base_name(file_name: &str) -> &str {
    let name = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// A rendered deliverable ready to be downloaded.
#[derive(Debug, Clone)]
pub struct Deliverable {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Optional client feedback captured when a project is archived.
#[derive(Debug, Clone, Deserialize)]
pub struct Feedback {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

//=========================================================================================
// Accounts and Access Events
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Represents an authenticated user - used throughout the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Only used internally for login and administration - contains sensitive data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// A single line of the append-only access log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessEvent {
    pub timestamp: String,
    pub username: String,
    pub event: String,
}
