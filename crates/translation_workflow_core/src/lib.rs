pub mod domain;
pub mod error;
pub mod ports;
pub mod prompts;
pub mod workflow;

pub use domain::{
    AccessEvent, Deliverable, Feedback, GoldExample, Identity, Language, Project, ProjectView,
    PromptKind, Role, SourceDocument, Stage, UserAccount,
};
pub use error::{WorkflowError, WorkflowResult};
pub use ports::{
    AccountStore, DocumentReader, DocumentWriter, EventLog, PortError, PortResult,
    TranslationOracle,
};
pub use workflow::{StartOutcome, StartProject, TranslationWorkflow};
