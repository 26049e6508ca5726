pub mod account_store;
pub mod document_reader;
pub mod docx_writer;
pub mod event_log;
pub mod oracle_llm;

pub use account_store::JsonAccountStore;
pub use document_reader::FileDocumentReader;
pub use docx_writer::DocxWriter;
pub use event_log::FileEventLog;
pub use oracle_llm::OpenAiOracleAdapter;
