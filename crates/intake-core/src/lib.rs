//! # Workflow Intake Core
//!
//! Pure domain logic for describing research workflows:
//!
//! * [`WorkflowDraft`] is the editable form state, owned by the caller
//! * [`to_document`] / [`from_document`] map it to and from the persisted
//!   [`PipelineDocument`]
//! * [`paths`] turns contacts and titles into storage path segments
//!
//! Nothing in this crate performs I/O.
//!
//! ## Example
//!
//! ```
//! use intake_core::{to_document, StepRecord, WorkflowDraft, WorkflowPaths};
//!
//! let mut draft = WorkflowDraft::new();
//! draft.title = "Net analysis".to_string();
//! draft.contact = "a@b.com".to_string();
//! draft.steps.push(StepRecord::new("Load CSV", "", "file.csv", "graph"));
//!
//! let document = to_document(&draft).unwrap();
//! assert_eq!(document.steps[0].module_config.title, "load-csv");
//!
//! let paths = WorkflowPaths::for_workflow(&draft.contact, &draft.title).unwrap();
//! assert_eq!(paths.document(), "a@b.com/net-analysis/pipeline.json");
//! ```

mod error;

pub mod document;
pub mod draft;
pub mod mapper;
pub mod paths;

pub use document::{
    parse_document, DocBlock, ModuleConfig, PipelineDocument, SchemaBlock, SchemaField, StepEntry,
    RESEARCH_QUESTIONS_DELIMITER,
};
pub use draft::{StepRecord, WorkflowDraft};
pub use error::{MappingError, MappingResult};
pub use mapper::{draft_from_json, from_document, to_document};
pub use paths::{sanitize, slugify, unslugify, WorkflowPaths};
