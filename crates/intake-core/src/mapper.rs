//! Conversion between [`WorkflowDraft`] and [`PipelineDocument`]
//!
//! `to_document` validates and serializes, `from_document` is its partial
//! inverse. Step titles are stored as slugs, so a title only survives the
//! round trip when it is lowercase, single-spaced and free of underscores.

use tracing::debug;

use crate::document::{
    parse_document, DocBlock, ModuleConfig, PipelineDocument, SchemaBlock, StepEntry,
    RESEARCH_QUESTIONS_DELIMITER,
};
use crate::draft::{StepRecord, WorkflowDraft};
use crate::error::{MappingError, MappingResult};
use crate::paths::{slugify, unslugify};

const CONSENT_PREFIX: &str = " (contact consent: ";

/// Format the contact line stored in `doc.contact`
pub fn format_contact(contact: &str, consent: bool) -> String {
    format!("{}{}{})", contact, CONSENT_PREFIX, consent)
}

/// Split a stored contact line into the contact and the consent flag.
///
/// Lines without the consent suffix are taken as a bare contact without consent.
pub fn parse_contact(line: &str) -> (String, bool) {
    if let Some((contact, rest)) = line.rsplit_once(CONSENT_PREFIX) {
        match rest {
            "true)" => return (contact.to_string(), true),
            "false)" => return (contact.to_string(), false),
            _ => {}
        }
    }
    (line.to_string(), false)
}

/// Serialize a draft into the persisted document shape.
///
/// Fails with [`MappingError::MissingRequiredField`] naming the first empty
/// required field: `title`, `contact`, or `steps[i].title`.
pub fn to_document(draft: &WorkflowDraft) -> MappingResult<PipelineDocument> {
    if draft.title.trim().is_empty() {
        return Err(MappingError::missing("title"));
    }
    if draft.contact.trim().is_empty() {
        return Err(MappingError::missing("contact"));
    }

    let steps = draft
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            // The stored title is the slug; an empty slug could not be saved again
            let title = slugify(&step.title);
            if title.is_empty() {
                return Err(MappingError::missing(format!("steps[{}].title", index)));
            }
            Ok(StepEntry {
                module_config: ModuleConfig {
                    title,
                    desc: step.description.clone(),
                    inputs_schema: SchemaBlock::any(step.inputs.clone()),
                    outputs_schema: SchemaBlock::any(step.outputs.clone()),
                },
            })
        })
        .collect::<MappingResult<Vec<_>>>()?;

    debug!(title = %draft.title, steps = steps.len(), "Mapped draft to pipeline document");

    Ok(PipelineDocument {
        doc: DocBlock {
            description: draft.description.clone(),
            doc: format!(
                "{}{}{}",
                draft.description, RESEARCH_QUESTIONS_DELIMITER, draft.research_notes
            ),
            contact: format_contact(&draft.contact, draft.contact_consent),
        },
        steps,
    })
}

/// Rebuild a draft from a stored document.
///
/// `title` and `input_details` are not part of the document and stay empty.
pub fn from_document(document: &PipelineDocument) -> WorkflowDraft {
    let (description, research_notes) = match document.doc.doc.split_once(RESEARCH_QUESTIONS_DELIMITER) {
        Some((description, notes)) => (description.to_string(), notes.to_string()),
        None => (document.doc.doc.clone(), String::new()),
    };
    let (contact, contact_consent) = parse_contact(&document.doc.contact);

    let steps = document
        .steps
        .iter()
        .map(|entry| {
            let config = &entry.module_config;
            StepRecord {
                title: unslugify(&config.title),
                description: config.desc.clone(),
                inputs: config.inputs_schema.doc().to_string(),
                outputs: config.outputs_schema.doc().to_string(),
            }
        })
        .collect();

    WorkflowDraft {
        title: String::new(),
        contact,
        contact_consent,
        description,
        research_notes,
        input_details: String::new(),
        steps,
    }
}

/// Parse stored bytes straight into a draft
pub fn draft_from_json(bytes: &[u8]) -> MappingResult<WorkflowDraft> {
    let document = parse_document(bytes)?;
    Ok(from_document(&document))
}
