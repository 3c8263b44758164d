//! Storage path rules
//!
//! Every workflow lives under `{sanitize(contact)}/{slugify(title)}/` in the
//! document store. The helpers here turn free-form user text into segments
//! that are safe to use in those paths.

use crate::error::{MappingError, MappingResult};

/// Returned by [`sanitize`] when nothing usable is left of the input
pub const FALLBACK_SEGMENT: &str = "unknown_user";

/// Longest sanitized segment accepted before falling back
pub const MAX_SEGMENT_LEN: usize = 128;

/// File name of the pipeline document inside a workflow directory
pub const DOCUMENT_FILE: &str = "pipeline.json";

/// Directory holding uploaded sample data
pub const DATA_DIR: &str = "data";

/// Free-text description of the sample data
pub const DATA_README: &str = "README.md";

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-' | '_' | '.' | '@')
}

fn filter_allowed(input: &str) -> String {
    input.chars().filter(|ch| is_allowed(*ch)).collect::<String>().trim().to_string()
}

/// Normalize arbitrary text (an email, a name) into a single path segment.
///
/// Keeps ASCII letters, digits, space, `-`, `_`, `.` and `@`, then trims
/// surrounding whitespace. Empty or overlong results become
/// [`FALLBACK_SEGMENT`]. Distinct inputs may collide.
pub fn sanitize(input: &str) -> String {
    let filtered = filter_allowed(input);
    if filtered.is_empty() || filtered.chars().count() > MAX_SEGMENT_LEN {
        return FALLBACK_SEGMENT.to_string();
    }
    filtered
}

/// Lowercase slug with runs of non-alphanumeric characters collapsed to `-`.
///
/// Letters and digits of any script are kept. Lowercase forms that are not
/// themselves alphanumeric (combining marks) are dropped, so
/// `slugify(slugify(x)) == slugify(x)` for every input.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase().filter(|lower| lower.is_alphanumeric()));
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Approximate inverse of [`slugify`]: hyphens and underscores become spaces.
pub fn unslugify(slug: &str) -> String {
    slug.replace(['-', '_'], " ")
}

/// Storage locations for one workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPaths {
    root: String,
}

impl WorkflowPaths {
    /// Derive the workflow directory from the contact and the workflow title
    pub fn for_workflow(contact: &str, title: &str) -> MappingResult<Self> {
        if contact.trim().is_empty() {
            return Err(MappingError::missing("contact"));
        }

        let title_slug = slugify(title);
        if title_slug.is_empty() {
            return Err(MappingError::missing("title"));
        }

        Ok(Self {
            root: format!("{}/{}", Self::contact_dir(contact), title_slug),
        })
    }

    /// Directory holding every workflow saved under a contact
    pub fn contact_dir(contact: &str) -> String {
        sanitize(contact)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn document(&self) -> String {
        format!("{}/{}", self.root, DOCUMENT_FILE)
    }

    pub fn data_dir(&self) -> String {
        format!("{}/{}", self.root, DATA_DIR)
    }

    pub fn data_readme(&self) -> String {
        format!("{}/{}", self.data_dir(), DATA_README)
    }

    /// Path for an uploaded sample file, or `None` if the name has no usable characters.
    ///
    /// Only the last component of the supplied name is kept.
    pub fn data_file(&self, file_name: &str) -> Option<String> {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
        let segment = filter_allowed(base);
        if segment.is_empty() || segment.chars().all(|ch| ch == '.') {
            return None;
        }
        Some(format!("{}/{}", self.data_dir(), segment))
    }
}
