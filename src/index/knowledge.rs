use chrono::Utc;

use super::types::{EntryKind, EntryMetadata, IndexedEntry, GENERAL_SCOPE};

/// A project fact headed for the knowledge base. Builds the canonical
/// content template and stable id (`project_{id}`), so re-adding the same
/// project upserts instead of duplicating.
#[derive(Debug, Clone)]
pub struct ProjectFact {
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub extra: Option<String>,
}

impl ProjectFact {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            description: description.into(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn into_entry(self) -> IndexedEntry {
        let extra_line = self
            .extra
            .map(|e| format!("Additional Info: {e}"))
            .unwrap_or_default();
        let content = format!(
            "Project: {}\nDescription: {}\n{extra_line}",
            self.name, self.description
        );

        IndexedEntry {
            id: format!("project_{}", self.project_id),
            content,
            metadata: EntryMetadata {
                team_id: self.project_id,
                sender_name: "System".into(),
                timestamp: Utc::now(),
                kind: EntryKind::ProjectInfo { project_name: self.name },
            },
        }
    }
}

/// A code snippet headed for the knowledge base, id `code_{id}`. Scoped to
/// its project, or to the general scope when it has none.
#[derive(Debug, Clone)]
pub struct CodeSnippet {
    pub code_id: String,
    pub code: String,
    pub language: String,
    pub description: String,
    pub project_id: Option<String>,
}

impl CodeSnippet {
    pub fn new(
        code_id: impl Into<String>,
        code: impl Into<String>,
        language: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code_id: code_id.into(),
            code: code.into(),
            language: language.into(),
            description: description.into(),
            project_id: None,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn into_entry(self) -> IndexedEntry {
        let content = format!(
            "Code Snippet ({lang}):\n{desc}\n\n```{lang}\n{code}\n```",
            lang = self.language,
            desc = self.description,
            code = self.code,
        );

        IndexedEntry {
            id: format!("code_{}", self.code_id),
            content,
            metadata: EntryMetadata {
                team_id: self.project_id.unwrap_or_else(|| GENERAL_SCOPE.into()),
                sender_name: "System".into(),
                timestamp: Utc::now(),
                kind: EntryKind::CodeSnippet {
                    language: self.language,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_fact_template_and_id() {
        let entry = ProjectFact::new("p1", "Apollo", "Lunar lander backend").into_entry();

        assert_eq!(entry.id, "project_p1");
        assert_eq!(entry.content, "Project: Apollo\nDescription: Lunar lander backend\n");
        assert_eq!(entry.metadata.team_id, "p1");
        assert_eq!(entry.metadata.sender_name, "System");
        assert_eq!(
            entry.metadata.kind,
            EntryKind::ProjectInfo {
                project_name: "Apollo".into()
            }
        );
    }

    #[test]
    fn project_fact_extra_line() {
        let entry = ProjectFact::new("p1", "Apollo", "Backend")
            .with_extra("Ships Q3")
            .into_entry();

        assert_eq!(
            entry.content,
            "Project: Apollo\nDescription: Backend\nAdditional Info: Ships Q3"
        );
    }

    #[test]
    fn code_snippet_template_and_id() {
        let entry = CodeSnippet::new("42", "fn main() {}", "rust", "Entry point")
            .with_project("p1")
            .into_entry();

        assert_eq!(entry.id, "code_42");
        assert_eq!(
            entry.content,
            "Code Snippet (rust):\nEntry point\n\n```rust\nfn main() {}\n```"
        );
        assert_eq!(entry.metadata.team_id, "p1");
        assert_eq!(
            entry.metadata.kind,
            EntryKind::CodeSnippet {
                language: "rust".into()
            }
        );
    }

    #[test]
    fn code_snippet_defaults_to_general_scope() {
        let entry = CodeSnippet::new("7", "x = 1", "python", "Assignment").into_entry();
        assert_eq!(entry.metadata.team_id, GENERAL_SCOPE);
    }
}
