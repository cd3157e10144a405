//! Snippet display formatting
//!
//! Formats snippets for terminal output in table and detail views.

use crate::models::Snippet;

use super::truncate;

const COMMAND_WIDTH: usize = 48;

/// Format a list of snippets as a table
pub fn format_snippet_list(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return "No snippets found.".to_string();
    }

    let id_width = snippets
        .iter()
        .map(|s| s.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);

    let name_width = snippets
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:>id_width$}  {:<name_width$}  {:<command_width$}  {}\n",
        "ID",
        "Name",
        "Command",
        "Tags",
        id_width = id_width,
        name_width = name_width,
        command_width = COMMAND_WIDTH,
    ));

    output.push_str(&format!(
        "{:->id_width$}  {:-<name_width$}  {:-<command_width$}  {:-<10}\n",
        "",
        "",
        "",
        "",
        id_width = id_width,
        name_width = name_width,
        command_width = COMMAND_WIDTH,
    ));

    for snippet in snippets {
        let command = truncate(&snippet.command_text.replace('\n', " "), COMMAND_WIDTH);
        output.push_str(&format!(
            "{:>id_width$}  {:<name_width$}  {:<command_width$}  {}\n",
            snippet.id,
            snippet.name,
            command,
            snippet.tag_list().join(", "),
            id_width = id_width,
            name_width = name_width,
            command_width = COMMAND_WIDTH,
        ));
    }

    output.push_str(&format!("\n{} snippet(s)\n", snippets.len()));
    output
}

/// Format a single snippet with all fields
pub fn format_snippet_details(snippet: &Snippet) -> String {
    let mut output = String::new();

    output.push_str(&format!("Snippet: {}\n", snippet.name));
    output.push_str(&format!("  ID:          {}\n", snippet.id));
    if !snippet.description.is_empty() {
        output.push_str(&format!("  Description: {}\n", snippet.description));
    }
    if !snippet.tags.is_empty() {
        output.push_str(&format!("  Tags:        {}\n", snippet.tag_list().join(", ")));
    }
    output.push_str(&format!(
        "  Created:     {}\n",
        snippet.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!(
        "  Last used:   {}\n",
        snippet.last_used.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push('\n');
    for line in snippet.command_text.lines() {
        output.push_str(&format!("    {}\n", line));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snippet(id: i64, name: &str, command: &str, tags: &str) -> Snippet {
        Snippet {
            id,
            name: name.into(),
            description: String::new(),
            command_text: command.into(),
            tags: tags.into(),
            last_used: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(format_snippet_list(&[]), "No snippets found.");
    }

    #[test]
    fn test_list_shows_each_snippet() {
        let output = format_snippet_list(&[
            snippet(1, "List", "ls -la", "fs"),
            snippet(12, "Disk usage", "df -h", ""),
        ]);

        assert!(output.contains("Disk usage"));
        assert!(output.contains("ls -la"));
        assert!(output.contains("2 snippet(s)"));
    }

    #[test]
    fn test_details_indent_command() {
        let output = format_snippet_details(&snippet(3, "Deploy", "make build\nmake deploy", "ops"));

        assert!(output.starts_with("Snippet: Deploy"));
        assert!(output.contains("    make build\n    make deploy\n"));
    }
}
