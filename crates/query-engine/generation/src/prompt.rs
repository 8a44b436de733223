//! Prompt construction for SQL generation.
//!
//! `build_prompt` is a pure function over the schema descriptor, the fixed
//! example set and the user's question: identical inputs produce a
//! byte-identical prompt. The descriptor's `BTreeMap`s give a stable
//! iteration order, so no sorting happens here.

use query_engine_metadata::metadata::{Metadata, Nullable, TableInfo};

use crate::examples::Example;

/// Build the full generation prompt for a question.
///
/// The prompt enumerates every table and column the validator will accept,
/// the foreign-key relationships between them, and the curated examples, so
/// the model has no reason to invent identifiers.
pub fn build_prompt(metadata: &Metadata, examples: &[Example], question: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are an expert SQL developer. Generate a single executable SQL SELECT \
         statement for the database described below.\n\n",
    );
    prompt.push_str("Rules:\n");
    prompt.push_str("- Return ONLY SQL, without explanation or markdown.\n");
    prompt.push_str("- Only reference the tables and columns listed below.\n");
    prompt.push_str("- Never modify data: SELECT statements only.\n\n");

    prompt.push_str("## Tables\n\n");
    for table in metadata.tables.0.values() {
        push_table(&mut prompt, table);
    }

    if !examples.is_empty() {
        prompt.push_str("## Examples\n\n");
        for (index, example) in examples.iter().enumerate() {
            prompt.push_str(&format!("Example {}:\n", index + 1));
            prompt.push_str(&format!("Question: {}\n", example.question));
            prompt.push_str(&format!("SQL: {}\n\n", example.sql));
        }
    }

    prompt.push_str("## Question\n\n");
    prompt.push_str(question);
    prompt.push_str("\n\nSQL:\n");

    prompt
}

fn push_table(prompt: &mut String, table: &TableInfo) {
    match &table.description {
        Some(description) => {
            prompt.push_str(&format!("TABLE {} ({description})\n", table.table_name));
        }
        None => prompt.push_str(&format!("TABLE {}\n", table.table_name)),
    }

    for column in table.columns.values() {
        let nullability = match column.nullable {
            Nullable::NonNullable => " NOT NULL",
            Nullable::Nullable => "",
        };
        match &column.description {
            Some(description) => prompt.push_str(&format!(
                "- {} {}{nullability} ({description})\n",
                column.name, column.r#type
            )),
            None => prompt.push_str(&format!(
                "- {} {}{nullability}\n",
                column.name, column.r#type
            )),
        }
    }

    for relation in table.foreign_relations.0.values() {
        for (local, remote) in &relation.column_mapping {
            prompt.push_str(&format!(
                "- foreign key: {local} references {}.{remote}\n",
                relation.foreign_table
            ));
        }
    }

    prompt.push('\n');
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use query_engine_metadata::metadata::{
        ColumnInfo, ForeignRelations, ScalarType, TableInfo, TablesInfo,
    };

    use super::*;
    use crate::examples::EXAMPLES;

    fn small_metadata() -> Metadata {
        let mut columns = BTreeMap::new();
        columns.insert(
            "user_id".to_string(),
            ColumnInfo {
                name: "user_id".to_string(),
                r#type: ScalarType::Integer,
                nullable: Nullable::NonNullable,
                description: Some("unique user ID".to_string()),
            },
        );
        columns.insert(
            "user_name".to_string(),
            ColumnInfo {
                name: "user_name".to_string(),
                r#type: ScalarType::CharacterVarying,
                nullable: Nullable::Nullable,
                description: None,
            },
        );
        let mut tables = BTreeMap::new();
        tables.insert(
            "users".to_string(),
            TableInfo {
                table_name: "users".to_string(),
                description: Some("registered users".to_string()),
                columns,
                foreign_relations: ForeignRelations::default(),
            },
        );
        Metadata {
            tables: TablesInfo(tables),
        }
    }

    #[test]
    fn test_build_prompt_is_deterministic() {
        let metadata = small_metadata();
        let first = build_prompt(&metadata, EXAMPLES, "How many users are there?");
        let second = build_prompt(&metadata, EXAMPLES, "How many users are there?");
        similar_asserts::assert_eq!(first, second);
    }

    #[test]
    fn test_build_prompt_renders_schema_and_question() {
        let examples = [Example {
            question: "How many users?",
            sql: "SELECT COUNT(*) FROM users",
        }];
        let prompt = build_prompt(&small_metadata(), &examples, "List user names");

        similar_asserts::assert_eq!(
            prompt,
            "You are an expert SQL developer. Generate a single executable SQL SELECT \
             statement for the database described below.\n\
             \n\
             Rules:\n\
             - Return ONLY SQL, without explanation or markdown.\n\
             - Only reference the tables and columns listed below.\n\
             - Never modify data: SELECT statements only.\n\
             \n\
             ## Tables\n\
             \n\
             TABLE users (registered users)\n\
             - user_id integer NOT NULL (unique user ID)\n\
             - user_name character varying\n\
             \n\
             ## Examples\n\
             \n\
             Example 1:\n\
             Question: How many users?\n\
             SQL: SELECT COUNT(*) FROM users\n\
             \n\
             ## Question\n\
             \n\
             List user names\n\
             \n\
             SQL:\n"
        );
    }

    #[test]
    fn test_full_descriptor_prompt_mentions_every_table() {
        let metadata = chatsql_configuration::ParsedConfiguration::initial().metadata;
        let prompt = build_prompt(&metadata, EXAMPLES, "anything");
        for table_name in metadata.tables.0.keys() {
            assert!(
                prompt.contains(&format!("TABLE {table_name}")),
                "prompt does not list {table_name}"
            );
        }
        assert!(prompt.contains("foreign key: manager_user_id references users.user_id"));
    }
}
