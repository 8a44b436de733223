//! The validation pipeline for model-generated SQL.
//!
//! The steps run in a fixed order, each terminal on failure: extraction,
//! leading-verb whitelist, single-statement enforcement, parsing and shape
//! checks, the disallowed-construct scan, identifier resolution against the
//! schema descriptor, and finally dialect normalization. The whole pipeline
//! is pure computation over the input text and the descriptor.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use sqlparser::ast::{
    visit_expressions, visit_relations, visit_relations_mut, Expr, Ident, ObjectName, Query,
    Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, Value,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use query_engine_metadata::metadata::Metadata;

use crate::error::ValidationError;
use crate::extract;

/// Functions that reach outside the query: file access, server-to-server
/// links, large objects, signals, settings. Denied even when nested inside
/// an otherwise-valid SELECT.
const DENIED_FUNCTIONS: &[&str] = &[
    "dblink",
    "dblink_connect",
    "dblink_exec",
    "lo_export",
    "lo_import",
    "pg_cancel_backend",
    "pg_ls_dir",
    "pg_read_binary_file",
    "pg_read_file",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "pg_sleep",
    "pg_sleep_for",
    "pg_sleep_until",
    "pg_stat_file",
    "pg_terminate_backend",
    "set_config",
];

/// Validator settings that vary per deployment.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Namespace bare table names are qualified with during normalization.
    pub schema_namespace: Option<String>,
    /// Row cap injected when the statement has no row-limiting clause.
    pub max_rows: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            schema_namespace: None,
            max_rows: 100,
        }
    }
}

/// A statement that passed every validation step. This type can only be
/// constructed here, so the executor cannot be handed anything unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStatement {
    sql: String,
}

impl ValidatedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for ValidatedStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Names visible inside the statement besides the schema's own: common table
/// expressions, table aliases and select-list aliases.
#[derive(Debug, Default)]
struct Scope {
    ctes: HashSet<String>,
    aliases: HashSet<String>,
}

/// Decide whether raw model output contains a statement that is safe to
/// execute, and if so produce its normalized form.
pub fn validate(
    raw_text: &str,
    metadata: &Metadata,
    options: &ValidationOptions,
) -> Result<ValidatedStatement, ValidationError> {
    let candidate = extract::extract_sql(raw_text)?;

    let verb = leading_keyword(&candidate);
    if verb != "SELECT" && verb != "WITH" {
        return Err(ValidationError::WriteStatement(verb));
    }

    let single = enforce_single_statement(&candidate)?;
    let mut statement = parse_single(single)?;

    let scope = {
        let Statement::Query(query) = &statement else {
            return Err(ValidationError::WriteStatement(verb));
        };
        let mut scope = Scope::default();
        collect_query(query, &mut scope)?;
        collect_expression_subqueries(&statement, &mut scope)?;
        scan_denied_functions(&statement)?;
        check_relations(&statement, &scope, metadata, options)?;
        check_columns(&statement, &scope, metadata, options)?;
        scope
    };

    normalize(&mut statement, &scope, options);

    Ok(ValidatedStatement {
        sql: statement.to_string(),
    })
}

fn leading_keyword(candidate: &str) -> String {
    candidate
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches('(')
        .to_uppercase()
}

/// Reject statement stacking: a top-level `;` outside string literals and
/// quoted identifiers followed by anything but whitespace. A single trailing
/// separator is stripped.
fn enforce_single_statement(candidate: &str) -> Result<&str, ValidationError> {
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = candidate.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '\'' if !in_double => {
                if in_single {
                    // '' escapes a quote inside a string literal
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                    } else {
                        in_single = false;
                    }
                } else {
                    in_single = true;
                }
            }
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => {
                let rest = &candidate[index + 1..];
                if rest.chars().any(|c| !c.is_whitespace() && c != ';') {
                    return Err(ValidationError::MultiStatement);
                }
                return Ok(candidate[..index].trim_end());
            }
            _ => {}
        }
    }
    Ok(candidate)
}

fn parse_single(sql: &str) -> Result<Statement, ValidationError> {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(|error| {
        ValidationError::Extraction(format!("generated statement does not parse: {error}"))
    })?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(ValidationError::Extraction(
            "generated text contains no statement".to_string(),
        )),
        _ => Err(ValidationError::MultiStatement),
    }
}

/// Walk a query collecting CTE names and aliases, rejecting anything that
/// is not purely a read.
fn collect_query(query: &Query, scope: &mut Scope) -> Result<(), ValidationError> {
    if !query.locks.is_empty() {
        return Err(ValidationError::UnsafeConstruct(
            "locking clause (FOR UPDATE/FOR SHARE)".to_string(),
        ));
    }
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            scope.ctes.insert(cte.alias.name.value.to_lowercase());
            collect_query(&cte.query, scope)?;
        }
    }
    collect_set_expr(&query.body, scope)
}

fn collect_set_expr(body: &SetExpr, scope: &mut Scope) -> Result<(), ValidationError> {
    match body {
        SetExpr::Select(select) => collect_select(select, scope),
        SetExpr::Query(query) => collect_query(query, scope),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, scope)?;
            collect_set_expr(right, scope)
        }
        SetExpr::Insert(_) => Err(ValidationError::WriteStatement("INSERT".to_string())),
        SetExpr::Update(_) => Err(ValidationError::WriteStatement("UPDATE".to_string())),
        _ => Ok(()),
    }
}

fn collect_select(select: &Select, scope: &mut Scope) -> Result<(), ValidationError> {
    if select.into.is_some() {
        return Err(ValidationError::WriteStatement("SELECT INTO".to_string()));
    }
    for item in &select.projection {
        if let SelectItem::ExprWithAlias { alias, .. } = item {
            scope.aliases.insert(alias.value.to_lowercase());
        }
    }
    for table_with_joins in &select.from {
        collect_table_with_joins(table_with_joins, scope)?;
    }
    Ok(())
}

fn collect_table_with_joins(
    table_with_joins: &TableWithJoins,
    scope: &mut Scope,
) -> Result<(), ValidationError> {
    collect_table_factor(&table_with_joins.relation, scope)?;
    for join in &table_with_joins.joins {
        collect_table_factor(&join.relation, scope)?;
    }
    Ok(())
}

fn collect_table_factor(factor: &TableFactor, scope: &mut Scope) -> Result<(), ValidationError> {
    match factor {
        TableFactor::Table { alias, .. } => {
            if let Some(alias) = alias {
                scope.aliases.insert(alias.name.value.to_lowercase());
            }
            Ok(())
        }
        TableFactor::Derived {
            subquery, alias, ..
        } => {
            if let Some(alias) = alias {
                scope.aliases.insert(alias.name.value.to_lowercase());
            }
            collect_query(subquery, scope)
        }
        TableFactor::NestedJoin {
            table_with_joins,
            alias,
        } => {
            if let Some(alias) = alias {
                scope.aliases.insert(alias.name.value.to_lowercase());
            }
            collect_table_with_joins(table_with_joins, scope)
        }
        _ => Ok(()),
    }
}

/// Subqueries buried in expressions (`IN (SELECT …)`, `EXISTS (…)`) carry
/// their own scopes and must obey the same read-only shape.
fn collect_expression_subqueries(
    statement: &Statement,
    scope: &mut Scope,
) -> Result<(), ValidationError> {
    let flow = visit_expressions(statement, |expr: &Expr| {
        let subquery = match expr {
            Expr::Subquery(query) => Some(query),
            Expr::InSubquery { subquery, .. } => Some(subquery),
            Expr::Exists { subquery, .. } => Some(subquery),
            _ => None,
        };
        if let Some(query) = subquery {
            if let Err(error) = collect_query(query, scope) {
                return ControlFlow::Break(error);
            }
        }
        ControlFlow::Continue(())
    });
    match flow {
        ControlFlow::Break(error) => Err(error),
        ControlFlow::Continue(()) => Ok(()),
    }
}

fn scan_denied_functions(statement: &Statement) -> Result<(), ValidationError> {
    let flow = visit_expressions(statement, |expr: &Expr| {
        if let Expr::Function(function) = expr {
            if let Some(name) = function.name.0.last() {
                let lowered = name.value.to_lowercase();
                if DENIED_FUNCTIONS.contains(&lowered.as_str()) {
                    return ControlFlow::Break(ValidationError::UnsafeConstruct(format!(
                        "call to {lowered}()"
                    )));
                }
            }
        }
        ControlFlow::Continue(())
    });
    match flow {
        ControlFlow::Break(error) => Err(error),
        ControlFlow::Continue(()) => Ok(()),
    }
}

fn check_relations(
    statement: &Statement,
    scope: &Scope,
    metadata: &Metadata,
    options: &ValidationOptions,
) -> Result<(), ValidationError> {
    let namespace = options.schema_namespace.as_deref();
    let flow = visit_relations(statement, |relation: &ObjectName| {
        match check_relation(relation, scope, metadata, namespace) {
            Ok(()) => ControlFlow::Continue(()),
            Err(error) => ControlFlow::Break(error),
        }
    });
    match flow {
        ControlFlow::Break(error) => Err(error),
        ControlFlow::Continue(()) => Ok(()),
    }
}

fn check_relation(
    relation: &ObjectName,
    scope: &Scope,
    metadata: &Metadata,
    namespace: Option<&str>,
) -> Result<(), ValidationError> {
    match relation.0.as_slice() {
        [table] => {
            if metadata.tables.lookup_table(&table.value).is_some()
                || scope.ctes.contains(&table.value.to_lowercase())
            {
                Ok(())
            } else {
                Err(ValidationError::UnknownIdentifier(table.value.clone()))
            }
        }
        [qualifier, table] => {
            let in_namespace =
                namespace.is_some_and(|ns| ns.eq_ignore_ascii_case(&qualifier.value));
            if in_namespace && metadata.tables.lookup_table(&table.value).is_some() {
                Ok(())
            } else {
                Err(ValidationError::UnknownIdentifier(format!(
                    "{}.{}",
                    qualifier.value, table.value
                )))
            }
        }
        _ => Err(ValidationError::UnknownIdentifier(relation.to_string())),
    }
}

fn check_columns(
    statement: &Statement,
    scope: &Scope,
    metadata: &Metadata,
    options: &ValidationOptions,
) -> Result<(), ValidationError> {
    let namespace = options.schema_namespace.as_deref();
    let flow = visit_expressions(statement, |expr: &Expr| {
        let result = match expr {
            Expr::Identifier(ident) => check_bare_column(ident, scope, metadata),
            Expr::CompoundIdentifier(idents) => {
                check_compound_column(idents, scope, metadata, namespace)
            }
            _ => Ok(()),
        };
        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(error) => ControlFlow::Break(error),
        }
    });
    match flow {
        ControlFlow::Break(error) => Err(error),
        ControlFlow::Continue(()) => Ok(()),
    }
}

fn check_bare_column(
    ident: &Ident,
    scope: &Scope,
    metadata: &Metadata,
) -> Result<(), ValidationError> {
    if metadata.tables.column_in_any_table(&ident.value)
        || scope.aliases.contains(&ident.value.to_lowercase())
    {
        Ok(())
    } else {
        Err(ValidationError::UnknownIdentifier(ident.value.clone()))
    }
}

fn check_compound_column(
    idents: &[Ident],
    scope: &Scope,
    metadata: &Metadata,
    namespace: Option<&str>,
) -> Result<(), ValidationError> {
    let rendered = || {
        idents
            .iter()
            .map(|ident| ident.value.as_str())
            .collect::<Vec<_>>()
            .join(".")
    };
    match idents {
        [qualifier, column] => {
            if let Some(table) = metadata.tables.lookup_table(&qualifier.value) {
                // qualified by a real table: the column must belong to it
                if table
                    .columns
                    .keys()
                    .any(|name| name.eq_ignore_ascii_case(&column.value))
                {
                    return Ok(());
                }
                return Err(ValidationError::UnknownIdentifier(rendered()));
            }
            let known_qualifier = scope.aliases.contains(&qualifier.value.to_lowercase())
                || scope.ctes.contains(&qualifier.value.to_lowercase());
            let known_column = metadata.tables.column_in_any_table(&column.value)
                || scope.aliases.contains(&column.value.to_lowercase());
            if known_qualifier && known_column {
                Ok(())
            } else {
                Err(ValidationError::UnknownIdentifier(rendered()))
            }
        }
        [schema, table, column] => {
            let in_namespace = namespace.is_some_and(|ns| ns.eq_ignore_ascii_case(&schema.value));
            let column_exists = metadata
                .tables
                .lookup_table(&table.value)
                .is_some_and(|info| {
                    info.columns
                        .keys()
                        .any(|name| name.eq_ignore_ascii_case(&column.value))
                });
            if in_namespace && column_exists {
                Ok(())
            } else {
                Err(ValidationError::UnknownIdentifier(rendered()))
            }
        }
        _ => Err(ValidationError::UnknownIdentifier(rendered())),
    }
}

/// Dialect normalization on the approved statement: qualify bare table names
/// with the configured namespace, and make sure a row-limiting clause exists.
/// Statements that already limit their rows (`LIMIT` or `FETCH FIRST … ROWS
/// ONLY`) are left untouched.
fn normalize(statement: &mut Statement, scope: &Scope, options: &ValidationOptions) {
    if let Some(namespace) = &options.schema_namespace {
        let _ = visit_relations_mut(statement, |relation: &mut ObjectName| {
            if relation.0.len() == 1 && !scope.ctes.contains(&relation.0[0].value.to_lowercase()) {
                relation.0.insert(0, Ident::new(namespace.clone()));
            }
            ControlFlow::<()>::Continue(())
        });
    }
    if let Statement::Query(query) = statement {
        if query.limit.is_none() && query.fetch.is_none() {
            query.limit = Some(Expr::Value(Value::Number(
                options.max_rows.to_string(),
                false,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use query_engine_metadata::metadata::{
        ColumnInfo, ForeignRelations, Nullable, ScalarType, TableInfo, TablesInfo,
    };

    use super::*;

    fn metadata() -> Metadata {
        let mut users = BTreeMap::new();
        for name in ["user_id", "user_name", "manager_user_id"] {
            users.insert(
                name.to_string(),
                ColumnInfo {
                    name: name.to_string(),
                    r#type: ScalarType::Integer,
                    nullable: Nullable::Nullable,
                    description: None,
                },
            );
        }
        let mut tables = BTreeMap::new();
        tables.insert(
            "users".to_string(),
            TableInfo {
                table_name: "users".to_string(),
                description: None,
                columns: users,
                foreign_relations: ForeignRelations::default(),
            },
        );
        Metadata {
            tables: TablesInfo(tables),
        }
    }

    fn options() -> ValidationOptions {
        ValidationOptions::default()
    }

    #[test]
    fn test_simple_select_is_allowed_and_capped() {
        let verdict = validate("SELECT user_id FROM users", &metadata(), &options()).unwrap();
        assert_eq!(verdict.sql(), "SELECT user_id FROM users LIMIT 100");
    }

    #[test]
    fn test_existing_limit_is_left_alone() {
        let verdict =
            validate("SELECT user_id FROM users LIMIT 7", &metadata(), &options()).unwrap();
        assert_eq!(verdict.sql(), "SELECT user_id FROM users LIMIT 7");
    }

    #[test]
    fn test_fetch_first_clause_is_left_intact() {
        let verdict = validate(
            "SELECT user_id FROM users FETCH FIRST 5 ROWS ONLY",
            &metadata(),
            &options(),
        )
        .unwrap();
        assert_eq!(
            verdict.sql(),
            "SELECT user_id FROM users FETCH FIRST 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_namespace_qualifies_bare_tables_only() {
        let namespaced = ValidationOptions {
            schema_namespace: Some("profiles".to_string()),
            max_rows: 100,
        };
        let verdict = validate(
            "SELECT user_id FROM users LIMIT 5",
            &metadata(),
            &namespaced,
        )
        .unwrap();
        assert_eq!(verdict.sql(), "SELECT user_id FROM profiles.users LIMIT 5");

        // already qualified names stay as they are
        let verdict = validate(
            "SELECT user_id FROM profiles.users LIMIT 5",
            &metadata(),
            &namespaced,
        )
        .unwrap();
        assert_eq!(verdict.sql(), "SELECT user_id FROM profiles.users LIMIT 5");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let namespaced = ValidationOptions {
            schema_namespace: Some("profiles".to_string()),
            max_rows: 100,
        };
        let first = validate("SELECT user_id FROM users", &metadata(), &namespaced).unwrap();
        let second = validate(first.sql(), &metadata(), &namespaced).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_verbs_are_rejected() {
        for statement in [
            "INSERT INTO users VALUES (1)",
            "UPDATE users SET user_name = 'x'",
            "DELETE FROM users",
            "DROP TABLE users",
            "ALTER TABLE users ADD COLUMN x INT",
            "CREATE TABLE t (x INT)",
            "TRUNCATE TABLE users",
            "EXEC something",
            "MERGE INTO users USING users u ON 1 = 1",
            "GRANT ALL ON users TO public",
        ] {
            let result = validate(statement, &metadata(), &options());
            assert!(
                matches!(result, Err(ValidationError::WriteStatement(_))),
                "{statement} was not rejected as a write: {result:?}"
            );
        }
    }

    #[test]
    fn test_statement_stacking_is_rejected() {
        let result = validate("SELECT 1; SELECT 2", &metadata(), &options());
        assert_eq!(result.unwrap_err(), ValidationError::MultiStatement);
    }

    #[test]
    fn test_write_leading_stack_reports_the_write() {
        let result = validate("DROP TABLE users; SELECT 1", &metadata(), &options());
        assert_eq!(
            result.unwrap_err(),
            ValidationError::WriteStatement("DROP".to_string())
        );
    }

    #[test]
    fn test_semicolon_inside_string_literal_is_fine() {
        let verdict = validate(
            "SELECT user_id FROM users WHERE user_name = 'a;b' LIMIT 5",
            &metadata(),
            &options(),
        )
        .unwrap();
        assert_eq!(
            verdict.sql(),
            "SELECT user_id FROM users WHERE user_name = 'a;b' LIMIT 5"
        );
    }

    #[test]
    fn test_trailing_semicolon_is_stripped() {
        let verdict =
            validate("SELECT user_id FROM users LIMIT 5;", &metadata(), &options()).unwrap();
        assert_eq!(verdict.sql(), "SELECT user_id FROM users LIMIT 5");
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let result = validate(
            "SELECT * FROM users WHERE expertise = 'API Connect'",
            &metadata(),
            &options(),
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnknownIdentifier("expertise".to_string())
        );
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        let result = validate("SELECT user_id FROM accounts", &metadata(), &options());
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnknownIdentifier("accounts".to_string())
        );
    }

    #[test]
    fn test_table_qualified_column_must_belong_to_that_table() {
        let result = validate(
            "SELECT users.expertise FROM users",
            &metadata(),
            &options(),
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnknownIdentifier("users.expertise".to_string())
        );
    }

    #[test]
    fn test_aliases_are_resolved() {
        let verdict = validate(
            "SELECT u.user_id AS id FROM users u ORDER BY id LIMIT 5",
            &metadata(),
            &options(),
        )
        .unwrap();
        assert_eq!(
            verdict.sql(),
            "SELECT u.user_id AS id FROM users AS u ORDER BY id LIMIT 5"
        );
    }

    #[test]
    fn test_cte_names_resolve_as_relations() {
        let verdict = validate(
            "WITH managers AS (SELECT manager_user_id AS manager_id FROM users) \
             SELECT managers.manager_id FROM managers LIMIT 5",
            &metadata(),
            &options(),
        )
        .unwrap();
        assert!(verdict.sql().starts_with("WITH managers AS"));
    }

    #[test]
    fn test_locking_clause_is_unsafe() {
        let result = validate(
            "SELECT user_id FROM users FOR UPDATE",
            &metadata(),
            &options(),
        );
        assert!(matches!(
            result,
            Err(ValidationError::UnsafeConstruct(_))
        ));
    }

    #[test]
    fn test_denied_function_is_unsafe_even_nested() {
        let result = validate(
            "SELECT user_id FROM users WHERE user_id > pg_sleep(10)",
            &metadata(),
            &options(),
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnsafeConstruct("call to pg_sleep()".to_string())
        );
    }

    #[test]
    fn test_select_into_is_a_write() {
        let result = validate(
            "SELECT user_id INTO backup FROM users",
            &metadata(),
            &options(),
        );
        assert!(matches!(
            result,
            Err(ValidationError::WriteStatement(_))
        ));
    }

    #[test]
    fn test_subquery_identifiers_are_checked() {
        let result = validate(
            "SELECT user_id FROM users WHERE user_id IN (SELECT nonexistent FROM users)",
            &metadata(),
            &options(),
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnknownIdentifier("nonexistent".to_string())
        );
    }

    #[test]
    fn test_gibberish_is_an_extraction_error() {
        let result = validate("good morning!", &metadata(), &options());
        assert!(matches!(result, Err(ValidationError::Extraction(_))));
    }

    #[test]
    fn test_narrated_fenced_statement_is_extracted_and_allowed() {
        let raw = "Here is the query you asked for:\n\
                   ```sql\n\
                   SELECT user_id FROM users FETCH FIRST 5 ROWS ONLY\n\
                   ```\n\
                   This fetches the first five users.";
        let verdict = validate(raw, &metadata(), &options()).unwrap();
        assert_eq!(
            verdict.sql(),
            "SELECT user_id FROM users FETCH FIRST 5 ROWS ONLY"
        );
    }
}
