//! The hand-maintained descriptor of the skills-profile database.
//!
//! This is static data: the schema is not discovered at runtime, and the
//! validator only accepts identifiers declared here.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{
    ColumnInfo, ForeignRelation, ForeignRelations, Metadata, Nullable, ScalarType, TableInfo,
    TablesInfo,
};

use query_engine_metadata::metadata::ScalarType::{
    Boolean, Character, CharacterVarying, Integer, Smallint, Text, Timestamp,
};

fn column(
    name: &str,
    r#type: ScalarType,
    nullable: Nullable,
    description: &str,
) -> (String, ColumnInfo) {
    (
        name.to_string(),
        ColumnInfo {
            name: name.to_string(),
            r#type,
            nullable,
            description: Some(description.to_string()),
        },
    )
}

fn foreign_key(local: &str, table: &str, remote: &str) -> (String, ForeignRelation) {
    (
        format!("{local}_to_{table}"),
        ForeignRelation {
            foreign_table: table.to_string(),
            column_mapping: BTreeMap::from([(local.to_string(), remote.to_string())]),
        },
    )
}

fn table(
    name: &str,
    description: &str,
    columns: Vec<(String, ColumnInfo)>,
    foreign_keys: Vec<(String, ForeignRelation)>,
) -> (String, TableInfo) {
    (
        name.to_string(),
        TableInfo {
            table_name: name.to_string(),
            description: Some(description.to_string()),
            columns: columns.into_iter().collect(),
            foreign_relations: ForeignRelations(foreign_keys.into_iter().collect()),
        },
    )
}

/// The full skills-profile schema.
pub fn skills_profile_metadata() -> Metadata {
    use query_engine_metadata::metadata::Nullable::{NonNullable, Nullable};

    let users = table(
        "users",
        "registered users, including managers and admins",
        vec![
            column("user_id", Integer, NonNullable, "unique user ID"),
            column("talent_id", CharacterVarying, NonNullable, "external talent ID"),
            column("w3_id", CharacterVarying, NonNullable, "corporate directory ID"),
            column("user_name", CharacterVarying, NonNullable, "full name of the user"),
            column("email", CharacterVarying, NonNullable, "email address"),
            column("profile_picture_url", CharacterVarying, Nullable, "URL to profile picture"),
            column("job_role", CharacterVarying, Nullable, "job role/title"),
            column("pjrs", CharacterVarying, Nullable, "PJRS code"),
            column("user_role", CharacterVarying, Nullable, "role: DC, Manager, Admin"),
            column("manager_talent_id", CharacterVarying, Nullable, "manager's talent ID"),
            column("manager_user_id", Integer, Nullable, "manager reference"),
            column("is_manager", Boolean, Nullable, "whether user is a manager"),
            column("is_active", Boolean, Nullable, "account active status"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![foreign_key("manager_user_id", "users", "user_id")],
    );

    let products = table(
        "products",
        "products users can declare expertise in",
        vec![
            column("product_id", Integer, NonNullable, "unique product ID"),
            column("product_name", CharacterVarying, NonNullable, "product name"),
            column("product_icon", CharacterVarying, NonNullable, "product icon identifier"),
            column("category", CharacterVarying, NonNullable, "product category"),
            column("subcategory", CharacterVarying, Nullable, "product subcategory"),
            column("product_description", CharacterVarying, Nullable, "product description"),
            column("vendor", CharacterVarying, Nullable, "product vendor"),
            column("is_active", Boolean, Nullable, "product active status"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![],
    );

    let user_product_expertise = table(
        "user_product_expertise",
        "a user's assessed expertise in a product",
        vec![
            column("expertise_id", Integer, NonNullable, "unique expertise record ID"),
            column("user_id", Integer, NonNullable, "owning user"),
            column("product_id", Smallint, NonNullable, "assessed product"),
            column("assessment_level", Character, Nullable, "expertise level: L1, L2, L3, L4"),
            column("expertise_implement", Boolean, Nullable, "can implement"),
            column("expertise_advise", Boolean, Nullable, "can advise"),
            column("expertise_design", Boolean, Nullable, "can design"),
            column("expertise_perform", Boolean, Nullable, "can perform"),
            column("project_count", Smallint, Nullable, "number of projects with this product"),
            column("has_certification", Boolean, Nullable, "has certification for product"),
            column("certification_url", CharacterVarying, Nullable, "URL to certification"),
            column("is_primary", Boolean, NonNullable, "is this primary expertise"),
            column("record_version", Smallint, Nullable, "version number for tracking changes"),
            column("approved_by", Integer, Nullable, "approving user"),
            column("approved_at", Timestamp, Nullable, "approval timestamp"),
            column("is_active", Boolean, Nullable, "record active status"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![
            foreign_key("user_id", "users", "user_id"),
            foreign_key("product_id", "products", "product_id"),
            foreign_key("approved_by", "users", "user_id"),
        ],
    );

    let user_product_assets = table(
        "user_product_assets",
        "reusable assets a user has built for a product",
        vec![
            column("asset_id", Integer, NonNullable, "unique asset ID"),
            column("user_id", Integer, NonNullable, "asset owner"),
            column("product_id", Smallint, NonNullable, "related product"),
            column("asset_name", CharacterVarying, NonNullable, "name/title of the asset"),
            column("asset_description", CharacterVarying, NonNullable, "detailed description"),
            column("repository_url", CharacterVarying, NonNullable, "URL to asset repository"),
            column("platform_type", CharacterVarying, NonNullable, "platform: GitHub, GitLab, etc."),
            column("url_validated", Boolean, Nullable, "URL validation status"),
            column("users_count", Smallint, Nullable, "number of users using this asset"),
            column("projects_count", Smallint, Nullable, "number of projects using this asset"),
            column("time_saved_hours", Smallint, Nullable, "estimated time saved in hours"),
            column("approval_status", CharacterVarying, Nullable, "status: PENDING, APPROVED, REJECTED"),
            column("manager_feedback", CharacterVarying, Nullable, "manager's feedback"),
            column("approved_by", Integer, Nullable, "approving user"),
            column("approved_at", Timestamp, Nullable, "approval timestamp"),
            column("record_version", Smallint, Nullable, "version number"),
            column("is_active", Boolean, Nullable, "record active status"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![
            foreign_key("user_id", "users", "user_id"),
            foreign_key("product_id", "products", "product_id"),
            foreign_key("approved_by", "users", "user_id"),
        ],
    );

    let user_product_knowledge_sharing = table(
        "user_product_knowledge_sharing",
        "content a user has published about a product",
        vec![
            column("knowledge_id", Integer, NonNullable, "unique knowledge sharing record ID"),
            column("user_id", Integer, NonNullable, "owning user"),
            column("product_id", Smallint, NonNullable, "related product"),
            column("content_title", CharacterVarying, NonNullable, "title of shared content"),
            column("content_type", CharacterVarying, NonNullable, "type: Blog, Video, Tutorial, etc."),
            column("content_url", CharacterVarying, NonNullable, "URL to content"),
            column("platform_type", CharacterVarying, NonNullable, "platform: Medium, YouTube, etc."),
            column("url_validated", Boolean, Nullable, "URL validation status"),
            column("views_count", Integer, Nullable, "number of views"),
            column("engagement_count", Integer, Nullable, "engagement metrics"),
            column("reach_count", Integer, Nullable, "reach metrics"),
            column("approval_status", CharacterVarying, Nullable, "status: PENDING, APPROVED, REJECTED"),
            column("manager_feedback", CharacterVarying, Nullable, "manager's feedback"),
            column("approved_by", Integer, Nullable, "approving user"),
            column("approved_at", Timestamp, Nullable, "approval timestamp"),
            column("record_version", Smallint, Nullable, "version number"),
            column("is_active", Boolean, Nullable, "record active status"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![
            foreign_key("user_id", "users", "user_id"),
            foreign_key("product_id", "products", "product_id"),
            foreign_key("approved_by", "users", "user_id"),
        ],
    );

    let submissions = table(
        "submissions",
        "bundles of changes a user submits for manager review",
        vec![
            column("submission_id", Integer, NonNullable, "unique submission ID"),
            column("user_id", Integer, NonNullable, "submitter"),
            column("manager_id", Integer, NonNullable, "reviewing manager"),
            column("submission_type", CharacterVarying, NonNullable, "type: EXPERTISE, ASSETS, KNOWLEDGE"),
            column("submission_status", CharacterVarying, Nullable, "status: PENDING, APPROVED, REJECTED, PARTIAL"),
            column("total_items", Smallint, Nullable, "total number of items in submission"),
            column("submitted_at", Timestamp, Nullable, "submission timestamp"),
            column("reviewed_at", Timestamp, Nullable, "review timestamp"),
            column("manager_feedback", CharacterVarying, Nullable, "overall manager feedback"),
            column("rejection_reason", CharacterVarying, Nullable, "reason for rejection"),
            column("is_active", Boolean, Nullable, "record active status"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![
            foreign_key("user_id", "users", "user_id"),
            foreign_key("manager_id", "users", "user_id"),
        ],
    );

    let submission_items = table(
        "submission_items",
        "individual changes inside a submission",
        vec![
            column("item_id", Integer, NonNullable, "unique item ID"),
            column("submission_id", Integer, NonNullable, "owning submission"),
            column("item_type", CharacterVarying, NonNullable, "type: EXPERTISE, ASSET, KNOWLEDGE"),
            column("entity_id", Integer, NonNullable, "ID of the entity being submitted"),
            column("product_id", Smallint, NonNullable, "related product"),
            column("change_type", CharacterVarying, NonNullable, "type: CREATE, UPDATE, DELETE"),
            column("prev_value", Text, Nullable, "previous value as JSON/text"),
            column("new_value", Text, Nullable, "new value as JSON/text"),
            column("approval_status", CharacterVarying, Nullable, "status: PENDING, APPROVED, REJECTED"),
            column("rejection_reason", CharacterVarying, Nullable, "reason for rejection"),
            column("reviewed_by", Integer, Nullable, "reviewing user"),
            column("reviewed_at", Timestamp, Nullable, "review timestamp"),
            column("created_at", Timestamp, Nullable, "record creation timestamp"),
            column("updated_at", Timestamp, Nullable, "record update timestamp"),
        ],
        vec![
            foreign_key("submission_id", "submissions", "submission_id"),
            foreign_key("product_id", "products", "product_id"),
            foreign_key("reviewed_by", "users", "user_id"),
        ],
    );

    let approvals = table(
        "approvals",
        "manager decisions on submissions",
        vec![
            column("approval_id", Integer, NonNullable, "unique approval ID"),
            column("submission_id", Integer, NonNullable, "decided submission"),
            column("manager_id", Integer, NonNullable, "approving manager"),
            column("decision", CharacterVarying, NonNullable, "decision: APPROVED, REJECTED"),
            column("rejection_reason", CharacterVarying, Nullable, "reason for rejection"),
            column("approval_feedback", CharacterVarying, Nullable, "approval feedback/comments"),
            column("created_at", Timestamp, Nullable, "approval timestamp"),
        ],
        vec![
            foreign_key("submission_id", "submissions", "submission_id"),
            foreign_key("manager_id", "users", "user_id"),
        ],
    );

    let notifications = table(
        "notifications",
        "per-user notifications about submissions and reviews",
        vec![
            column("notification_id", Integer, NonNullable, "unique notification ID"),
            column("user_id", Integer, NonNullable, "recipient"),
            column("notification_type", CharacterVarying, NonNullable, "type: SUBMISSION, APPROVAL, REJECTION, etc."),
            column("notification_title", CharacterVarying, NonNullable, "notification title"),
            column("notification_message", CharacterVarying, NonNullable, "notification message"),
            column("related_submission_id", Integer, Nullable, "related submission"),
            column("is_read", Boolean, Nullable, "read status"),
            column("read_at", Timestamp, Nullable, "timestamp when notification was read"),
            column("created_at", Timestamp, Nullable, "notification creation timestamp"),
        ],
        vec![
            foreign_key("user_id", "users", "user_id"),
            foreign_key("related_submission_id", "submissions", "submission_id"),
        ],
    );

    Metadata {
        tables: TablesInfo(
            [
                users,
                products,
                user_product_expertise,
                user_product_assets,
                user_product_knowledge_sharing,
                submissions,
                submission_items,
                approvals,
                notifications,
            ]
            .into_iter()
            .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_foreign_relation_points_at_a_declared_table_and_column() {
        let metadata = skills_profile_metadata();
        for table in metadata.tables.0.values() {
            for relation in table.foreign_relations.0.values() {
                let target = metadata
                    .tables
                    .lookup_table(&relation.foreign_table)
                    .unwrap_or_else(|| {
                        panic!(
                            "table {} references unknown table {}",
                            table.table_name, relation.foreign_table
                        )
                    });
                for (local, remote) in &relation.column_mapping {
                    assert!(
                        table.columns.contains_key(local),
                        "{} has no column {local}",
                        table.table_name
                    );
                    assert!(
                        target.columns.contains_key(remote),
                        "{} has no column {remote}",
                        target.table_name
                    );
                }
            }
        }
    }

    #[test]
    fn test_descriptor_covers_the_profile_tables() {
        let metadata = skills_profile_metadata();
        for name in [
            "users",
            "products",
            "user_product_expertise",
            "user_product_assets",
            "user_product_knowledge_sharing",
            "submissions",
            "submission_items",
            "approvals",
            "notifications",
        ] {
            assert!(metadata.tables.lookup_table(name).is_some(), "missing {name}");
        }
    }
}
