//! Integration tests for schema analysis and query collection over files

use intentsql_analyzer::{QueryCollector, SchemaAnalyzer};
use intentsql_core::ParamValue;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

const SCHEMA: &str = r#"
import { pgTable, uuid, text, timestamp, integer, primaryKey } from 'drizzle-orm/pg-core';

export const organizations = pgTable('organizations', {
  id: uuid('id').primaryKey().defaultRandom(),
  name: text('name').notNull(),
  plan: text('plan', { enum: ['free', 'pro', 'enterprise'] }).default('free'),
});

export const users = pgTable('users', {
  id: uuid('id').primaryKey(),
  name: text('name').notNull(),
  email: text('email').notNull().unique(),
  orgId: uuid('org_id').references(() => organizations.id),
  createdAt: timestamp('created_at').defaultNow(),
});

export type User = typeof users.$inferSelect;

export const memberships = pgTable('memberships', {
  userId: uuid('user_id').notNull().references(() => users.id),
  orgId: uuid('org_id').notNull().references(() => organizations.id),
  seats: integer('seats').default(1),
});
export const membershipsKey = primaryKey(memberships.userId, memberships.orgId);
"#;

const USERS_SOURCE: &str = r#"
import { db, llm } from './db';

export async function activeUsers(orgId: string): Promise<User[]> {
  return db.llm('Get active users for an organization', { orgId, limit: 50 });
}

export const findUser = async (id: string) => {
  const user: User = await llm`Get user with id ${id}`;
  return user;
};
"#;

const REPORTS_SOURCE: &str = r#"
import { client } from './db';

export const seatTotals = () => client.llm<{ org: string; seats: number }[]>('Sum seats per organization').many();
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn analyzes_schema_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "schema.ts", SCHEMA);

    let schema = SchemaAnalyzer::default().analyze_files(&[path]);

    assert_eq!(schema.table_names(), vec!["organizations", "users", "memberships"]);
    assert!(schema.relations.is_empty());

    let orgs = schema.find_table("organizations").unwrap();
    let plan = orgs.find_column("plan").unwrap();
    assert_eq!(plan.default_value.as_deref(), Some("free"));
    assert_eq!(plan.enum_values.as_ref().map(|v| v.len()), Some(3));
    assert_eq!(
        orgs.find_column("id").unwrap().default_value.as_deref(),
        Some("gen_random_uuid()")
    );

    let users = schema.find_table("users").unwrap();
    let org_ref = users.find_column("orgId").unwrap().references.as_ref().unwrap();
    assert_eq!((org_ref.table.as_str(), org_ref.column.as_str()), ("organizations", "id"));

    let memberships = schema.find_table("memberships").unwrap();
    assert_eq!(
        memberships.primary_key,
        Some(vec!["user_id".to_string(), "org_id".to_string()])
    );
    assert_eq!(memberships.find_column("seats").unwrap().default_value.as_deref(), Some("1"));
}

#[test]
fn collects_across_files_in_given_order() {
    let dir = TempDir::new().unwrap();
    let users = write(&dir, "users.ts", USERS_SOURCE);
    let reports = write(&dir, "reports.ts", REPORTS_SOURCE);
    let missing = dir.path().join("missing.ts");

    let queries = QueryCollector::default().collect_files(&[reports.clone(), missing, users.clone()]);

    let intents: Vec<_> = queries.iter().map(|q| q.intent.as_str()).collect();
    assert_eq!(
        intents,
        vec![
            "Sum seats per organization",
            "Get active users for an organization",
            "Get user with id ${0}",
        ]
    );

    let seats = &queries[0];
    assert_eq!(seats.return_type.as_deref(), Some("{ org: string; seats: number }[]"));
    assert_eq!(seats.expects_multiple, Some(true));
    assert!(seats.source_file.ends_with("reports.ts"));

    let active = &queries[1];
    assert_eq!(active.return_type.as_deref(), Some("User[]"));
    let params = active.params.as_ref().unwrap();
    assert_eq!(params["orgId"], ParamValue::Expression("orgId".into()));
    assert_eq!(params["limit"], ParamValue::Number(50.0));

    let user = &queries[2];
    assert_eq!(user.return_type.as_deref(), Some("User"));
    assert_eq!(user.location.line, 9);
}

#[test]
fn repeated_collection_is_identical() {
    let dir = TempDir::new().unwrap();
    let users = write(&dir, "users.ts", USERS_SOURCE);

    let collector = QueryCollector::default();
    let first = serde_json::to_string(&collector.collect_files(&[users.clone()])).unwrap();
    let second = serde_json::to_string(&collector.collect_files(&[users])).unwrap();

    assert_eq!(first, second);
}

#[test]
fn reformatting_elsewhere_keeps_identity_of_untouched_sites() {
    let before = "const a = db.llm('Get users');\nconst b = db.llm('Get posts');";
    let after = "const a = db.llm('Get users');\nconst   b   = db.llm('Get posts');";

    let collector = QueryCollector::default();
    let before = collector.collect_source("src/q.ts", before).unwrap();
    let after = collector.collect_source("src/q.ts", after).unwrap();

    assert_eq!(before[0].id, after[0].id);
    assert_ne!(before[1].id, after[1].id);
}
