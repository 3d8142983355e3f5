//! Schema-reference rewriting for temp restores
//!
//! A snapshot restored into the temp schema must not touch production, so
//! every schema-qualified reference in the dumped SQL is redirected to the
//! temp name before replay. The dump is opaque SQL text, so this is a
//! textual transform, not a SQL-aware rename. It is correct because pg_dump
//! plain format always qualifies objects with the literal schema name and
//! never relies on search_path; keep dumping with explicit qualification or
//! this transform silently produces cross-schema corruption.
//!
//! Three surface forms cover pg_dump's output:
//! - `" <schema>."`  table/sequence/column qualification
//! - `" <schema>;"`  bare schema references ending a statement
//! - `"\"<schema>\""` quoted-identifier form

/// Redirect every reference of schema `from` to schema `to`.
pub fn redirect_schema(sql: &str, from: &str, to: &str) -> String {
    sql.replace(&format!(" {}.", from), &format!(" {}.", to))
        .replace(&format!(" {};", from), &format!(" {};", to))
        .replace(&format!("\"{}\"", from), &format!("\"{}\"", to))
}
