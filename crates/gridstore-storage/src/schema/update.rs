//! Reconcile a table with a full incoming schema.
//!
//! Planning is pure and runs every check before any DDL. Applying runs
//! table rename → drops → column renames → adds → catalog upsert.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use tracing::{info, warn};

use gridstore_core::errors::{GridError, GridResult};
use gridstore_core::types::identifier::{validate_column_name, validate_table_name};
use gridstore_core::types::{ColumnDefinition, TableSchema, TypeHint};

use super::alter::{add_checked, check_additions, rebuild_table, rename_columns, rename_table};
use super::validate::{check_added_field, check_unique, parse_hint, CheckedField};
use crate::{catalog, introspect};

/// The structural changes needed to turn one schema into another.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// Current table name.
    pub table: String,
    pub rename_to: Option<String>,
    pub drops: Vec<String>,
    pub renames: Vec<(String, String)>,
    pub adds: Vec<ColumnDefinition>,
    /// Catalog entry once the plan is applied.
    pub target: TableSchema,
}

impl UpdatePlan {
    pub fn is_structural_noop(&self) -> bool {
        self.rename_to.is_none()
            && self.drops.is_empty()
            && self.renames.is_empty()
            && self.adds.is_empty()
    }

    fn final_name(&self) -> &str {
        self.rename_to.as_deref().unwrap_or(&self.table)
    }
}

fn same_category(existing: &ColumnDefinition, incoming_hint: TypeHint) -> bool {
    match existing.hint() {
        Some(current) => current == incoming_hint,
        None => existing.type_hint.trim().eq_ignore_ascii_case(incoming_hint.canonical()),
    }
}

/// Work out what `incoming` changes relative to `current`.
///
/// Incoming fields are matched to current ones by `old_name` (or by name
/// when `old_name` is absent). Unmatched incoming fields are additions and
/// unmatched current fields are drops.
pub fn plan_update(current: &TableSchema, incoming: &TableSchema) -> GridResult<UpdatePlan> {
    if incoming.fields.is_empty() {
        return Err(GridError::EmptyFieldSet);
    }

    let target_name = match incoming.name.trim() {
        "" => current.name.clone(),
        name => {
            validate_table_name(name)?;
            name.to_string()
        }
    };
    let rename_to = (target_name != current.name).then(|| target_name.clone());

    let by_name: HashMap<String, &ColumnDefinition> = current
        .fields
        .iter()
        .map(|f| (f.name.to_ascii_lowercase(), f))
        .collect();

    let mut matched: HashSet<String> = HashSet::new();
    let mut renames = Vec::new();
    let mut adds = Vec::new();
    let mut fields = Vec::with_capacity(incoming.fields.len());

    for field in &incoming.fields {
        let name = field.name.trim();
        if name.is_empty() {
            return Err(GridError::EmptyFieldName);
        }
        let source = field
            .old_name
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(name);

        match by_name.get(&source.to_ascii_lowercase()) {
            Some(existing) => {
                if !matched.insert(existing.name.to_ascii_lowercase()) {
                    return Err(GridError::DuplicateField {
                        name: existing.name.clone(),
                    });
                }
                validate_column_name(name)?;
                let hint_text = field.type_hint.trim();
                if !hint_text.is_empty() {
                    let hint = parse_hint(name, hint_text)?;
                    if !same_category(existing, hint) {
                        return Err(GridError::TypeChangeForbidden {
                            column: existing.name.clone(),
                            from: existing.type_hint.clone(),
                            to: hint_text.to_string(),
                        });
                    }
                }
                if existing.name != name {
                    renames.push((existing.name.clone(), name.to_string()));
                }
                fields.push(ColumnDefinition {
                    name: name.to_string(),
                    old_name: None,
                    labels: field.labels.clone(),
                    type_hint: existing.type_hint.clone(),
                    allow_null: field.allow_null,
                    default: existing.default.clone(),
                });
            }
            None => {
                let CheckedField { def, .. } = check_added_field(&ColumnDefinition {
                    name: name.to_string(),
                    ..field.clone()
                })?;
                adds.push(def.clone());
                fields.push(def);
            }
        }
    }
    check_unique(fields.iter().map(|f| f.name.as_str()))?;

    let drops: Vec<String> = current
        .fields
        .iter()
        .filter(|f| !matched.contains(&f.name.to_ascii_lowercase()))
        .map(|f| f.name.clone())
        .collect();

    Ok(UpdatePlan {
        table: current.name.clone(),
        rename_to,
        drops,
        renames,
        adds,
        target: TableSchema {
            name: target_name,
            display_name: incoming.display_name.trim().to_string(),
            description: incoming.description.clone(),
            fields,
        },
    })
}

/// Plan and apply an update of `table` to `incoming`.
pub fn update_table(conn: &Connection, table: &str, incoming: &TableSchema) -> GridResult<UpdatePlan> {
    let (name, known) = introspect::known_columns(conn, table)?;
    let stored = catalog::load_schema(conn, &name)?.ok_or_else(|| GridError::UnknownTable {
        table: table.to_string(),
    })?;
    let current = TableSchema {
        fields: known,
        ..stored
    };
    let plan = plan_update(&current, incoming)?;

    if let Some(new_name) = &plan.rename_to {
        if !new_name.eq_ignore_ascii_case(&plan.table)
            && (catalog::find_table(conn, new_name)?.is_some()
                || introspect::physical_table(conn, new_name)?.is_some())
        {
            return Err(GridError::TableExists {
                table: new_name.clone(),
            });
        }
    }

    apply_update(conn, &plan)?;
    info!(
        table = %plan.final_name(),
        renamed = plan.rename_to.is_some(),
        dropped = plan.drops.len(),
        renamed_columns = plan.renames.len(),
        added = plan.adds.len(),
        "table updated"
    );
    Ok(plan)
}

fn apply_update(conn: &Connection, plan: &UpdatePlan) -> GridResult<()> {
    if let Some(new_name) = &plan.rename_to {
        rename_table(conn, &plan.table, new_name)?;
    }
    let table = plan.final_name();

    let physical = introspect::logical_columns(conn, table)?;
    let stale: Vec<String> = catalog::load_columns(conn, table)?
        .into_iter()
        .filter(|c| !physical.iter().any(|p| p.name.eq_ignore_ascii_case(&c.name)))
        .map(|c| c.name)
        .collect();
    if !stale.is_empty() {
        warn!(table, columns = ?stale, "purging stale catalog columns");
        catalog::delete_columns(conn, table, &stale)?;
    }

    let mut adds_pending = true;
    if !plan.drops.is_empty() {
        let is_dropped = |name: &str| plan.drops.iter().any(|d| d.eq_ignore_ascii_case(name));
        let survivors: Vec<_> = physical.iter().filter(|p| !is_dropped(&p.name)).cloned().collect();
        if survivors.is_empty() {
            // Nothing survives; build the added columns straight into the new table.
            let checked = plan
                .adds
                .iter()
                .map(check_added_field)
                .collect::<GridResult<Vec<_>>>()?;
            let extra: Vec<String> = checked.iter().map(CheckedField::ddl).collect();
            rebuild_table(conn, table, &[], &extra)?;
            adds_pending = false;
        } else if survivors.len() != physical.len() {
            rebuild_table(conn, table, &survivors, &[])?;
        }
        catalog::delete_columns(conn, table, &plan.drops)?;
    }

    rename_columns(conn, table, &plan.renames)?;

    if adds_pending && !plan.adds.is_empty() {
        let checked = check_additions(conn, table, &plan.adds)?;
        add_checked(conn, table, &checked)?;
    }

    catalog::upsert_schema(conn, &plan.target)
}
