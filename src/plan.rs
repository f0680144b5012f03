//! Ingestion-plan reconciliation.
//!
//! A caller may address a column in three reference frames: its zero-based
//! physical index, its autogenerated `column_<n>` placeholder (1-based, used
//! when the file has no header row), or the final name it will carry after an
//! explicit rename. The parsing engine only understands original identity
//! (literal header text or the placeholder), so projection, dtype overrides,
//! and renames must be reconciled into original-identity form before the
//! first byte of the source is read.
//!
//! The pipeline is three pure steps, shared by the one-shot and batched
//! readers:
//!
//! 1. [`resolve_projection`] normalizes the column selection into indices or
//!    names and rejects mixed or inconsistent selections.
//! 2. [`reconcile_dtypes`] merges a positional or keyed dtype override with
//!    the projection.
//! 3. [`translate_new_names`] rewrites keyed overrides expressed in final
//!    names back to original identity.
//!
//! Every failure is a [`PlanError`] raised before any I/O occurs.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::data::ColumnType;

/// Prefix of autogenerated column names on headerless sources.
pub const PLACEHOLDER_PREFIX: &str = "column_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("column selectors must be all indices or all names, not a mixture")]
    MixedSelectors,
    #[error("column index {0} is selected more than once")]
    DuplicateIndex(usize),
    #[error("column '{0}' is selected more than once")]
    DuplicateName(String),
    #[error(
        "selected column '{0}' is not an autogenerated 'column_<n>' name, but autogenerated headers were requested"
    )]
    NotAPlaceholder(String),
    #[error("more dtype overrides are specified than there are selected columns")]
    TooManyDtypes,
    #[error("more new column names are specified than there are selected columns")]
    TooManyNewNames,
    #[error(
        "dtype override keys [{}] match renamed columns but do not cover the leading rename entries; key the override by original column names or use a positional override",
        .0.iter().map(|k| format!("'{k}'")).join(", ")
    )]
    AmbiguousRenameOverride(Vec<String>),
}

/// One user-supplied projection entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

/// A normalized column selection: physical indices or original names,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    ByIndex(Vec<usize>),
    ByName(Vec<String>),
}

impl Projection {
    /// The `column_<index+1>` identity list equivalent to a `ByIndex`
    /// projection on a headerless source.
    pub fn placeholder_names(&self) -> Option<Vec<String>> {
        match self {
            Projection::ByIndex(indices) => {
                Some(indices.iter().map(|&idx| placeholder_name(idx)).collect())
            }
            Projection::ByName(_) => None,
        }
    }
}

/// A dtype override, positional against its reference frame or keyed by a
/// column identity string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtypes {
    Positional(Vec<ColumnType>),
    Keyed(BTreeMap<String, ColumnType>),
}

/// The reconciled, original-identity-keyed instruction set handed to the
/// parsing engine. Recomputed per call, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionPlan {
    pub projection: Option<Projection>,
    pub dtypes: Option<Dtypes>,
    pub new_columns: Vec<String>,
}

impl IngestionPlan {
    /// Resolve a raw column selection, dtype override, and rename list into
    /// a plan keyed in original identity. Pure; performs no I/O.
    pub fn resolve(
        selectors: &[ColumnSelector],
        dtypes: Option<Dtypes>,
        new_columns: &[String],
        has_header: bool,
    ) -> Result<Self, PlanError> {
        let projection = resolve_projection(selectors, has_header)?;
        let dtypes = reconcile_dtypes(dtypes, projection.as_ref())?;
        let dtypes = translate_new_names(dtypes, projection.as_ref(), new_columns, has_header)?;
        Ok(IngestionPlan {
            projection,
            dtypes,
            new_columns: new_columns.to_vec(),
        })
    }
}

/// Autogenerated name for the column at zero-based `index`.
pub fn placeholder_name(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{}", index + 1)
}

/// Parse `column_<n>` back to its 1-based ordinal. Returns `None` for
/// anything that is not a well-formed placeholder.
pub fn placeholder_ordinal(name: &str) -> Option<usize> {
    let suffix = name.strip_prefix(PLACEHOLDER_PREFIX)?;
    match suffix.parse::<usize>() {
        Ok(ordinal) if ordinal > 0 && !suffix.starts_with('+') => Some(ordinal),
        _ => None,
    }
}

/// Normalize the user column selection into a [`Projection`].
///
/// All-integer input selects by physical index; all-string input selects by
/// original name. On a headerless source every name must be a well-formed
/// `column_<n>` placeholder, since no other original identity exists yet.
pub fn resolve_projection(
    selectors: &[ColumnSelector],
    has_header: bool,
) -> Result<Option<Projection>, PlanError> {
    if selectors.is_empty() {
        return Ok(None);
    }

    let mut indices = Vec::new();
    let mut names = Vec::new();
    for selector in selectors {
        match selector {
            ColumnSelector::Index(index) => indices.push(*index),
            ColumnSelector::Name(name) => names.push(name.clone()),
        }
    }
    if !indices.is_empty() && !names.is_empty() {
        return Err(PlanError::MixedSelectors);
    }

    if !indices.is_empty() {
        if let Some(duplicate) = indices.iter().duplicates().next() {
            return Err(PlanError::DuplicateIndex(*duplicate));
        }
        return Ok(Some(Projection::ByIndex(indices)));
    }

    if let Some(duplicate) = names.iter().duplicates().next() {
        return Err(PlanError::DuplicateName(duplicate.clone()));
    }
    if !has_header
        && let Some(name) = names.iter().find(|name| placeholder_ordinal(name).is_none())
    {
        return Err(PlanError::NotAPlaceholder(name.clone()));
    }
    Ok(Some(Projection::ByName(names)))
}

/// Merge a dtype override with the resolved projection.
///
/// A positional override paired with a `ByIndex` projection becomes a dense
/// flat list covering physical positions `0..=max(index)`: the engine
/// consumes one type per leading physical column and applies the selection
/// afterwards, so unselected positions are filled with the untyped
/// placeholder. A positional override paired with a `ByName` projection is
/// zipped into a keyed map. Keyed overrides pass through pending rename
/// translation.
pub fn reconcile_dtypes(
    dtypes: Option<Dtypes>,
    projection: Option<&Projection>,
) -> Result<Option<Dtypes>, PlanError> {
    let Some(dtypes) = dtypes else {
        return Ok(None);
    };
    match (dtypes, projection) {
        (Dtypes::Positional(overrides), Some(Projection::ByIndex(indices))) => {
            if indices.len() < overrides.len() {
                return Err(PlanError::TooManyDtypes);
            }
            let width = indices.iter().copied().max().unwrap_or(0) + 1;
            let mut dense = vec![ColumnType::String; width];
            for (position, &index) in indices.iter().enumerate() {
                if position < overrides.len() {
                    dense[index] = overrides[position].clone();
                }
            }
            Ok(Some(Dtypes::Positional(dense)))
        }
        (Dtypes::Positional(overrides), Some(Projection::ByName(names))) => {
            if names.len() < overrides.len() {
                return Err(PlanError::TooManyDtypes);
            }
            let keyed = names.iter().cloned().zip(overrides).collect();
            Ok(Some(Dtypes::Keyed(keyed)))
        }
        // Without a projection a positional override already addresses the
        // natural column order; the engine consumes it as-is.
        (dtypes, _) => Ok(Some(dtypes)),
    }
}

/// Rewrite keyed dtype entries expressed in final names back to original
/// identity.
///
/// Positional specifications need no translation: they are physical-position
/// based and oblivious to renaming. For keyed maps the original identities
/// occupying the renamed output positions are derived from whichever rule
/// applies (explicit name projection, headerless projection, headerless
/// sequential placeholders), and the map keys are rewritten through the
/// `new name -> current name` table. When a header is present and no name
/// projection was given, original names are unknown until the scan; see
/// [`resolve_renamed_prefix`] for how that case is settled.
pub fn translate_new_names(
    dtypes: Option<Dtypes>,
    projection: Option<&Projection>,
    new_columns: &[String],
    has_header: bool,
) -> Result<Option<Dtypes>, PlanError> {
    if new_columns.is_empty() {
        return Ok(dtypes);
    }
    let Some(Dtypes::Keyed(keyed)) = dtypes else {
        return Ok(dtypes);
    };

    let current_columns: Vec<String> = match (projection, has_header) {
        (Some(Projection::ByName(names)), _) => {
            if names.len() < new_columns.len() {
                return Err(PlanError::TooManyNewNames);
            }
            names[..new_columns.len()].to_vec()
        }
        (Some(Projection::ByIndex(indices)), false) => {
            indices.iter().map(|&idx| placeholder_name(idx)).collect()
        }
        (None, false) => (0..new_columns.len()).map(placeholder_name).collect(),
        (_, true) => return resolve_renamed_prefix(keyed, new_columns),
    };

    Ok(Some(Dtypes::Keyed(rewrite_keys(
        keyed,
        new_columns,
        &current_columns,
    ))))
}

/// Settle a keyed override when the header is present but unscanned.
///
/// If every key occupies one of the leading `len(map)` rename entries, the
/// keys denote final names of a leading prefix of the output in order, and
/// the map converts to a positional list aligned to that prefix. Keys that
/// match rename entries without covering the prefix cannot be mapped back to
/// original identity and are rejected. A map whose keys never occur in the
/// rename list is taken to be keyed by original header names and passes
/// through untouched.
fn resolve_renamed_prefix(
    keyed: BTreeMap<String, ColumnType>,
    new_columns: &[String],
) -> Result<Option<Dtypes>, PlanError> {
    if keyed.len() <= new_columns.len() {
        let prefix = &new_columns[..keyed.len()];
        if prefix.iter().all(|name| keyed.contains_key(name)) {
            let positional = prefix.iter().map(|name| keyed[name].clone()).collect();
            return Ok(Some(Dtypes::Positional(positional)));
        }
    }

    let colliding: Vec<String> = keyed
        .keys()
        .filter(|key| new_columns.contains(key))
        .cloned()
        .collect();
    if !colliding.is_empty() {
        return Err(PlanError::AmbiguousRenameOverride(colliding));
    }
    Ok(Some(Dtypes::Keyed(keyed)))
}

fn rewrite_keys(
    keyed: BTreeMap<String, ColumnType>,
    new_columns: &[String],
    current_columns: &[String],
) -> BTreeMap<String, ColumnType> {
    let new_to_current: BTreeMap<&str, &str> = new_columns
        .iter()
        .map(String::as_str)
        .zip(current_columns.iter().map(String::as_str))
        .collect();
    keyed
        .into_iter()
        .map(|(name, datatype)| {
            let key = new_to_current
                .get(name.as_str())
                .map_or(name, |current| (*current).to_string());
            (key, datatype)
        })
        .collect()
}
