use std::collections::BTreeMap;

use csv_ingest::data::ColumnType;
use csv_ingest::plan::{
    ColumnSelector, Dtypes, IngestionPlan, PlanError, Projection, placeholder_name,
    resolve_projection,
};
use proptest::prelude::*;

fn indices(values: &[usize]) -> Vec<ColumnSelector> {
    values.iter().map(|&idx| ColumnSelector::Index(idx)).collect()
}

fn names(values: &[&str]) -> Vec<ColumnSelector> {
    values
        .iter()
        .map(|name| ColumnSelector::Name((*name).to_string()))
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn keyed(entries: &[(&str, ColumnType)]) -> Dtypes {
    Dtypes::Keyed(
        entries
            .iter()
            .map(|(name, ty)| ((*name).to_string(), ty.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn empty_selection_means_no_projection() {
    let plan = IngestionPlan::resolve(&[], None, &[], true).unwrap();
    assert_eq!(plan.projection, None);
    assert_eq!(plan.dtypes, None);
    assert!(plan.new_columns.is_empty());
}

#[test]
fn mixed_selectors_are_rejected() {
    let selectors = vec![
        ColumnSelector::Index(0),
        ColumnSelector::Name("amount".to_string()),
    ];
    let err = resolve_projection(&selectors, true).unwrap_err();
    assert_eq!(err, PlanError::MixedSelectors);
}

#[test]
fn duplicate_indices_are_rejected() {
    let err = resolve_projection(&indices(&[0, 2, 0]), true).unwrap_err();
    assert_eq!(err, PlanError::DuplicateIndex(0));
}

#[test]
fn duplicate_names_are_rejected() {
    let err = resolve_projection(&names(&["a", "b", "a"]), true).unwrap_err();
    assert_eq!(err, PlanError::DuplicateName("a".to_string()));
}

#[test]
fn headerless_selection_requires_placeholder_names() {
    let err = resolve_projection(&names(&["column_1", "amount"]), false).unwrap_err();
    assert_eq!(err, PlanError::NotAPlaceholder("amount".to_string()));

    let projection = resolve_projection(&names(&["column_2", "column_1"]), false)
        .unwrap()
        .unwrap();
    assert_eq!(
        projection,
        Projection::ByName(strings(&["column_2", "column_1"]))
    );
}

#[test]
fn index_projection_spreads_positional_dtypes_into_a_dense_list() {
    let plan = IngestionPlan::resolve(
        &indices(&[1, 4, 2]),
        Some(Dtypes::Positional(vec![
            ColumnType::Integer,
            ColumnType::Float,
        ])),
        &[],
        true,
    )
    .unwrap();

    let Some(Dtypes::Positional(dense)) = plan.dtypes else {
        panic!("expected a dense positional list");
    };
    assert_eq!(dense.len(), 5);
    assert_eq!(dense[1], ColumnType::Integer);
    assert_eq!(dense[4], ColumnType::Float);
    // Position 2 is selected but has no override; everything else is
    // unselected. Both stay at the untyped placeholder.
    assert_eq!(dense[0], ColumnType::String);
    assert_eq!(dense[2], ColumnType::String);
    assert_eq!(dense[3], ColumnType::String);
}

#[test]
fn name_projection_zips_positional_dtypes_into_a_keyed_map() {
    let plan = IngestionPlan::resolve(
        &names(&["a", "b", "c"]),
        Some(Dtypes::Positional(vec![
            ColumnType::Integer,
            ColumnType::Boolean,
        ])),
        &[],
        true,
    )
    .unwrap();

    let Some(Dtypes::Keyed(map)) = plan.dtypes else {
        panic!("expected a keyed map");
    };
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("a"), Some(&ColumnType::Integer));
    assert_eq!(map.get("b"), Some(&ColumnType::Boolean));
}

#[test]
fn more_dtypes_than_selected_columns_fails_for_both_projection_shapes() {
    let overrides = Dtypes::Positional(vec![
        ColumnType::Integer,
        ColumnType::Float,
        ColumnType::Boolean,
    ]);

    let err = IngestionPlan::resolve(&indices(&[0, 1]), Some(overrides.clone()), &[], true)
        .unwrap_err();
    assert_eq!(err, PlanError::TooManyDtypes);

    let err =
        IngestionPlan::resolve(&names(&["a", "b"]), Some(overrides), &[], true).unwrap_err();
    assert_eq!(err, PlanError::TooManyDtypes);
}

#[test]
fn positional_dtypes_without_projection_pass_through() {
    let plan = IngestionPlan::resolve(
        &[],
        Some(Dtypes::Positional(vec![
            ColumnType::Integer,
            ColumnType::Date,
        ])),
        &[],
        true,
    )
    .unwrap();
    assert_eq!(
        plan.dtypes,
        Some(Dtypes::Positional(vec![
            ColumnType::Integer,
            ColumnType::Date,
        ]))
    );
}

#[test]
fn rename_rewrites_keyed_dtypes_to_selected_original_names() {
    let plan = IngestionPlan::resolve(
        &names(&["a", "b"]),
        Some(keyed(&[("x", ColumnType::Integer), ("y", ColumnType::String)])),
        &strings(&["x", "y"]),
        true,
    )
    .unwrap();

    let Some(Dtypes::Keyed(map)) = plan.dtypes else {
        panic!("expected a keyed map");
    };
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("a"), Some(&ColumnType::Integer));
    assert_eq!(map.get("b"), Some(&ColumnType::String));
}

#[test]
fn more_new_names_than_selected_columns_fails() {
    let err = IngestionPlan::resolve(
        &names(&["a"]),
        Some(keyed(&[("x", ColumnType::Integer)])),
        &strings(&["x", "y"]),
        true,
    )
    .unwrap_err();
    assert_eq!(err, PlanError::TooManyNewNames);
}

#[test]
fn headerless_index_projection_maps_renames_through_placeholders() {
    let plan = IngestionPlan::resolve(
        &indices(&[2, 0]),
        Some(keyed(&[("x", ColumnType::Float)])),
        &strings(&["x", "y"]),
        false,
    )
    .unwrap();

    // Output position 0 is physical column 2, i.e. column_3.
    let Some(Dtypes::Keyed(map)) = plan.dtypes else {
        panic!("expected a keyed map");
    };
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("column_3"), Some(&ColumnType::Float));
}

#[test]
fn headerless_unprojected_renames_map_to_sequential_placeholders() {
    let plan = IngestionPlan::resolve(
        &[],
        Some(keyed(&[("x", ColumnType::Integer)])),
        &strings(&["x", "y", "z"]),
        false,
    )
    .unwrap();

    let Some(Dtypes::Keyed(map)) = plan.dtypes else {
        panic!("expected a keyed map");
    };
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("column_1"), Some(&ColumnType::Integer));
}

#[test]
fn header_present_rename_prefix_converts_keyed_dtypes_to_positional() {
    let plan = IngestionPlan::resolve(
        &[],
        Some(keyed(&[("x", ColumnType::Integer), ("y", ColumnType::String)])),
        &strings(&["x", "y"]),
        true,
    )
    .unwrap();

    assert_eq!(
        plan.dtypes,
        Some(Dtypes::Positional(vec![
            ColumnType::Integer,
            ColumnType::String,
        ]))
    );
}

#[test]
fn header_present_keys_off_the_rename_prefix_are_rejected() {
    // "y" is renamed but occupies position 1 while the map covers only one
    // leading entry, so the key cannot be mapped back to an original name.
    let err = IngestionPlan::resolve(
        &[],
        Some(keyed(&[("y", ColumnType::Integer)])),
        &strings(&["x", "y"]),
        true,
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::AmbiguousRenameOverride(keys) if keys == vec!["y"]));
}

#[test]
fn header_present_original_name_keys_pass_through_unrenamed() {
    // Keys that never occur in the rename list are original header names and
    // stay usable as-is.
    let plan = IngestionPlan::resolve(
        &[],
        Some(keyed(&[("amount", ColumnType::Float)])),
        &strings(&["x", "y"]),
        true,
    )
    .unwrap();

    assert_eq!(plan.dtypes, Some(keyed(&[("amount", ColumnType::Float)])));
}

#[test]
fn keyed_dtypes_without_rename_pass_through() {
    let plan = IngestionPlan::resolve(
        &indices(&[0, 3]),
        Some(keyed(&[("amount", ColumnType::Float)])),
        &[],
        true,
    )
    .unwrap();
    assert_eq!(plan.dtypes, Some(keyed(&[("amount", ColumnType::Float)])));
}

#[test]
fn resolution_is_idempotent() {
    let selectors = names(&["a", "b", "c"]);
    let overrides = Some(Dtypes::Positional(vec![
        ColumnType::Integer,
        ColumnType::Boolean,
    ]));
    let renames = strings(&["x", "y"]);

    let first =
        IngestionPlan::resolve(&selectors, overrides.clone(), &renames, true).unwrap();
    let second = IngestionPlan::resolve(&selectors, overrides, &renames, true).unwrap();
    assert_eq!(first, second);
}

fn dtype_strategy() -> impl Strategy<Value = ColumnType> {
    prop_oneof![
        Just(ColumnType::String),
        Just(ColumnType::Integer),
        Just(ColumnType::Float),
        Just(ColumnType::Boolean),
        Just(ColumnType::Date),
        Just(ColumnType::DateTime),
        Just(ColumnType::Guid),
    ]
}

proptest! {
    #[test]
    fn dense_list_always_covers_max_index_and_defaults_elsewhere(
        selected in proptest::collection::btree_set(0usize..48, 1..8),
        overrides in proptest::collection::vec(dtype_strategy(), 0..8),
    ) {
        let projection: Vec<usize> = selected.into_iter().collect();
        prop_assume!(overrides.len() <= projection.len());

        let plan = IngestionPlan::resolve(
            &projection
                .iter()
                .map(|&idx| ColumnSelector::Index(idx))
                .collect::<Vec<_>>(),
            Some(Dtypes::Positional(overrides.clone())),
            &[],
            true,
        )
        .unwrap();

        let Some(Dtypes::Positional(dense)) = plan.dtypes else {
            panic!("expected a dense positional list");
        };
        let max_index = *projection.iter().max().unwrap();
        prop_assert_eq!(dense.len(), max_index + 1);

        for (position, &index) in projection.iter().enumerate() {
            if position < overrides.len() {
                prop_assert_eq!(&dense[index], &overrides[position]);
            }
        }
        let overridden: Vec<usize> = projection
            .iter()
            .take(overrides.len())
            .copied()
            .collect();
        for (index, datatype) in dense.iter().enumerate() {
            if !overridden.contains(&index) {
                prop_assert_eq!(datatype, &ColumnType::String);
            }
        }
    }

    #[test]
    fn placeholder_names_are_one_based(index in 0usize..1000) {
        let name = placeholder_name(index);
        prop_assert_eq!(name, format!("column_{}", index + 1));
    }
}
