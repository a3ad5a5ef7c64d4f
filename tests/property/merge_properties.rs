//! Property-based tests for the catalog merge

use darkroom::assets::AssetLayout;
use darkroom::captions::CaptionIndex;
use darkroom::catalog::{merge, CatalogEntry, ImageMetadata, MergeContext, PrintSize};
use darkroom::pricing::PricingPolicy;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

fn image() -> impl Strategy<Value = ImageMetadata> {
    (
        "[a-e]{1,2}",
        prop_oneof![Just("jpg"), Just("png")],
        prop::option::of(-10i64..8000),
        prop::option::of(-10i64..8000),
        prop::collection::btree_set(prop_oneof![Just("L"), Just("XL"), Just("M")], 0..3),
    )
        .prop_map(|(stem, ext, width, height, formats)| ImageMetadata {
            file: format!("{}.{}", stem, ext),
            width,
            height,
            print_sizes: formats
                .into_iter()
                .map(|f| (f.to_string(), PrintSize { long: 60.0, short: 40.0 }))
                .collect(),
            resolution_warnings: BTreeMap::new(),
            year: None,
        })
}

fn run_merge(
    metadata: &[ImageMetadata],
    previous: &[CatalogEntry],
    published: &HashSet<String>,
) -> darkroom::catalog::MergeOutcome {
    let pricing = PricingPolicy::default();
    let layout = AssetLayout::default();
    let captions = CaptionIndex::default();
    let assets = |path: &str| published.contains(path);
    let ctx = MergeContext {
        pricing: &pricing,
        layout: &layout,
        assets: &assets,
        captions: &captions,
    };
    merge(metadata, previous, &ctx)
}

fn publish_all(metadata: &[ImageMetadata]) -> HashSet<String> {
    let layout = AssetLayout::default();
    metadata
        .iter()
        .flat_map(|m| [layout.medium_path(&m.file), layout.thumbnail_path(&m.file)])
        .collect()
}

proptest! {
    /// Merging the same metadata against its own output changes nothing.
    #[test]
    fn merge_is_idempotent(metadata in prop::collection::vec(image(), 0..8)) {
        let published = publish_all(&metadata);
        let first = run_merge(&metadata, &[], &published);
        let second = run_merge(&metadata, &first.catalog, &published);
        prop_assert_eq!(&first.catalog, &second.catalog);
        prop_assert!(second.missing_ids.is_empty());
    }

    /// Output ids are unique and every entry has positive dimensions.
    #[test]
    fn output_ids_unique_and_sized(metadata in prop::collection::vec(image(), 0..10)) {
        let published = publish_all(&metadata);
        let outcome = run_merge(&metadata, &[], &published);
        let mut seen = HashSet::new();
        for entry in &outcome.catalog {
            prop_assert!(seen.insert(entry.id.clone()));
            prop_assert!(entry.width > 0 && entry.height > 0);
        }
    }

    /// Curator fields survive any re-extraction; extractor fields follow the new metadata.
    #[test]
    fn curator_fields_sticky_extractor_fields_fresh(
        title in "[A-Z][a-z]{2,12}",
        visible in any::<bool>(),
        width in 1i64..9000,
        height in 1i64..9000,
    ) {
        let original = vec![ImageMetadata {
            file: "pier.jpg".to_string(),
            width: Some(1000),
            height: Some(1000),
            print_sizes: BTreeMap::new(),
            resolution_warnings: BTreeMap::new(),
            year: None,
        }];
        let published = publish_all(&original);
        let mut previous = run_merge(&original, &[], &published).catalog;
        previous[0].title = title.clone();
        previous[0].visible = visible;

        let refreshed = vec![ImageMetadata {
            width: Some(width),
            height: Some(height),
            ..original[0].clone()
        }];
        let outcome = run_merge(&refreshed, &previous, &published);
        let entry = &outcome.catalog[0];
        prop_assert_eq!(&entry.title, &title);
        prop_assert_eq!(entry.visible, visible);
        prop_assert_eq!(entry.width as i64, width);
        prop_assert_eq!(entry.height as i64, height);
    }

    /// Nothing reaches the catalog without both derivatives, and missing ids
    /// are exactly the previous ids absent from the output.
    #[test]
    fn asset_gating_and_missing_ids(
        metadata in prop::collection::vec(image(), 0..8),
        unpublished in prop::collection::vec(any::<prop::sample::Index>(), 0..4),
    ) {
        let mut published = publish_all(&metadata);
        let layout = AssetLayout::default();
        for index in &unpublished {
            if !metadata.is_empty() {
                let file = &metadata[index.index(metadata.len())].file;
                published.remove(&layout.thumbnail_path(file));
            }
        }

        let everything = publish_all(&metadata);
        let previous = run_merge(&metadata, &[], &everything).catalog;
        let outcome = run_merge(&metadata, &previous, &published);

        for entry in &outcome.catalog {
            prop_assert!(published.contains(&entry.filename));
            prop_assert!(published.contains(&entry.thumbnail_path));
        }
        let output: HashSet<&str> = outcome.catalog.iter().map(|e| e.id.as_str()).collect();
        let expected: HashSet<String> = previous
            .iter()
            .filter(|e| !output.contains(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();
        prop_assert_eq!(outcome.missing_ids.into_iter().collect::<HashSet<_>>(), expected);
    }
}
