//! Waste categories and the label-to-category classifier.
//!
//! Classification is a pure set intersection of the labels seen in a frame
//! against three static membership tables. Display formatting lives here too,
//! but it is only ever applied to classified output, never to matching.

use std::collections::BTreeSet;
use std::fmt;

/// Name of an object class as produced by the detector (e.g. `plastic_bottle`).
pub type DetectionLabel = String;

/// Unique labels observed in one processed frame.
///
/// Backed by a `BTreeSet` so iteration (and therefore sidebar output) is stable.
/// Equality is plain set equality.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeSet<DetectionLabel>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label. Returns false if it was already present.
    pub fn insert(&mut self, label: impl Into<DetectionLabel>) -> bool {
        self.0.insert(label.into())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Labels present in both sets.
    pub fn intersection(&self, other: &LabelSet) -> LabelSet {
        LabelSet(self.0.intersection(&other.0).cloned().collect())
    }
}

impl<S: Into<DetectionLabel>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LabelSet(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a DetectionLabel;
    type IntoIter = std::collections::btree_set::Iter<'a, DetectionLabel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WasteCategory {
    Recyclable,
    NonRecyclable,
    Hazardous,
}

impl WasteCategory {
    /// Sidebar order.
    pub const ALL: [WasteCategory; 3] = [
        WasteCategory::Recyclable,
        WasteCategory::NonRecyclable,
        WasteCategory::Hazardous,
    ];

    /// Heading used in the sidebar.
    pub fn title(self) -> &'static str {
        match self {
            WasteCategory::Recyclable => "Recyclable",
            WasteCategory::NonRecyclable => "Non-Recyclable",
            WasteCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Static membership tables, built once from configuration.
///
/// The tables are expected to be disjoint but this is not enforced: a label
/// listed in two tables is reported under both categories.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryTables {
    recyclable: LabelSet,
    non_recyclable: LabelSet,
    hazardous: LabelSet,
}

impl CategoryTables {
    pub fn new(recyclable: LabelSet, non_recyclable: LabelSet, hazardous: LabelSet) -> Self {
        Self {
            recyclable,
            non_recyclable,
            hazardous,
        }
    }

    pub fn table(&self, category: WasteCategory) -> &LabelSet {
        match category {
            WasteCategory::Recyclable => &self.recyclable,
            WasteCategory::NonRecyclable => &self.non_recyclable,
            WasteCategory::Hazardous => &self.hazardous,
        }
    }

    /// First category (in sidebar order) whose table lists `label`.
    pub fn category_of(&self, label: &str) -> Option<WasteCategory> {
        WasteCategory::ALL
            .into_iter()
            .find(|category| self.table(*category).contains(label))
    }

    /// Labels listed in more than one table, with every table they appear in.
    pub fn overlaps(&self) -> Vec<(DetectionLabel, Vec<WasteCategory>)> {
        let mut all = LabelSet::new();
        for category in WasteCategory::ALL {
            for label in self.table(category) {
                all.insert(label.clone());
            }
        }
        all.iter()
            .filter_map(|label| {
                let hits: Vec<WasteCategory> = WasteCategory::ALL
                    .into_iter()
                    .filter(|category| self.table(*category).contains(label))
                    .collect();
                (hits.len() > 1).then(|| (label.to_string(), hits))
            })
            .collect()
    }
}

/// Per-category subsets of one frame's labels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorizedResult {
    pub recyclable: LabelSet,
    pub non_recyclable: LabelSet,
    pub hazardous: LabelSet,
}

impl CategorizedResult {
    pub fn get(&self, category: WasteCategory) -> &LabelSet {
        match category {
            WasteCategory::Recyclable => &self.recyclable,
            WasteCategory::NonRecyclable => &self.non_recyclable,
            WasteCategory::Hazardous => &self.hazardous,
        }
    }

    pub fn is_empty(&self) -> bool {
        WasteCategory::ALL
            .into_iter()
            .all(|category| self.get(category).is_empty())
    }
}

/// Intersect a frame's labels with each category table.
pub fn classify(labels: &LabelSet, tables: &CategoryTables) -> CategorizedResult {
    CategorizedResult {
        recyclable: labels.intersection(tables.table(WasteCategory::Recyclable)),
        non_recyclable: labels.intersection(tables.table(WasteCategory::NonRecyclable)),
        hazardous: labels.intersection(tables.table(WasteCategory::Hazardous)),
    }
}

/// Human-readable form of a label: `glass_bottle` -> `glass bottle`.
pub fn display_label(label: &str) -> String {
    label.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> CategoryTables {
        CategoryTables::new(
            ["glass_bottle", "cardboard_box", "aluminium_can"]
                .into_iter()
                .collect(),
            ["chip_bag", "styrofoam_cup"].into_iter().collect(),
            ["battery", "paint_can"].into_iter().collect(),
        )
    }

    #[test]
    fn classify_intersects_each_table() {
        let labels: LabelSet = ["glass_bottle", "battery", "chip_bag", "banana_peel"]
            .into_iter()
            .collect();
        let result = classify(&labels, &tables());

        assert_eq!(result.recyclable, ["glass_bottle"].into_iter().collect::<LabelSet>());
        assert_eq!(result.non_recyclable, ["chip_bag"].into_iter().collect::<LabelSet>());
        assert_eq!(result.hazardous, ["battery"].into_iter().collect::<LabelSet>());
    }

    #[test]
    fn unknown_labels_produce_empty_result() {
        let labels: LabelSet = ["banana_peel"].into_iter().collect();
        let result = classify(&labels, &tables());
        assert!(result.is_empty());

        let result = classify(&LabelSet::new(), &tables());
        assert!(result.is_empty());
    }

    #[test]
    fn classify_is_idempotent() {
        let labels: LabelSet = ["glass_bottle", "paint_can"].into_iter().collect();
        let t = tables();
        assert_eq!(classify(&labels, &t), classify(&labels, &t));
    }

    #[test]
    fn disjoint_tables_give_disjoint_results() {
        let labels: LabelSet = [
            "glass_bottle",
            "cardboard_box",
            "chip_bag",
            "battery",
            "paint_can",
        ]
        .into_iter()
        .collect();
        let result = classify(&labels, &tables());

        assert!(result.recyclable.intersection(&result.non_recyclable).is_empty());
        assert!(result.recyclable.intersection(&result.hazardous).is_empty());
        assert!(result.non_recyclable.intersection(&result.hazardous).is_empty());
    }

    #[test]
    fn overlapping_tables_report_label_in_both_categories() {
        let t = CategoryTables::new(
            ["aerosol_can"].into_iter().collect(),
            LabelSet::new(),
            ["aerosol_can"].into_iter().collect(),
        );
        let labels: LabelSet = ["aerosol_can"].into_iter().collect();
        let result = classify(&labels, &t);

        assert!(result.recyclable.contains("aerosol_can"));
        assert!(result.hazardous.contains("aerosol_can"));
        assert_eq!(
            t.overlaps(),
            vec![(
                "aerosol_can".to_string(),
                vec![WasteCategory::Recyclable, WasteCategory::Hazardous]
            )]
        );
    }

    #[test]
    fn glass_bottle_example() {
        let t = CategoryTables::new(
            ["glass_bottle"].into_iter().collect(),
            LabelSet::new(),
            LabelSet::new(),
        );
        let labels: LabelSet = ["glass_bottle", "banana_peel"].into_iter().collect();
        let result = classify(&labels, &t);

        assert_eq!(result.recyclable, ["glass_bottle"].into_iter().collect::<LabelSet>());
        assert!(result.non_recyclable.is_empty());
        assert!(result.hazardous.is_empty());

        let shown: Vec<String> = result.recyclable.iter().map(display_label).collect();
        assert_eq!(shown, vec!["glass bottle"]);
    }

    #[test]
    fn display_formatting_does_not_affect_matching() {
        let labels: LabelSet = ["glass bottle"].into_iter().collect();
        let result = classify(&labels, &tables());
        assert!(result.recyclable.is_empty());

        assert_eq!(display_label("plastic_milk_jug"), "plastic milk jug");
        assert_eq!(display_label("battery"), "battery");
    }

    #[test]
    fn category_lookup_follows_sidebar_order() {
        let t = tables();
        assert_eq!(t.category_of("battery"), Some(WasteCategory::Hazardous));
        assert_eq!(t.category_of("glass_bottle"), Some(WasteCategory::Recyclable));
        assert_eq!(t.category_of("banana_peel"), None);
    }
}
