//! Generation categories and the carbon factors used to account for them.
//!
//! The registry is an immutable value built once at start-up and passed to the code which needs
//! it. Categories seen in the feed which are not in the registry are still recorded, but they
//! contribute no emissions and belong to no group.
use crate::id::CategoryID;
use crate::units::CarbonFactor;
use anyhow::{Result, bail, ensure};
use indexmap::IndexMap;
use indexmap::map::Entry;
use itertools::Itertools;
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// A tag describing the kind of source a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CategoryTag {
    /// Wind, solar, hydro etc.
    Renewable,
    /// Coal, gas, oil etc.
    Fossil,
    /// Nuclear fission
    Nuclear,
}

/// A group of categories whose combined share of generation is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CategoryGroup {
    /// Categories tagged renewable
    Renewable,
    /// Categories tagged fossil
    Fossil,
    /// Categories tagged renewable or nuclear
    LowCarbon,
}

impl CategoryGroup {
    /// Whether a category with the given tags is a member of this group
    pub fn includes(self, tags: &[CategoryTag]) -> bool {
        match self {
            Self::Renewable => tags.contains(&CategoryTag::Renewable),
            Self::Fossil => tags.contains(&CategoryTag::Fossil),
            Self::LowCarbon => tags
                .iter()
                .any(|tag| matches!(tag, CategoryTag::Renewable | CategoryTag::Nuclear)),
        }
    }
}

/// A generation category, e.g. coal or wind
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The label used for this category by the feed (e.g. "燃煤(Coal)")
    pub id: CategoryID,
    /// Tonnes of CO2 emitted per MWh generated
    pub carbon_factor: CarbonFactor,
    /// Which kinds of source this category counts as
    pub tags: Vec<CategoryTag>,
}

impl Category {
    /// Create a new [`Category`]
    pub fn new(id: &str, carbon_factor: f64, tags: &[CategoryTag]) -> Self {
        Self {
            id: id.into(),
            carbon_factor: CarbonFactor(carbon_factor),
            tags: tags.iter().copied().unique().collect(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} tCO2/MWh [{}]",
            self.id,
            self.carbon_factor.value(),
            self.tags.iter().join(";")
        )
    }
}

/// The known generation categories, in canonical column order
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRegistry {
    categories: IndexMap<CategoryID, Category>,
}

impl CategoryRegistry {
    /// Build a registry from a list of categories.
    ///
    /// The order of `categories` is the order in which their columns appear in the output.
    pub fn new<I>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = Category>,
    {
        let mut map = IndexMap::new();
        for category in categories {
            ensure!(
                !category.id.as_str().trim().is_empty(),
                "Category IDs cannot be empty"
            );
            ensure!(
                category.carbon_factor.value().is_finite() && category.carbon_factor.value() >= 0.0,
                "Carbon factor for {} must be a non-negative number",
                category.id
            );
            match map.entry(category.id.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(category);
                }
                Entry::Occupied(entry) => {
                    bail!("Category {} is defined more than once", entry.key())
                }
            }
        }

        Ok(Self { categories: map })
    }

    /// The built-in table of categories published by Taipower
    pub fn taipower() -> Self {
        use CategoryTag::{Fossil, Nuclear, Renewable};

        let categories = [
            Category::new("燃煤(Coal)", 0.9, &[Fossil]),
            Category::new("燃氣(LNG)", 0.5, &[Fossil]),
            Category::new("燃油(Oil)", 0.8, &[Fossil]),
            Category::new("核能(Nuclear)", 0.0, &[Nuclear]),
            Category::new("太陽能(Solar)", 0.0, &[Renewable]),
            Category::new("風力(Wind)", 0.0, &[Renewable]),
            Category::new("水力(Hydro)", 0.0, &[Renewable]),
            Category::new("汽電共生(Co-Gen)", 0.6, &[Fossil]),
            Category::new("民營電廠-燃氣(IPP-LNG)", 0.5, &[Fossil]),
            Category::new("民營電廠-燃煤(IPP-Coal)", 0.9, &[Fossil]),
            Category::new("輕油(Diesel)", 0.8, &[Fossil]),
            Category::new("儲能(Energy Storage System)", 0.0, &[]),
            Category::new("其它再生能源(Other Renewable Energy)", 0.0, &[Renewable]),
        ];

        Self {
            categories: categories
                .into_iter()
                .map(|category| (category.id.clone(), category))
                .collect(),
        }
    }

    /// Look up a category by its exact label
    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    /// The carbon factor for a category, or zero if it is unknown
    pub fn carbon_factor(&self, id: &str) -> CarbonFactor {
        self.get(id)
            .map_or(CarbonFactor(0.0), |category| category.carbon_factor)
    }

    /// Whether the category is a member of `group`. Unknown categories belong to no group.
    pub fn is_in_group(&self, id: &str, group: CategoryGroup) -> bool {
        self.get(id)
            .is_some_and(|category| group.includes(&category.tags))
    }

    /// Iterate over the category IDs in canonical order
    pub fn ids(&self) -> impl Iterator<Item = &CategoryID> {
        self.categories.keys()
    }

    /// Iterate over the categories in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// The number of categories in the registry
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the registry has no categories
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::taipower()
    }
}
