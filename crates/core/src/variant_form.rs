//! Parsing of flat form fields into variant descriptors and id lists.
//!
//! A stock create form describes its color variants as sparse, index-keyed
//! fields: `color_0`, `colorScheme_0`, `color_3`, `colorScheme_3`, ...
//! Indices need not be contiguous. Entries are grouped by index into a
//! [`BTreeMap`] and iterated in ascending index order, which is also the
//! order in which uploaded files are assigned to variants. An entry counts
//! toward the file contract as soon as one of its keys is recognized, even
//! if it cannot be stored.

use std::collections::{BTreeMap, HashSet};

use crate::types::DbId;

/// Decoded form fields. Repeated fields accumulate in submission order.
pub type FieldBag = BTreeMap<String, Vec<String>>;

const COLOR: &str = "color";
const COLOR_SCHEME: &str = "colorScheme";

/// One color variant as described by the create form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    /// `ColorName` id.
    pub color: DbId,
    /// `ColorScheme` ids, possibly empty.
    pub color_schemes: Vec<DbId>,
}

/// One indexed entry of the create form. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantEntry {
    pub color: Option<DbId>,
    /// `Some(vec![])` when the field was sent with no ids.
    pub color_schemes: Option<Vec<DbId>>,
}

impl VariantEntry {
    /// The storable descriptor, or the name of the missing field kind.
    pub fn into_descriptor(self) -> Result<VariantDescriptor, &'static str> {
        Ok(VariantDescriptor {
            color: self.color.ok_or(COLOR)?,
            color_schemes: self.color_schemes.ok_or(COLOR_SCHEME)?,
        })
    }
}

/// First value of a field, trimmed. Empty values count as absent.
pub fn first_value<'a>(fields: &'a FieldBag, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(|values| values.first())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Group `color_<n>` / `colorScheme_<n>` fields by `n`.
///
/// A non-numeric color is ignored as if it were never sent. Every index
/// left with at least one recognized key yields an entry, complete or not.
/// Scheme ids are cleaned like [`parse_id_list`]. Fields with any other
/// prefix, or with a non-numeric index, are ignored.
pub fn parse_variant_fields(fields: &FieldBag) -> BTreeMap<u32, VariantEntry> {
    let mut entries: BTreeMap<u32, VariantEntry> = BTreeMap::new();

    for (key, values) in fields {
        let Some((kind, index)) = key.split_once('_') else {
            continue;
        };
        let Ok(index) = index.parse::<u32>() else {
            continue;
        };

        match kind {
            COLOR => {
                let color = values.first().and_then(|v| v.trim().parse::<DbId>().ok());
                if let Some(color) = color {
                    entries.entry(index).or_default().color = Some(color);
                }
            }
            COLOR_SCHEME => {
                entries.entry(index).or_default().color_schemes = Some(parse_id_list(values));
            }
            _ => {}
        }
    }

    entries
}

/// Parse submitted ids, dropping empty, zero, negative and non-numeric
/// values and removing duplicates while keeping first-seen order.
///
/// Values may be repeated fields or comma-separated.
pub fn parse_id_list<S: AsRef<str>>(values: &[S]) -> Vec<DbId> {
    clean_ids(
        values
            .iter()
            .flat_map(|v| v.as_ref().split(','))
            .filter_map(|v| v.trim().parse::<DbId>().ok()),
    )
}

/// Keep positive ids only, first occurrence wins.
pub fn clean_ids(ids: impl IntoIterator<Item = DbId>) -> Vec<DbId> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| *id > 0 && seen.insert(*id))
        .collect()
}

/// Ids submitted under `name`, empty when the field is absent.
pub fn id_list_field(fields: &FieldBag, name: &str) -> Vec<DbId> {
    fields
        .get(name)
        .map(|values| parse_id_list(values))
        .unwrap_or_default()
}
