//! The seven independently patchable step slices of an onboarding record.
//!
//! The state machine treats every slice as an opaque JSON object. Writing
//! one slice never reads or validates another.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JsonMap;

// ---------------------------------------------------------------------------
// Slice names
// ---------------------------------------------------------------------------

/// Name of a step slice. The serialized form is the JSON key used in
/// records and PATCH bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SliceName {
    RestaurantInfo,
    Contact,
    BusinessData,
    TechSetup,
    Tables,
    Menu,
    Agreement,
}

impl SliceName {
    /// Every slice in step order.
    pub const ALL: [SliceName; 7] = [
        Self::RestaurantInfo,
        Self::Contact,
        Self::BusinessData,
        Self::TechSetup,
        Self::Tables,
        Self::Menu,
        Self::Agreement,
    ];

    /// JSON key of the slice (`restaurantInfo`, `contact`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Self::RestaurantInfo => "restaurantInfo",
            Self::Contact => "contact",
            Self::BusinessData => "businessData",
            Self::TechSetup => "techSetup",
            Self::Tables => "tables",
            Self::Menu => "menu",
            Self::Agreement => "agreement",
        }
    }

    /// Database column holding the slice.
    pub fn column(self) -> &'static str {
        match self {
            Self::RestaurantInfo => "restaurant_info",
            Self::Contact => "contact",
            Self::BusinessData => "business_data",
            Self::TechSetup => "tech_setup",
            Self::Tables => "tables",
            Self::Menu => "menu",
            Self::Agreement => "agreement",
        }
    }

    /// Look up a slice by its JSON key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slice| slice.key() == key)
    }

    /// 1-based wizard step that edits this slice.
    pub fn step_number(self) -> u8 {
        match self {
            Self::RestaurantInfo => 1,
            Self::Contact => 2,
            Self::BusinessData => 3,
            Self::TechSetup => 4,
            Self::Tables => 5,
            Self::Menu => 6,
            Self::Agreement => 7,
        }
    }

    /// Slice edited by the 1-based wizard step `n`.
    pub fn from_step(n: u8) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|slice| slice.step_number() == n)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid step number {n}. Must be between 1 and {}",
                    Self::ALL.len()
                ))
            })
    }
}

impl std::fmt::Display for SliceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Slice set
// ---------------------------------------------------------------------------

/// The stored data of all seven slices. Flattened into the record JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceSet {
    #[serde(default)]
    pub restaurant_info: JsonMap,
    #[serde(default)]
    pub contact: JsonMap,
    #[serde(default)]
    pub business_data: JsonMap,
    #[serde(default)]
    pub tech_setup: JsonMap,
    #[serde(default)]
    pub tables: JsonMap,
    #[serde(default)]
    pub menu: JsonMap,
    #[serde(default)]
    pub agreement: JsonMap,
}

impl SliceSet {
    pub fn get(&self, slice: SliceName) -> &JsonMap {
        match slice {
            SliceName::RestaurantInfo => &self.restaurant_info,
            SliceName::Contact => &self.contact,
            SliceName::BusinessData => &self.business_data,
            SliceName::TechSetup => &self.tech_setup,
            SliceName::Tables => &self.tables,
            SliceName::Menu => &self.menu,
            SliceName::Agreement => &self.agreement,
        }
    }

    pub fn get_mut(&mut self, slice: SliceName) -> &mut JsonMap {
        match slice {
            SliceName::RestaurantInfo => &mut self.restaurant_info,
            SliceName::Contact => &mut self.contact,
            SliceName::BusinessData => &mut self.business_data,
            SliceName::TechSetup => &mut self.tech_setup,
            SliceName::Tables => &mut self.tables,
            SliceName::Menu => &mut self.menu,
            SliceName::Agreement => &mut self.agreement,
        }
    }
}

/// Shallow-merge `patch` into `target`.
///
/// Keys present in `patch` overwrite (an explicit `null` is stored as
/// `null`); keys absent from `patch` are left untouched.
pub fn merge_fields(target: &mut JsonMap, patch: JsonMap) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn key_roundtrip() {
        for slice in SliceName::ALL {
            assert_eq!(SliceName::from_key(slice.key()), Some(slice));
        }
        assert_eq!(SliceName::from_key("restaurant_info"), None);
        assert_eq!(SliceName::from_key("status"), None);
    }

    #[test]
    fn serde_name_matches_key() {
        for slice in SliceName::ALL {
            assert_eq!(serde_json::to_value(slice).unwrap(), slice.key());
        }
    }

    #[test]
    fn step_numbers_cover_one_through_seven() {
        for (index, slice) in SliceName::ALL.into_iter().enumerate() {
            assert_eq!(slice.step_number() as usize, index + 1);
            assert_eq!(SliceName::from_step(slice.step_number()).unwrap(), slice);
        }
        assert!(SliceName::from_step(0).is_err());
        assert!(SliceName::from_step(8).is_err());
    }

    #[test]
    fn merge_overwrites_present_keys_only() {
        let mut target = map(json!({ "name": "Old", "city": "Napoli" }));
        merge_fields(&mut target, map(json!({ "name": "Bella Napoli", "zipCode": "80100" })));

        assert_eq!(target["name"], "Bella Napoli");
        assert_eq!(target["city"], "Napoli");
        assert_eq!(target["zipCode"], "80100");
    }

    #[test]
    fn merge_keeps_explicit_null() {
        let mut target = map(json!({ "website": "https://example.com" }));
        merge_fields(&mut target, map(json!({ "website": null })));
        assert!(target["website"].is_null());
    }

    #[test]
    fn slice_set_access_is_independent() {
        let mut set = SliceSet::default();
        set.get_mut(SliceName::Menu)
            .insert("categories".into(), json!(["Pizza"]));

        for slice in SliceName::ALL {
            if slice != SliceName::Menu {
                assert!(set.get(slice).is_empty(), "{slice} should stay empty");
            }
        }
    }

    #[test]
    fn slice_set_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(SliceSet::default()).unwrap();
        for slice in SliceName::ALL {
            assert!(json.get(slice.key()).is_some(), "missing {}", slice.key());
        }
    }
}
