use crate::config::{MappingDocument, MappingEntry};
use std::borrow::Cow;
use std::collections::HashMap;

pub const UNKNOWN_CATEGORY: &str = "未知";

/// Resolves raw `business_type_category` codes to canonical entries.
#[derive(Debug, Default)]
pub struct BusinessTypeMapper {
    canonical: HashMap<String, MappingEntry>,
    compatibility: HashMap<String, String>,
}

impl BusinessTypeMapper {
    pub fn new(doc: MappingDocument) -> Self {
        let mut canonical = HashMap::new();
        for entry in doc.business_types {
            // Both the raw CSV value and the full display name are valid lookups.
            canonical.insert(entry.ui_full_name.clone(), entry.clone());
            canonical.insert(entry.csv_raw_value.clone(), entry);
        }
        let compatibility = doc.compatibility_mappings.into_pairs().into_iter().collect();
        BusinessTypeMapper { canonical, compatibility }
    }

    /// `None` only for an empty code. Unknown codes never fail: they come back
    /// as a placeholder labelled with the code itself.
    pub fn resolve(&self, raw_code: &str) -> Option<Cow<'_, MappingEntry>> {
        if raw_code.is_empty() {
            return None;
        }
        let redirected = self
            .compatibility
            .get(raw_code)
            .and_then(|target| self.canonical.get(target));
        if let Some(entry) = redirected.or_else(|| self.canonical.get(raw_code)) {
            return Some(Cow::Borrowed(entry));
        }
        Some(Cow::Owned(MappingEntry {
            csv_raw_value: raw_code.to_string(),
            ui_full_name: raw_code.to_string(),
            ui_short_label: raw_code.to_string(),
            category: UNKNOWN_CATEGORY.to_string(),
        }))
    }

    /// Grouping label for the business-type table.
    pub fn short_label(&self, raw_code: &str) -> String {
        self.resolve(raw_code)
            .map(|e| e.ui_short_label.clone())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
    }
}
