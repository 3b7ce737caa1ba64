//! Input and intermediate tables.

mod abundance;
mod count_matrix;
mod metadata;
mod prepared;
mod taxonomy;

pub use abundance::{AbundanceRecord, AbundanceTable};
pub use count_matrix::CountMatrix;
pub use metadata::{Metadata, Variable};
pub use prepared::{PreparedRecord, PreparedTable};
pub use taxonomy::Taxonomy;

/// Label used wherever a lineage entry is missing.
pub const UNASSIGNED: &str = "Unassigned";

/// Interpret a raw table cell as a taxon label; empty cells and `NA`
/// are missing.
pub(crate) fn parse_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "NA" || raw == "na" {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label(" Bacteroides "), Some("Bacteroides".to_string()));
        assert_eq!(parse_label(""), None);
        assert_eq!(parse_label("NA"), None);
        assert_eq!(parse_label("na"), None);
    }
}
