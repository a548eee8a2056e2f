//! Declared comparable fields for bulk CSV updates.
//!
//! Bulk updates may only compare and mutate fields listed in
//! [`FIELD_MAPPINGS`]; free-form column names never reach the store.

use serde::{Deserialize, Serialize};

/// A title field that bulk updates are allowed to touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleField {
    Title,
    Subtitle,
    Genre,
    Language,
    PublicationDate,
    PageCount,
    Price,
    Description,
    BisacCodes,
    Keywords,
}

impl TitleField {
    /// Stable identifier, also the column name in the titles table.
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleField::Title => "title",
            TitleField::Subtitle => "subtitle",
            TitleField::Genre => "genre",
            TitleField::Language => "language",
            TitleField::PublicationDate => "publication_date",
            TitleField::PageCount => "page_count",
            TitleField::Price => "price",
            TitleField::Description => "description",
            TitleField::BisacCodes => "bisac_codes",
            TitleField::Keywords => "keywords",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(TitleField::Title),
            "subtitle" => Some(TitleField::Subtitle),
            "genre" => Some(TitleField::Genre),
            "language" => Some(TitleField::Language),
            "publication_date" => Some(TitleField::PublicationDate),
            "page_count" => Some(TitleField::PageCount),
            "price" => Some(TitleField::Price),
            "description" => Some(TitleField::Description),
            "bisac_codes" => Some(TitleField::BisacCodes),
            "keywords" => Some(TitleField::Keywords),
            _ => None,
        }
    }

    /// Column name in the titles table.
    pub fn column(&self) -> &'static str {
        self.as_str()
    }
}

/// Kind of value a field holds, used by comparison and row validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    List,
}

/// One entry in the fixed mapping between CSV columns and persisted columns.
pub struct FieldMapping {
    pub field: TitleField,
    /// Expected CSV header, also the wire key for incoming rows.
    pub csv_key: &'static str,
    /// Human label used in diff reporting.
    pub label: &'static str,
    pub kind: FieldKind,
}

pub const FIELD_MAPPINGS: &[FieldMapping] = &[
    FieldMapping {
        field: TitleField::Title,
        csv_key: "title",
        label: "Title",
        kind: FieldKind::Text,
    },
    FieldMapping {
        field: TitleField::Subtitle,
        csv_key: "subtitle",
        label: "Subtitle",
        kind: FieldKind::Text,
    },
    FieldMapping {
        field: TitleField::Genre,
        csv_key: "genre",
        label: "Genre",
        kind: FieldKind::Text,
    },
    FieldMapping {
        field: TitleField::Language,
        csv_key: "language",
        label: "Language",
        kind: FieldKind::Text,
    },
    FieldMapping {
        field: TitleField::PublicationDate,
        csv_key: "publication_date",
        label: "Publication Date",
        kind: FieldKind::Text,
    },
    FieldMapping {
        field: TitleField::PageCount,
        csv_key: "page_count",
        label: "Page Count",
        kind: FieldKind::Number,
    },
    FieldMapping {
        field: TitleField::Price,
        csv_key: "price",
        label: "Price",
        kind: FieldKind::Number,
    },
    FieldMapping {
        field: TitleField::Description,
        csv_key: "description",
        label: "Description",
        kind: FieldKind::Text,
    },
    FieldMapping {
        field: TitleField::BisacCodes,
        csv_key: "bisac_codes",
        label: "BISAC Codes",
        kind: FieldKind::List,
    },
    FieldMapping {
        field: TitleField::Keywords,
        csv_key: "keywords",
        label: "Keywords",
        kind: FieldKind::List,
    },
];

/// Look up the mapping entry for a field.
pub fn mapping_for(field: TitleField) -> Option<&'static FieldMapping> {
    FIELD_MAPPINGS.iter().find(|m| m.field == field)
}
