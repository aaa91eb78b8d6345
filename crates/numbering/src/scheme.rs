use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult};

use crate::FiscalYear;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    PurchaseOrder,
    Kit,
}

impl DocumentKind {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::Kit => "KIT",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PO" => Some(DocumentKind::PurchaseOrder),
            "KIT" => Some(DocumentKind::Kit),
            _ => None,
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Parsed form of a generated identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumber {
    pub kind: DocumentKind,
    pub fiscal_year: FiscalYear,
    pub sequence: u64,
}

/// Fixed `ORG/DOMAIN` prefix plus the zero-padding width of the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingScheme {
    org: String,
    domain: String,
    width: usize,
}

impl Default for NumberingScheme {
    fn default() -> Self {
        Self {
            org: "TSRS".to_string(),
            domain: "ROBOLAB".to_string(),
            width: 4,
        }
    }
}

fn validate_segment(name: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() || value.contains('/') {
        return Err(DomainError::invalid(format!(
            "{name} segment must be non-empty and contain no '/' (got '{value}')"
        )));
    }
    Ok(value.to_string())
}

impl NumberingScheme {
    pub fn new(org: &str, domain: &str, width: usize) -> DomainResult<Self> {
        if width == 0 || width > 12 {
            return Err(DomainError::invalid(format!(
                "sequence width must be between 1 and 12 (got {width})"
            )));
        }
        Ok(Self {
            org: validate_segment("org", org)?,
            domain: validate_segment("domain", domain)?,
            width,
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Everything before the sequence, trailing slash included.
    pub fn prefix(&self, kind: DocumentKind, fiscal_year: FiscalYear) -> String {
        format!("{}/{}/{}/{}/", self.org, self.domain, kind.code(), fiscal_year.label())
    }

    pub fn format(&self, kind: DocumentKind, fiscal_year: FiscalYear, sequence: u64) -> String {
        format!(
            "{}{:0width$}",
            self.prefix(kind, fiscal_year),
            sequence,
            width = self.width
        )
    }

    /// Parse an identifier produced by this scheme. Sequences wider than
    /// `width` are accepted (the padding is a minimum).
    pub fn parse(&self, value: &str) -> DomainResult<DocumentNumber> {
        let invalid = || DomainError::invalid(format!("not a document number: '{value}'"));

        let parts: Vec<&str> = value.split('/').collect();
        let [org, domain, code, fy, seq] = parts.as_slice() else {
            return Err(invalid());
        };
        if *org != self.org || *domain != self.domain || seq.len() < self.width {
            return Err(invalid());
        }
        let kind = DocumentKind::from_code(code).ok_or_else(invalid)?;
        let fiscal_year = FiscalYear::parse_label(fy)?;
        if !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let sequence: u64 = seq.parse().map_err(|_| invalid())?;
        if sequence == 0 {
            return Err(invalid());
        }

        Ok(DocumentNumber {
            kind,
            fiscal_year,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scheme_formats_po_numbers() {
        let scheme = NumberingScheme::default();
        let n = scheme.format(DocumentKind::PurchaseOrder, FiscalYear::new(2025), 7);
        assert_eq!(n, "TSRS/ROBOLAB/PO/2025-26/0007");
    }

    #[test]
    fn kit_refs_share_the_shape() {
        let scheme = NumberingScheme::new("ACME", "LAB", 3).unwrap();
        let n = scheme.format(DocumentKind::Kit, FiscalYear::new(2024), 12);
        assert_eq!(n, "ACME/LAB/KIT/2024-25/012");
    }

    #[test]
    fn parse_inverts_format() {
        let scheme = NumberingScheme::default();
        let parsed = scheme.parse("TSRS/ROBOLAB/KIT/2024-25/10000").unwrap();
        assert_eq!(parsed.kind, DocumentKind::Kit);
        assert_eq!(parsed.fiscal_year, FiscalYear::new(2024));
        assert_eq!(parsed.sequence, 10_000);
    }

    #[test]
    fn parse_rejects_foreign_prefixes_and_junk() {
        let scheme = NumberingScheme::default();
        assert!(scheme.parse("OTHER/ROBOLAB/PO/2024-25/0001").is_err());
        assert!(scheme.parse("TSRS/ROBOLAB/XX/2024-25/0001").is_err());
        assert!(scheme.parse("TSRS/ROBOLAB/PO/2024-25/01").is_err());
        assert!(scheme.parse("TSRS/ROBOLAB/PO/2024-25/+001").is_err());
        assert!(scheme.parse("TSRS/ROBOLAB/PO/2024-25").is_err());
    }

    #[test]
    fn segments_are_validated() {
        assert!(NumberingScheme::new("A/B", "LAB", 4).is_err());
        assert!(NumberingScheme::new("A", " ", 4).is_err());
        assert!(NumberingScheme::new("A", "B", 0).is_err());
    }
}
