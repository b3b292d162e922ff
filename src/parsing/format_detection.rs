use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parsing::ParseError;

/// Results export layouts, one per supported punching system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Federation-style HTML tables, one per group
    Table,
    /// WinOrient pre-formatted text blocks
    TextBlock,
    /// SportOrg page with the race embedded as a script literal
    EmbeddedJson,
}

impl DocumentFormat {
    /// Get the display name for this format
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            DocumentFormat::Table => "HTML tables",
            DocumentFormat::TextBlock => "WinOrient text blocks",
            DocumentFormat::EmbeddedJson => "SportOrg embedded JSON",
        }
    }
}

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

/// Extract the document `<title>` text, whitespace-collapsed
#[must_use]
pub fn document_title(content: &str) -> Option<String> {
    let raw = TITLE.captures(content)?.get(1)?.as_str();
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Select the parser for a document from the product name in its title
///
/// Documents naming neither WinOrient nor SportOrg are treated as
/// federation table exports.
///
/// # Errors
///
/// Returns `ParseError::EmptyDocument` if the content is blank.
pub fn detect_format(content: &str) -> Result<DocumentFormat, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let title = document_title(content).unwrap_or_default();
    if title.contains("WinOrient") {
        Ok(DocumentFormat::TextBlock)
    } else if title.contains("SportOrg") {
        Ok(DocumentFormat::EmbeddedJson)
    } else {
        Ok(DocumentFormat::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_winorient() {
        let html = "<html><head><title>Протокол результатов (WinOrient 2.8)</title></head></html>";
        assert_eq!(detect_format(html).unwrap(), DocumentFormat::TextBlock);
    }

    #[test]
    fn test_detect_sportorg() {
        let html = "<html><head>\n<title>\n  SportOrg - Results\n</title></head></html>";
        assert_eq!(detect_format(html).unwrap(), DocumentFormat::EmbeddedJson);
    }

    #[test]
    fn test_default_is_table() {
        let html = "<html><head><title>Split times</title></head></html>";
        assert_eq!(detect_format(html).unwrap(), DocumentFormat::Table);

        // No title at all
        assert_eq!(
            detect_format("<table><tr><td>x</td></tr></table>").unwrap(),
            DocumentFormat::Table
        );
    }

    #[test]
    fn test_product_name_outside_title_is_ignored() {
        let html = "<html><head><title>Results</title></head><body>made with SportOrg</body></html>";
        assert_eq!(detect_format(html).unwrap(), DocumentFormat::Table);
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(detect_format(""), Err(ParseError::EmptyDocument)));
        assert!(matches!(detect_format(" \n\t"), Err(ParseError::EmptyDocument)));
    }

    #[test]
    fn test_document_title() {
        assert_eq!(
            document_title("<TITLE> Cup  of\nRussia </TITLE>"),
            Some("Cup of Russia".to_string())
        );
        assert_eq!(document_title("<title></title>"), None);
        assert_eq!(document_title("<p>no title</p>"), None);
    }
}
