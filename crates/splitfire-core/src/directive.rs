//! Directive extraction from expense annotations
//!
//! A group member can steer how an expense lands in the ledger by embedding a
//! marker in the expense details or in a comment: `firefly` on its own accepts
//! the defaults, `firefly/<destination>/<category>/<description>/<source>`
//! overrides individual draft fields. Segments may be left empty to keep the
//! default for that position.

use crate::models::{Comment, ExpenseRecord};

/// Marker keyword that opens a directive
const MARKER: &str = "firefly";

/// Maximum number of override segments consumed after the marker
const MAX_OVERRIDES: usize = 4;

/// Outcome of scanning a piece of text for a directive
///
/// "Marker present but without overrides" and "no marker at all" are distinct
/// cases: the former opts the expense in with defaults, the latter leaves the
/// expense unclassified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// No marker found
    Unresolved,
    /// Marker found, with zero to four override fields
    Resolved(Vec<String>),
}

impl Directive {
    /// Scan free text for a directive marker
    pub fn parse(text: Option<&str>) -> Directive {
        let text = match text {
            Some(t) if !t.is_empty() => t,
            _ => return Directive::Unresolved,
        };

        let mut segments = text.split('/');
        let first = segments.next().unwrap_or("");
        if !first.eq_ignore_ascii_case(MARKER) {
            return Directive::Unresolved;
        }

        let overrides = segments
            .take(MAX_OVERRIDES)
            .map(|s| s.to_string())
            .collect();
        Directive::Resolved(overrides)
    }

    /// Whether a marker was found
    pub fn is_resolved(&self) -> bool {
        matches!(self, Directive::Resolved(_))
    }
}

/// Choose the authoritative directive for an expense.
///
/// The expense's own details field is trusted only when the acting user is
/// the last editor, or the creator if the expense was never edited. Comments
/// are scanned in chronological order and each one carrying a directive
/// overwrites the candidate; comment authorship is not a trust gate, so the
/// last writer wins.
pub fn resolve_directive(
    expense: &ExpenseRecord,
    comments: &[Comment],
    acting_user: i64,
) -> Directive {
    let details_trusted = match expense.updated_by {
        Some(editor) => editor == acting_user,
        None => expense.created_by == acting_user,
    };

    let mut candidate = if details_trusted {
        Directive::parse(expense.details.as_deref())
    } else {
        Directive::Unresolved
    };

    for comment in comments {
        let parsed = Directive::parse(Some(&comment.text));
        if parsed.is_resolved() {
            candidate = parsed;
        }
    }

    candidate
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShareRecord;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn expense(details: Option<&str>, created_by: i64, updated_by: Option<i64>) -> ExpenseRecord {
        let instant = Utc.with_ymd_and_hms(2023, 9, 10, 12, 0, 0).unwrap();
        ExpenseRecord {
            id: 67890,
            description: "Test Expense".to_string(),
            currency_code: "USD".to_string(),
            date: instant,
            created_at: instant,
            updated_at: instant,
            details: details.map(|d| d.to_string()),
            deleted_at: None,
            is_payment: false,
            created_by,
            updated_by,
            category: "General".to_string(),
            shares: vec![ShareRecord {
                user_id: 12345,
                owed: Decimal::new(1000, 2),
                paid: Decimal::new(1000, 2),
                net_balance: Decimal::ZERO,
            }],
        }
    }

    fn comment(author_id: i64, text: &str, minute: u32) -> Comment {
        Comment {
            author_id,
            text: text.to_string(),
            posted_at: Utc.with_ymd_and_hms(2023, 9, 10, 13, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_marker_with_overrides() {
        assert_eq!(
            Directive::parse(Some("firefly/Category1/Description1")),
            Directive::Resolved(vec!["Category1".to_string(), "Description1".to_string()])
        );
    }

    #[test]
    fn test_parse_bare_marker() {
        assert_eq!(Directive::parse(Some("firefly")), Directive::Resolved(vec![]));
    }

    #[test]
    fn test_parse_regular_text() {
        assert_eq!(Directive::parse(Some("regular expense")), Directive::Unresolved);
        assert_eq!(Directive::parse(None), Directive::Unresolved);
        assert_eq!(Directive::parse(Some("")), Directive::Unresolved);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            Directive::parse(Some("FireFly/Dest")),
            Directive::Resolved(vec!["Dest".to_string()])
        );
    }

    #[test]
    fn test_parse_consumes_at_most_four_overrides() {
        let parsed = Directive::parse(Some("firefly/a/b/c/d/e/f"));
        assert_eq!(
            parsed,
            Directive::Resolved(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_keeps_empty_segments() {
        assert_eq!(
            Directive::parse(Some("firefly//Food")),
            Directive::Resolved(vec!["".to_string(), "Food".to_string()])
        );
    }

    #[test]
    fn test_details_trusted_for_creator() {
        let exp = expense(Some("firefly/Dest"), 12345, None);
        let resolved = resolve_directive(&exp, &[], 12345);
        assert_eq!(resolved, Directive::Resolved(vec!["Dest".to_string()]));
    }

    #[test]
    fn test_details_ignored_for_foreign_creator() {
        let exp = expense(Some("firefly/Dest"), 999, None);
        assert_eq!(resolve_directive(&exp, &[], 12345), Directive::Unresolved);
    }

    #[test]
    fn test_details_trusted_for_last_editor() {
        let exp = expense(Some("firefly/Dest"), 999, Some(12345));
        assert!(resolve_directive(&exp, &[], 12345).is_resolved());
    }

    #[test]
    fn test_details_ignored_when_last_edit_was_foreign() {
        // Created by the acting user but later edited by someone else: the
        // details field no longer reflects the acting user's intent.
        let exp = expense(Some("firefly/Dest"), 12345, Some(999));
        assert_eq!(resolve_directive(&exp, &[], 12345), Directive::Unresolved);
    }

    #[test]
    fn test_newer_comment_wins() {
        let exp = expense(None, 12345, None);
        let comments = vec![
            comment(12345, "firefly/A", 0),
            comment(777, "looks right to me", 1),
            comment(777, "firefly/B", 2),
        ];
        let resolved = resolve_directive(&exp, &comments, 12345);
        assert_eq!(resolved, Directive::Resolved(vec!["B".to_string()]));
    }

    #[test]
    fn test_comment_overrides_details() {
        let exp = expense(Some("firefly/FromDetails"), 12345, None);
        let comments = vec![comment(777, "firefly/FromComment", 0)];
        let resolved = resolve_directive(&exp, &comments, 12345);
        assert_eq!(resolved, Directive::Resolved(vec!["FromComment".to_string()]));
    }

    #[test]
    fn test_marked_empty_is_not_unresolved() {
        let exp = expense(Some("firefly"), 12345, None);
        assert_eq!(resolve_directive(&exp, &[], 12345), Directive::Resolved(vec![]));
    }
}
