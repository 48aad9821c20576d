//! Validity-window filtering over candidate price records.

use chrono::NaiveDate;

use super::types::PriceRecord;

/// Pick the record active on `date`.
///
/// A record is active when `valid_from <= date <= valid_to`; a `None` bound
/// never excludes. When the invoice date itself is unknown every candidate
/// is considered active. An open-ended record wins over closed ones; a
/// superseded record is still active on the day it was closed, and the
/// replacement must take precedence there. Among equals, repository order
/// decides.
#[must_use]
pub fn active_on(records: &[PriceRecord], date: Option<NaiveDate>) -> Option<&PriceRecord> {
    let is_active = |r: &PriceRecord| match date {
        Some(d) => {
            r.valid_from.is_none_or(|from| from <= d) && r.valid_to.is_none_or(|to| d <= to)
        }
        None => true,
    };

    let mut first_active = None;
    for record in records {
        if !is_active(record) {
            continue;
        }
        if record.valid_to.is_none() {
            return Some(record);
        }
        if first_active.is_none() {
            first_active = Some(record);
        }
    }
    first_active
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::pricebook::{PriceSource, PriceStatus};

    fn record(valid_from: Option<NaiveDate>, valid_to: Option<NaiveDate>) -> PriceRecord {
        PriceRecord {
            id: Uuid::new_v4(),
            supplier_name: "Nordic Parts A/S".into(),
            sku: Some("NP-100".into()),
            product_name: Some("Gasket".into()),
            unit_price: dec!(10.50),
            currency: Some("DKK".into()),
            valid_from,
            valid_to,
            status: PriceStatus::Active,
            source: PriceSource::Manual,
            created_at: Utc::now(),
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_open_ended_record_matches() {
        let records = vec![record(Some(d("2025-01-01")), None)];
        assert!(active_on(&records, Some(d("2025-06-15"))).is_some());
    }

    #[test]
    fn test_window_is_closed_on_both_ends() {
        let records = vec![record(Some(d("2025-01-01")), Some(d("2025-03-31")))];
        assert!(active_on(&records, Some(d("2025-01-01"))).is_some());
        assert!(active_on(&records, Some(d("2025-03-31"))).is_some());
        assert!(active_on(&records, Some(d("2025-04-01"))).is_none());
        assert!(active_on(&records, Some(d("2024-12-31"))).is_none());
    }

    #[test]
    fn test_unknown_invoice_date_matches_any_window() {
        let records = vec![record(Some(d("2025-01-01")), Some(d("2025-03-31")))];
        assert!(active_on(&records, None).is_some());
    }

    #[test]
    fn test_first_active_candidate_wins() {
        let older = record(None, None);
        let newer = record(None, None);
        let older_id = older.id;
        let records = vec![older, newer];
        assert_eq!(active_on(&records, None).unwrap().id, older_id);
    }

    #[test]
    fn test_open_ended_record_beats_closed_on_supersession_day() {
        // A record closed at date d and its open-ended replacement starting
        // at d are both active on d. The replacement must win.
        let closed = record(Some(d("2025-01-01")), Some(d("2026-01-09")));
        let replacement = record(Some(d("2026-01-09")), None);
        let replacement_id = replacement.id;
        let records = vec![closed, replacement];
        assert_eq!(
            active_on(&records, Some(d("2026-01-09"))).unwrap().id,
            replacement_id
        );
    }
}
