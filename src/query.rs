use std::cmp::Reverse;

use crate::db::{Notice, Store};

/// Current notices in display order: pinned first, then newest.
pub fn list_notices(store: &Store) -> rusqlite::Result<Vec<Notice>> {
    let mut notices = store.read_all()?;
    sort_for_display(&mut notices);
    Ok(notices)
}

/// Sort by sequence number, then published date, both descending.
pub fn sort_for_display(notices: &mut [Notice]) {
    notices.sort_by_key(|n| Reverse((n.row.sequence_number, n.row.published_date)));
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::tests::{row, temp_store};
    use crate::extract::PINNED_SEQUENCE;

    #[test]
    fn pinned_then_sequence_then_date() {
        let (_dir, mut store) = temp_store();
        let mut old_pin = row(PINNED_SEQUENCE, "old pin");
        old_pin.published_date = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
        let mut new_pin = row(PINNED_SEQUENCE, "new pin");
        new_pin.published_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        store
            .replace_all(&[row(40, "forty"), old_pin, row(42, "forty-two"), new_pin, row(41, "forty-one")])
            .unwrap();

        let titles: Vec<String> = list_notices(&store)
            .unwrap()
            .into_iter()
            .map(|n| n.row.title)
            .collect();
        assert_eq!(titles, vec!["new pin", "old pin", "forty-two", "forty-one", "forty"]);
    }

    #[test]
    fn empty_snapshot_lists_nothing() {
        let (_dir, store) = temp_store();
        assert!(list_notices(&store).unwrap().is_empty());
    }
}
