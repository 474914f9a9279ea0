use crate::model::*;

/// Half-open overlap test: `a.start < b.end && b.start < a.end`.
///
/// Do not rewrite this as a closed-interval test; back-to-back bookings must coexist.
pub fn overlaps(a: &TimeRange, b: &TimeRange) -> bool {
    a.overlaps(b)
}

/// Admission check for a single candidate.
///
/// Only entries on the candidate's resource are considered, and `exclude_id`
/// (the record being updated) is skipped. Pure: the caller decides whether to
/// write, and must hold whatever lock makes `existing` a consistent snapshot.
pub fn check<'a, I>(candidate: &Candidate, existing: I, exclude_id: Option<ReservationId>) -> ConflictReport
where
    I: IntoIterator<Item = &'a Reservation>,
{
    let conflicts: Vec<Reservation> = existing
        .into_iter()
        .filter(|r| r.resource_id == candidate.resource_id)
        .filter(|r| Some(r.id) != exclude_id)
        .filter(|r| overlaps(&candidate.range, &r.range))
        .cloned()
        .collect();

    if conflicts.is_empty() {
        ConflictReport::Admitted
    } else {
        ConflictReport::Rejected(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2025, 9, 24, sh, sm, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 24, eh, em, 0).unwrap(),
        )
        .unwrap()
    }

    fn reservation(id: i64, resource: i64, r: TimeRange) -> Reservation {
        Reservation::new(ReservationId(id), ResourceId(resource), r)
    }

    #[test]
    fn rejects_collision_on_same_resource() {
        let existing = vec![reservation(1, 5, range(9, 0, 10, 0))];
        let candidate = Candidate::new(ResourceId(5), range(9, 30, 10, 30));
        let report = check(&candidate, &existing, None);
        assert_eq!(report.conflicting_ids(), vec![ReservationId(1)]);
    }

    #[test]
    fn ignores_other_resources() {
        let existing = vec![reservation(1, 5, range(9, 0, 10, 0))];
        let candidate = Candidate::new(ResourceId(6), range(9, 30, 10, 30));
        assert_eq!(check(&candidate, &existing, None), ConflictReport::Admitted);
    }

    #[test]
    fn update_excludes_itself() {
        let existing = vec![reservation(1, 5, range(9, 0, 10, 0))];
        let candidate = Candidate::new(ResourceId(5), range(9, 15, 10, 15));
        assert_eq!(
            check(&candidate, &existing, Some(ReservationId(1))),
            ConflictReport::Admitted
        );
    }

    #[test]
    fn exclusion_only_skips_matching_id() {
        let existing = vec![
            reservation(1, 5, range(9, 0, 10, 0)),
            reservation(2, 5, range(10, 0, 11, 0)),
        ];
        let candidate = Candidate::new(ResourceId(5), range(9, 30, 10, 30));
        let report = check(&candidate, &existing, Some(ReservationId(1)));
        assert_eq!(report.conflicting_ids(), vec![ReservationId(2)]);
    }

    #[test]
    fn back_to_back_is_admitted() {
        let existing = vec![
            reservation(1, 5, range(9, 0, 10, 0)),
            reservation(2, 5, range(11, 0, 12, 0)),
        ];
        let candidate = Candidate::new(ResourceId(5), range(10, 0, 11, 0));
        assert!(check(&candidate, &existing, None).is_admitted());
    }

    #[test]
    fn rejection_preserves_input_order() {
        let existing = vec![
            reservation(30, 5, range(11, 0, 12, 0)),
            reservation(10, 5, range(8, 0, 9, 30)),
            reservation(20, 6, range(9, 0, 12, 0)),
            reservation(40, 5, range(10, 0, 10, 30)),
        ];
        let candidate = Candidate::new(ResourceId(5), range(9, 0, 11, 30));
        let report = check(&candidate, &existing, None);
        assert_eq!(
            report.conflicting_ids(),
            vec![ReservationId(30), ReservationId(10), ReservationId(40)]
        );
    }

    #[test]
    fn empty_existing_admits() {
        let candidate = Candidate::new(ResourceId(5), range(9, 0, 10, 0));
        assert!(check(&candidate, &Vec::<Reservation>::new(), None).is_admitted());
    }

    #[test]
    fn overlaps_matches_negated_disjointness() {
        let ranges = [
            range(9, 0, 10, 0),
            range(9, 30, 10, 30),
            range(10, 0, 11, 0),
            range(8, 0, 12, 0),
        ];
        for a in &ranges {
            for b in &ranges {
                let disjoint = a.end() <= b.start() || a.start() >= b.end();
                assert_eq!(overlaps(a, b), !disjoint);
            }
        }
    }
}
