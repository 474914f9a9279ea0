use std::collections::HashMap;

use crate::model::*;

use super::conflict::overlaps;

/// Enumerate every overlapping pair among stored reservations.
///
/// Input is partitioned by resource, keeping each partition in input order;
/// partitions are visited in order of first appearance. Within a partition each
/// unordered pair `(i, j)` with `i < j` is tested once, so the output is stable
/// for a fixed input order. Quadratic per partition: meant for offline audits,
/// not the admission path.
pub fn audit_all(reservations: &[Reservation]) -> Vec<ConflictPair> {
    let mut order: Vec<ResourceId> = Vec::new();
    let mut partitions: HashMap<ResourceId, Vec<&Reservation>> = HashMap::new();
    for r in reservations {
        partitions
            .entry(r.resource_id)
            .or_insert_with(|| {
                order.push(r.resource_id);
                Vec::new()
            })
            .push(r);
    }

    let mut pairs = Vec::new();
    for resource_id in order {
        let batch = &partitions[&resource_id];
        for i in 0..batch.len() {
            for j in (i + 1)..batch.len() {
                if overlaps(&batch[i].range, &batch[j].range) {
                    pairs.push(ConflictPair {
                        resource_id,
                        first: batch[i].clone(),
                        second: batch[j].clone(),
                    });
                }
            }
        }
    }
    pairs
}
