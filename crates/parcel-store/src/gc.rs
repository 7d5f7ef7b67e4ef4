use std::collections::HashSet;

use parcel_types::ContentHash;

use crate::records::HeaderRecord;

/// Headers and objects one collection pass will delete.
#[derive(Debug, Default)]
pub(crate) struct GcPlan {
    pub headers: HashSet<ContentHash>,
    pub objects: Vec<ContentHash>,
}

/// Split `headers` into doomed and surviving, then doom every object of a
/// doomed header that no surviving header still references.
pub(crate) fn plan<'a, I, F>(headers: I, mut doomed: F) -> GcPlan
where
    I: IntoIterator<Item = (ContentHash, &'a HeaderRecord)>,
    F: FnMut(&ContentHash, &HeaderRecord) -> bool,
{
    let mut plan = GcPlan::default();
    let mut candidate_objects = HashSet::new();
    let mut kept_objects = HashSet::new();

    for (hash, record) in headers {
        if doomed(&hash, record) {
            plan.headers.insert(hash);
            candidate_objects.extend(record.header.object_hash);
        } else {
            kept_objects.extend(record.header.object_hash);
        }
    }

    plan.objects = candidate_objects
        .into_iter()
        .filter(|h| !kept_objects.contains(h))
        .collect();
    plan
}
