use std::collections::HashMap;

use super::{FieldValues, FormField};

/// Which fields are shown for the given values.
///
/// Pure: reads only `values`, never focus or navigation state, so calling it
/// twice on the same input yields the same map.
pub fn resolve(fields: &[FormField], values: &FieldValues) -> HashMap<String, bool> {
    fields
        .iter()
        .map(|f| (f.key.clone(), f.is_visible(values)))
        .collect()
}
