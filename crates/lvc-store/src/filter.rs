// Copyright 2026 The mdcore Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;

use mdcore_wire_codec::FieldList;

/// Field-id and service-name masks narrowing `SnapAll` results (§4.5.3).
/// `Snap` ignores the service mask since its ticker is already pinned.
#[derive(Debug, Clone, Default)]
pub struct LvcFilter {
    fids: Option<HashSet<i32>>,
    services: Option<HashSet<String>>,
}

impl LvcFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fids(mut self, fids: impl IntoIterator<Item = i32>) -> Self {
        self.fids = Some(fids.into_iter().collect());
        self
    }

    pub fn with_services(mut self, services: impl IntoIterator<Item = String>) -> Self {
        self.services = Some(services.into_iter().collect());
        self
    }

    pub fn admits_service(&self, svc: &str) -> bool {
        self.services.as_ref().map_or(true, |set| set.contains(svc))
    }

    /// Projects `fields` down to the fid set, or returns it unchanged if no
    /// field mask is set.
    pub fn project(&self, fields: &FieldList) -> FieldList {
        match &self.fids {
            None => fields.clone(),
            Some(set) => fields.iter().filter(|f| set.contains(&f.fid)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use mdcore_wire_codec::FieldType;
    use mdcore_wire_codec::FieldValue;

    use super::*;

    #[test]
    fn unset_filter_admits_everything() {
        let filter = LvcFilter::new();
        assert!(filter.admits_service("ANY"));
        let mut fields = FieldList::new();
        fields.add(22, FieldType::Double, FieldValue::Double(1.0));
        assert_eq!(filter.project(&fields), fields);
    }

    #[test]
    fn field_mask_projects_down() {
        let filter = LvcFilter::new().with_fids([22]);
        let mut fields = FieldList::new();
        fields.add(22, FieldType::Double, FieldValue::Double(1.0));
        fields.add(25, FieldType::Double, FieldValue::Double(2.0));
        let projected = filter.project(&fields);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get(22), Some(&FieldValue::Double(1.0)));
    }

    #[test]
    fn service_mask_narrows_admission() {
        let filter = LvcFilter::new().with_services(["S1".to_string()]);
        assert!(filter.admits_service("S1"));
        assert!(!filter.admits_service("S2"));
    }
}
