//! Department / municipality reference data.
//!
//! The hierarchy is owned by an external collaborator; this module only models the two levels and
//! loads a flat CSV export of it so the scope resolver can turn a municipality id into the
//! department it belongs to.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityId(pub u32);

/// A municipality together with the department it implies.
///
/// Listings and user profiles carry this pair so location decisions never need a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MunicipalityRef {
    pub id: MunicipalityId,
    pub department: DepartmentId,
}

impl MunicipalityRef {
    pub const fn new(id: MunicipalityId, department: DepartmentId) -> Self {
        Self { id, department }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Municipality {
    pub id: MunicipalityId,
    pub name: String,
    pub department: DepartmentId,
}

impl Municipality {
    pub fn reference(&self) -> MunicipalityRef {
        MunicipalityRef::new(self.id, self.department)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeographyError {
    #[error("failed to read geography export: {0}")]
    Csv(#[from] csv::Error),
    #[error("department {id:?} appears as both '{first}' and '{second}'")]
    ConflictingDepartment {
        id: DepartmentId,
        first: String,
        second: String,
    },
    #[error("municipality {id:?} is assigned to departments {first:?} and {second:?}")]
    ConflictingMunicipality {
        id: MunicipalityId,
        first: DepartmentId,
        second: DepartmentId,
    },
    #[error("unknown department {0:?}")]
    UnknownDepartment(DepartmentId),
    #[error("unknown municipality {0:?}")]
    UnknownMunicipality(MunicipalityId),
}

#[derive(Debug, Deserialize)]
struct HierarchyRow {
    department_id: u32,
    department_name: String,
    municipality_id: u32,
    municipality_name: String,
}

/// In-memory snapshot of the two-level administrative geography.
#[derive(Debug, Clone, Default)]
pub struct AdministrativeHierarchy {
    departments: BTreeMap<DepartmentId, Department>,
    municipalities: BTreeMap<MunicipalityId, Municipality>,
}

impl AdministrativeHierarchy {
    /// Load `department_id,department_name,municipality_id,municipality_name` rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeographyError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut hierarchy = Self::default();

        for row in csv_reader.deserialize::<HierarchyRow>() {
            let row = row?;
            let department = DepartmentId(row.department_id);
            hierarchy.insert_department(department, &row.department_name)?;
            hierarchy.insert_municipality(
                MunicipalityId(row.municipality_id),
                &row.municipality_name,
                department,
            )?;
        }

        Ok(hierarchy)
    }

    pub fn insert_department(&mut self, id: DepartmentId, name: &str) -> Result<(), GeographyError> {
        if let Some(existing) = self.departments.get(&id) {
            if existing.name != name {
                return Err(GeographyError::ConflictingDepartment {
                    id,
                    first: existing.name.clone(),
                    second: name.to_string(),
                });
            }
            return Ok(());
        }

        self.departments.insert(
            id,
            Department {
                id,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    pub fn insert_municipality(
        &mut self,
        id: MunicipalityId,
        name: &str,
        department: DepartmentId,
    ) -> Result<(), GeographyError> {
        if !self.departments.contains_key(&department) {
            return Err(GeographyError::UnknownDepartment(department));
        }

        if let Some(existing) = self.municipalities.get(&id) {
            if existing.department != department {
                return Err(GeographyError::ConflictingMunicipality {
                    id,
                    first: existing.department,
                    second: department,
                });
            }
            return Ok(());
        }

        self.municipalities.insert(
            id,
            Municipality {
                id,
                name: name.to_string(),
                department,
            },
        );
        Ok(())
    }

    pub fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn municipality(&self, id: MunicipalityId) -> Option<&Municipality> {
        self.municipalities.get(&id)
    }

    /// Resolve a municipality id into the pair carried by listings and profiles.
    pub fn resolve(&self, id: MunicipalityId) -> Result<MunicipalityRef, GeographyError> {
        self.municipality(id)
            .map(Municipality::reference)
            .ok_or(GeographyError::UnknownMunicipality(id))
    }

    pub fn municipalities_in(&self, department: DepartmentId) -> Vec<&Municipality> {
        self.municipalities
            .values()
            .filter(|municipality| municipality.department == department)
            .collect()
    }

    /// Municipalities whose own name or department name contains `needle`, ignoring case.
    pub fn municipalities_named(&self, needle: &str) -> BTreeSet<MunicipalityId> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return BTreeSet::new();
        }
        self.municipalities
            .values()
            .filter(|municipality| {
                municipality.name.to_lowercase().contains(&needle)
                    || self
                        .departments
                        .get(&municipality.department)
                        .is_some_and(|department| department.name.to_lowercase().contains(&needle))
            })
            .map(|municipality| municipality.id)
            .collect()
    }

    pub fn department_count(&self) -> usize {
        self.departments.len()
    }

    pub fn municipality_count(&self) -> usize {
        self.municipalities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "department_id,department_name,municipality_id,municipality_name\n\
        3,Antioquia,301,Medellin\n\
        3,Antioquia,302,Rionegro\n\
        7,Boyaca,701,Tunja\n";

    #[test]
    fn loads_rows_into_two_levels() {
        let hierarchy =
            AdministrativeHierarchy::from_reader(EXPORT.as_bytes()).expect("export parses");

        assert_eq!(hierarchy.department_count(), 2);
        assert_eq!(hierarchy.municipality_count(), 3);
        assert_eq!(
            hierarchy.resolve(MunicipalityId(302)).expect("known"),
            MunicipalityRef::new(MunicipalityId(302), DepartmentId(3))
        );
        assert_eq!(hierarchy.municipalities_in(DepartmentId(3)).len(), 2);
    }

    #[test]
    fn rejects_municipality_listed_under_two_departments() {
        let export = format!("{EXPORT}7,Boyaca,301,Medellin\n");
        match AdministrativeHierarchy::from_reader(export.as_bytes()) {
            Err(GeographyError::ConflictingMunicipality { id, .. }) => {
                assert_eq!(id, MunicipalityId(301));
            }
            other => panic!("expected conflicting municipality, got {other:?}"),
        }
    }

    #[test]
    fn unknown_municipality_is_reported() {
        let hierarchy =
            AdministrativeHierarchy::from_reader(EXPORT.as_bytes()).expect("export parses");
        assert!(matches!(
            hierarchy.resolve(MunicipalityId(999)),
            Err(GeographyError::UnknownMunicipality(MunicipalityId(999)))
        ));
    }

    #[test]
    fn name_lookup_covers_municipality_and_department() {
        let hierarchy =
            AdministrativeHierarchy::from_reader(EXPORT.as_bytes()).expect("export parses");

        let by_department = hierarchy.municipalities_named("antioq");
        assert_eq!(
            by_department,
            BTreeSet::from([MunicipalityId(301), MunicipalityId(302)])
        );
        assert_eq!(
            hierarchy.municipalities_named("TUNJA"),
            BTreeSet::from([MunicipalityId(701)])
        );
        assert!(hierarchy.municipalities_named("  ").is_empty());
    }
}
