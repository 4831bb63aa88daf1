//! In-memory directory store.
//!
//! Holds employees and extensions behind a single `RwLock` and enforces the
//! record invariants: field limits, one extension per employee, and cascade
//! delete from employee to extension. Iteration order is ascending id, which
//! is also insertion order.

use crate::error::DirectoryError;
use crate::model::{
    DirectorySeed, Employee, EmployeeId, EmployeeUpdate, Extension, ExtensionId, ExtensionInput,
    ExtensionListing, ExtensionRow, NewEmployee, Recipient, SaveKind,
};
use crate::validation::{validate_employee_name, validate_extension_code, validate_optional_email};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Read side consumed by the report generator and notification dispatcher.
pub trait DirectoryStore: Send + Sync {
    /// All extensions joined with their employee's name, in store order.
    fn extension_rows(&self) -> Vec<ExtensionRow>;

    /// Employees with a non-empty contact address, in store order.
    fn recipients(&self) -> Vec<Recipient>;
}

#[derive(Default)]
struct Tables {
    employees: BTreeMap<EmployeeId, Employee>,
    extensions: BTreeMap<ExtensionId, Extension>,
    next_employee_id: u64,
    next_extension_id: u64,
}

impl Tables {
    fn extension_for(&self, employee_id: EmployeeId) -> Option<&Extension> {
        self.extensions
            .values()
            .find(|extension| extension.employee_id == employee_id)
    }

    fn employee_name(&self, employee_id: EmployeeId) -> Option<String> {
        self.employees
            .get(&employee_id)
            .map(|employee| employee.name.clone())
    }
}

#[derive(Default)]
pub struct InMemoryDirectoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a seed document. Saves made here do not notify.
    pub fn from_seed(seed: DirectorySeed) -> Result<Self, DirectoryError> {
        let store = Self::new();
        for entry in seed.employees {
            let employee = store.create_employee(NewEmployee {
                name: entry.name,
                email: entry.email,
                is_active: entry.is_active,
            })?;
            if let Some(extension) = entry.extension {
                store.create_extension(ExtensionInput {
                    employee_id: employee.id,
                    code: extension.code,
                    status: extension.status,
                })?;
            }
        }
        Ok(store)
    }

    pub fn create_employee(&self, input: NewEmployee) -> Result<Employee, DirectoryError> {
        validate_employee_name(&input.name)?;
        validate_optional_email(&input.email)?;

        let mut tables = self.tables.write();
        tables.next_employee_id += 1;
        let now = Utc::now();
        let employee = Employee {
            id: EmployeeId(tables.next_employee_id),
            name: input.name,
            email: input.email,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.employees.insert(employee.id, employee.clone());
        debug!(employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    pub fn update_employee(
        &self,
        id: EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee, DirectoryError> {
        if let Some(name) = update.name.as_deref() {
            validate_employee_name(name)?;
        }
        if let Some(email) = update.email.as_deref() {
            validate_optional_email(email)?;
        }

        let mut tables = self.tables.write();
        let employee = tables
            .employees
            .get_mut(&id)
            .ok_or(DirectoryError::EmployeeNotFound(id))?;
        if let Some(name) = update.name {
            employee.name = name;
        }
        if let Some(email) = update.email {
            employee.email = email;
        }
        if let Some(is_active) = update.is_active {
            employee.is_active = is_active;
        }
        employee.updated_at = Utc::now();
        Ok(employee.clone())
    }

    /// Removes the employee and, by cascade, its extension.
    pub fn delete_employee(&self, id: EmployeeId) -> Result<Employee, DirectoryError> {
        let mut tables = self.tables.write();
        let employee = tables
            .employees
            .remove(&id)
            .ok_or(DirectoryError::EmployeeNotFound(id))?;
        let before = tables.extensions.len();
        tables
            .extensions
            .retain(|_, extension| extension.employee_id != id);
        debug!(
            employee_id = %id,
            cascaded = before - tables.extensions.len(),
            "employee deleted"
        );
        Ok(employee)
    }

    pub fn employee(&self, id: EmployeeId) -> Result<Employee, DirectoryError> {
        self.tables
            .read()
            .employees
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::EmployeeNotFound(id))
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.tables.read().employees.values().cloned().collect()
    }

    pub fn create_extension(&self, input: ExtensionInput) -> Result<Extension, DirectoryError> {
        validate_extension_code(&input.code)?;

        let mut tables = self.tables.write();
        if !tables.employees.contains_key(&input.employee_id) {
            return Err(DirectoryError::EmployeeNotFound(input.employee_id));
        }
        if let Some(existing) = tables.extension_for(input.employee_id) {
            return Err(DirectoryError::Conflict {
                employee_id: input.employee_id,
                existing: existing.id,
            });
        }

        tables.next_extension_id += 1;
        let now = Utc::now();
        let extension = Extension {
            id: ExtensionId(tables.next_extension_id),
            employee_id: input.employee_id,
            code: input.code,
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        tables.extensions.insert(extension.id, extension.clone());
        Ok(extension)
    }

    pub fn update_extension(
        &self,
        id: ExtensionId,
        input: ExtensionInput,
    ) -> Result<Extension, DirectoryError> {
        validate_extension_code(&input.code)?;

        let mut tables = self.tables.write();
        if !tables.extensions.contains_key(&id) {
            return Err(DirectoryError::ExtensionNotFound(id));
        }
        if !tables.employees.contains_key(&input.employee_id) {
            return Err(DirectoryError::EmployeeNotFound(input.employee_id));
        }
        if let Some(existing) = tables.extension_for(input.employee_id) {
            if existing.id != id {
                return Err(DirectoryError::Conflict {
                    employee_id: input.employee_id,
                    existing: existing.id,
                });
            }
        }

        let extension = tables
            .extensions
            .get_mut(&id)
            .ok_or(DirectoryError::ExtensionNotFound(id))?;
        extension.employee_id = input.employee_id;
        extension.code = input.code;
        extension.status = input.status;
        extension.updated_at = Utc::now();
        Ok(extension.clone())
    }

    /// Creates or updates depending on whether `id` is given.
    pub fn save_extension(
        &self,
        id: Option<ExtensionId>,
        input: ExtensionInput,
    ) -> Result<(Extension, SaveKind), DirectoryError> {
        match id {
            Some(id) => Ok((self.update_extension(id, input)?, SaveKind::Updated)),
            None => Ok((self.create_extension(input)?, SaveKind::Created)),
        }
    }

    pub fn delete_extension(&self, id: ExtensionId) -> Result<Extension, DirectoryError> {
        self.tables
            .write()
            .extensions
            .remove(&id)
            .ok_or(DirectoryError::ExtensionNotFound(id))
    }

    pub fn extension(&self, id: ExtensionId) -> Result<Extension, DirectoryError> {
        self.tables
            .read()
            .extensions
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::ExtensionNotFound(id))
    }

    pub fn extension_listing(&self) -> Vec<ExtensionListing> {
        let tables = self.tables.read();
        tables
            .extensions
            .values()
            .map(|extension| ExtensionListing {
                id: extension.id,
                employee_id: extension.employee_id,
                employee: tables
                    .employee_name(extension.employee_id)
                    .unwrap_or_default(),
                extension: extension.code.clone(),
                status: extension.status,
                created_at: extension.created_at,
                updated_at: extension.updated_at,
            })
            .collect()
    }

    pub fn employee_count(&self) -> usize {
        self.tables.read().employees.len()
    }

    pub fn extension_count(&self) -> usize {
        self.tables.read().extensions.len()
    }
}

impl DirectoryStore for InMemoryDirectoryStore {
    fn extension_rows(&self) -> Vec<ExtensionRow> {
        let tables = self.tables.read();
        tables
            .extensions
            .values()
            .map(|extension| ExtensionRow {
                code: extension.code.clone(),
                employee_name: tables.employee_name(extension.employee_id),
            })
            .collect()
    }

    fn recipients(&self) -> Vec<Recipient> {
        self.tables
            .read()
            .employees
            .values()
            .filter(|employee| employee.has_contact_address())
            .map(|employee| Recipient {
                name: employee.name.clone(),
                email: employee.email.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn store_with_employee(name: &str, email: &str) -> (InMemoryDirectoryStore, EmployeeId) {
        let store = InMemoryDirectoryStore::new();
        let employee = store
            .create_employee(NewEmployee::new(name, email))
            .expect("employee");
        (store, employee.id)
    }

    #[test]
    fn second_extension_for_same_employee_conflicts() {
        let (store, id) = store_with_employee("Meena", "meena@example.com");
        let first = store
            .create_extension(ExtensionInput::new(id, "101"))
            .expect("first");
        let err = store
            .create_extension(ExtensionInput::new(id, "102"))
            .expect_err("conflict");
        assert_matches!(err, DirectoryError::Conflict { existing, .. } if existing == first.id);
    }

    #[test]
    fn moving_extension_onto_taken_employee_conflicts() {
        let (store, a) = store_with_employee("A", "");
        let b = store.create_employee(NewEmployee::new("B", "")).unwrap().id;
        store.create_extension(ExtensionInput::new(a, "1")).unwrap();
        let ext_b = store.create_extension(ExtensionInput::new(b, "2")).unwrap();

        let err = store
            .update_extension(ext_b.id, ExtensionInput::new(a, "2"))
            .expect_err("conflict");
        assert_matches!(err, DirectoryError::Conflict { .. });

        let same = store
            .update_extension(ext_b.id, ExtensionInput::new(b, "22"))
            .expect("self update is fine");
        assert_eq!(same.code, "22");
    }

    #[test]
    fn deleting_employee_cascades_to_extension() {
        let (store, id) = store_with_employee("Kiran", "");
        let ext = store.create_extension(ExtensionInput::new(id, "300")).unwrap();

        store.delete_employee(id).expect("delete");

        assert_matches!(store.extension(ext.id), Err(DirectoryError::ExtensionNotFound(_)));
        assert!(store.extension_rows().is_empty());
    }

    #[test]
    fn extension_requires_existing_employee() {
        let store = InMemoryDirectoryStore::new();
        let err = store
            .create_extension(ExtensionInput::new(EmployeeId(42), "1"))
            .expect_err("missing employee");
        assert_matches!(err, DirectoryError::EmployeeNotFound(EmployeeId(42)));
    }

    #[test]
    fn recipients_skip_blank_addresses_but_keep_inactive() {
        let store = InMemoryDirectoryStore::new();
        store
            .create_employee(NewEmployee::new("With Mail", "a@example.com"))
            .unwrap();
        store.create_employee(NewEmployee::new("No Mail", "")).unwrap();
        store
            .create_employee(NewEmployee {
                name: "Inactive".to_string(),
                email: "b@example.com".to_string(),
                is_active: false,
            })
            .unwrap();

        let emails: Vec<_> = store.recipients().into_iter().map(|r| r.email).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn rows_follow_insertion_order() {
        let store = InMemoryDirectoryStore::new();
        for (name, code) in [("Zed", "9"), ("Amy", "1"), ("Bob", "5")] {
            let id = store.create_employee(NewEmployee::new(name, "")).unwrap().id;
            store.create_extension(ExtensionInput::new(id, code)).unwrap();
        }
        let codes: Vec<_> = store.extension_rows().into_iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["9", "1", "5"]);
    }

    #[test]
    fn update_refreshes_updated_at_only() {
        let (store, id) = store_with_employee("Tara", "");
        let created = store.employee(id).unwrap();
        let updated = store
            .update_employee(
                id,
                EmployeeUpdate {
                    email: Some("tara@example.com".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.name, "Tara");
    }
}
