//! Save entry point for the directory.
//!
//! `Directory` persists through the store and then runs every registered
//! [`ExtensionSavedHook`] with the saved record. Saves are serialized: the
//! next save waits until the previous one has finished notifying.

use crate::error::{DirectoryError, DispatchError};
use crate::metrics::METRICS;
use crate::model::{
    Employee, EmployeeId, EmployeeUpdate, Extension, ExtensionId, ExtensionInput,
    ExtensionListing, NewEmployee, SaveKind,
};
use crate::report::{ReportDocument, generate_report};
use crate::store::{DirectoryStore, InMemoryDirectoryStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Reacts to an extension record that has just been committed.
#[async_trait]
pub trait ExtensionSavedHook: Send + Sync {
    async fn on_extension_saved(
        &self,
        record: &Extension,
        was_update: bool,
    ) -> Result<(), DispatchError>;

    fn name(&self) -> &'static str;
}

pub struct Directory {
    store: Arc<InMemoryDirectoryStore>,
    hooks: Vec<Arc<dyn ExtensionSavedHook>>,
    save_gate: Mutex<()>,
}

impl Directory {
    pub fn new(store: Arc<InMemoryDirectoryStore>) -> Self {
        Self {
            store,
            hooks: Vec::new(),
            save_gate: Mutex::new(()),
        }
    }

    /// Registers a hook; hooks run in registration order.
    pub fn on_extension_saved(mut self, hook: Arc<dyn ExtensionSavedHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn store(&self) -> &Arc<InMemoryDirectoryStore> {
        &self.store
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.store.employees()
    }

    pub fn employee(&self, id: EmployeeId) -> Result<Employee, DirectoryError> {
        self.store.employee(id)
    }

    pub fn create_employee(&self, input: NewEmployee) -> Result<Employee, DirectoryError> {
        self.store.create_employee(input).inspect_err(track)
    }

    pub fn update_employee(
        &self,
        id: EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee, DirectoryError> {
        self.store.update_employee(id, update).inspect_err(track)
    }

    pub fn delete_employee(&self, id: EmployeeId) -> Result<Employee, DirectoryError> {
        let employee = self.store.delete_employee(id).inspect_err(track)?;
        METRICS.set_extension_count(self.store.extension_count());
        Ok(employee)
    }

    pub fn extensions(&self) -> Vec<ExtensionListing> {
        self.store.extension_listing()
    }

    pub fn extension(&self, id: ExtensionId) -> Result<Extension, DirectoryError> {
        self.store.extension(id)
    }

    pub async fn create_extension(&self, input: ExtensionInput) -> Result<Extension, DirectoryError> {
        self.save_extension(None, input).await
    }

    pub async fn update_extension(
        &self,
        id: ExtensionId,
        input: ExtensionInput,
    ) -> Result<Extension, DirectoryError> {
        self.save_extension(Some(id), input).await
    }

    /// Commits the record, then notifies. A hook failure is reported even
    /// though the record stays saved.
    pub async fn save_extension(
        &self,
        id: Option<ExtensionId>,
        input: ExtensionInput,
    ) -> Result<Extension, DirectoryError> {
        let _gate = self.save_gate.lock().await;

        let (record, kind) = self.store.save_extension(id, input).inspect_err(track)?;
        METRICS.record_save(kind.as_str());
        METRICS.set_extension_count(self.store.extension_count());
        info!(
            extension_id = %record.id,
            employee_id = %record.employee_id,
            kind = kind.as_str(),
            "extension saved"
        );

        self.run_hooks(&record, kind).await?;
        Ok(record)
    }

    /// Deleting does not notify; only saves do.
    pub fn delete_extension(&self, id: ExtensionId) -> Result<Extension, DirectoryError> {
        let extension = self.store.delete_extension(id).inspect_err(track)?;
        METRICS.set_extension_count(self.store.extension_count());
        Ok(extension)
    }

    /// Current report, for download.
    pub fn render_report(&self, today: NaiveDate) -> Result<ReportDocument, DirectoryError> {
        generate_report(&self.store.extension_rows(), today)
            .map_err(DirectoryError::from)
            .inspect_err(track)
    }

    async fn run_hooks(&self, record: &Extension, kind: SaveKind) -> Result<(), DirectoryError> {
        for hook in &self.hooks {
            if let Err(source) = hook.on_extension_saved(record, kind.was_update()).await {
                warn!(
                    hook = hook.name(),
                    extension_id = %record.id,
                    error = %source,
                    "save hook failed after commit"
                );
                let err = DirectoryError::Notification {
                    extension_id: record.id,
                    source,
                };
                track(&err);
                return Err(err);
            }
        }
        Ok(())
    }
}

fn track(err: &DirectoryError) {
    METRICS.record_error(err.code().category());
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use parking_lot::Mutex as SyncMutex;

    #[derive(Default)]
    struct RecordingHook {
        calls: SyncMutex<Vec<(ExtensionId, bool)>>,
    }

    #[async_trait]
    impl ExtensionSavedHook for RecordingHook {
        async fn on_extension_saved(
            &self,
            record: &Extension,
            was_update: bool,
        ) -> Result<(), DispatchError> {
            self.calls.lock().push((record.id, was_update));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hook_sees_create_then_update() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let hook = Arc::new(RecordingHook::default());
        let directory = Directory::new(store.clone()).on_extension_saved(hook.clone());

        let employee = directory
            .create_employee(NewEmployee::new("Nisha", ""))
            .unwrap();
        let created = directory
            .create_extension(ExtensionInput::new(employee.id, "210"))
            .await
            .unwrap();
        directory
            .update_extension(created.id, ExtensionInput::new(employee.id, "211"))
            .await
            .unwrap();

        assert_eq!(
            *hook.calls.lock(),
            vec![(created.id, false), (created.id, true)]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_save_never_reaches_hooks() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let hook = Arc::new(RecordingHook::default());
        let directory = Directory::new(store).on_extension_saved(hook.clone());
        let employee = directory.create_employee(NewEmployee::new("Om", "")).unwrap();

        let err = directory
            .create_extension(ExtensionInput::new(employee.id, "123456"))
            .await
            .expect_err("too long");
        assert_matches!(err, DirectoryError::Validation(_));
        assert!(hook.calls.lock().is_empty());
    }
}
