//! Persistence boundary for tasks, bulk jobs, files and organisations.
//!
//! The pipeline and the bulk orchestrators depend only on the `TaskStore`
//! trait. `MemoryStore` is the bundled implementation; a database-backed
//! store slots in behind the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use brohub_core::models::{
    BulkUpload, BulkUploadPatch, BulkUploadStatus, Organisation, TaskStatus, UploadFile,
    UploadTask, UploadTaskPatch,
};
use brohub_core::AppError;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_upload_task(&self, task: UploadTask) -> Result<(), AppError>;
    async fn load_upload_task(&self, id: Uuid) -> Result<UploadTask, AppError>;
    /// Partial update; fields absent from the patch are left untouched.
    async fn update_upload_task(&self, id: Uuid, patch: UploadTaskPatch) -> Result<(), AppError>;
    /// Atomic status transition. Returns false when the task was not in
    /// `from`, in which case nothing changed.
    async fn cas_upload_task_status(
        &self,
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, AppError>;
    async fn pending_upload_tasks(&self, limit: usize) -> Result<Vec<UploadTask>, AppError>;

    async fn insert_bulk_upload(&self, bulk: BulkUpload) -> Result<(), AppError>;
    async fn load_bulk_upload(&self, id: Uuid) -> Result<BulkUpload, AppError>;
    async fn update_bulk_upload(&self, id: Uuid, patch: BulkUploadPatch) -> Result<(), AppError>;
    async fn cas_bulk_upload_status(
        &self,
        id: Uuid,
        from: BulkUploadStatus,
        to: BulkUploadStatus,
    ) -> Result<bool, AppError>;
    async fn pending_bulk_uploads(&self, limit: usize) -> Result<Vec<BulkUpload>, AppError>;

    async fn insert_upload_file(&self, file: UploadFile, content: Vec<u8>)
        -> Result<(), AppError>;
    async fn load_upload_file(&self, id: Uuid) -> Result<(UploadFile, Vec<u8>), AppError>;
    async fn upload_files_for_bulk(&self, bulk_id: Uuid) -> Result<Vec<UploadFile>, AppError>;

    async fn insert_organisation(&self, organisation: Organisation) -> Result<(), AppError>;
    async fn load_organisation(&self, id: Uuid) -> Result<Organisation, AppError>;
    /// Bumps the completed-delivery counter by one.
    async fn increment_organisation_counter(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Default)]
struct State {
    tasks: HashMap<Uuid, UploadTask>,
    bulks: HashMap<Uuid, BulkUpload>,
    files: HashMap<Uuid, (UploadFile, Vec<u8>)>,
    organisations: HashMap<Uuid, Organisation>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(kind: &str, id: Uuid) -> AppError {
    AppError::Internal(format!("Unknown {} {}", kind, id))
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_upload_task(&self, task: UploadTask) -> Result<(), AppError> {
        self.state.write().await.tasks.insert(task.id, task);
        Ok(())
    }

    async fn load_upload_task(&self, id: Uuid) -> Result<UploadTask, AppError> {
        self.state
            .read()
            .await
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("upload task", id))
    }

    async fn update_upload_task(&self, id: Uuid, patch: UploadTaskPatch) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&id).ok_or_else(|| not_found("upload task", id))?;
        patch.apply(task);
        Ok(())
    }

    async fn cas_upload_task_status(
        &self,
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&id).ok_or_else(|| not_found("upload task", id))?;
        if task.status != from {
            return Ok(false);
        }
        UploadTaskPatch::status(to).apply(task);
        Ok(true)
    }

    async fn pending_upload_tasks(&self, limit: usize) -> Result<Vec<UploadTask>, AppError> {
        let state = self.state.read().await;
        let mut pending: Vec<UploadTask> = state
            .tasks
            .values()
            .filter(|task| task.status == TaskStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|task| task.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn insert_bulk_upload(&self, bulk: BulkUpload) -> Result<(), AppError> {
        self.state.write().await.bulks.insert(bulk.id, bulk);
        Ok(())
    }

    async fn load_bulk_upload(&self, id: Uuid) -> Result<BulkUpload, AppError> {
        self.state
            .read()
            .await
            .bulks
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("bulk upload", id))
    }

    async fn update_bulk_upload(&self, id: Uuid, patch: BulkUploadPatch) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let bulk = state.bulks.get_mut(&id).ok_or_else(|| not_found("bulk upload", id))?;
        patch.apply(bulk);
        Ok(())
    }

    async fn cas_bulk_upload_status(
        &self,
        id: Uuid,
        from: BulkUploadStatus,
        to: BulkUploadStatus,
    ) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let bulk = state.bulks.get_mut(&id).ok_or_else(|| not_found("bulk upload", id))?;
        if bulk.status != from {
            return Ok(false);
        }
        BulkUploadPatch {
            status: Some(to),
            ..Default::default()
        }
        .apply(bulk);
        Ok(true)
    }

    async fn pending_bulk_uploads(&self, limit: usize) -> Result<Vec<BulkUpload>, AppError> {
        let state = self.state.read().await;
        let mut pending: Vec<BulkUpload> = state
            .bulks
            .values()
            .filter(|bulk| bulk.status == BulkUploadStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|bulk| bulk.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn insert_upload_file(
        &self,
        file: UploadFile,
        content: Vec<u8>,
    ) -> Result<(), AppError> {
        self.state.write().await.files.insert(file.id, (file, content));
        Ok(())
    }

    async fn load_upload_file(&self, id: Uuid) -> Result<(UploadFile, Vec<u8>), AppError> {
        self.state
            .read()
            .await
            .files
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("upload file", id))
    }

    async fn upload_files_for_bulk(&self, bulk_id: Uuid) -> Result<Vec<UploadFile>, AppError> {
        let state = self.state.read().await;
        let mut files: Vec<UploadFile> = state
            .files
            .values()
            .filter(|(file, _)| file.bulk_upload_id == bulk_id)
            .map(|(file, _)| file.clone())
            .collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    async fn insert_organisation(&self, organisation: Organisation) -> Result<(), AppError> {
        self.state
            .write()
            .await
            .organisations
            .insert(organisation.id, organisation);
        Ok(())
    }

    async fn load_organisation(&self, id: Uuid) -> Result<Organisation, AppError> {
        self.state
            .read()
            .await
            .organisations
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("organisation", id))
    }

    async fn increment_organisation_counter(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let organisation = state
            .organisations
            .get_mut(&id)
            .ok_or_else(|| not_found("organisation", id))?;
        organisation.request_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brohub_core::models::RegistrationType;
    use serde_json::json;

    fn task() -> UploadTask {
        UploadTask::new(
            Uuid::new_v4(),
            "1",
            RegistrationType::GmwOwner,
            brohub_core::models::RequestType::Registration,
            json!({"requestReference": "ref", "qualityRegime": "IMBRO"}),
            json!({"eventDate": "2024-01-01", "owner": "27376655"}),
        )
    }

    #[tokio::test]
    async fn cas_claims_a_task_exactly_once() {
        let store = MemoryStore::new();
        let task = task();
        let id = task.id;
        store.insert_upload_task(task).await.unwrap();

        assert!(store
            .cas_upload_task_status(id, TaskStatus::Pending, TaskStatus::Processing)
            .await
            .unwrap());
        assert!(!store
            .cas_upload_task_status(id, TaskStatus::Pending, TaskStatus::Processing)
            .await
            .unwrap());
        assert_eq!(
            store.load_upload_task(id).await.unwrap().status,
            TaskStatus::Processing
        );
    }

    #[tokio::test]
    async fn pending_tasks_come_back_oldest_first() {
        let store = MemoryStore::new();
        let first = task();
        let second = task();
        let first_id = first.id;
        store.insert_upload_task(first).await.unwrap();
        store.insert_upload_task(second).await.unwrap();

        let pending = store.pending_upload_tasks(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first_id);

        store
            .cas_upload_task_status(first_id, TaskStatus::Pending, TaskStatus::Processing)
            .await
            .unwrap();
        assert_eq!(store.pending_upload_tasks(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn organisation_counter_increments() {
        let store = MemoryStore::new();
        let organisation = Organisation::new("Provincie Test", "27376655");
        let id = organisation.id;
        store.insert_organisation(organisation).await.unwrap();
        store.increment_organisation_counter(id).await.unwrap();
        store.increment_organisation_counter(id).await.unwrap();
        assert_eq!(store.load_organisation(id).await.unwrap().request_count, 2);
    }

    #[tokio::test]
    async fn files_are_scoped_to_their_bulk() {
        let store = MemoryStore::new();
        let bulk_id = Uuid::new_v4();
        let other_bulk = Uuid::new_v4();
        store
            .insert_upload_file(UploadFile::new(bulk_id, "veld.csv"), b"a;b".to_vec())
            .await
            .unwrap();
        store
            .insert_upload_file(UploadFile::new(other_bulk, "lab.csv"), b"c;d".to_vec())
            .await
            .unwrap();

        let files = store.upload_files_for_bulk(bulk_id).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "veld.csv");

        let (_, content) = store.load_upload_file(files[0].id).await.unwrap();
        assert_eq!(content, b"a;b");
    }

    #[tokio::test]
    async fn missing_task_is_an_error() {
        let store = MemoryStore::new();
        assert!(store.load_upload_task(Uuid::new_v4()).await.is_err());
    }
}
