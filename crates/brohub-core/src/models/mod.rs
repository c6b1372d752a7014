pub mod bulk_upload;
pub mod organisation;
pub mod upload_task;

pub use bulk_upload::{BulkUpload, BulkUploadPatch, BulkUploadStatus, BulkUploadType, UploadFile};
pub use organisation::{Organisation, RegistryCredentials};
pub use upload_task::{
    BroDomain, RegistrationType, RequestType, TaskStatus, UploadTask, UploadTaskPatch,
};
