//! End-to-end pipeline behavior against a scripted portal.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use brohub_core::models::{
    Organisation, RegistrationType, RegistryCredentials, RequestType, TaskStatus, UploadTask,
};
use brohub_core::{AppError, Config, EncryptionService};
use brohub_registry::{BronDocument, DeliveryStatus, RegistryApi, ValidationOutcome};
use brohub_store::{MemoryStore, TaskStore};
use brohub_worker::{DeliveryPipeline, DeliveryQueue, WellGeometry, INSERT_REWRITE_TRIGGER};

#[derive(Default)]
struct PortalState {
    validate_calls: usize,
    upload_calls: usize,
    attach_calls: usize,
    delivery_calls: usize,
    poll_calls: usize,
    last_xml: String,
}

/// Portal double: fixed validation outcome and a scripted poll sequence, the
/// last status repeating once the script runs out.
struct FakePortal {
    validation: ValidationOutcome,
    polls: Vec<DeliveryStatus>,
    state: Mutex<PortalState>,
}

impl FakePortal {
    fn new(validation: ValidationOutcome, polls: Vec<DeliveryStatus>) -> Self {
        FakePortal {
            validation,
            polls,
            state: Mutex::new(PortalState::default()),
        }
    }

    fn happy(bro_id: &str) -> Self {
        Self::new(valid(), vec![delivered(bro_id)])
    }
}

#[async_trait]
impl RegistryApi for FakePortal {
    async fn validate_xml(
        &self,
        _project: &str,
        _credentials: &RegistryCredentials,
        xml: &str,
    ) -> Result<ValidationOutcome, AppError> {
        let mut state = self.state.lock().unwrap();
        state.validate_calls += 1;
        state.last_xml = xml.to_string();
        Ok(self.validation.clone())
    }

    async fn create_upload(
        &self,
        project: &str,
        _credentials: &RegistryCredentials,
    ) -> Result<String, AppError> {
        self.state.lock().unwrap().upload_calls += 1;
        Ok(format!("https://portal.test/api/v2/{project}/uploads/77"))
    }

    async fn attach_document(
        &self,
        _upload_url: &str,
        _credentials: &RegistryCredentials,
        _xml: &str,
    ) -> Result<(), AppError> {
        self.state.lock().unwrap().attach_calls += 1;
        Ok(())
    }

    async fn create_delivery(
        &self,
        project: &str,
        _credentials: &RegistryCredentials,
        _upload_url: &str,
    ) -> Result<String, AppError> {
        self.state.lock().unwrap().delivery_calls += 1;
        Ok(format!("https://portal.test/api/v2/{project}/leveringen/88"))
    }

    async fn check_delivery(
        &self,
        _delivery_url: &str,
        _credentials: &RegistryCredentials,
    ) -> Result<DeliveryStatus, AppError> {
        let mut state = self.state.lock().unwrap();
        let index = state.poll_calls.min(self.polls.len() - 1);
        state.poll_calls += 1;
        Ok(self.polls[index].clone())
    }
}

fn valid() -> ValidationOutcome {
    ValidationOutcome {
        status: "VALIDE".to_string(),
        errors: vec![],
    }
}

fn rejected(errors: &[&str]) -> ValidationOutcome {
    ValidationOutcome {
        status: "NIET-VALIDE".to_string(),
        errors: errors.iter().map(|e| e.to_string()).collect(),
    }
}

fn delivered(bro_id: &str) -> DeliveryStatus {
    DeliveryStatus {
        status: "DOORGELEVERD".to_string(),
        brondocuments: vec![BronDocument {
            status: "OPGENOMEN_LVBRO".to_string(),
            bro_id: Some(bro_id.to_string()),
            errors: vec![],
        }],
    }
}

fn still_pending() -> DeliveryStatus {
    DeliveryStatus {
        status: "AANGELEVERD".to_string(),
        brondocuments: vec![],
    }
}

fn encryption() -> Arc<EncryptionService> {
    Arc::new(EncryptionService::from_key_bytes(b"01234567890123456789012345678901").unwrap())
}

async fn organisation_with_credentials(
    store: &MemoryStore,
    encryption: &EncryptionService,
) -> Uuid {
    let mut organisation = Organisation::new("Provincie Test", "27376655");
    organisation
        .set_credentials(encryption, "portal-token", "geheim")
        .unwrap();
    let id = organisation.id;
    store.insert_organisation(organisation).await.unwrap();
    id
}

fn pipeline(
    store: &Arc<MemoryStore>,
    portal: &Arc<FakePortal>,
    encryption: Arc<EncryptionService>,
) -> DeliveryPipeline<MemoryStore, FakePortal> {
    DeliveryPipeline::new(
        Arc::clone(store),
        Arc::clone(portal),
        encryption,
        &Config::default(),
    )
    .with_poll_delay(Duration::ZERO)
}

fn gar_task(owner: Uuid) -> UploadTask {
    UploadTask::new(
        owner,
        "1234",
        RegistrationType::Gar,
        RequestType::Registration,
        json!({"requestReference": "GAR_levering_1", "qualityRegime": "IMBRO"}),
        json!({
            "objectIdAccountableParty": "GMW000000000001-001-2024",
            "qualityControlMethod": "handboekProvinciesRIVMv2017",
            "gmwBroId": "GMW000000000001",
            "tubeNumber": 1,
            "fieldResearch": {
                "samplingDateTime": "2024-05-13T09:30:00+00:00",
                "samplingOperator": "27376655",
                "pumpType": "onderwaterPomp",
                "fieldMeasurements": [{
                    "parameter": 1398,
                    "unit": "1",
                    "fieldMeasurementValue": 7.2,
                    "qualityControlStatus": "onbeslist",
                }],
            },
            "laboratoryAnalyses": [{
                "analysisProcesses": [{
                    "date": "2024-05-20",
                    "analyticalTechnique": "LC-MS-MS",
                    "valuationMethod": "I21675.19",
                    "analyses": [{
                        "parameter": 5741,
                        "unit": "ug/l",
                        "analysisMeasurementValue": 0.12,
                        "qualityControlStatus": "onbeslist",
                    }],
                }],
            }],
        }),
    )
}

fn owner_change_task(owner: Uuid) -> UploadTask {
    UploadTask::new(
        owner,
        "1234",
        RegistrationType::GmwOwner,
        RequestType::Registration,
        json!({
            "requestReference": "eigenaarswissel",
            "qualityRegime": "IMBRO",
            "broId": "GMW000000000001",
        }),
        json!({"eventDate": "2024-01-01", "owner": "87654321"}),
    )
}

#[tokio::test]
async fn happy_path_gar_delivery_completes() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GAR000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = gar_task(owner);
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100.0);
    assert_eq!(task.bro_id.as_deref(), Some("GAR000000000001"));
    assert_eq!(task.log, "Upload geslaagd: GAR000000000001");
    assert_eq!(
        task.bro_delivery_url.as_deref(),
        Some("https://portal.test/api/v2/1234/leveringen/88")
    );
    assert!(task.bro_errors.is_empty());

    assert_eq!(
        store.load_organisation(owner).await.unwrap().request_count,
        1
    );
    let state = portal.state.lock().unwrap();
    assert_eq!(state.attach_calls, 1);
    assert_eq!(state.poll_calls, 1);
    assert!(state.last_xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(state.last_xml.contains("<registrationRequest"));
}

#[tokio::test]
async fn missing_request_reference_fails_before_the_portal_is_touched() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GMN000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let mut task = owner_change_task(owner);
    task.metadata = json!({"qualityRegime": "IMBRO"});
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.progress, 50.0);
    assert_eq!(task.bro_errors, "requestReference: Field required");
    assert!(task.bro_delivery_url.is_none());

    let state = portal.state.lock().unwrap();
    assert_eq!(state.validate_calls, 0);
    assert_eq!(state.upload_calls, 0);
}

#[tokio::test]
async fn portal_rejection_records_the_errors_and_stops() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::new(
        rejected(&["requestReference: de waarde ontbreekt"]),
        vec![delivered("GMW000000000001")],
    ));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = owner_change_task(owner);
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.progress, 50.0);
    assert_eq!(task.bro_errors, "requestReference: de waarde ontbreekt");

    let state = portal.state.lock().unwrap();
    assert_eq!(state.validate_calls, 1);
    assert_eq!(state.upload_calls, 0);
}

#[tokio::test]
async fn rejected_registration_is_rewritten_as_insert() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GMW000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let mut task = owner_change_task(owner);
    task.bro_errors =
        "Op 2025-01 gebeurtenis mag niet voor de laatst geregistreerde gebeurtenis 2025-02 liggen."
            .to_string();
    assert!(task.bro_errors.contains(INSERT_REWRITE_TRIGGER));
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.request_type, RequestType::Insert);
    assert_eq!(task.metadata["correctionReason"], "eigenCorrectie");
    assert_eq!(task.status, TaskStatus::Completed);

    let state = portal.state.lock().unwrap();
    assert!(state.last_xml.contains("<insertRequest"));
    assert!(state
        .last_xml
        .contains("<brocom:correctionReason>eigenCorrectie</brocom:correctionReason>"));
}

#[tokio::test]
async fn stalled_delivery_ends_unfinished_after_four_polls() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::new(valid(), vec![still_pending()]));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = owner_change_task(owner);
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Unfinished);
    assert_eq!(task.progress, 95.0);
    assert!(task.bro_id.is_none());
    assert!(task.log.contains("handmatig"));
    assert!(task.bro_delivery_url.is_some());

    assert_eq!(portal.state.lock().unwrap().poll_calls, 4);
    assert_eq!(
        store.load_organisation(owner).await.unwrap().request_count,
        0
    );
}

#[tokio::test]
async fn document_errors_during_polling_fail_the_task() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::new(
        valid(),
        vec![DeliveryStatus {
            status: "DOORGELEVERD".to_string(),
            brondocuments: vec![BronDocument {
                status: "AFGEKEURD_LVBRO".to_string(),
                bro_id: None,
                errors: vec!["het brondocument is afgekeurd".to_string()],
            }],
        }],
    ));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = owner_change_task(owner);
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.progress, 75.0);
    assert!(task.bro_errors.contains("afgekeurd"));
    assert!(task.bro_id.is_none());
}

#[tokio::test]
async fn concurrent_triggers_deliver_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GMW000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = owner_change_task(owner);
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    let first = pipeline(&store, &portal, Arc::clone(&encryption));
    let second = pipeline(&store, &portal, encryption);
    let (a, b) = tokio::join!(first.process(task_id), second.process(task_id));
    a.unwrap();
    b.unwrap();

    let state = portal.state.lock().unwrap();
    assert_eq!(state.validate_calls, 1);
    assert_eq!(state.attach_calls, 1);
    assert_eq!(
        store.load_organisation(owner).await.unwrap().request_count,
        1
    );
}

struct FixedGeometry {
    screen_top: f64,
}

#[async_trait]
impl WellGeometry for FixedGeometry {
    async fn screen_top_position(
        &self,
        _bro_id: &str,
        _tube_number: &str,
    ) -> Result<Option<f64>, AppError> {
        Ok(Some(self.screen_top))
    }
}

#[tokio::test]
async fn shortening_gets_tube_length_from_geometry() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GMW000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = UploadTask::new(
        owner,
        "1234",
        RegistrationType::GmwShortening,
        RequestType::Registration,
        json!({
            "requestReference": "inkorting",
            "qualityRegime": "IMBRO",
            "broId": "GMW000000000001",
        }),
        json!({
            "eventDate": "2024-01-01",
            "monitoringTubes": [{
                "tubeNumber": 1,
                "tubeTopPosition": 1.5,
                "tubeTopPositioningMethod": "RTKGPS0tot4cm",
            }],
        }),
    );
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .with_geometry(Arc::new(FixedGeometry { screen_top: -2.5 }))
        .process(task_id)
        .await
        .unwrap();

    let task = store.load_upload_task(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(
        task.sourcedocument_data["monitoringTubes"][0]["plainTubePartLength"],
        "4.000"
    );
    assert!(portal
        .state
        .lock()
        .unwrap()
        .last_xml
        .contains(r#"<gmwcom:plainTubePartLength uom="m">4.000</gmwcom:plainTubePartLength>"#));
}

#[tokio::test]
async fn accountable_party_equal_to_owner_is_left_out() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GMW000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let mut task = owner_change_task(owner);
    task.metadata = json!({
        "requestReference": "eigenaarswissel",
        "qualityRegime": "IMBRO",
        "broId": "GMW000000000001",
        "deliveryAccountableParty": "27376655",
    });
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    pipeline(&store, &portal, encryption)
        .process(task_id)
        .await
        .unwrap();

    assert!(!portal
        .state
        .lock()
        .unwrap()
        .last_xml
        .contains("deliveryAccountableParty"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_pool_drains_pending_tasks() {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(FakePortal::happy("GMW000000000001"));
    let encryption = encryption();
    let owner = organisation_with_credentials(&store, &encryption).await;

    let task = owner_change_task(owner);
    let task_id = task.id;
    store.insert_upload_task(task).await.unwrap();

    let config = Config {
        worker_poll_interval_ms: 10,
        delivery_poll_delay_secs: 0,
        ..Config::default()
    };
    let queue = DeliveryQueue::start(
        Arc::clone(&store),
        Arc::clone(&portal),
        None,
        encryption,
        config,
    );

    let mut completed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if store.load_upload_task(task_id).await.unwrap().status == TaskStatus::Completed {
            completed = true;
            break;
        }
    }
    queue.shutdown().await;

    assert!(completed, "task never completed");
    assert_eq!(portal.state.lock().unwrap().attach_calls, 1);
}
