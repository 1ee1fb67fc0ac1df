#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end tests of the command engine over an on-disk database.
//!
//! Drives devices through the connect façade the way a transport would:
//! poll, acknowledge, fail, and the `DeviceConfigured` follow-up.

use std::sync::Arc;

use mdmq_core::config::StorageConfig;
use mdmq_server::protocol::{
    CommandPayload, InstalledApplication, NewCommand, QueryResponses, RequestType, Response,
    Status,
};
use mdmq_server::storage::{MdmDatabase, NewDeviceApplication};
use mdmq_server::{AckDispatcher, ConnectService, Reply};

async fn open_db(dir: &tempfile::TempDir) -> MdmDatabase {
    MdmDatabase::open(&dir.path().join("mdmq.db"), &StorageConfig::default())
        .await
        .unwrap()
}

fn delivered(reply: &Reply) -> CommandPayload {
    CommandPayload::decode(reply.body.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn test_awaiting_configuration_workflow() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let service = ConnectService::new(AckDispatcher::from_database(&db));

    let device = db.enroll_device("udid-1", None, true).await.unwrap();
    for request_type in [
        RequestType::DeviceInformation,
        RequestType::InstalledApplicationList,
    ] {
        service
            .enqueue(&NewCommand::new("udid-1", request_type).unwrap())
            .await
            .unwrap();
    }

    // Poll: DeviceInformation is first.
    let reply = service
        .connect(&Response::new("udid-1", Status::Idle))
        .await
        .unwrap();
    let info = delivered(&reply);
    assert_eq!(info.command.request_type, RequestType::DeviceInformation);
    assert_eq!(reply.remaining, 2);

    // Answer it; the application list comes next.
    let mut response = Response::new("udid-1", Status::Acknowledged).for_command(&info.command_uuid);
    response.query_responses = Some(QueryResponses {
        serial_number: Some("C02ABC".to_string()),
        device_name: Some("Front desk iPad".to_string()),
        ..Default::default()
    });
    let reply = service.connect(&response).await.unwrap();
    let apps_cmd = delivered(&reply);
    assert_eq!(
        apps_cmd.command.request_type,
        RequestType::InstalledApplicationList
    );
    assert_eq!(reply.remaining, 1);

    // Answer the last provisioning command; DeviceConfigured follows.
    let mut response =
        Response::new("udid-1", Status::Acknowledged).for_command(&apps_cmd.command_uuid);
    response.installed_application_list = Some(vec![InstalledApplication {
        name: "Kiosk".to_string(),
        identifier: Some("com.example.kiosk".to_string()),
        ..Default::default()
    }]);
    let reply = service.connect(&response).await.unwrap();
    let configured = delivered(&reply);
    assert_eq!(configured.command.request_type, RequestType::DeviceConfigured);
    assert_eq!(reply.remaining, 1);

    // Setup finished elsewhere: the flag is cleared before the final ack.
    db.set_awaiting_configuration("udid-1", false).await.unwrap();
    let reply = service
        .connect(
            &Response::new("udid-1", Status::Acknowledged).for_command(&configured.command_uuid),
        )
        .await
        .unwrap();
    assert_eq!(reply, Reply::empty());

    let stored = db.get_device("udid-1").await.unwrap();
    assert_eq!(stored.serial_number.as_deref(), Some("C02ABC"));
    assert_eq!(stored.device_name.as_deref(), Some("Front desk iPad"));
    let apps = db.device_applications(&device.uuid).await.unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].identifier.as_deref(), Some("com.example.kiosk"));
}

#[tokio::test]
async fn test_failed_final_command_leaves_device_awaiting() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let service = ConnectService::new(AckDispatcher::from_database(&db));
    db.enroll_device("udid-1", None, true).await.unwrap();

    let id = service
        .enqueue(&NewCommand::new("udid-1", RequestType::InstallProfile).unwrap())
        .await
        .unwrap();
    let reply = service
        .connect(&Response::new("udid-1", Status::Error).for_command(&id))
        .await
        .unwrap();

    assert_eq!(reply, Reply::empty());
    assert!(db.get_device("udid-1").await.unwrap().awaiting_configuration);
    assert!(db.pending_commands("udid-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_queue_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let id = {
        let db = open_db(&dir).await;
        let dispatcher = AckDispatcher::from_database(&db);
        dispatcher
            .enqueue(&NewCommand::new("udid-1", RequestType::ProfileList).unwrap())
            .await
            .unwrap()
    };

    let db = open_db(&dir).await;
    let head = AckDispatcher::from_database(&db)
        .next_command("udid-1")
        .await
        .unwrap();
    assert_eq!(CommandPayload::decode(&head.body).unwrap().command_uuid, id);
}

#[tokio::test]
async fn test_concurrent_devices_do_not_interfere() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let service = Arc::new(ConnectService::new(AckDispatcher::from_database(&db)));

    let mut handles = Vec::new();
    for n in 0..8 {
        let service = Arc::clone(&service);
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let udid = format!("udid-{n}");
            db.enroll_device(&udid, None, n % 2 == 0).await.unwrap();
            let mut expected = Vec::new();
            for _ in 0..5 {
                let cmd = NewCommand::new(udid.clone(), RequestType::ProfileList).unwrap();
                expected.push(service.enqueue(&cmd).await.unwrap());
            }

            let mut reply = service
                .connect(&Response::new(udid.clone(), Status::Idle))
                .await
                .unwrap();
            let mut seen = Vec::new();
            while let Some(body) = reply.body.clone() {
                let payload = CommandPayload::decode(&body).unwrap();
                if payload.command.request_type == RequestType::DeviceConfigured {
                    break;
                }
                seen.push(payload.command_uuid.clone());
                reply = service
                    .connect(
                        &Response::new(udid.clone(), Status::Acknowledged)
                            .for_command(payload.command_uuid),
                    )
                    .await
                    .unwrap();
            }
            (n, expected, seen, reply.remaining)
        }));
    }

    for handle in handles {
        let (n, expected, seen, remaining) = handle.await.unwrap();
        assert_eq!(seen, expected, "device {n} saw commands out of order");
        let expected_remaining = if n % 2 == 0 { 1 } else { 0 };
        assert_eq!(remaining, expected_remaining, "device {n}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_final_acknowledgments_enqueue_one_follow_up() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let dispatcher = AckDispatcher::from_database(&db);
    db.enroll_device("udid-1", None, true).await.unwrap();

    for round in 0..20 {
        let id = dispatcher
            .enqueue(&NewCommand::new("udid-1", RequestType::ProfileList).unwrap())
            .await
            .unwrap();
        let ack = Response::new("udid-1", Status::Acknowledged).for_command(&id);

        let (first, second) =
            tokio::join!(dispatcher.acknowledge(&ack), dispatcher.acknowledge(&ack));
        assert_eq!(first.unwrap(), 1, "round {round}");
        assert_eq!(second.unwrap(), 1, "round {round}");

        let pending = db.pending_commands("udid-1").await.unwrap();
        assert_eq!(pending.len(), 1, "round {round}");
        assert_eq!(pending[0].request_type(), RequestType::DeviceConfigured);

        // Failing never requeues, so the next round starts empty.
        dispatcher
            .fail_command("udid-1", &pending[0].command_uuid)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_reader_never_sees_empty_inventory_during_replace() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let device = db.enroll_device("udid-1", None, false).await.unwrap();

    let snapshot: Vec<NewDeviceApplication> = (0..3)
        .map(|i| NewDeviceApplication {
            name: format!("App {i}"),
            ..Default::default()
        })
        .collect();
    db.replace_device_applications(&device.uuid, &snapshot)
        .await
        .unwrap();

    let writer = {
        let db = db.clone();
        let uuid = device.uuid.clone();
        let snapshot = snapshot.clone();
        tokio::spawn(async move {
            for _ in 0..25 {
                db.replace_device_applications(&uuid, &snapshot).await.unwrap();
            }
        })
    };

    for _ in 0..50 {
        let apps = db.device_applications(&device.uuid).await.unwrap();
        assert_eq!(apps.len(), 3);
    }
    writer.await.unwrap();
}
