//! Folder, annotation, group, trash, read position and type catalogue endpoints

mod common;

use common::*;
use mendeley_core::api::annotations::AnnotationParams;
use mendeley_core::api::documents::DocumentParams;
use mendeley_core::api::models::{Annotation, Folder, ReadPosition};
use mendeley_core::api::read_positions::ReadPositionParams;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_create_folder_and_file_document() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let folder_id = Uuid::new_v4();
    let document_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/folders"))
        .and(header("content-type", "application/vnd.mendeley-folder.1+json"))
        .and(body_json(json!({ "name": "Reading list" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": folder_id.to_string(),
            "name": "Reading list",
            "created": "2024-03-01T10:00:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/folders/{}/documents", folder_id)))
        .and(header("content-type", "application/vnd.mendeley-folder-add-document.1+json"))
        .and(body_json(json!({ "id": document_id.to_string() })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/folders/{}/documents", folder_id)))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": document_id.to_string() }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/folders/{}/documents/{}", folder_id, document_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let folder = client.create_folder(&Folder::new("Reading list")).await.unwrap();
    assert_eq!(folder.resource.id, Some(folder_id));
    assert!(folder.resource.added.is_some());

    client.add_document_to_folder(folder_id, document_id).await.unwrap();

    let filed = client.list_folder_documents(folder_id, Some(20)).await.unwrap();
    assert_eq!(filed.resource.len(), 1);
    assert_eq!(filed.resource[0].id, document_id);

    client
        .remove_document_from_folder(folder_id, document_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rename_folder_uses_update_media_type() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let folder_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path(format!("/folders/{}", folder_id)))
        .and(header("content-type", "application/vnd.mendeley-folder-update-folder.1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": folder_id.to_string(),
            "name": "Renamed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = client
        .patch_folder(folder_id, &Folder::new("Renamed"))
        .await
        .unwrap();
    assert_eq!(folder.resource.name, "Renamed");
}

#[tokio::test]
async fn test_annotations_list_and_create() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let document_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/annotations"))
        .and(query_param("document_id", document_id.to_string().as_str()))
        .and(query_param("include_trashed", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4().to_string(),
            "type": "highlight",
            "color": { "r": 255, "g": 245, "b": 173 },
            "positions": [{
                "top_left": { "x": 10.0, "y": 20.0 },
                "bottom_right": { "x": 110.0, "y": 30.0 },
                "page": 3
            }],
            "privacy_level": "private",
            "document_id": document_id.to_string()
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/annotations"))
        .and(header("content-type", "application/vnd.mendeley-annotation.1+json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": Uuid::new_v4().to_string(),
            "type": "note",
            "text": "Check the sample size",
            "document_id": document_id.to_string()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = AnnotationParams {
        document_id: Some(document_id),
        include_trashed: Some(true),
        ..Default::default()
    };
    let listed = client.list_annotations(&params).await.unwrap();
    assert_eq!(listed.resource.len(), 1);
    assert_eq!(listed.resource[0].positions.len(), 1);
    assert_eq!(listed.resource[0].positions[0].page, 3);

    let created = client
        .create_annotation(&Annotation::note(document_id, "Check the sample size"))
        .await
        .unwrap();
    assert_eq!(created.resource.text.as_deref(), Some("Check the sample size"));

    let sent = &server.received_requests().await.unwrap()[1];
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["type"], "note");
    assert_eq!(body["document_id"], document_id.to_string());
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn test_group_members() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let group_id = Uuid::new_v4();
    let owner = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/members", group_id)))
        .and(header("content-type", "application/vnd.mendeley-membership.1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "profile_id": owner.to_string(), "joined": "2020-01-01T00:00:00.000Z", "role": "owner" },
            { "profile_id": Uuid::new_v4().to_string(), "role": "normal" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let members = client.list_group_members(group_id, None).await.unwrap();
    assert_eq!(members.resource.len(), 2);
    assert_eq!(members.resource[0].profile_id, owner);
    assert_eq!(members.resource[0].role, "owner");
    assert!(members.resource[1].joined.is_none());
}

#[tokio::test]
async fn test_trash_restore_and_listing() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let document_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/trash"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Mendeley-Count", "1")
                .set_body_json(json!([{
                    "id": document_id.to_string(),
                    "title": "Binned",
                    "type": "book"
                }])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/trash/{}/restore", document_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let trashed = client
        .list_trashed_documents(&DocumentParams::default())
        .await
        .unwrap();
    assert_eq!(trashed.headers.total_count, Some(1));
    assert_eq!(trashed.resource[0].title, "Binned");

    client.restore_trashed_document(document_id).await.unwrap();
}

#[tokio::test]
async fn test_post_read_position() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/recently_read"))
        .and(header("content-type", "application/vnd.mendeley-read-position.1+json"))
        .and(body_json(json!({
            "file_id": file_id.to_string(),
            "page": 7,
            "vertical_position": 0.5
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": Uuid::new_v4().to_string(),
            "file_id": file_id.to_string(),
            "page": 7,
            "vertical_position": 0.5,
            "date": "2024-05-05T08:30:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recently_read"))
        .and(query_param("file_id", file_id.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let position = ReadPosition {
        id: None,
        file_id,
        page: 7,
        vertical_position: 0.5,
        date: None,
    };
    let stored = client.post_read_position(&position).await.unwrap();
    assert_eq!(stored.resource.page, 7);
    assert!(stored.resource.date.is_some());

    let params = ReadPositionParams {
        file_id: Some(file_id),
        ..Default::default()
    };
    assert!(client.list_read_positions(&params).await.unwrap().resource.is_empty());
}

#[tokio::test]
async fn test_document_and_identifier_type_catalogues() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));

    Mock::given(method("GET"))
        .and(path("/document_types"))
        .and(header("content-type", "application/vnd.mendeley-document-type.1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "journal", "description": "Journal" },
            { "name": "book", "description": "Book" },
            { "name": "generic" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identifier_types"))
        .and(header("content-type", "application/vnd.mendeley-document-identifier.1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "doi", "description": "DOI" },
            { "name": "isbn", "description": "ISBN" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let types = client.get_document_types().await.unwrap().resource;
    assert_eq!(types.len(), 3);
    assert_eq!(types.get("journal").map(String::as_str), Some("Journal"));
    assert_eq!(types.get("book").map(String::as_str), Some("Book"));
    assert_eq!(types.get("generic").map(String::as_str), Some(""));

    let identifiers = client.get_identifier_types().await.unwrap().resource;
    assert_eq!(
        identifiers.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["doi", "isbn"]
    );
}
