//! Integration tests for multiform

use multiform::{
    Boundary, Error, FileDescriptor, LocalResources, Params, ResourceError, Result,
    UploadConfig, UploadRequest,
};
use serde_json::json;
use std::io::Write;
use std::path::Path;

fn write_file(dir: &Path, name: &str, len: usize) -> String {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    let contents: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    file.write_all(&contents).unwrap();
    path.to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_two_files_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_file(dir.path(), "a.jpg", 100);
    let b = write_file(dir.path(), "b.png", 200);

    let request = UploadRequest::new(
        Params::new(),
        vec![
            FileDescriptor::new("f1", &a),
            FileDescriptor::new("f2", &b).mime_type("image/png"),
        ],
        LocalResources::new(),
    )
    .await?;

    let boundary = Boundary::fixed();
    let files = request.files();
    assert_eq!(files[0].after_header(), boundary.continue_delimiter());
    assert_eq!(files[1].after_header(), boundary.end_delimiter());
    assert_eq!(files[0].resource_length(), 100);
    assert_eq!(files[1].resource_length(), 200);

    let declared = request.params_data().len() as u64
        + files[0].before_header().len() as u64
        + files[0].after_header().len() as u64
        + 100
        + files[1].before_header().len() as u64
        + files[1].after_header().len() as u64
        + 200;
    assert_eq!(request.content_length(), declared);

    let mut body = Vec::new();
    let written = request.write_to(&mut body).await?;
    assert_eq!(written, declared);
    assert_eq!(body.len() as u64, declared);
    assert!(body.ends_with(b"\r\n--+++++--\r\n"));

    Ok(())
}

#[tokio::test]
async fn test_params_and_file_body_layout() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_file(dir.path(), "note.txt", 0);
    std::fs::write(&path, "hello")?;

    let request = UploadRequest::from_json(
        &json!({ "title": "Grüße", "count": 2, "headers": { "X-Trace": "1" } }),
        &json!([{ "key": "note", "name": path.clone(), "mimeType": "text/plain" }]),
        LocalResources::new(),
    )
    .await?;

    let mut body = Vec::new();
    request.write_to(&mut body).await?;
    let body = String::from_utf8(body).unwrap();

    let expected = format!(
        "--+++++\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nGrüße\r\n\
         --+++++\r\nContent-Disposition: form-data; name=\"count\"\r\n\r\n2\r\n\
         --+++++\r\nContent-Disposition: form-data; name=\"note\"; filename=\"{path}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello\r\n--+++++--\r\n"
    );
    assert_eq!(body, expected);
    assert!(!body.contains("X-Trace"));

    Ok(())
}

#[tokio::test]
async fn test_content_length_header_matches_body() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files: Vec<_> = (0..4)
        .map(|i| {
            let path = write_file(dir.path(), &format!("part{i}.bin"), 1000 * i + 7);
            FileDescriptor::new(format!("file{i}"), path)
        })
        .collect();

    let request = UploadRequest::builder(LocalResources::new())
        .param("ünïcödé", "välüé")
        .files(files)
        .config(UploadConfig::new().resolve_concurrency(3))
        .build()
        .await?;

    let header = request.headers()[http::header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse::<u64>()
        .unwrap();
    assert_eq!(header, request.content_length());

    let mut body = Vec::new();
    request.write_to(&mut body).await?;
    assert_eq!(body.len() as u64, header);

    Ok(())
}

#[tokio::test]
async fn test_missing_file_fails_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let present = write_file(dir.path(), "present.jpg", 10);
    let missing = dir.path().join("missing.jpg");

    let err = UploadRequest::new(
        Params::new().field("a", "b"),
        vec![
            FileDescriptor::new("ok", &present),
            FileDescriptor::new("gone", missing.to_str().unwrap()),
        ],
        LocalResources::new(),
    )
    .await
    .unwrap_err();

    match err {
        Error::FileResolution { key, source, .. } => {
            assert_eq!(key, "gone");
            assert!(matches!(source, ResourceError::NotFound(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_random_boundary_body() -> Result<()> {
    let request = UploadRequest::builder(LocalResources::new())
        .param("a", "1")
        .file(FileDescriptor::new("inline", "data:text/plain;base64,aGk=").mime_type("text/plain"))
        .config(UploadConfig::new().random_boundary())
        .build()
        .await?;

    let boundary = request.boundary().clone();
    assert!(boundary.is_random());
    assert_eq!(
        request.headers()[http::header::CONTENT_TYPE],
        boundary.content_type().as_str()
    );

    let mut body = Vec::new();
    request.write_to(&mut body).await?;
    let body = String::from_utf8(body).unwrap();
    assert!(body.starts_with(&boundary.opener()));
    assert!(body.ends_with(&format!("hi{}", boundary.end_delimiter())));

    Ok(())
}
