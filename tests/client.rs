use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use serde_json::json;

use placement_portal::client::{FileTokenStore, JobCache, MemoryTokenStore, PortalClient, SessionState, TokenStore};
use placement_portal::data::Database;
use placement_portal::utils::config::PortalConfig;
use placement_portal::utils::enums::{ApplicationStatus, Role};
use placement_portal::utils::structures::{JobRequest, RegisterRequest};
use placement_portal::utils::validate::SkillsInput;
use placement_portal::{configure, AppState};

fn registration(name: &str, email: &str, role: &str) -> RegisterRequest {
    RegisterRequest {
        name: Some(name.into()),
        email: Some(email.into()),
        password: Some("secret1".into()),
        role: Some(role.into()),
    }
}

fn rust_internship() -> JobRequest {
    JobRequest {
        title: Some("Rust Intern".into()),
        description: Some("Work on the placement portal".into()),
        company: Some("Acme".into()),
        location: Some("Berlin".into()),
        salary: Some("1500/month".into()),
        skills: Some(SkillsInput::from(vec!["Rust".to_string(), "SQL".to_string()])),
        apply_by: Some("2030-06-30".into()),
        time_period: Some("Internship".into()),
        job_type: Some("Internship".into()),
    }
}

#[actix_web::test]
async fn client_drives_a_running_portal() {
    let uploads = tempfile::tempdir().unwrap();
    let config = PortalConfig {
        uploads_dir: uploads.path().to_path_buf(),
        ..PortalConfig::default()
    };
    let state = web::Data::new(AppState::new(Database::open_in_memory().unwrap(), config));

    let server_state = state.clone();
    let server = HttpServer::new(move || App::new().app_data(server_state.clone()).configure(configure))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let base_url = format!("http://{}", server.addrs()[0]);
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    // Recruiter publishes an internship
    let recruiter = PortalClient::new(&base_url, Arc::new(MemoryTokenStore::new())).unwrap();
    let recruiter_user = recruiter
        .register(&registration("Rita Recruiter", "r@x.com", "recruiter"))
        .await
        .unwrap();
    assert_eq!(recruiter_user.role, Role::Recruiter);
    assert!(recruiter.has_token());

    let job = recruiter.create_job(&rust_internship()).await.unwrap();
    assert_eq!(job.skills, ["Rust", "SQL"]);
    assert_eq!(recruiter.my_jobs().await.unwrap().len(), 1);

    // Student registers, then signs in through the session container
    let token_dir = tempfile::tempdir().unwrap();
    let token_path = token_dir.path().join("token");
    let student = PortalClient::new(&base_url, Arc::new(FileTokenStore::new(&token_path))).unwrap();
    let student_user = student
        .register(&registration("Sam Student", "s@x.com", "student"))
        .await
        .unwrap();
    student.clear_token().unwrap();

    let session = SessionState::new();
    let mut changes = session.subscribe();
    assert_eq!(session.restore(&student).await.unwrap().map(|u| u.id), None);
    assert_eq!(session.landing_route(), "/login");

    session.login(&student, "s@x.com", "secret1").await.unwrap();
    assert!(changes.has_changed().unwrap());
    assert_eq!(changes.borrow_and_update().landing_route(), "/student/dashboard");

    let jobs = JobCache::new();
    assert_eq!(jobs.refresh(&student, Some(Role::Student)).await.unwrap(), 1);
    assert_eq!(student.internships().await.unwrap()[0].id, job.id);

    // Apply, get a duplicate rejected, and see the recruiter's decision
    let application = student.apply(&job.id, "http://r.example", "Hi").await.unwrap();
    assert_eq!(application.status, ApplicationStatus::Pending);
    let duplicate = student.apply(&job.id, "http://r.example", "Hi").await.unwrap_err();
    assert_eq!(duplicate.status(), Some(409));

    let received = recruiter.received_applications().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].student.id, student_user.id);
    recruiter
        .set_status(&application.id, ApplicationStatus::Accepted)
        .await
        .unwrap();

    let applied = student.applied().await.unwrap();
    assert_eq!(applied[0].status, ApplicationStatus::Accepted);
    assert_eq!(student.notifications().await.unwrap().unread, 1);

    let detail = recruiter.get_job(&job.id).await.unwrap();
    assert_eq!(detail.applicants[0].id, student_user.id);

    // Messages and resume upload
    student.send_message(&recruiter_user.id, "Thank you!").await.unwrap();
    let conversations = recruiter.conversations().await.unwrap();
    assert_eq!(conversations[0].last_message.content, "Thank you!");

    let resume = student
        .upload_resume("cv.pdf", b"%PDF-1.4 resume".to_vec(), Some(&json!({ "skills": ["Rust"] })))
        .await
        .unwrap();
    assert!(resume.file_url.ends_with(".pdf"));
    assert_eq!(student.latest_resume().await.unwrap().id, resume.id);

    // A new process restores the session from the token file
    let restarted = PortalClient::new(&base_url, Arc::new(FileTokenStore::new(&token_path))).unwrap();
    let restored = SessionState::new();
    let user = restored.restore(&restarted).await.unwrap().unwrap();
    assert_eq!(user.id, student_user.id);

    // After logout the old token is revoked and a stale copy gets dropped
    let old_token = FileTokenStore::new(&token_path).load().unwrap();
    session.logout(&student).await.unwrap();
    assert_eq!(session.landing_route(), "/login");
    assert!(!student.has_token());

    let stale_store = Arc::new(MemoryTokenStore::new());
    stale_store.save(&old_token).unwrap();
    let stale = PortalClient::new(&base_url, stale_store.clone()).unwrap();
    assert!(SessionState::new().restore(&stale).await.unwrap().is_none());
    assert_eq!(stale_store.load(), None);

    handle.stop(true).await;
}
