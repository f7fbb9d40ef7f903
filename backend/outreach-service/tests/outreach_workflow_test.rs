// Integration tests for the identity reservation and bulk outreach workflows
//
// Both workflows run against the in-memory collaborators, which behave like
// the remote stores: a single lock makes username claims atomic, contacts are
// scoped to their owner, and the transport fails on demand per address.

use outreach_service::models::{
    Availability, AvailabilityStatus, CoachContact, OutreachDraft, ResponseStatus, Session,
};
use outreach_service::services::outreach::OutreachOptions;
use outreach_service::services::{
    MemoryContactStore, MemoryIdentityStore, MemoryTransport, OutreachService, ReservationService,
    RetryConfig, SchoolDirectory,
};
use outreach_service::OutreachError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DOMAIN: &str = "recruit.test";

struct Harness {
    owner: Uuid,
    identities: Arc<MemoryIdentityStore>,
    contacts: Arc<MemoryContactStore>,
    transport: Arc<MemoryTransport>,
}

impl Harness {
    async fn with_identity() -> Self {
        let owner = Uuid::new_v4();
        let identities = Arc::new(MemoryIdentityStore::new(DOMAIN));
        identities.seed(owner, "jakedavids", "Jake Davids").await;
        Self {
            owner,
            identities,
            contacts: Arc::new(MemoryContactStore::new()),
            transport: Arc::new(MemoryTransport::new()),
        }
    }

    async fn add_contact(&self, name: &str, school: &str, email: &str) -> CoachContact {
        let contact = CoachContact {
            id: Uuid::new_v4(),
            school_id: school.to_string(),
            coach_name: name.to_string(),
            coach_email: email.to_string(),
            response_status: ResponseStatus::None,
            date_contacted: None,
        };
        self.contacts.insert(self.owner, contact.clone()).await;
        contact
    }

    fn service(&self, options: OutreachOptions) -> OutreachService {
        let mut names = HashMap::new();
        names.insert("uga".to_string(), "University of Georgia".to_string());
        names.insert("clemson".to_string(), "Clemson University".to_string());

        OutreachService::new(
            self.identities.clone(),
            self.contacts.clone(),
            self.transport.clone(),
            Arc::new(SchoolDirectory::from_map(names)),
            options,
        )
    }

    fn session(&self) -> Session {
        Session::new(self.owner)
    }
}

fn draft(ids: &[Uuid]) -> OutreachDraft {
    OutreachDraft {
        subject: "{school_name} recruiting interest".to_string(),
        body: "Coach {coach_last_name},\n\nI'm interested in {school_name}.\n\n{sender_name}"
            .to_string(),
        recipient_ids: ids.to_vec(),
    }
}

// ============================================================================
// Bulk outreach
// ============================================================================

#[tokio::test]
async fn test_middle_recipient_failure_is_isolated() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;
    let b = h.add_contact("Dabo Swinney", "clemson", "dabo@clemson.edu").await;
    let c = h.add_contact("Brian Kelly", "lsu", "bkelly@lsu.edu").await;
    h.transport.fail_for("dabo@clemson.edu").await;

    let report = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&[a.id, b.id, c.id]))
        .await
        .unwrap();

    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);

    let a_after = h.contacts.contact(a.id).await.unwrap();
    let b_after = h.contacts.contact(b.id).await.unwrap();
    let c_after = h.contacts.contact(c.id).await.unwrap();

    assert_eq!(a_after.response_status, ResponseStatus::Contacted);
    assert!(a_after.date_contacted.is_some());
    assert_eq!(b_after, b);
    assert_eq!(c_after.response_status, ResponseStatus::Contacted);

    let b_outcome = report.outcome_for(b.id).unwrap();
    assert!(!b_outcome.delivered);
    assert!(b_outcome.error.as_deref().unwrap().contains("rejected"));
}

#[tokio::test]
async fn test_n_recipients_m_failures() {
    let h = Harness::with_identity().await;
    let mut ids = Vec::new();
    let mut failing = Vec::new();
    for i in 0..10 {
        let email = format!("coach{}@school{}.edu", i, i);
        let contact = h.add_contact(&format!("Coach {}", i), "uga", &email).await;
        if i % 3 == 0 {
            h.transport.fail_for(&email).await;
            failing.push(contact.id);
        }
        ids.push(contact.id);
    }

    let report = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&ids))
        .await
        .unwrap();

    let m = failing.len();
    assert_eq!(report.success_count, ids.len() - m);
    assert_eq!(report.failure_count, m);
    assert_eq!(report.total(), ids.len());

    for id in &ids {
        let status = h.contacts.contact(*id).await.unwrap().response_status;
        if failing.contains(id) {
            assert_eq!(status, ResponseStatus::None);
        } else {
            assert_eq!(status, ResponseStatus::Contacted);
        }
    }
}

#[tokio::test]
async fn test_unknown_recipient_counts_as_failure() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;
    let stranger = Uuid::new_v4();

    let report = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&[a.id, stranger]))
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(report.failure_count, 1);
    assert_eq!(
        report.outcome_for(stranger).unwrap().error.as_deref(),
        Some("contact not found")
    );
}

#[tokio::test]
async fn test_another_users_contact_is_not_sent() {
    let h = Harness::with_identity().await;
    let foreign = CoachContact {
        id: Uuid::new_v4(),
        school_id: "uga".to_string(),
        coach_name: "Someone Else".to_string(),
        coach_email: "else@uga.edu".to_string(),
        response_status: ResponseStatus::None,
        date_contacted: None,
    };
    h.contacts.insert(Uuid::new_v4(), foreign.clone()).await;

    let report = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&[foreign.id]))
        .await
        .unwrap();

    assert_eq!(report.failure_count, 1);
    assert!(h.transport.sent().await.is_empty());
}

#[tokio::test]
async fn test_empty_subject_rejected_without_network() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;
    let mut d = draft(&[a.id]);
    d.subject = String::new();
    let calls_before = h.identities.call_count();

    let err = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &d)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(h.identities.call_count(), calls_before);
    assert_eq!(h.contacts.fetch_count(), 0);
    assert_eq!(h.transport.total_attempts().await, 0);
}

#[tokio::test]
async fn test_rendered_subject_and_body_use_school_directory() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;

    h.service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&[a.id]))
        .await
        .unwrap();

    let sent = h.transport.sent().await;
    assert_eq!(sent[0].subject, "University of Georgia recruiting interest");
    assert!(sent[0].text.starts_with("Coach Smart,"));
    assert!(sent[0].text.ends_with("Jake Davids"));
}

#[tokio::test]
async fn test_duplicate_selection_is_not_deduplicated() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;

    let report = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&[a.id, a.id]))
        .await
        .unwrap();

    assert_eq!(report.success_count, 2);
    assert_eq!(h.transport.attempts("ksmart@uga.edu").await, 2);
}

#[tokio::test]
async fn test_bounded_parallel_send_keeps_isolation() {
    let h = Harness::with_identity().await;
    let mut ids = Vec::new();
    for i in 0..12 {
        let email = format!("coach{}@school.edu", i);
        let contact = h.add_contact(&format!("Coach {}", i), "uga", &email).await;
        if i % 4 == 1 {
            h.transport.fail_for(&email).await;
        }
        ids.push(contact.id);
    }

    let options = OutreachOptions {
        max_concurrency: 4,
        ..OutreachOptions::default()
    };
    let report = h
        .service(options)
        .send_bulk(&h.session(), &draft(&ids))
        .await
        .unwrap();

    assert_eq!(report.success_count, 9);
    assert_eq!(report.failure_count, 3);
    assert_eq!(report.outcomes.len(), 12);
}

#[tokio::test]
async fn test_opt_in_retry_recovers_transient_failures() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;
    h.transport.fail_times("ksmart@uga.edu", 2).await;

    let options = OutreachOptions {
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            jitter: false,
            ..RetryConfig::default()
        },
        ..OutreachOptions::default()
    };
    let report = h
        .service(options)
        .send_bulk(&h.session(), &draft(&[a.id]))
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(h.transport.attempts("ksmart@uga.edu").await, 3);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;
    h.transport.fail_times("ksmart@uga.edu", 1).await;

    let report = h
        .service(OutreachOptions::default())
        .send_bulk(&h.session(), &draft(&[a.id]))
        .await
        .unwrap();

    assert_eq!(report.failure_count, 1);
    assert_eq!(h.transport.attempts("ksmart@uga.edu").await, 1);
}

#[tokio::test]
async fn test_sent_status_option() {
    let h = Harness::with_identity().await;
    let a = h.add_contact("Kirby Smart", "uga", "ksmart@uga.edu").await;

    let options = OutreachOptions {
        contacted_status: ResponseStatus::Sent,
        ..OutreachOptions::default()
    };
    h.service(options)
        .send_bulk(&h.session(), &draft(&[a.id]))
        .await
        .unwrap();

    assert_eq!(
        h.contacts.contact(a.id).await.unwrap().response_status,
        ResponseStatus::Sent
    );
}

// ============================================================================
// Identity reservation
// ============================================================================

#[tokio::test]
async fn test_concurrent_reservations_yield_one_winner() {
    let store = Arc::new(MemoryIdentityStore::new(DOMAIN));
    let service = ReservationService::new(store.clone());

    let first = Session::new(Uuid::new_v4());
    let second = Session::new(Uuid::new_v4());

    let s1 = service.clone();
    let s2 = service.clone();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { s1.reserve(&first, "jakedavids", "Jake One").await }),
        tokio::spawn(async move { s2.reserve(&second, "jakedavids", "Jake Two").await }),
    );
    let results = [r1.unwrap(), r2.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(OutreachError::UsernameTaken)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn test_invalid_username_makes_no_remote_call() {
    let store = Arc::new(MemoryIdentityStore::new(DOMAIN));
    let service = ReservationService::new(store.clone());

    assert!(service.check_availability("Ab").await.is_err());
    assert!(service
        .reserve(&Session::new(Uuid::new_v4()), "Ab", "Name")
        .await
        .is_err());
    assert_eq!(store.call_count(), 0);

    assert_eq!(
        service.check_availability("valid_name-1").await.unwrap(),
        Availability::Available
    );
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_taken_username_then_reentry() {
    let store = Arc::new(MemoryIdentityStore::new(DOMAIN));
    store.seed(Uuid::new_v4(), "jakedavids", "Jake").await;
    let service = ReservationService::new(store);
    let session = Session::new(Uuid::new_v4());

    let status = service.availability_status("jakedavids").await.unwrap();
    assert_eq!(status, AvailabilityStatus::Taken);
    assert!(!status.allows_create());

    let status = service.availability_status("jakedavids2").await.unwrap();
    assert!(status.allows_create());
    let identity = service
        .reserve(&session, "jakedavids2", "Jake Davids")
        .await
        .unwrap();
    assert_eq!(identity.address(), "jakedavids2@recruit.test");
}

#[tokio::test]
async fn test_outage_reports_error_not_taken() {
    let store = Arc::new(MemoryIdentityStore::new(DOMAIN));
    store.set_offline(true);
    let service = ReservationService::new(store.clone());

    let status = service.availability_status("jakedavids").await.unwrap();
    assert!(matches!(status, AvailabilityStatus::Error { .. }));

    // Recoverable: the same input succeeds once the store is back
    store.set_offline(false);
    let status = service.availability_status("jakedavids").await.unwrap();
    assert_eq!(status, AvailabilityStatus::Available);
}

#[tokio::test]
async fn test_reserved_identity_enables_outreach() {
    let store = Arc::new(MemoryIdentityStore::new(DOMAIN));
    let reservation = ReservationService::new(store.clone());
    let owner = Uuid::new_v4();
    let session = Session::new(owner);

    let contacts = Arc::new(MemoryContactStore::new());
    let contact = CoachContact {
        id: Uuid::new_v4(),
        school_id: "uga".to_string(),
        coach_name: "Kirby Smart".to_string(),
        coach_email: "ksmart@uga.edu".to_string(),
        response_status: ResponseStatus::None,
        date_contacted: None,
    };
    contacts.insert(owner, contact.clone()).await;
    let transport = Arc::new(MemoryTransport::new());
    let outreach = OutreachService::new(
        store,
        contacts,
        transport.clone(),
        Arc::new(SchoolDirectory::default()),
        OutreachOptions::default(),
    );

    let err = outreach
        .send_bulk(&session, &draft(&[contact.id]))
        .await
        .unwrap_err();
    assert!(matches!(err, OutreachError::IdentityRequired));

    reservation
        .reserve(&session, "jakedavids", "Jake Davids")
        .await
        .unwrap();
    let report = outreach
        .send_bulk(&session, &draft(&[contact.id]))
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert!(transport.sent().await[0]
        .from
        .contains("jakedavids@recruit.test"));
}
