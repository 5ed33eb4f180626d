#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Identity bound for one request must never be observed by another request
//! that later (or concurrently) uses the same pooled connection.

use std::sync::Arc;

use ownergate_db::{MemoryPool, SessionError, SessionPropagator};
use ownergate_security::Principal;

async fn observed_subject(
    propagator: &SessionPropagator<MemoryPool>,
    principal: Principal,
) -> (u64, Option<String>) {
    propagator
        .with_bound_session(&principal, |session| {
            Box::pin(async move {
                let conn = session.connection()?;
                tokio::task::yield_now().await;
                Ok::<_, SessionError>((
                    conn.id(),
                    conn.current_value("app.user_id").map(str::to_owned),
                ))
            })
        })
        .await
        .unwrap()
}

async fn unbound_view(propagator: &SessionPropagator<MemoryPool>) -> (u64, Option<String>) {
    propagator
        .with_connection(|session| {
            Box::pin(async move {
                let conn = session.connection()?;
                Ok::<_, SessionError>((
                    conn.id(),
                    conn.current_value("app.user_id").map(str::to_owned),
                ))
            })
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn sequential_requests_on_one_connection_see_only_their_own_identity() {
    let pool = Arc::new(MemoryPool::new(1));
    let propagator = SessionPropagator::new(Arc::clone(&pool));

    let (first_conn, first) = observed_subject(&propagator, Principal::standard(1)).await;
    let (second_conn, second) = observed_subject(&propagator, Principal::standard(2)).await;
    let (third_conn, after) = unbound_view(&propagator).await;

    assert_eq!(first_conn, second_conn, "pool of one must reuse the connection");
    assert_eq!(second_conn, third_conn);
    assert_eq!(first.as_deref(), Some("1"));
    assert_eq!(second.as_deref(), Some("2"));
    assert_eq!(after, None, "identity leaked past the end of the request");

    let stats = pool.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.leaked_releases, 0);
    assert_eq!(stats.discarded, 0);
}

#[tokio::test]
async fn role_is_bound_next_to_the_subject() {
    let pool = Arc::new(MemoryPool::new(1));
    let propagator = SessionPropagator::new(Arc::clone(&pool));

    let role = propagator
        .with_bound_session(&Principal::admin(9), |session| {
            Box::pin(async move {
                let conn = session.connection()?;
                Ok::<_, SessionError>(conn.current_value("app.user_role").map(str::to_owned))
            })
        })
        .await
        .unwrap();

    assert_eq!(role.as_deref(), Some("admin"));
    assert!(pool.idle_sessions().iter().all(|(_, s)| s.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_observe_each_other() {
    let pool = Arc::new(MemoryPool::new(2));
    let propagator = SessionPropagator::new(Arc::clone(&pool));

    let mut handles = Vec::new();
    for subject in 1..=16_i64 {
        let propagator = propagator.clone();
        handles.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..8 {
                let (_, observed) = observed_subject(&propagator, Principal::standard(subject)).await;
                seen.push(observed);
            }
            (subject, seen)
        }));
    }

    for handle in handles {
        let (subject, seen) = handle.await.unwrap();
        let expected = subject.to_string();
        assert!(
            seen.iter().all(|v| v.as_deref() == Some(expected.as_str())),
            "subject {subject} observed {seen:?}"
        );
    }

    let stats = pool.stats();
    assert!(stats.opened <= 2);
    assert_eq!(stats.checkouts, 16 * 8);
    assert_eq!(stats.leaked_releases, 0);
    assert!(pool.idle_sessions().iter().all(|(_, s)| s.is_empty()));
}

#[tokio::test]
async fn body_error_still_clears_the_connection() {
    let pool = Arc::new(MemoryPool::new(1));
    let propagator = SessionPropagator::new(Arc::clone(&pool));

    let res: Result<(), SessionError> = propagator
        .with_bound_session(&Principal::standard(4), |_session| {
            Box::pin(async move { Err(SessionError::Released) })
        })
        .await;

    assert!(matches!(res, Err(SessionError::Released)));
    let (_, after) = unbound_view(&propagator).await;
    assert_eq!(after, None);
    assert_eq!(pool.stats().leaked_releases, 0);
    assert_eq!(pool.stats().discarded, 0);
}
