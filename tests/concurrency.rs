mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;

#[tokio::test]
async fn second_submit_while_pending_is_a_no_op() -> anyhow::Result<()> {
    let transport = Arc::new(
        ScriptedTransport::gated().respond(binary_response(true, 2, "0.870", "1.230", png_bytes())),
    );
    let (session, _store) = session_with(transport.clone());
    session.select_file(jpeg_bytes(64), "image/jpeg", 64)?;

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    transport.wait_for_request().await;
    assert_eq!(session.state(), SessionState::Submitting);

    assert_eq!(session.submit().await, SubmitOutcome::Skipped(SkipReason::AlreadySubmitting));
    // selection is ignored while a request is in flight
    assert_eq!(session.select_file(jpeg_bytes(8), "image/jpeg", 8)?, SessionState::Submitting);

    transport.release();
    assert_eq!(first.await?, SubmitOutcome::Applied(SessionState::Succeeded));
    assert_eq!(transport.request_count(), 1);
    assert_eq!(
        session.snapshot().preview_handle.map(|h| h.len),
        Some(64),
        "preview from before the submission is kept"
    );
    Ok(())
}

#[tokio::test]
async fn response_after_reset_is_discarded() -> anyhow::Result<()> {
    let transport = Arc::new(
        ScriptedTransport::gated().respond(binary_response(true, 1, "0.990", "0.300", png_bytes())),
    );
    let (session, store) = session_with(transport.clone());
    session.select_file(jpeg_bytes(64), "image/jpeg", 64)?;

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    transport.wait_for_request().await;

    session.reset();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(store.live(), 0);

    transport.release();
    assert_eq!(pending.await?, SubmitOutcome::Discarded);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(snapshot.result.is_none());
    assert!(snapshot.result_handle.is_none());
    assert_eq!(store.live(), 0);
    Ok(())
}

#[tokio::test]
async fn stale_response_cannot_overwrite_newer_request() -> anyhow::Result<()> {
    let transport = Arc::new(
        ScriptedTransport::gated()
            .respond(binary_response(true, 1, "0.100", "9.000", png_bytes()))
            .respond(binary_response(true, 3, "0.800", "0.400", png_bytes())),
    );
    let (session, store) = session_with(transport.clone());

    session.select_file(jpeg_bytes(32), "image/jpeg", 32)?;
    let stale = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    transport.wait_for_request().await;

    session.reset();
    session.select_file(jpeg_bytes(48), "image/jpeg", 48)?;
    let fresh = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    transport.wait_for_request().await;

    // responses are handed out in request order, the first one goes to the stale call
    transport.release();
    assert_eq!(stale.await?, SubmitOutcome::Discarded);
    assert_eq!(session.state(), SessionState::Submitting);

    transport.release();
    assert_eq!(fresh.await?, SubmitOutcome::Applied(SessionState::Succeeded));
    assert_eq!(session.snapshot().result.map(|r| r.count), Some(3));
    assert_eq!(store.live(), 2);
    Ok(())
}

#[tokio::test]
async fn cancelled_submit_does_not_leave_session_submitting() -> anyhow::Result<()> {
    let transport = Arc::new(
        ScriptedTransport::gated().respond(binary_response(true, 1, "0.800", "0.200", png_bytes())),
    );
    let (session, _store) = session_with(transport.clone());
    session.select_file(jpeg_bytes(64), "image/jpeg", 64)?;

    let timed_out = tokio::time::timeout(Duration::from_millis(50), session.submit()).await;
    assert!(timed_out.is_err());
    assert_eq!(session.state(), SessionState::FileSelected);
    assert_eq!(session.select_file(jpeg_bytes(32), "image/jpeg", 32)?, SessionState::FileSelected);

    let retry = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    transport.release();
    assert_eq!(retry.await?, SubmitOutcome::Applied(SessionState::Succeeded));
    assert_eq!(transport.request_count(), 2);
    Ok(())
}
