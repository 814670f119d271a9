//! Session controller integration tests
//!
//! Drives the full listen/confirm/dispatch cycle with scripted audio and
//! transcriptions on a manual clock.

use std::time::Duration;

use brigade::events::CaptureStage;
use brigade::{ConfirmationResult, IntentKind, SessionEvent, SessionPhase, SessionSettings};

mod common;

use common::{Script, controller, failing_controller, test_settings};

fn launch(order: &str) -> (IntentKind, String) {
    (IntentKind::Launch, order.to_string())
}

fn ready(order: &str) -> (IntentKind, String) {
    (IntentKind::Ready, order.to_string())
}

#[tokio::test]
async fn test_step_walks_through_every_phase() {
    let script = Script::new().say("commande 3 lancée").say("oui");
    let (mut controller, harness) = controller(script, test_settings());

    assert_eq!(controller.phase(), &SessionPhase::Idle);

    assert_eq!(controller.step().await, &SessionPhase::Listening);
    assert!(matches!(controller.step().await, SessionPhase::Detected(i) if i.order_number == "3"));
    assert!(matches!(controller.step().await, SessionPhase::Confirming(i) if i.kind == IntentKind::Launch));
    assert!(matches!(controller.step().await, SessionPhase::Dispatching(_)));
    assert!(harness.dispatched().is_empty());
    assert_eq!(controller.step().await, &SessionPhase::Listening);

    assert_eq!(harness.dispatched(), vec![launch("3")]);
}

#[tokio::test]
async fn test_confirmed_command_is_dispatched() {
    let script = Script::new().say("commande 5 prête").say("oui c'est ça");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;

    assert_eq!(harness.dispatched(), vec![ready("5")]);
    assert!(controller.state().last_command_time.is_some());

    let events = harness.events.events();
    assert_eq!(events[0], SessionEvent::Started);
    assert!(matches!(&events[1], SessionEvent::IntentDetected { text, .. } if text == "commande 5 prête"));
    assert!(matches!(&events[2], SessionEvent::ConfirmationRequested { .. }));
    assert!(matches!(
        &events[3],
        SessionEvent::ConfirmationResolved {
            result: ConfirmationResult::Affirmed,
            response: Some(r),
            ..
        } if r == "oui c'est ça"
    ));
    assert!(matches!(&events[4], SessionEvent::Dispatched { intent } if intent.order_number == "5"));
}

#[tokio::test]
async fn test_cooldown_between_dispatches() {
    let script = Script::new()
        .say("commande 3 lancée")
        .say("oui")
        .say("commande 4 prête")
        .say("commande 5 lancée")
        .say("oui");
    let settings = SessionSettings {
        cooldown: Duration::from_secs(10),
        ..test_settings()
    };
    let (mut controller, harness) = controller(script, settings);

    // t = 0
    controller.run_cycle().await;
    controller.run_cycle().await;
    assert_eq!(harness.dispatched(), vec![launch("3")]);

    // t = 5: recognized but held back, no confirmation asked
    harness.clock.advance(Duration::from_secs(5));
    harness.events.clear();
    controller.run_cycle().await;

    let events = harness.events.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        SessionEvent::CooldownActive { intent, remaining_ms: 5000 } if intent.order_number == "4"
    ));
    assert_eq!(harness.dispatched().len(), 1);

    // t = 11
    harness.clock.advance(Duration::from_secs(6));
    controller.run_cycle().await;

    assert_eq!(harness.dispatched(), vec![launch("3"), launch("5")]);
}

#[tokio::test]
async fn test_short_answers_are_classified() {
    let script = Script::new()
        .say("commande 3 lancée")
        .say("ok")
        .say("commande 4 prête")
        .say("no");
    let settings = SessionSettings {
        cooldown: Duration::ZERO,
        ..test_settings()
    };
    let (mut controller, harness) = controller(script, settings);

    controller.run_cycle().await;
    controller.run_cycle().await;
    harness.clock.advance(Duration::from_millis(1));
    controller.run_cycle().await;

    assert_eq!(harness.dispatched(), vec![launch("3")]);

    let events = harness.events.events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::TooShort { .. }))
    );
    assert!(matches!(
        events.last(),
        Some(SessionEvent::ConfirmationResolved {
            result: ConfirmationResult::Declined,
            response: Some(r),
            ..
        }) if r == "no"
    ));
}

#[tokio::test]
async fn test_empty_answer_is_unclear() {
    let script = Script::new().say("commande 3 lancée").say("  ");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;

    assert!(harness.dispatched().is_empty());
    assert!(harness.events.events().contains(&SessionEvent::TooShort {
        stage: CaptureStage::Confirmation,
        text: String::new(),
    }));
}

#[tokio::test]
async fn test_declined_command_is_not_dispatched() {
    let script = Script::new().say("commande 7 lancée").say("non merci");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    assert_eq!(controller.run_cycle().await, &SessionPhase::Listening);

    assert!(harness.dispatched().is_empty());
    assert!(controller.state().last_command_time.is_none());
    assert!(harness.events.events().iter().any(|e| matches!(
        e,
        SessionEvent::ConfirmationResolved {
            result: ConfirmationResult::Declined,
            ..
        }
    )));
}

#[tokio::test]
async fn test_unclear_answer_fails_closed() {
    let script = Script::new().say("commande 7 lancée").say("peut-être");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;

    assert!(harness.dispatched().is_empty());
    assert!(harness.events.events().iter().any(|e| matches!(
        e,
        SessionEvent::ConfirmationResolved {
            result: ConfirmationResult::Unclear,
            ..
        }
    )));
}

#[tokio::test]
async fn test_silent_confirmation_is_unclear() {
    let script = Script::new().say("commande 2 prête").silence();
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;

    assert!(harness.dispatched().is_empty());
    let events = harness.events.events();
    assert!(events.contains(&SessionEvent::Silence {
        stage: CaptureStage::Confirmation,
        peak: 0.0,
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ConfirmationResolved {
            result: ConfirmationResult::Unclear,
            response: None,
            ..
        }
    )));
}

#[tokio::test]
async fn test_unclear_retry_asks_again() {
    let script = Script::new()
        .say("commande 8 lancée")
        .say("peut-être")
        .say("oui");
    let settings = SessionSettings {
        unclear_retries: 1,
        ..test_settings()
    };
    let (mut controller, harness) = controller(script, settings);

    controller.run_cycle().await;
    controller.run_cycle().await;

    assert_eq!(harness.dispatched(), vec![launch("8")]);
    let requests = harness
        .events
        .events()
        .iter()
        .filter(|e| matches!(e, SessionEvent::ConfirmationRequested { .. }))
        .count();
    assert_eq!(requests, 2);
}

#[tokio::test]
async fn test_unclear_retries_are_bounded() {
    let script = Script::new()
        .say("commande 8 lancée")
        .say("peut-être")
        .say("merci")
        .say("oui");
    let settings = SessionSettings {
        unclear_retries: 1,
        ..test_settings()
    };
    let (mut controller, harness) = controller(script, settings);

    controller.run_cycle().await;
    controller.run_cycle().await;

    // the "oui" arrives after the controller gave up and is heard as a command
    assert!(harness.dispatched().is_empty());
    controller.run_cycle().await;
    assert!(harness.dispatched().is_empty());
    assert!(matches!(
        harness.events.events().last(),
        Some(SessionEvent::NoCommand { text }) if text == "oui"
    ));
}

#[tokio::test]
async fn test_silence_never_reaches_transcriber() {
    let script = Script::new().silence().silence();
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;
    controller.run_cycle().await;

    assert_eq!(harness.captures.get(), 2);
    assert_eq!(harness.transcriptions.get(), 0);
    assert!(
        harness
            .events
            .events()
            .iter()
            .skip(1)
            .all(|e| matches!(e, SessionEvent::Silence { stage: CaptureStage::Command, .. }))
    );
}

#[tokio::test]
async fn test_unrecognized_speech_is_logged_and_ignored() {
    let script = Script::new().say("bonjour tout le monde").say("ok");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;
    controller.run_cycle().await;

    let events = harness.events.events();
    assert!(matches!(&events[1], SessionEvent::NoCommand { text } if text == "bonjour tout le monde"));
    assert!(matches!(
        &events[2],
        SessionEvent::TooShort { stage: CaptureStage::Command, text } if text == "ok"
    ));
    assert_eq!(controller.phase(), &SessionPhase::Listening);
}

#[tokio::test]
async fn test_capture_failures_do_not_stop_the_loop() {
    let script = Script::new()
        .capture_error()
        .stt_error()
        .say("commande 9 lancée")
        .say("oui");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;
    controller.run_cycle().await;
    controller.run_cycle().await;

    let events = harness.events.events();
    assert!(matches!(
        &events[1],
        SessionEvent::CaptureFailed { stage: CaptureStage::Command, error } if error.contains("device unplugged")
    ));
    assert!(matches!(
        &events[2],
        SessionEvent::CaptureFailed { error, .. } if error.contains("503")
    ));
    assert_eq!(harness.dispatched(), vec![launch("9")]);
}

#[tokio::test]
async fn test_failed_dispatch_does_not_start_cooldown() {
    let script = Script::new()
        .say("commande 4 prête")
        .say("oui")
        .say("commande 4 prête");
    let (mut controller, harness) = failing_controller(script, test_settings());

    controller.run_cycle().await;
    controller.run_cycle().await;

    assert!(controller.state().last_command_time.is_none());
    assert!(harness.events.events().iter().any(|e| matches!(
        e,
        SessionEvent::DispatchFailed { error, .. } if error.contains("unreachable")
    )));

    // retried by voice right away, not held back
    controller.run_cycle().await;

    let events = harness.events.events();
    let detected = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::IntentDetected { .. }))
        .count();
    assert_eq!(detected, 2);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::CooldownActive { .. }))
    );
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let script = Script::new().say("commande 1 lancée");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_cycle().await;
    controller.shutdown();
    controller.shutdown();

    assert_eq!(controller.step().await, &SessionPhase::Shutdown);
    assert_eq!(controller.run_cycle().await, &SessionPhase::Shutdown);

    let shutdowns = harness
        .events
        .events()
        .iter()
        .filter(|e| **e == SessionEvent::Shutdown)
        .count();
    assert_eq!(shutdowns, 1);
    assert_eq!(harness.captures.get(), 0);
}

#[tokio::test]
async fn test_shutdown_while_confirming_drops_intent() {
    let script = Script::new().say("commande 6 lancée").say("oui");
    let (mut controller, harness) = controller(script, test_settings());

    controller.step().await;
    controller.step().await;
    controller.step().await;
    assert!(matches!(controller.phase(), SessionPhase::Confirming(_)));

    controller.shutdown();
    controller.step().await;

    assert!(harness.dispatched().is_empty());
    assert_eq!(controller.phase(), &SessionPhase::Shutdown);
}

#[tokio::test]
async fn test_run_until_stops_immediately() {
    let script = Script::new().say("commande 1 lancée").say("oui");
    let (mut controller, harness) = controller(script, test_settings());

    controller.run_until(async {}).await;

    assert_eq!(controller.phase(), &SessionPhase::Shutdown);
    assert_eq!(harness.captures.get(), 0);
    assert!(harness.dispatched().is_empty());
    assert_eq!(harness.events.events().last(), Some(&SessionEvent::Shutdown));
}

#[tokio::test]
async fn test_run_until_keeps_listening_until_shutdown() {
    let script = Script::new()
        .silence()
        .say("commande 12 lancée")
        .say("oui")
        .say("bonjour tout le monde");
    let (mut controller, harness) = controller(script, test_settings());

    controller
        .run_until(tokio::time::sleep(Duration::from_millis(300)))
        .await;

    assert_eq!(harness.dispatched(), vec![launch("12")]);
    assert!(harness.captures.get() > 4);
    assert_eq!(controller.phase(), &SessionPhase::Shutdown);
}
